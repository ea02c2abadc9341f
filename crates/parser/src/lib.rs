//! Text front-end for `pmcheck_core` traces.
//!
//! [`parse_trace`] reads the compact line-oriented DSL produced by
//! [`format_trace`](pmcheck_core::trace::display::format_trace), and
//! [`tokenize`] exposes the underlying lexer for tooling such as syntax
//! highlighting.

pub mod lexer;
pub mod parser;

pub use lexer::{describe_first, tokenize, Token, TokenKind};
pub use parser::{parse_trace, ParseError};
