//! Logos-based lexer for the compact trace text DSL.
//!
//! A trace lists one observed event per line. Events attributed to a thread
//! are prefixed with the thread id (`t1:`), numbers are decimal or `0x` hex,
//! `=` introduces a stored value and `@` a call-context handle.
//!
//! # Example input
//!
//! ```text
//! // one transaction on thread 1
//! map 0x0 0x10000
//! t1: begin 7
//! add 7 0x2000 0x100
//! t1: store 0x2000 16 = 0xff @ 3
//! flush 0x2000 16
//! fence
//! end 7
//! ```

use core::ops::Range;

/// All token kinds produced by the DSL lexer.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(::logos::Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A line comment starting with `//` and running to end of line.
    #[regex(r"//[^\n]*", allow_greedy = true)]
    Comment,

    /// A keyword or thread id such as `store` or `t1`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    /// A hexadecimal literal with `0x` prefix.
    #[regex(r"0[xX][0-9a-fA-F]+")]
    Hex,

    /// A decimal literal.
    #[regex(r"[0-9]+")]
    Integer,

    /// Thread prefix separator `:`.
    #[token(":")]
    Colon,

    /// Stored value marker `=`.
    #[token("=")]
    Equals,

    /// Call-context marker `@`.
    #[token("@")]
    At,

    /// A newline (`\n` or `\r\n`).
    #[regex(r"\r?\n")]
    Newline,

    /// Spaces or tabs.
    #[regex(r"[ \t]+")]
    Whitespace,
}

impl TokenKind {
    /// Human-readable name used in diagnostics.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Ident => "identifier",
            Self::Hex => "hex literal",
            Self::Integer => "integer",
            Self::Colon => "`:`",
            Self::Equals => "`=`",
            Self::At => "`@`",
            Self::Newline => "end of line",
            Self::Whitespace => "whitespace",
        }
    }
}

/// A single token with its kind and the byte-offset span in the source.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range `start..end` into the original input string.
    pub span: Range<usize>,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// Return the source text for this token given the original input.
    #[must_use]
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.span.clone()]
    }
}

/// Tokenize `input` and return all valid tokens.
///
/// Tokens that the lexer cannot recognise are silently skipped.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    use logos::Logos as _;
    TokenKind::lexer(input)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|kind| Token { kind, span }))
        .collect()
}

/// Describes the first token of `input`, for error messages.
///
/// Returns `None` at end of input.
#[must_use]
pub fn describe_first(input: &str) -> Option<String> {
    use logos::Logos as _;
    let (result, span) = TokenKind::lexer(input).spanned().next()?;
    let text = &input[span];
    Some(match result {
        Ok(kind @ (TokenKind::Colon | TokenKind::Equals | TokenKind::At | TokenKind::Newline)) => {
            kind.describe().to_string()
        }
        Ok(kind) => format!("{} `{text}`", kind.describe()),
        Err(()) => format!("unrecognized character `{text}`"),
    })
}
