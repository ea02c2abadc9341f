use pmcheck_core::trace::TraceEvent;
use pmcheck_core::{ContextHandle, ThreadId, TxId};
/// Winnow-based parser for the compact trace text DSL.
///
/// Grammar:
/// ```text
/// trace        = line* EOF
/// line         = WS? (event WS?)? comment? (NEWLINE | EOF)
/// comment      = "//" REST_OF_LINE
/// event        = thread ":" WS? thread_event
///              | "map" WS num WS num | "unmap" WS num WS num
///              | "exclude" WS num WS num | "flush" WS num WS num
///              | "fence" | "end" WS num
///              | "add" WS num WS num WS num | "remove" WS num WS num WS num
/// thread_event = "store" WS num WS num WS? "=" WS? num (WS? "@" WS? INTEGER)?
///              | "begin" WS num | "join" WS num | "leave" WS num
/// thread       = "t" INTEGER
/// num          = "0x" HEX | INTEGER
/// ```
use winnow::ascii::{dec_uint, hex_uint, line_ending, till_line_ending};
use winnow::combinator::{alt, eof, opt, preceded};
use winnow::prelude::*;
use winnow::token::{literal, take_while};
use winnow::ModalResult;

use crate::lexer::describe_first;

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

/// A parse error with human-readable location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse a compact trace DSL string into a list of events.
///
/// # Errors
///
/// Returns a [`ParseError`] with line/column information when the input does
/// not conform to the grammar. The message names the offending token.
pub fn parse_trace(input: &str) -> Result<Vec<TraceEvent>, ParseError> {
    let original = input;
    let mut stream: &str = input;
    match trace_parser.parse_next(&mut stream) {
        Ok(events) => Ok(events),
        Err(_) => {
            let consumed = original.len().saturating_sub(stream.len());
            let (line, column) = offset_to_line_col(original, consumed);
            let found = describe_first(stream).unwrap_or_else(|| "end of input".to_string());
            Err(ParseError {
                message: format!("unexpected {found}"),
                line,
                column,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Line/column helper
// ---------------------------------------------------------------------------

/// Convert a byte offset into the original input to 1-based (line, column).
fn offset_to_line_col(input: &str, offset: usize) -> (usize, usize) {
    let safe_offset = offset.min(input.len());
    let prefix = &input[..safe_offset];
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = prefix
        .rfind('\n')
        .map_or_else(|| prefix.len() + 1, |pos| prefix.len() - pos);
    (line, column)
}

// ---------------------------------------------------------------------------
// Whitespace and leaf parsers
// ---------------------------------------------------------------------------

/// Inline whitespace: spaces and tabs only (no newlines).
fn inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(1.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

/// Optional inline whitespace.
fn opt_inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

/// `0x`-prefixed hexadecimal or plain decimal.
fn number(input: &mut &str) -> ModalResult<u64> {
    alt((preceded(alt(("0x", "0X")), hex_uint), dec_uint)).parse_next(input)
}

/// A number preceded by mandatory whitespace.
fn arg(input: &mut &str) -> ModalResult<u64> {
    preceded(inline_ws, number).parse_next(input)
}

fn tx_arg(input: &mut &str) -> ModalResult<TxId> {
    arg.map(TxId).parse_next(input)
}

/// `"t" INTEGER`
fn thread(input: &mut &str) -> ModalResult<ThreadId> {
    preceded("t", dec_uint).map(ThreadId).parse_next(input)
}

// ---------------------------------------------------------------------------
// Event parsers
// ---------------------------------------------------------------------------

/// `keyword addr size` events that carry only a range.
fn range_event(input: &mut &str) -> ModalResult<TraceEvent> {
    let keyword = alt(("map", "unmap", "exclude", "flush")).parse_next(input)?;
    let addr = arg.parse_next(input)?;
    let size = arg.parse_next(input)?;
    Ok(match keyword {
        "map" => TraceEvent::Map { addr, size },
        "unmap" => TraceEvent::Unmap { addr, size },
        "exclude" => TraceEvent::Exclude { addr, size },
        _ => TraceEvent::Flush { addr, size },
    })
}

fn fence(input: &mut &str) -> ModalResult<TraceEvent> {
    literal("fence").value(TraceEvent::Fence).parse_next(input)
}

/// `"end" tx`
fn tx_end(input: &mut &str) -> ModalResult<TraceEvent> {
    let tx = preceded("end", tx_arg).parse_next(input)?;
    Ok(TraceEvent::TxEnd { tx })
}

/// `("add" | "remove") tx addr size`
fn tx_object(input: &mut &str) -> ModalResult<TraceEvent> {
    let keyword = alt(("add", "remove")).parse_next(input)?;
    let tx = tx_arg.parse_next(input)?;
    let addr = arg.parse_next(input)?;
    let size = arg.parse_next(input)?;
    Ok(if keyword == "add" {
        TraceEvent::TxAdd { tx, addr, size }
    } else {
        TraceEvent::TxRemove { tx, addr, size }
    })
}

/// `"store" addr size "=" value ("@" context)?`
fn store(input: &mut &str, thread: ThreadId) -> ModalResult<TraceEvent> {
    literal("store").parse_next(input)?;
    let addr = arg.parse_next(input)?;
    let size = arg.parse_next(input)?;
    (opt_inline_ws, "=", opt_inline_ws).parse_next(input)?;
    let value = number.parse_next(input)?;
    let context = opt(preceded((opt_inline_ws, "@", opt_inline_ws), dec_uint))
        .parse_next(input)?
        .map(ContextHandle);
    Ok(TraceEvent::Store {
        thread,
        addr,
        size,
        value,
        context,
    })
}

/// `("begin" | "join" | "leave") tx`
fn tx_membership(input: &mut &str, thread: ThreadId) -> ModalResult<TraceEvent> {
    let keyword = alt(("begin", "join", "leave")).parse_next(input)?;
    let tx = tx_arg.parse_next(input)?;
    Ok(match keyword {
        "begin" => TraceEvent::TxBegin { tx, thread },
        "join" => TraceEvent::TxJoin { tx, thread },
        _ => TraceEvent::TxLeave { tx, thread },
    })
}

/// `thread ":" thread_event`
fn thread_event(input: &mut &str) -> ModalResult<TraceEvent> {
    let id = thread.parse_next(input)?;
    (opt_inline_ws, ":", opt_inline_ws).parse_next(input)?;
    alt((
        move |i: &mut &str| store(i, id),
        move |i: &mut &str| tx_membership(i, id),
    ))
    .parse_next(input)
}

fn event(input: &mut &str) -> ModalResult<TraceEvent> {
    alt((thread_event, range_event, fence, tx_end, tx_object)).parse_next(input)
}

// ---------------------------------------------------------------------------
// Line and trace parsers
// ---------------------------------------------------------------------------

/// `"//" <rest-of-line>`, not including the newline.
fn comment(input: &mut &str) -> ModalResult<()> {
    ("//", till_line_ending).void().parse_next(input)
}

/// One line: an optional event, an optional trailing comment, then a line
/// ending or end-of-input.
fn line(input: &mut &str) -> ModalResult<Option<TraceEvent>> {
    opt_inline_ws.parse_next(input)?;
    let event = opt(event).parse_next(input)?;
    opt_inline_ws.parse_next(input)?;
    opt(comment).parse_next(input)?;
    alt((line_ending.void(), eof.void())).parse_next(input)?;
    Ok(event)
}

fn trace_parser(input: &mut &str) -> ModalResult<Vec<TraceEvent>> {
    let mut events = Vec::new();
    while !input.is_empty() {
        if let Some(event) = line.parse_next(input)? {
            events.push(event);
        }
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
