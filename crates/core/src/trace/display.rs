use alloc::string::String;
use core::fmt::{self, Display, Formatter, Write};

use super::TraceEvent;

impl Display for TraceEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map { addr, size } => write!(f, "map {addr:#x} {size:#x}"),
            Self::Unmap { addr, size } => write!(f, "unmap {addr:#x} {size:#x}"),
            Self::Exclude { addr, size } => write!(f, "exclude {addr:#x} {size:#x}"),
            Self::Store {
                thread,
                addr,
                size,
                value,
                context,
            } => {
                write!(f, "{thread}: store {addr:#x} {size:#x} = {value:#x}")?;
                if let Some(context) = context {
                    write!(f, " @ {}", context.0)?;
                }
                Ok(())
            }
            Self::Flush { addr, size } => write!(f, "flush {addr:#x} {size:#x}"),
            Self::Fence => f.write_str("fence"),
            Self::TxBegin { tx, thread } => write!(f, "{thread}: begin {tx}"),
            Self::TxEnd { tx } => write!(f, "end {tx}"),
            Self::TxAdd { tx, addr, size } => write!(f, "add {tx} {addr:#x} {size:#x}"),
            Self::TxRemove { tx, addr, size } => write!(f, "remove {tx} {addr:#x} {size:#x}"),
            Self::TxJoin { tx, thread } => write!(f, "{thread}: join {tx}"),
            Self::TxLeave { tx, thread } => write!(f, "{thread}: leave {tx}"),
        }
    }
}

/// Format a trace as the compact text DSL, one event per line.
///
/// The output always ends with a trailing newline so that it round-trips
/// through `parse_trace` without needing any external fixup.
#[must_use]
pub fn format_trace(events: &[TraceEvent]) -> String {
    let mut output = String::new();
    for event in events {
        let _ = writeln!(output, "{event}");
    }
    output
}
