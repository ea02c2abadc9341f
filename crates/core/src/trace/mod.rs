//! Recorded event streams of a monitored program.
//!
//! A trace is the sequence of [`TraceEvent`]s a binary-instrumentation
//! front-end observed, in observation order. Replaying it through
//! [`Checker::apply`](crate::Checker::apply) reproduces the analysis
//! offline.

pub mod display;

use derive_more::{Display, From};

use crate::region::RegionError;
use crate::store::{ContextHandle, ThreadId, TxId};
use crate::transaction::TxError;

/// One observed event.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op", rename_all = "snake_case"))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// A persistent-memory file was mapped at `[addr, addr + size)`.
    Map { addr: u64, size: u64 },
    Unmap { addr: u64, size: u64 },
    /// The range is excluded from every check.
    Exclude { addr: u64, size: u64 },
    Store {
        thread: ThreadId,
        addr: u64,
        size: u64,
        value: u64,
        #[cfg_attr(feature = "serde", serde(default))]
        context: Option<ContextHandle>,
    },
    Flush { addr: u64, size: u64 },
    Fence,
    TxBegin { tx: TxId, thread: ThreadId },
    TxEnd { tx: TxId },
    TxAdd { tx: TxId, addr: u64, size: u64 },
    TxRemove { tx: TxId, addr: u64, size: u64 },
    TxJoin { tx: TxId, thread: ThreadId },
    TxLeave { tx: TxId, thread: ThreadId },
}

impl TraceEvent {
    /// Thread the event is attributed to, if any.
    #[must_use]
    pub const fn thread(&self) -> Option<ThreadId> {
        match self {
            Self::Store { thread, .. }
            | Self::TxBegin { thread, .. }
            | Self::TxJoin { thread, .. }
            | Self::TxLeave { thread, .. } => Some(*thread),
            _ => None,
        }
    }
}

/// Failure to replay an event.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, From, Display)]
pub enum TraceError {
    #[display("invalid region: {_0}")]
    Region(RegionError),
    #[display("{_0}")]
    Transaction(TxError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_thread() {
        let store = TraceEvent::Store {
            thread: ThreadId(3),
            addr: 0x1000,
            size: 8,
            value: 0,
            context: None,
        };
        assert_eq!(store.thread(), Some(ThreadId(3)));
        assert_eq!(TraceEvent::Fence.thread(), None);
        assert_eq!(TraceEvent::TxEnd { tx: TxId(1) }.thread(), None);
    }

    #[test]
    fn test_error_conversions() {
        let err: TraceError = TxError::NotActive(TxId(4)).into();
        assert_eq!(err.to_string(), "transaction 4 is not active");
        let err: TraceError = RegionError::ZeroSize { addr: 0x10 }.into();
        assert!(err.to_string().starts_with("invalid region: "));
    }
}
