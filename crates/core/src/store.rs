//! Identifiers and the per-store record shared by the tracker and the
//! transaction manager.

use derive_more::{Display, From};

use crate::region::{Region, Span};

/// Identifier of a thread of the monitored program.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Display)]
#[display("t{_0}")]
pub struct ThreadId(pub u32);

/// Externally supplied transaction identifier, unique while active.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Display)]
#[display("{_0}")]
pub struct TxId(pub u64);

/// Opaque handle into the symbolization service that owns call stacks.
///
/// The checker only carries it around; it never dereferences it.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Display)]
#[display("ctx#{_0}")]
pub struct ContextHandle(pub u32);

/// Durability state of a stored byte range.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreState {
    /// Never written, or written and since made durable by a fence.
    #[default]
    Clean,
    /// Written and not yet covered by a flush.
    Dirty,
    /// Covered by a flush since the last write.
    Flushed,
}

/// One observed store to persistent memory.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreRecord {
    pub region: Region,
    /// Monotonic sequence number assigned when the store was observed.
    pub seq: u64,
    /// Value written, kept for diagnostics only.
    pub value: u64,
    pub thread: ThreadId,
    pub context: Option<ContextHandle>,
    pub state: StoreState,
}

impl StoreRecord {
    #[must_use]
    pub const fn new(region: Region, seq: u64, value: u64, thread: ThreadId) -> Self {
        Self {
            region,
            seq,
            value,
            thread,
            context: None,
            state: StoreState::Dirty,
        }
    }

    #[must_use]
    pub const fn with_context(mut self, context: Option<ContextHandle>) -> Self {
        self.context = context;
        self
    }

    /// Same store restricted to `region`, optionally in another state.
    #[must_use]
    pub(crate) fn piece(&self, region: Region, state: StoreState) -> Self {
        Self {
            region,
            state,
            ..*self
        }
    }
}

impl Span for StoreRecord {
    fn addr(&self) -> u64 {
        self.region.addr()
    }

    fn size(&self) -> u64 {
        self.region.size()
    }
}
