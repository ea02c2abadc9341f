//! Bounded, deduplicating registers of detected violations.

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use hashbrown::HashSet;

use crate::region::Region;
use crate::store::{ContextHandle, StoreRecord, ThreadId, TxId};

/// Kind of misuse detected in the monitored program.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningKind {
    /// Store on a thread with no active transaction, in transactions-only mode.
    StoreOutsideTx,
    /// Store on a transactional thread to bytes no transaction registered.
    StoreOutsideTxObjects,
    /// Region registered while a different active transaction owns it.
    CrossTxOverlap,
    /// Store to bytes that were still dirty from an earlier store.
    MultipleStore,
    /// Flush that covered no dirty byte.
    RedundantFlush,
    /// Transaction removed while bytes it owned were still dirty.
    UnflushedOnTxEnd,
}

impl WarningKind {
    pub const ALL: [Self; 6] = [
        Self::StoreOutsideTx,
        Self::StoreOutsideTxObjects,
        Self::CrossTxOverlap,
        Self::MultipleStore,
        Self::RedundantFlush,
        Self::UnflushedOnTxEnd,
    ];
}

impl Display for WarningKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::StoreOutsideTx => "store outside of a transaction",
            Self::StoreOutsideTxObjects => "store outside of transaction objects",
            Self::CrossTxOverlap => "region registered in more than one transaction",
            Self::MultipleStore => "overwrite of a store not yet flushed",
            Self::RedundantFlush => "flush of a region with no dirty stores",
            Self::UnflushedOnTxEnd => "transaction ended with unflushed stores",
        };
        f.write_str(text)
    }
}

/// One detected violation.
///
/// Two events are the same violation when their kind and region match;
/// the remaining fields are diagnostics.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningEvent {
    pub kind: WarningKind,
    pub region: Region,
    pub seq: Option<u64>,
    pub thread: Option<ThreadId>,
    pub tx: Option<TxId>,
    pub context: Option<ContextHandle>,
}

impl WarningEvent {
    #[must_use]
    pub const fn new(kind: WarningKind, region: Region) -> Self {
        Self {
            kind,
            region,
            seq: None,
            thread: None,
            tx: None,
            context: None,
        }
    }

    /// Event about `store`, carrying its sequence number, thread and context.
    #[must_use]
    pub const fn for_store(kind: WarningKind, store: &StoreRecord) -> Self {
        Self {
            kind,
            region: store.region,
            seq: Some(store.seq),
            thread: Some(store.thread),
            tx: None,
            context: store.context,
        }
    }

    #[must_use]
    pub const fn with_tx(mut self, tx: TxId) -> Self {
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub const fn key(&self) -> (WarningKind, Region) {
        (self.kind, self.region)
    }
}

/// What to do with an event that arrives when the register is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowAction {
    /// Keep the register as is and discard the new event.
    Drop,
    /// Empty the register (the callback has reported it) and append.
    Reset,
}

/// Result of [`WarningRegister::add_warning_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Appended,
    Duplicate,
    /// The register was full; the overflow callback decided the outcome.
    Overflowed(OverflowAction),
}

/// Callback invoked when a register of the given kind is full.
///
/// It receives the number of events currently held.
pub type OverflowHook<'a> = dyn FnMut(WarningKind, usize) -> OverflowAction + Send + 'a;

/// Fixed-capacity, order-preserving, deduplicating sequence of events.
///
/// Deduplication covers every key ever offered, including events dropped or
/// cleared on overflow, so a violation repeated in a loop counts once.
#[derive(Debug, Clone)]
pub struct WarningRegister {
    kind: WarningKind,
    limit: usize,
    events: Vec<WarningEvent>,
    seen: HashSet<(WarningKind, Region)>,
    detected: u64,
}

impl WarningRegister {
    #[must_use]
    pub fn new(kind: WarningKind, limit: usize) -> Self {
        Self {
            kind,
            limit,
            events: Vec::new(),
            seen: HashSet::new(),
            detected: 0,
        }
    }

    /// Appends `event` unless an equal one was offered before.
    ///
    /// If the register already holds `limit` events, `on_overflow` is called
    /// with the current count and its answer decides whether the new event
    /// is dropped or the register is reset first. Duplicates never trigger
    /// the callback, even when the earlier copy was dropped or cleared.
    pub fn add_warning_event<F>(&mut self, event: WarningEvent, on_overflow: F) -> Recorded
    where
        F: FnOnce(usize) -> OverflowAction,
    {
        if !self.seen.insert(event.key()) {
            return Recorded::Duplicate;
        }

        self.detected += 1;

        if self.events.len() >= self.limit {
            let action = on_overflow(self.events.len());
            match action {
                OverflowAction::Drop => {}
                OverflowAction::Reset => {
                    self.events.clear();
                    self.push(event);
                }
            }
            return Recorded::Overflowed(action);
        }

        self.push(event);
        Recorded::Appended
    }

    /// [`add_warning_event`](Self::add_warning_event) routed through a
    /// shared hook that is told which register overflowed.
    pub fn record(&mut self, event: WarningEvent, hook: &mut OverflowHook<'_>) -> Recorded {
        let kind = self.kind;
        let recorded = self.add_warning_event(event, |count| hook(kind, count));
        tracing::trace!(?kind, region = %event.region, ?recorded, "warning event");
        recorded
    }

    fn push(&mut self, event: WarningEvent) {
        if self.limit > 0 {
            self.events.push(event);
        }
    }

    #[must_use]
    pub const fn kind(&self) -> WarningKind {
        self.kind
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Events currently held, in arrival order.
    #[must_use]
    pub fn events(&self) -> &[WarningEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of distinct events ever offered, including those dropped or
    /// cleared on overflow.
    #[must_use]
    pub const fn detected(&self) -> u64 {
        self.detected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(addr: u64) -> WarningEvent {
        WarningEvent::new(
            WarningKind::StoreOutsideTxObjects,
            Region::new(addr, 8).unwrap(),
        )
    }

    #[test]
    fn test_duplicate_counts_once() {
        let mut register = WarningRegister::new(WarningKind::StoreOutsideTxObjects, 8);
        assert_eq!(
            register.add_warning_event(event(0x10), |_| OverflowAction::Drop),
            Recorded::Appended
        );
        let again = event(0x10).with_tx(TxId(3));
        assert_eq!(
            register.add_warning_event(again, |_| panic!("no overflow expected")),
            Recorded::Duplicate
        );
        assert_eq!(register.len(), 1);
        assert_eq!(register.detected(), 1);
    }

    #[test]
    fn test_overflow_callback_once_on_third_event() {
        let mut register = WarningRegister::new(WarningKind::StoreOutsideTxObjects, 2);
        let mut calls = Vec::new();
        for addr in [0x10, 0x20, 0x30] {
            register.add_warning_event(event(addr), |count| {
                calls.push(count);
                OverflowAction::Drop
            });
        }
        assert_eq!(calls, [2]);
        assert_eq!(register.len(), 2);
        assert_eq!(register.detected(), 3);
    }

    #[test]
    fn test_reset_empties_then_appends() {
        let mut register = WarningRegister::new(WarningKind::StoreOutsideTxObjects, 2);
        register.add_warning_event(event(0x10), |_| OverflowAction::Reset);
        register.add_warning_event(event(0x20), |_| OverflowAction::Reset);
        let recorded = register.add_warning_event(event(0x30), |_| OverflowAction::Reset);
        assert_eq!(recorded, Recorded::Overflowed(OverflowAction::Reset));
        assert_eq!(register.events(), &[event(0x30)]);
        // cleared events are still remembered
        assert_eq!(
            register.add_warning_event(event(0x10), |_| panic!("no overflow expected")),
            Recorded::Duplicate
        );
        assert_eq!(register.detected(), 3);
    }

    #[test]
    fn test_dropped_event_repeated_counts_once() {
        let mut register = WarningRegister::new(WarningKind::StoreOutsideTxObjects, 2);
        let mut calls = 0;
        for addr in [0x10, 0x20, 0x30, 0x30, 0x30] {
            register.add_warning_event(event(addr), |_| {
                calls += 1;
                OverflowAction::Drop
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(register.detected(), 3);
        assert_eq!(register.events(), &[event(0x10), event(0x20)]);
    }

    #[test]
    fn test_record_passes_kind_to_hook() {
        let mut register = WarningRegister::new(WarningKind::RedundantFlush, 0);
        let mut seen = None;
        let mut hook = |kind: WarningKind, count: usize| {
            seen = Some((kind, count));
            OverflowAction::Drop
        };
        let ev = WarningEvent::new(WarningKind::RedundantFlush, Region::new(0, 1).unwrap());
        assert_eq!(
            register.record(ev, &mut hook),
            Recorded::Overflowed(OverflowAction::Drop)
        );
        assert_eq!(seen, Some((WarningKind::RedundantFlush, 0)));
    }
}
