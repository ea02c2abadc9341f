//! The analysis context fed by the instrumentation front-end.

pub mod config;
pub mod report;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::{self, Debug, Formatter};

use self::config::CheckerConfig;
use self::report::Report;
use crate::exclude::ExclusionList;
use crate::region::{Region, RegionSet};
use crate::store::{ContextHandle, StoreRecord, StoreState, ThreadId, TxId};
use crate::trace::{TraceError, TraceEvent};
use crate::tracker::{RangeState, StoreTracker};
use crate::transaction::{TransactionManager, TxClosure, TxError, TxStoreOutcome, TxSummary};
use crate::warning::{OverflowAction, OverflowHook, WarningEvent, WarningKind, WarningRegister};

/// What happened to one observed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// No byte of the store lies in a registered persistent mapping.
    NotPersistent,
    /// Every persistent byte of the store is excluded.
    Excluded,
    /// The store was checked as `pieces` disjoint ranges. `violations` is 1
    /// if the store broke a transaction rule and 0 otherwise.
    Checked { pieces: usize, violations: usize },
}

/// One analysis of one monitored program.
///
/// All state lives here; independent checkers never share anything.
pub struct Checker {
    config: CheckerConfig,
    mappings: RegionSet,
    excludes: ExclusionList,
    tracker: StoreTracker,
    transactions: TransactionManager,
    on_overflow: Box<OverflowHook<'static>>,
    next_seq: u64,
}

fn log_overflow(kind: WarningKind, count: usize) -> OverflowAction {
    tracing::warn!(%kind, count, "warning register full, dropping further events");
    OverflowAction::Drop
}

impl Checker {
    #[must_use]
    pub fn new(config: CheckerConfig) -> Self {
        tracing::debug!(?config, "initializing checker");
        Self {
            mappings: RegionSet::new(),
            excludes: ExclusionList::new(),
            tracker: StoreTracker::new(&config),
            transactions: TransactionManager::new(&config),
            on_overflow: Box::new(log_overflow),
            next_seq: 0,
            config,
        }
    }

    /// Checker with default settings, optionally in transactions-only mode.
    #[must_use]
    pub fn init_transactions(transactions_only: bool) -> Self {
        Self::new(
            CheckerConfig::builder()
                .transactions_only(transactions_only)
                .build(),
        )
    }

    /// Replaces the callback invoked when a warning register is full.
    ///
    /// The default callback logs a warning and drops the event.
    #[must_use]
    pub fn with_overflow_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(WarningKind, usize) -> OverflowAction + Send + 'static,
    {
        self.on_overflow = Box::new(hook);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn register_pmem_mapping(&mut self, region: Region) {
        self.mappings.add_region(region);
        tracing::debug!(%region, "registered persistent mapping");
    }

    /// Forgets `region` as persistent memory and stops tracking stores in it.
    ///
    /// Returns `false` if no byte of it was mapped.
    pub fn remove_pmem_mapping(&mut self, region: &Region) -> bool {
        if !self.mappings.remove_region(region) {
            return false;
        }
        let dropped = self.tracker.discard(region);
        tracing::debug!(%region, dropped, "removed persistent mapping");
        true
    }

    /// Returns `true` if every byte of `region` is mapped persistent memory.
    #[must_use]
    pub fn is_pmem(&self, region: &Region) -> bool {
        self.mappings.covers(region)
    }

    #[must_use]
    pub const fn mappings(&self) -> &RegionSet {
        &self.mappings
    }

    /// Excludes `region` from every later check.
    pub fn add_to_global_excludes(&mut self, region: Region) {
        self.excludes.add(region);
    }

    #[must_use]
    pub const fn excludes(&self) -> &ExclusionList {
        &self.excludes
    }

    /// Observes a store of `value` to `region` made by `thread`.
    ///
    /// Only the bytes inside registered mappings and outside the exclusion
    /// list are considered. In full mode they are tracked for durability;
    /// in both modes they are checked against the thread's transactions.
    pub fn store(
        &mut self,
        region: Region,
        value: u64,
        thread: ThreadId,
        context: Option<ContextHandle>,
    ) -> StoreOutcome {
        let seq = self.next_seq;
        self.next_seq += 1;

        let mapped = self.mappings.covered(&region);
        if mapped.is_empty() {
            return StoreOutcome::NotPersistent;
        }
        let pieces: Vec<Region> = mapped
            .iter()
            .flat_map(|piece| self.excludes.residue(piece))
            .collect();
        if pieces.is_empty() {
            return StoreOutcome::Excluded;
        }

        let observed = StoreRecord::new(region, seq, value, thread).with_context(context);
        if !self.config.transactions_only {
            for piece in &pieces {
                let record = observed.piece(*piece, StoreState::Dirty);
                self.tracker.store(record, &mut *self.on_overflow);
            }
        }
        let outcome = self
            .transactions
            .handle_tx_pieces(&observed, &pieces, &mut *self.on_overflow);

        StoreOutcome::Checked {
            pieces: pieces.len(),
            violations: usize::from(matches!(outcome, TxStoreOutcome::Violation(_))),
        }
    }

    /// Observes a flush of `region`.
    ///
    /// Returns the number of dirty records promoted. Does nothing in
    /// transactions-only mode.
    pub fn flush(&mut self, region: Region) -> usize {
        if self.config.transactions_only {
            return 0;
        }
        self.mappings
            .covered(&region)
            .into_iter()
            .map(|piece| self.tracker.flush(piece, &mut *self.on_overflow))
            .sum()
    }

    /// Observes a store fence. Returns the number of records made durable.
    pub fn fence(&mut self) -> usize {
        if self.config.transactions_only {
            return 0;
        }
        self.tracker.fence()
    }

    /// Checks one store against the active transactions without touching
    /// durability tracking or the mapping filter.
    ///
    /// Excluded bytes are removed first; a store that is excluded entirely
    /// is never checked. Returns the number of violations recorded (0 or 1).
    pub fn handle_tx_store(&mut self, store: &StoreRecord) -> usize {
        let pieces = self.excludes.residue(&store.region);
        if pieces.is_empty() {
            return 0;
        }
        match self
            .transactions
            .handle_tx_pieces(store, &pieces, &mut *self.on_overflow)
        {
            TxStoreOutcome::Violation(_) => 1,
            TxStoreOutcome::NoTransaction | TxStoreOutcome::Consistent { .. } => 0,
        }
    }

    /// # Errors
    ///
    /// See [`TransactionManager::register_new_tx`].
    pub fn register_new_tx(&mut self, id: TxId, thread: ThreadId) -> Result<(), TxError> {
        self.transactions.register_new_tx(id, thread)
    }

    /// Ends transaction `id`.
    ///
    /// In full mode, owned bytes still dirty are returned in
    /// [`TxClosure::unflushed`] and recorded as
    /// [`WarningKind::UnflushedOnTxEnd`].
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::remove_tx`].
    pub fn remove_tx(&mut self, id: TxId) -> Result<TxClosure, TxError> {
        let mut closure = self.transactions.remove_tx(id)?;
        if !self.config.transactions_only {
            closure.unflushed = closure
                .owned
                .iter()
                .flat_map(|object| self.tracker.dirty_within(object))
                .collect();
            for region in &closure.unflushed {
                self.transactions
                    .record_unflushed(id, *region, &mut *self.on_overflow);
            }
        }
        Ok(closure)
    }

    /// # Errors
    ///
    /// See [`TransactionManager::add_obj_to_tx`].
    pub fn add_obj_to_tx(&mut self, id: TxId, base: u64, size: u64) -> Result<(), TxError> {
        self.transactions
            .add_obj_to_tx(id, base, size, &mut *self.on_overflow)
    }

    /// # Errors
    ///
    /// See [`TransactionManager::remove_obj_from_tx`].
    pub fn remove_obj_from_tx(&mut self, id: TxId, base: u64, size: u64) -> Result<(), TxError> {
        self.transactions.remove_obj_from_tx(id, base, size)
    }

    /// # Errors
    ///
    /// See [`TransactionManager::add_thread_to_tx`].
    pub fn add_thread_to_tx(&mut self, id: TxId, thread: ThreadId) -> Result<(), TxError> {
        self.transactions.add_thread_to_tx(id, thread)
    }

    /// # Errors
    ///
    /// See [`TransactionManager::remove_thread_from_tx`].
    pub fn remove_thread_from_tx(&mut self, id: TxId, thread: ThreadId) -> Result<(), TxError> {
        self.transactions.remove_thread_from_tx(id, thread)
    }

    #[must_use]
    pub const fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    #[must_use]
    pub const fn tracker(&self) -> &StoreTracker {
        &self.tracker
    }

    /// Durability of `region`. Always [`RangeState::Clean`] in
    /// transactions-only mode.
    #[must_use]
    pub fn range_state(&self, region: &Region) -> RangeState {
        self.tracker.range_state(region)
    }

    #[must_use]
    pub fn is_durable(&self, addr: u64) -> bool {
        self.tracker.is_durable(addr)
    }

    /// Logs the transaction counts and returns them.
    pub fn print_tx_summary(&self) -> TxSummary {
        self.transactions.print_tx_summary()
    }

    /// Cumulative number of transaction violations.
    #[must_use]
    pub fn get_tx_all_err(&self) -> u64 {
        self.transactions.get_tx_all_err()
    }

    /// Every warning register, one per kind, in [`WarningKind::ALL`] order.
    #[must_use]
    pub fn registers(&self) -> [&WarningRegister; 6] {
        let [outside_tx, outside_objects, cross_tx, unflushed_on_end] =
            self.transactions.registers();
        [
            outside_tx,
            outside_objects,
            cross_tx,
            self.tracker.multiple_stores(),
            self.tracker.redundant_flushes(),
            unflushed_on_end,
        ]
    }

    /// Events currently held, grouped by kind.
    pub fn warnings(&self) -> impl Iterator<Item = &WarningEvent> {
        self.registers()
            .into_iter()
            .flat_map(WarningRegister::events)
    }

    /// Replays one recorded event.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] if the event names an invalid region or
    /// misuses the transaction API. The checker is left unchanged.
    pub fn apply(&mut self, event: &TraceEvent) -> Result<(), TraceError> {
        match *event {
            TraceEvent::Map { addr, size } => {
                self.register_pmem_mapping(Region::new(addr, size)?);
            }
            TraceEvent::Unmap { addr, size } => {
                self.remove_pmem_mapping(&Region::new(addr, size)?);
            }
            TraceEvent::Exclude { addr, size } => {
                self.add_to_global_excludes(Region::new(addr, size)?);
            }
            TraceEvent::Store {
                thread,
                addr,
                size,
                value,
                context,
            } => {
                self.store(Region::new(addr, size)?, value, thread, context);
            }
            TraceEvent::Flush { addr, size } => {
                self.flush(Region::new(addr, size)?);
            }
            TraceEvent::Fence => {
                self.fence();
            }
            TraceEvent::TxBegin { tx, thread } => self.register_new_tx(tx, thread)?,
            TraceEvent::TxEnd { tx } => {
                self.remove_tx(tx)?;
            }
            TraceEvent::TxAdd { tx, addr, size } => self.add_obj_to_tx(tx, addr, size)?,
            TraceEvent::TxRemove { tx, addr, size } => self.remove_obj_from_tx(tx, addr, size)?,
            TraceEvent::TxJoin { tx, thread } => self.add_thread_to_tx(tx, thread)?,
            TraceEvent::TxLeave { tx, thread } => self.remove_thread_from_tx(tx, thread)?,
        }
        Ok(())
    }

    /// Replays `events` in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the index of the failing event with its error.
    pub fn apply_all<'a, I>(&mut self, events: I) -> Result<(), (usize, TraceError)>
    where
        I: IntoIterator<Item = &'a TraceEvent>,
    {
        for (i, event) in events.into_iter().enumerate() {
            self.apply(event).map_err(|err| (i, err))?;
        }
        Ok(())
    }

    /// Snapshot of the analysis so far.
    #[must_use]
    pub fn report(&self) -> Report {
        let records = self.tracker.records();
        Report {
            unflushed: records
                .iter()
                .filter(|record| matches!(record.state, StoreState::Dirty))
                .copied()
                .collect(),
            unfenced: records
                .iter()
                .filter(|record| matches!(record.state, StoreState::Flushed))
                .copied()
                .collect(),
            leaked: self
                .transactions
                .active()
                .map(crate::transaction::Transaction::id)
                .collect(),
            summary: self.transactions.summary(),
            detected: self
                .registers()
                .iter()
                .map(|register| (register.kind(), register.detected()))
                .collect(),
            warnings: self.warnings().copied().collect(),
        }
    }

    /// Ends the analysis, logging and returning the final report.
    #[must_use]
    pub fn finish(self) -> Report {
        let report = self.report();
        tracing::info!(
            unflushed = report.unflushed.len(),
            leaked = report.leaked.len(),
            violations = report.summary.total(),
            clean = report.is_clean(),
            "analysis finished"
        );
        report
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new(CheckerConfig::default())
    }
}

impl Debug for Checker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("config", &self.config)
            .field("mappings", &self.mappings)
            .field("excludes", &self.excludes)
            .field("tracker", &self.tracker)
            .field("transactions", &self.transactions)
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn region(addr: u64, size: u64) -> Region {
        Region::new(addr, size).unwrap()
    }

    fn mapped(config: CheckerConfig) -> Checker {
        let mut checker = Checker::new(config);
        checker.register_pmem_mapping(region(0, 0x10000));
        checker
    }

    #[test]
    fn test_stores_outside_mappings_are_ignored() {
        let mut checker = Checker::default();
        checker.register_pmem_mapping(region(0x1000, 0x100));
        assert_eq!(
            checker.store(region(0x4000, 8), 1, ThreadId(1), None),
            StoreOutcome::NotPersistent
        );
        assert_eq!(
            checker.store(region(0x10f8, 0x10), 1, ThreadId(1), None),
            StoreOutcome::Checked {
                pieces: 1,
                violations: 0
            }
        );
        assert_eq!(
            checker.tracker().dirty_within(&region(0, 0x10000)),
            vec![region(0x10f8, 8)]
        );
    }

    #[test]
    fn test_excluded_bytes_are_skipped() {
        let mut checker = mapped(CheckerConfig::default());
        checker.add_to_global_excludes(region(0x1000, 0x10));
        assert_eq!(
            checker.store(region(0x1000, 0x10), 1, ThreadId(1), None),
            StoreOutcome::Excluded
        );
        assert_eq!(
            checker.store(region(0x0ff8, 0x20), 1, ThreadId(1), None),
            StoreOutcome::Checked {
                pieces: 2,
                violations: 0
            }
        );
        assert_eq!(checker.range_state(&region(0x1000, 0x10)), RangeState::Clean);
    }

    #[test]
    fn test_store_around_exclusion_is_one_violation() {
        let mut checker = mapped(CheckerConfig::builder().transactions_only(true).build());
        checker.add_to_global_excludes(region(0x1010, 0x10));
        assert_eq!(
            checker.store(region(0x1000, 0x30), 1, ThreadId(1), None),
            StoreOutcome::Checked {
                pieces: 2,
                violations: 1
            }
        );
        assert_eq!(checker.get_tx_all_err(), 1);
        assert_eq!(checker.warnings().count(), 1);
    }

    #[test]
    fn test_transactions_only_skips_tracking() {
        let mut checker = mapped(CheckerConfig::builder().transactions_only(true).build());
        assert_eq!(
            checker.store(region(0x1000, 8), 1, ThreadId(1), None),
            StoreOutcome::Checked {
                pieces: 1,
                violations: 1
            }
        );
        assert!(checker.tracker().records().is_empty());
        assert_eq!(checker.flush(region(0x1000, 8)), 0);
        assert_eq!(checker.get_tx_all_err(), 1);
    }

    #[test]
    fn test_remove_tx_reports_unflushed_bytes() {
        let mut checker = mapped(CheckerConfig::default());
        checker.register_new_tx(TxId(1), ThreadId(1)).unwrap();
        checker.add_obj_to_tx(TxId(1), 0x1000, 0x40).unwrap();
        checker.store(region(0x1000, 0x20), 1, ThreadId(1), None);
        checker.flush(region(0x1000, 0x10));

        let closure = checker.remove_tx(TxId(1)).unwrap();
        assert_eq!(closure.unflushed, vec![region(0x1010, 0x10)]);
        assert_eq!(checker.transactions().summary().unflushed_on_end, 1);
    }

    #[test]
    fn test_unmap_forgets_tracked_stores() {
        let mut checker = mapped(CheckerConfig::default());
        checker.store(region(0x2000, 0x10), 1, ThreadId(1), None);
        assert!(checker.remove_pmem_mapping(&region(0x2000, 0x1000)));
        assert!(checker.tracker().records().is_empty());
        assert!(!checker.is_pmem(&region(0x2000, 1)));
        assert!(checker.is_pmem(&region(0x1000, 1)));
        assert!(!checker.remove_pmem_mapping(&region(0x2000, 0x10)));
    }

    #[test]
    fn test_overflow_hook_is_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut checker = mapped(
            CheckerConfig::builder()
                .transactions_only(true)
                .warning_limit(1)
                .build(),
        )
        .with_overflow_hook(move |kind, count| {
            assert_eq!(kind, WarningKind::StoreOutsideTx);
            assert_eq!(count, 1);
            seen.fetch_add(1, Ordering::SeqCst);
            OverflowAction::Drop
        });
        for i in 0..3 {
            checker.store(region(0x100 * i, 8), 0, ThreadId(1), None);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(checker.get_tx_all_err(), 3);
        assert_eq!(checker.warnings().count(), 1);
    }

    #[test]
    fn test_apply_rejects_invalid_events() {
        let mut checker = Checker::default();
        assert_eq!(
            checker.apply(&TraceEvent::Map { addr: 0, size: 0 }),
            Err(TraceError::Region(crate::region::RegionError::ZeroSize {
                addr: 0
            }))
        );
        assert_eq!(
            checker.apply(&TraceEvent::TxEnd { tx: TxId(1) }),
            Err(TraceError::Transaction(TxError::NotActive(TxId(1))))
        );
        let events = [
            TraceEvent::TxBegin {
                tx: TxId(1),
                thread: ThreadId(1),
            },
            TraceEvent::TxBegin {
                tx: TxId(1),
                thread: ThreadId(2),
            },
        ];
        assert_eq!(
            checker.apply_all(&events),
            Err((
                1,
                TraceError::Transaction(TxError::AlreadyActive(TxId(1)))
            ))
        );
    }

    #[test]
    fn test_report_lists_leaked_and_unflushed() {
        let mut checker = mapped(CheckerConfig::default());
        checker.register_new_tx(TxId(5), ThreadId(1)).unwrap();
        checker.store(region(0x3000, 8), 1, ThreadId(2), None);
        let report = checker.finish();
        assert_eq!(report.leaked, vec![TxId(5)]);
        assert_eq!(report.unflushed.len(), 1);
        assert!(!report.is_clean());
    }
}
