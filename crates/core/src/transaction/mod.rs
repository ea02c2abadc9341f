//! Lifecycle and membership of active transactions, and the store checks
//! made against them.
//!
//! A transaction is registered by one thread, owns the regions explicitly
//! added to it, and may be joined by further threads. A store made by a
//! thread that participates in at least one active transaction must land
//! inside the union of the regions owned by those transactions:
//!
//! ```text
//!   t1: begin 7            tx 7 = { threads: {t1}, objects: {} }
//!   t1: add 7 0x2000 0x100 tx 7 = { threads: {t1}, objects: {[0x2000, 0x2100)} }
//!   t1: store 0x2000 16    inside  -> consistent
//!   t1: store 0x3000 16    outside -> StoreOutsideTxObjects
//!   t2: store 0x3000 16    t2 has no transaction -> ignored, or
//!                          StoreOutsideTx in transactions-only mode
//! ```

pub mod error;

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use hashbrown::HashMap;

pub use self::error::TxError;
use crate::checker::config::{CheckerConfig, CrossTxPolicy};
use crate::region::{Region, RegionSet};
use crate::store::{StoreRecord, ThreadId, TxId};
use crate::warning::{OverflowHook, Recorded, WarningEvent, WarningKind, WarningRegister};

/// One active transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: TxId,
    objects: RegionSet,
    touched: RegionSet,
    threads: BTreeSet<ThreadId>,
    stores: u64,
}

impl Transaction {
    fn new(id: TxId, thread: ThreadId) -> Self {
        Self {
            id,
            objects: RegionSet::new(),
            touched: RegionSet::new(),
            threads: BTreeSet::from([thread]),
            stores: 0,
        }
    }

    #[must_use]
    pub const fn id(&self) -> TxId {
        self.id
    }

    /// Owned regions, merged into maximal disjoint runs.
    #[must_use]
    pub const fn objects(&self) -> &RegionSet {
        &self.objects
    }

    #[must_use]
    pub const fn threads(&self) -> &BTreeSet<ThreadId> {
        &self.threads
    }

    /// Number of consistent stores that landed in this transaction's objects.
    #[must_use]
    pub const fn stores(&self) -> u64 {
        self.stores
    }

    /// Owned regions no store has touched.
    #[must_use]
    pub fn untouched_objects(&self) -> Vec<Region> {
        self.objects
            .iter()
            .filter(|object| !self.touched.contains(*object))
            .copied()
            .collect()
    }
}

/// What remained of a transaction when it was removed.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxClosure {
    pub id: TxId,
    /// Regions still owned at removal.
    pub owned: Vec<Region>,
    /// Owned regions that no store ever touched.
    pub untouched: Vec<Region>,
    /// Owned bytes still dirty at removal. Filled in by the checker in full
    /// mode; always empty when the manager is used on its own.
    pub unflushed: Vec<Region>,
    pub stores: u64,
}

/// How a store relates to the active transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStoreOutcome {
    /// The storing thread participates in no active transaction.
    NoTransaction,
    /// The store lies inside the objects of `owners` transactions.
    Consistent { owners: usize },
    /// The store violated a transaction rule.
    Violation(WarningKind),
}

/// Aggregate counts of transaction checking.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TxSummary {
    pub stores_outside_tx: u64,
    pub stores_outside_objects: u64,
    pub cross_tx_overlaps: u64,
    pub unflushed_on_end: u64,
    pub active: usize,
}

impl TxSummary {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.stores_outside_tx
            + self.stores_outside_objects
            + self.cross_tx_overlaps
            + self.unflushed_on_end
    }
}

impl Display for TxSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Number of stores not made in a transaction: {}",
            self.stores_outside_tx
        )?;
        writeln!(
            f,
            "Number of stores made without adding to transaction: {}",
            self.stores_outside_objects
        )?;
        writeln!(
            f,
            "Number of overlapping regions registered in different transactions: {}",
            self.cross_tx_overlaps
        )?;
        writeln!(
            f,
            "Number of transactions ended with unflushed stores: {}",
            self.unflushed_on_end
        )?;
        write!(f, "Number of transactions still active: {}", self.active)
    }
}

/// Tracks active transactions and checks stores against them.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    transactions_only: bool,
    cross_tx_policy: CrossTxPolicy,
    active: BTreeMap<TxId, Transaction>,
    by_thread: HashMap<ThreadId, BTreeSet<TxId>>,
    outside_tx: WarningRegister,
    outside_objects: WarningRegister,
    cross_tx: WarningRegister,
    unflushed_on_end: WarningRegister,
}

impl TransactionManager {
    #[must_use]
    pub fn new(config: &CheckerConfig) -> Self {
        let limit = config.warning_limit;
        Self {
            transactions_only: config.transactions_only,
            cross_tx_policy: config.cross_tx_policy,
            active: BTreeMap::new(),
            by_thread: HashMap::new(),
            outside_tx: WarningRegister::new(WarningKind::StoreOutsideTx, limit),
            outside_objects: WarningRegister::new(WarningKind::StoreOutsideTxObjects, limit),
            cross_tx: WarningRegister::new(WarningKind::CrossTxOverlap, limit),
            unflushed_on_end: WarningRegister::new(WarningKind::UnflushedOnTxEnd, limit),
        }
    }

    #[must_use]
    pub const fn transactions_only(&self) -> bool {
        self.transactions_only
    }

    /// Starts transaction `id` with `thread` as its first participant.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::AlreadyActive`] if `id` is already active.
    pub fn register_new_tx(&mut self, id: TxId, thread: ThreadId) -> Result<(), TxError> {
        if self.active.contains_key(&id) {
            tracing::debug!(tx = %id, "transaction registered twice");
            return Err(TxError::AlreadyActive(id));
        }
        self.active.insert(id, Transaction::new(id, thread));
        self.by_thread.entry(thread).or_default().insert(id);
        tracing::debug!(tx = %id, %thread, "registered transaction");
        Ok(())
    }

    /// Ends transaction `id`, detaching it from every participating thread.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotActive`] if `id` is not active.
    pub fn remove_tx(&mut self, id: TxId) -> Result<TxClosure, TxError> {
        let tx = self.active.remove(&id).ok_or(TxError::NotActive(id))?;
        for thread in &tx.threads {
            self.detach(*thread, id);
        }
        let closure = TxClosure {
            id,
            owned: tx.objects.as_slice().to_vec(),
            untouched: tx.untouched_objects(),
            unflushed: Vec::new(),
            stores: tx.stores,
        };
        tracing::debug!(
            tx = %id,
            owned = closure.owned.len(),
            untouched = closure.untouched.len(),
            stores = closure.stores,
            "removed transaction"
        );
        Ok(closure)
    }

    /// Adds `[base, base + size)` to the objects of `id`.
    ///
    /// If another active transaction already owns any of those bytes and the
    /// policy is [`CrossTxPolicy::Report`], a
    /// [`WarningKind::CrossTxOverlap`] event is recorded; the region is
    /// added either way.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidRegion`] for an empty or wrapping range and
    /// [`TxError::NotActive`] if `id` is not active.
    pub fn add_obj_to_tx(
        &mut self,
        id: TxId,
        base: u64,
        size: u64,
        hook: &mut OverflowHook<'_>,
    ) -> Result<(), TxError> {
        let region = Region::new(base, size)?;
        if !self.active.contains_key(&id) {
            return Err(TxError::NotActive(id));
        }

        let contenders: Vec<Region> = match self.cross_tx_policy {
            CrossTxPolicy::Allow => Vec::new(),
            CrossTxPolicy::Report => self
                .active
                .values()
                .filter(|other| other.id != id)
                .flat_map(|other| other.objects.covered(&region))
                .collect(),
        };
        for shared in contenders {
            let event = WarningEvent::new(WarningKind::CrossTxOverlap, shared).with_tx(id);
            self.cross_tx.record(event, hook);
        }

        if let Some(tx) = self.active.get_mut(&id) {
            tx.objects.add_region(region);
        }
        tracing::trace!(tx = %id, %region, "added object to transaction");
        Ok(())
    }

    /// Removes `[base, base + size)` from the objects of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidRegion`] for an empty or wrapping range,
    /// [`TxError::NotActive`] if `id` is not active, and
    /// [`TxError::RegionNotFound`] unless every byte of the region is owned.
    pub fn remove_obj_from_tx(&mut self, id: TxId, base: u64, size: u64) -> Result<(), TxError> {
        let region = Region::new(base, size)?;
        let tx = self.active.get_mut(&id).ok_or(TxError::NotActive(id))?;
        if !tx.objects.covers(&region) {
            return Err(TxError::RegionNotFound { tx: id, region });
        }
        tx.objects.remove_region(&region);
        tx.touched.remove_region(&region);
        tracing::trace!(tx = %id, %region, "removed object from transaction");
        Ok(())
    }

    /// Makes `thread` a participant of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotActive`] if `id` is not active.
    pub fn add_thread_to_tx(&mut self, id: TxId, thread: ThreadId) -> Result<(), TxError> {
        let tx = self.active.get_mut(&id).ok_or(TxError::NotActive(id))?;
        tx.threads.insert(thread);
        self.by_thread.entry(thread).or_default().insert(id);
        tracing::debug!(tx = %id, %thread, "thread joined transaction");
        Ok(())
    }

    /// Stops `thread` from participating in `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotActive`] if `id` is not active and
    /// [`TxError::ThreadNotMember`] if `thread` does not participate.
    pub fn remove_thread_from_tx(&mut self, id: TxId, thread: ThreadId) -> Result<(), TxError> {
        let tx = self.active.get_mut(&id).ok_or(TxError::NotActive(id))?;
        if !tx.threads.remove(&thread) {
            return Err(TxError::ThreadNotMember { tx: id, thread });
        }
        self.detach(thread, id);
        tracing::debug!(tx = %id, %thread, "thread left transaction");
        Ok(())
    }

    fn detach(&mut self, thread: ThreadId, id: TxId) {
        if let Some(ids) = self.by_thread.get_mut(&thread) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_thread.remove(&thread);
            }
        }
    }

    /// Checks `store` against every active transaction its thread joined.
    pub fn handle_tx_store(
        &mut self,
        store: &StoreRecord,
        hook: &mut OverflowHook<'_>,
    ) -> TxStoreOutcome {
        self.handle_tx_pieces(store, &[store.region], hook)
    }

    /// Checks the `pieces` of one observed `store` that survived filtering.
    ///
    /// The store counts as a single event: at most one violation is
    /// recorded for it, keyed by the store's own region.
    pub(crate) fn handle_tx_pieces(
        &mut self,
        store: &StoreRecord,
        pieces: &[Region],
        hook: &mut OverflowHook<'_>,
    ) -> TxStoreOutcome {
        let ids: Vec<TxId> = self
            .by_thread
            .get(&store.thread)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        if ids.is_empty() {
            if !self.transactions_only {
                return TxStoreOutcome::NoTransaction;
            }
            let event = WarningEvent::for_store(WarningKind::StoreOutsideTx, store);
            self.outside_tx.record(event, hook);
            return TxStoreOutcome::Violation(WarningKind::StoreOutsideTx);
        }

        let mut uncovered = pieces.to_vec();
        let mut owners = 0;
        for id in &ids {
            let Some(tx) = self.active.get_mut(id) else {
                continue;
            };
            uncovered = uncovered
                .iter()
                .flat_map(|piece| tx.objects.uncovered(piece))
                .collect();
            let hits: Vec<Region> = pieces
                .iter()
                .flat_map(|piece| tx.objects.covered(piece))
                .collect();
            if !hits.is_empty() {
                owners += 1;
                tx.stores += 1;
                for hit in hits {
                    tx.touched.add_region(hit);
                }
            }
        }

        if uncovered.is_empty() {
            return TxStoreOutcome::Consistent { owners };
        }

        let event =
            WarningEvent::for_store(WarningKind::StoreOutsideTxObjects, store).with_tx(ids[0]);
        let recorded = self.outside_objects.record(event, hook);
        if matches!(recorded, Recorded::Appended) {
            tracing::debug!(
                thread = %store.thread,
                region = %store.region,
                uncovered = uncovered.len(),
                "store outside of transaction objects"
            );
        }
        TxStoreOutcome::Violation(WarningKind::StoreOutsideTxObjects)
    }

    /// Records that transaction `id` ended while `region` was still dirty.
    pub(crate) fn record_unflushed(
        &mut self,
        id: TxId,
        region: Region,
        hook: &mut OverflowHook<'_>,
    ) {
        let event = WarningEvent::new(WarningKind::UnflushedOnTxEnd, region).with_tx(id);
        self.unflushed_on_end.record(event, hook);
    }

    #[must_use]
    pub fn is_active(&self, id: TxId) -> bool {
        self.active.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: TxId) -> Option<&Transaction> {
        self.active.get(&id)
    }

    /// Active transactions in id order.
    pub fn active(&self) -> impl Iterator<Item = &Transaction> {
        self.active.values()
    }

    /// Active transactions `thread` participates in, in id order.
    pub fn transactions_of(&self, thread: ThreadId) -> impl Iterator<Item = TxId> + '_ {
        self.by_thread
            .get(&thread)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    #[must_use]
    pub fn summary(&self) -> TxSummary {
        TxSummary {
            stores_outside_tx: self.outside_tx.detected(),
            stores_outside_objects: self.outside_objects.detected(),
            cross_tx_overlaps: self.cross_tx.detected(),
            unflushed_on_end: self.unflushed_on_end.detected(),
            active: self.active.len(),
        }
    }

    /// Logs the aggregate counts and returns them.
    pub fn print_tx_summary(&self) -> TxSummary {
        let summary = self.summary();
        tracing::info!(
            stores_outside_tx = summary.stores_outside_tx,
            stores_outside_objects = summary.stores_outside_objects,
            cross_tx_overlaps = summary.cross_tx_overlaps,
            unflushed_on_end = summary.unflushed_on_end,
            active = summary.active,
            "transaction summary"
        );
        summary
    }

    /// Cumulative number of violations attributed to transaction checking.
    #[must_use]
    pub fn get_tx_all_err(&self) -> u64 {
        self.summary().total()
    }

    /// The registers holding transaction warnings.
    #[must_use]
    pub fn registers(&self) -> [&WarningRegister; 4] {
        [
            &self.outside_tx,
            &self.outside_objects,
            &self.cross_tx,
            &self.unflushed_on_end,
        ]
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::warning::OverflowAction;

    const T1: ThreadId = ThreadId(1);
    const T2: ThreadId = ThreadId(2);

    fn manager(transactions_only: bool) -> TransactionManager {
        TransactionManager::new(
            &CheckerConfig::builder()
                .transactions_only(transactions_only)
                .build(),
        )
    }

    fn store(addr: u64, size: u64, thread: ThreadId) -> StoreRecord {
        StoreRecord::new(Region::new(addr, size).unwrap(), 0, 0, thread)
    }

    fn region(addr: u64, size: u64) -> Region {
        Region::new(addr, size).unwrap()
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut txs = manager(false);
        assert_eq!(txs.register_new_tx(TxId(7), T1), Ok(()));
        assert_eq!(
            txs.register_new_tx(TxId(7), T1),
            Err(TxError::AlreadyActive(TxId(7)))
        );
        assert!(txs.remove_tx(TxId(7)).is_ok());
        assert_eq!(txs.remove_tx(TxId(7)), Err(TxError::NotActive(TxId(7))));
        assert_eq!(
            txs.add_obj_to_tx(TxId(7), 0x2000, 0x100, &mut hook),
            Err(TxError::NotActive(TxId(7)))
        );
        assert_eq!(
            txs.add_thread_to_tx(TxId(7), T2),
            Err(TxError::NotActive(TxId(7)))
        );
        assert_eq!(
            txs.add_obj_to_tx(TxId(7), 0x2000, 0, &mut hook),
            Err(TxError::InvalidRegion(crate::region::RegionError::ZeroSize {
                addr: 0x2000
            }))
        );
    }

    #[test]
    fn test_store_inside_and_outside_objects() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut txs = manager(false);
        txs.register_new_tx(TxId(7), T1).unwrap();
        txs.add_obj_to_tx(TxId(7), 0x2000, 0x100, &mut hook).unwrap();

        assert_eq!(
            txs.handle_tx_store(&store(0x2000, 0x10, T1), &mut hook),
            TxStoreOutcome::Consistent { owners: 1 }
        );
        assert_eq!(txs.get_tx_all_err(), 0);

        assert_eq!(
            txs.handle_tx_store(&store(0x3000, 0x10, T1), &mut hook),
            TxStoreOutcome::Violation(WarningKind::StoreOutsideTxObjects)
        );
        // straddling the end of the object is a violation too
        assert_eq!(
            txs.handle_tx_store(&store(0x20f8, 0x10, T1), &mut hook),
            TxStoreOutcome::Violation(WarningKind::StoreOutsideTxObjects)
        );
        assert_eq!(txs.summary().stores_outside_objects, 2);
    }

    #[test]
    fn test_split_store_counts_once() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut txs = manager(false);
        txs.register_new_tx(TxId(7), T1).unwrap();
        txs.add_obj_to_tx(TxId(7), 0x2000, 0x10, &mut hook).unwrap();

        // both pieces miss the object, one violation for the store
        let observed = store(0x3000, 0x40, T1);
        let pieces = [region(0x3000, 0x10), region(0x3030, 0x10)];
        assert_eq!(
            txs.handle_tx_pieces(&observed, &pieces, &mut hook),
            TxStoreOutcome::Violation(WarningKind::StoreOutsideTxObjects)
        );
        assert_eq!(txs.summary().stores_outside_objects, 1);

        // pieces inside the object are consistent even if the hull is not
        let observed = store(0x1ff0, 0x30, T1);
        let pieces = [region(0x2000, 0x10)];
        assert_eq!(
            txs.handle_tx_pieces(&observed, &pieces, &mut hook),
            TxStoreOutcome::Consistent { owners: 1 }
        );
    }

    #[test]
    fn test_store_without_transaction_depends_on_mode() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut full = manager(false);
        assert_eq!(
            full.handle_tx_store(&store(0x1000, 8, T1), &mut hook),
            TxStoreOutcome::NoTransaction
        );
        assert_eq!(full.get_tx_all_err(), 0);

        let mut only = manager(true);
        assert_eq!(
            only.handle_tx_store(&store(0x1000, 8, T1), &mut hook),
            TxStoreOutcome::Violation(WarningKind::StoreOutsideTx)
        );
        assert_eq!(only.get_tx_all_err(), 1);
    }

    #[test]
    fn test_joined_thread_is_checked() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut txs = manager(true);
        txs.register_new_tx(TxId(1), T1).unwrap();
        txs.add_obj_to_tx(TxId(1), 0x1000, 0x100, &mut hook).unwrap();

        // t2 has not joined: outside any transaction
        assert_eq!(
            txs.handle_tx_store(&store(0x1000, 8, T2), &mut hook),
            TxStoreOutcome::Violation(WarningKind::StoreOutsideTx)
        );

        txs.add_thread_to_tx(TxId(1), T2).unwrap();
        assert_eq!(
            txs.handle_tx_store(&store(0x1000, 8, T2), &mut hook),
            TxStoreOutcome::Consistent { owners: 1 }
        );

        txs.remove_thread_from_tx(TxId(1), T2).unwrap();
        assert_eq!(
            txs.remove_thread_from_tx(TxId(1), T2),
            Err(TxError::ThreadNotMember {
                tx: TxId(1),
                thread: T2
            })
        );
        assert_eq!(txs.transactions_of(T2).count(), 0);
    }

    #[test]
    fn test_union_of_thread_transactions_covers_store() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut txs = manager(false);
        txs.register_new_tx(TxId(1), T1).unwrap();
        txs.register_new_tx(TxId(2), T1).unwrap();
        txs.add_obj_to_tx(TxId(1), 0x1000, 0x10, &mut hook).unwrap();
        txs.add_obj_to_tx(TxId(2), 0x1010, 0x10, &mut hook).unwrap();
        assert_eq!(
            txs.handle_tx_store(&store(0x1008, 0x10, T1), &mut hook),
            TxStoreOutcome::Consistent { owners: 2 }
        );
    }

    #[test]
    fn test_remove_obj_requires_ownership() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut txs = manager(false);
        txs.register_new_tx(TxId(3), T1).unwrap();
        txs.add_obj_to_tx(TxId(3), 0x1000, 0x100, &mut hook).unwrap();

        assert_eq!(
            txs.remove_obj_from_tx(TxId(3), 0x10f0, 0x20),
            Err(TxError::RegionNotFound {
                tx: TxId(3),
                region: region(0x10f0, 0x20)
            })
        );
        assert_eq!(txs.get(TxId(3)).unwrap().objects().len(), 1);

        txs.remove_obj_from_tx(TxId(3), 0x1040, 0x40).unwrap();
        assert_eq!(
            txs.get(TxId(3)).unwrap().objects().as_slice(),
            &[region(0x1000, 0x40), region(0x1080, 0x80)]
        );
        assert_eq!(
            txs.handle_tx_store(&store(0x1040, 8, T1), &mut hook),
            TxStoreOutcome::Violation(WarningKind::StoreOutsideTxObjects)
        );
    }

    #[test]
    fn test_cross_tx_overlap_policy() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut txs = manager(false);
        txs.register_new_tx(TxId(1), T1).unwrap();
        txs.register_new_tx(TxId(2), T2).unwrap();
        txs.add_obj_to_tx(TxId(1), 0x1000, 0x100, &mut hook).unwrap();
        txs.add_obj_to_tx(TxId(2), 0x1080, 0x100, &mut hook).unwrap();
        assert_eq!(txs.summary().cross_tx_overlaps, 1);
        assert_eq!(
            txs.registers()[2].events()[0].region,
            region(0x1080, 0x80)
        );
        // adjacent is not overlapping
        txs.add_obj_to_tx(TxId(2), 0x0f00, 0x100, &mut hook).unwrap();
        assert_eq!(txs.summary().cross_tx_overlaps, 1);

        let mut allow = TransactionManager::new(
            &CheckerConfig::builder()
                .cross_tx_policy(CrossTxPolicy::Allow)
                .build(),
        );
        allow.register_new_tx(TxId(1), T1).unwrap();
        allow.register_new_tx(TxId(2), T2).unwrap();
        allow.add_obj_to_tx(TxId(1), 0x1000, 0x100, &mut hook).unwrap();
        allow.add_obj_to_tx(TxId(2), 0x1000, 0x100, &mut hook).unwrap();
        assert_eq!(allow.get_tx_all_err(), 0);
    }

    #[test]
    fn test_remove_tx_reports_untouched_objects() {
        let mut hook = |_: WarningKind, _: usize| OverflowAction::Drop;
        let mut txs = manager(false);
        txs.register_new_tx(TxId(9), T1).unwrap();
        txs.add_obj_to_tx(TxId(9), 0x1000, 0x10, &mut hook).unwrap();
        txs.add_obj_to_tx(TxId(9), 0x2000, 0x10, &mut hook).unwrap();
        txs.handle_tx_store(&store(0x1000, 8, T1), &mut hook);

        let closure = txs.remove_tx(TxId(9)).unwrap();
        assert_eq!(closure.owned, vec![region(0x1000, 0x10), region(0x2000, 0x10)]);
        assert_eq!(closure.untouched, vec![region(0x2000, 0x10)]);
        assert_eq!(closure.stores, 1);
        assert_eq!(txs.transactions_of(T1).count(), 0);
        assert_eq!(txs.summary().active, 0);
    }
}
