//! Per-byte durability tracking of stores and flushes.

pub mod slab;

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use self::slab::{rebuild_from, slabs_consistent, FlushAggregate, Slab};
use crate::checker::config::CheckerConfig;
use crate::region::{OverlapSet, Region, Span};
use crate::store::{StoreRecord, StoreState};
use crate::warning::{OverflowHook, WarningEvent, WarningKind, WarningRegister};

/// Durability of a queried byte range.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeState {
    /// No tracked byte: never written, or made durable by a fence.
    Clean,
    /// Some bytes dirty, none flushed.
    Dirty,
    /// Both dirty and flushed bytes.
    PartlyFlushed,
    /// Some bytes flushed, none dirty.
    Flushed,
}

impl RangeState {
    const fn from_presence(dirty: bool, flushed: bool) -> Self {
        match (dirty, flushed) {
            (false, false) => Self::Clean,
            (true, false) => Self::Dirty,
            (true, true) => Self::PartlyFlushed,
            (false, true) => Self::Flushed,
        }
    }
}

impl Display for RangeState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::PartlyFlushed => "partly flushed",
            Self::Flushed => "flushed",
        };
        f.write_str(text)
    }
}

/// Side effects of one store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreEffect {
    /// Earlier records that were still dirty and got overwritten.
    pub overwrote_dirty: usize,
    /// Earlier records that were flushed and got dirtied again.
    pub redirtied: usize,
}

/// Tracks every byte written and not yet fenced, with its flush state.
///
/// Records are kept in an [`OverlapSet`] so they never overlap: a new store
/// carves its bytes out of older records, which keep their state for the
/// bytes outside it.
#[derive(Debug, Clone)]
pub struct StoreTracker {
    records: OverlapSet<StoreRecord>,
    slabs: Vec<Slab>,
    slab_width: usize,
    track_multiple_stores: bool,
    check_redundant_flushes: bool,
    multiple_stores: WarningRegister,
    redundant_flushes: WarningRegister,
}

impl StoreTracker {
    #[must_use]
    pub fn new(config: &CheckerConfig) -> Self {
        Self {
            records: OverlapSet::new(),
            slabs: Vec::new(),
            slab_width: config.slab_width.max(1),
            track_multiple_stores: config.track_multiple_stores,
            check_redundant_flushes: config.check_redundant_flushes,
            multiple_stores: WarningRegister::new(WarningKind::MultipleStore, config.warning_limit),
            redundant_flushes: WarningRegister::new(
                WarningKind::RedundantFlush,
                config.warning_limit,
            ),
        }
    }

    /// Records `store` as dirty over its whole region.
    ///
    /// Overlapped bytes of older records are replaced, so flushed bytes
    /// become dirty again.
    pub fn store(&mut self, store: StoreRecord, hook: &mut OverflowHook<'_>) -> StoreEffect {
        let store = store.piece(store.region, StoreState::Dirty);
        let range = self.records.overlap_range(&store);
        let at = range.start;
        let older = self.records.take_range(range);

        let mut effect = StoreEffect::default();
        for prev in &older {
            match prev.state {
                StoreState::Dirty => {
                    effect.overwrote_dirty += 1;
                    if self.track_multiple_stores {
                        let overlap = prev.region.intersection(&store.region).unwrap_or(store.region);
                        let event = WarningEvent {
                            region: overlap,
                            ..WarningEvent::for_store(WarningKind::MultipleStore, &store)
                        };
                        self.multiple_stores.record(event, hook);
                    }
                }
                StoreState::Flushed => effect.redirtied += 1,
                StoreState::Clean => {}
            }
        }

        // only the first and last older record can stick out of the new store
        let before = older
            .first()
            .and_then(|prev| Some(prev.piece(prev.region.split_around(&store.region).0?, prev.state)));
        let after = older
            .last()
            .and_then(|prev| Some(prev.piece(prev.region.split_around(&store.region).2?, prev.state)));

        self.records
            .put_run(at, before.into_iter().chain([store]).chain(after));
        self.refresh_slabs(at);

        tracing::trace!(region = %store.region, seq = store.seq, ?effect, "store");
        effect
    }

    /// Promotes the dirty bytes inside `region` to flushed.
    ///
    /// Returns the number of dirty records touched.
    pub fn flush(&mut self, region: Region, hook: &mut OverflowHook<'_>) -> usize {
        let range = self.records.overlap_range(&region);
        let at = range.start;
        let older = self.records.take_range(range);

        let mut promoted = 0;
        let mut pieces = Vec::with_capacity(older.len() + 2);
        for prev in older {
            match prev.state {
                StoreState::Dirty => {
                    promoted += 1;
                    let (before, inside, after) = prev.region.split_around(&region);
                    pieces.extend(before.map(|r| prev.piece(r, StoreState::Dirty)));
                    pieces.extend(inside.map(|r| prev.piece(r, StoreState::Flushed)));
                    pieces.extend(after.map(|r| prev.piece(r, StoreState::Dirty)));
                }
                StoreState::Flushed | StoreState::Clean => pieces.push(prev),
            }
        }

        self.records.put_run(at, pieces);
        self.refresh_slabs(at);

        if promoted == 0 && self.check_redundant_flushes {
            let event = WarningEvent::new(WarningKind::RedundantFlush, region);
            self.redundant_flushes.record(event, hook);
        }

        tracing::trace!(%region, promoted, "flush");
        promoted
    }

    /// Retires every flushed record: its bytes are durable and become clean.
    ///
    /// Returns the number of records retired.
    pub fn fence(&mut self) -> usize {
        let before = self.records.len();
        self.records
            .retain(|record| !matches!(record.state, StoreState::Flushed));
        self.refresh_slabs(0);
        let retired = before - self.records.len();
        tracing::trace!(retired, "fence");
        retired
    }

    /// Stops tracking every byte inside `region`, whatever its state.
    ///
    /// Returns the number of records that lost bytes.
    pub fn discard(&mut self, region: &Region) -> usize {
        let range = self.records.overlap_range(region);
        if range.is_empty() {
            return 0;
        }
        let at = range.start;
        let older = self.records.take_range(range);
        let touched = older.len();

        let before = older
            .first()
            .and_then(|prev| Some(prev.piece(prev.region.split_around(region).0?, prev.state)));
        let after = older
            .last()
            .and_then(|prev| Some(prev.piece(prev.region.split_around(region).2?, prev.state)));

        self.records.put_run(at, before.into_iter().chain(after));
        self.refresh_slabs(at);
        tracing::trace!(%region, touched, "discard");
        touched
    }

    /// State of the byte at `addr`.
    #[must_use]
    pub fn state_at(&self, addr: u64) -> StoreState {
        let Ok(probe) = Region::new(addr, 1) else {
            return StoreState::Clean;
        };
        self.records
            .find(&probe)
            .map_or(StoreState::Clean, |record| record.state)
    }

    /// Returns `false` only while the byte at `addr` is dirty.
    #[must_use]
    pub fn is_durable(&self, addr: u64) -> bool {
        let idx = self.slabs.partition_point(|slab| slab.max_addr < addr);
        match self.slabs.get(idx) {
            Some(slab) if slab.min_addr <= addr => match slab.state {
                FlushAggregate::AllFlushed => true,
                FlushAggregate::NoFlushed | FlushAggregate::PartFlushed => {
                    !matches!(self.state_at(addr), StoreState::Dirty)
                }
            },
            _ => true,
        }
    }

    /// Durability of `region` as a whole.
    ///
    /// Slabs whose address window misses `region` are skipped, and slabs
    /// entirely inside it are answered from their aggregate.
    #[must_use]
    pub fn range_state(&self, region: &Region) -> RangeState {
        let (addr, end) = (region.addr(), region.end());
        let mut dirty = false;
        let mut flushed = false;

        let first = self.slabs.partition_point(|slab| slab.max_addr < addr);
        for slab in self.slabs[first..]
            .iter()
            .take_while(|slab| slab.meets(addr, end))
        {
            let inside = addr <= slab.min_addr && slab.max_addr < end;
            if inside {
                match slab.state {
                    FlushAggregate::NoFlushed => dirty = true,
                    FlushAggregate::AllFlushed => flushed = true,
                    FlushAggregate::PartFlushed => {
                        dirty = true;
                        flushed = true;
                    }
                }
            } else {
                let members = &self.records.as_slice()[slab.start_index..slab.end_index];
                for record in members
                    .iter()
                    .filter(|record| record.addr() < end && addr < record.end())
                {
                    match record.state {
                        StoreState::Dirty => dirty = true,
                        StoreState::Flushed => flushed = true,
                        StoreState::Clean => {}
                    }
                }
            }
            if dirty && flushed {
                break;
            }
        }

        RangeState::from_presence(dirty, flushed)
    }

    /// Dirty byte ranges inside `region`, in address order.
    #[must_use]
    pub fn dirty_within(&self, region: &Region) -> Vec<Region> {
        self.records
            .overlapping(region)
            .iter()
            .filter(|record| matches!(record.state, StoreState::Dirty))
            .filter_map(|record| record.region.intersection(region))
            .collect()
    }

    /// Every store not yet flushed.
    pub fn dirty_stores(&self) -> impl Iterator<Item = &StoreRecord> {
        self.records
            .iter()
            .filter(|record| matches!(record.state, StoreState::Dirty))
    }

    #[must_use]
    pub fn records(&self) -> &[StoreRecord] {
        self.records.as_slice()
    }

    #[must_use]
    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }

    /// Returns `true` if every slab aggregate matches its records.
    #[must_use]
    pub fn slabs_consistent(&self) -> bool {
        slabs_consistent(&self.slabs, self.records.as_slice(), self.slab_width)
    }

    #[must_use]
    pub const fn multiple_stores(&self) -> &WarningRegister {
        &self.multiple_stores
    }

    #[must_use]
    pub const fn redundant_flushes(&self) -> &WarningRegister {
        &self.redundant_flushes
    }

    fn refresh_slabs(&mut self, from_index: usize) {
        rebuild_from(
            &mut self.slabs,
            self.records.as_slice(),
            self.slab_width,
            from_index,
        );
    }
}
