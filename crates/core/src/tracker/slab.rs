//! Summaries over fixed-width runs of store records.
//!
//! Slab `k` covers record indices `[k * width, min((k + 1) * width, n))`.
//! Because records are sorted and disjoint, each slab also covers a
//! contiguous address window `[min_addr, max_addr]`, which lets range
//! queries skip whole slabs and answer fully covered ones from the cached
//! aggregate.

use alloc::vec::Vec;

use crate::region::Span;
use crate::store::{StoreRecord, StoreState};

/// Aggregate flush state of a run of records.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlushAggregate {
    NoFlushed,
    PartFlushed,
    AllFlushed,
}

impl FlushAggregate {
    /// Contribution of a single record.
    #[must_use]
    pub const fn of(state: StoreState) -> Self {
        match state {
            StoreState::Clean | StoreState::Dirty => Self::NoFlushed,
            StoreState::Flushed => Self::AllFlushed,
        }
    }

    /// Equal contributions keep their value; anything mixed is partial.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            Self::PartFlushed
        }
    }

    /// Folds the contributions of `records`, or `None` if there are none.
    pub fn over<'a, I>(records: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a StoreRecord>,
    {
        records
            .into_iter()
            .map(|record| Self::of(record.state))
            .reduce(Self::combine)
    }
}

/// Metadata for the records at `[start_index, end_index)`.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slab {
    pub start_index: usize,
    pub end_index: usize,
    /// First byte covered by the run.
    pub min_addr: u64,
    /// Last byte covered by the run (inclusive).
    pub max_addr: u64,
    pub state: FlushAggregate,
}

impl Slab {
    /// Summarizes a non-empty run starting at `start_index`.
    fn summarize(records: &[StoreRecord], start_index: usize) -> Option<Self> {
        let first = records.first()?;
        let last = records.last()?;
        Some(Self {
            start_index,
            end_index: start_index + records.len(),
            min_addr: first.addr(),
            max_addr: last.end() - 1,
            state: FlushAggregate::over(records)?,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }

    /// Returns `true` if the slab's address window meets `[addr, end)`.
    #[must_use]
    pub const fn meets(&self, addr: u64, end: u64) -> bool {
        self.min_addr < end && addr <= self.max_addr
    }
}

/// Recomputes every slab from the one containing `from_index` onward.
///
/// Slabs before it summarize indices that did not move and are kept.
pub(crate) fn rebuild_from(
    slabs: &mut Vec<Slab>,
    records: &[StoreRecord],
    width: usize,
    from_index: usize,
) {
    let width = width.max(1);
    let first_slab = from_index / width;
    slabs.truncate(first_slab);
    let mut start = first_slab * width;
    while start < records.len() {
        let end = (start + width).min(records.len());
        if let Some(slab) = Slab::summarize(&records[start..end], start) {
            slabs.push(slab);
        }
        start = end;
    }
}

/// Returns `true` if every slab equals a fresh summary of its records.
#[must_use]
pub fn slabs_consistent(slabs: &[Slab], records: &[StoreRecord], width: usize) -> bool {
    let mut expected = Vec::new();
    rebuild_from(&mut expected, records, width.max(1), 0);
    expected == slabs
}
