use alloc::vec::Vec;
use core::cmp::Ordering;
use core::ops::Range;

use super::types::{cmp_span, Region, Span};

/// Ordered set of pairwise-disjoint ranges, indexed by the overlap comparator.
///
/// Elements are kept sorted by address in a contiguous array. Because stored
/// elements never overlap each other, every element overlapping a query
/// collates to one contiguous run, which two binary searches delimit.
/// Lookup is `O(log n)`; insertion and removal shift the tail of the array.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapSet<T> {
    items: Vec<T>,
}

impl<T> Default for OverlapSet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// The set used for mappings, exclusions, and transaction objects.
pub type RegionSet = OverlapSet<Region>;

impl<T> OverlapSet<T>
where
    T: Span,
{
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Returns `true` if any stored element shares a byte with `key`.
    pub fn contains<K>(&self, key: &K) -> bool
    where
        K: Span + ?Sized,
    {
        self.items
            .binary_search_by(|probe| cmp_span(probe, key))
            .is_ok()
    }

    /// Returns some element overlapping `key`.
    ///
    /// When several elements overlap, which one is returned is unspecified.
    pub fn find<K>(&self, key: &K) -> Option<&T>
    where
        K: Span + ?Sized,
    {
        self.items
            .binary_search_by(|probe| cmp_span(probe, key))
            .ok()
            .map(|idx| &self.items[idx])
    }

    /// Index range of every element overlapping `key`.
    ///
    /// An empty range still points at the position where `key` would be
    /// inserted.
    pub fn overlap_range<K>(&self, key: &K) -> Range<usize>
    where
        K: Span + ?Sized,
    {
        let start = self
            .items
            .partition_point(|item| cmp_span(item, key) == Ordering::Less);
        let end = self
            .items
            .partition_point(|item| cmp_span(item, key) != Ordering::Greater);
        start..end
    }

    /// All elements sharing at least one byte with `key`, in address order.
    pub fn overlapping<K>(&self, key: &K) -> &[T]
    where
        K: Span + ?Sized,
    {
        &self.items[self.overlap_range(key)]
    }

    /// Inserts `item` unless it overlaps an element already stored.
    ///
    /// Returns `false` (and leaves the set unchanged) on overlap.
    pub fn insert(&mut self, item: T) -> bool {
        match self.items.binary_search_by(|probe| cmp_span(probe, &item)) {
            Ok(_) => false,
            Err(idx) => {
                self.items.insert(idx, item);
                true
            }
        }
    }

    /// Removes and returns the element covering exactly `key`.
    ///
    /// A key that only partially matches a stored element, or matches
    /// nothing, leaves the set unchanged and returns `None`.
    pub fn remove<K>(&mut self, key: &K) -> Option<T>
    where
        K: Span + ?Sized,
    {
        let idx = self
            .items
            .binary_search_by(|probe| cmp_span(probe, key))
            .ok()?;
        let item = &self.items[idx];
        (item.addr() == key.addr() && item.size() == key.size()).then(|| self.items.remove(idx))
    }

    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.items.retain(f);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Removes the elements at `range` and returns them in address order.
    pub(crate) fn take_range(&mut self, range: Range<usize>) -> Vec<T> {
        self.items.drain(range).collect()
    }

    /// Inserts a sorted run of elements at `at`.
    ///
    /// The caller guarantees the run is sorted, pairwise disjoint, and fits
    /// between `items[at - 1]` and `items[at]`.
    pub(crate) fn put_run<I>(&mut self, at: usize, run: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.items.splice(at..at, run);
        debug_assert!(self
            .items
            .windows(2)
            .all(|w| cmp_span(&w[0], &w[1]) == Ordering::Less));
    }
}

impl<'a, T> IntoIterator for &'a OverlapSet<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl OverlapSet<Region> {
    /// Adds `region`, merging it with every stored region it overlaps or
    /// touches, so the set always holds maximal disjoint runs.
    pub fn add_region(&mut self, region: Region) {
        // widen by one byte on each side so adjacent regions are merged too
        let probe_start = region.addr().saturating_sub(1);
        let probe_end = region.end().saturating_add(1);
        let probe = Region::from_bounds(probe_start, probe_end).unwrap_or(region);

        let range = self.overlap_range(&probe);
        let at = range.start;
        let neighbors = self.take_range(range);

        let start = neighbors
            .first()
            .map_or(region.addr(), |first| first.addr().min(region.addr()));
        let end = neighbors
            .last()
            .map_or(region.end(), |last| last.end().max(region.end()));
        let merged = Region::from_bounds(start, end).unwrap_or(region);

        self.put_run(at, [merged]);
    }

    /// Carves `region` out of the set, splitting stored regions that only
    /// partially overlap it.
    ///
    /// Returns `true` if any byte was removed.
    pub fn remove_region(&mut self, region: &Region) -> bool {
        let range = self.overlap_range(region);
        if range.is_empty() {
            return false;
        }
        let at = range.start;
        let removed = self.take_range(range);

        let first_before = removed.first().and_then(|r| r.split_around(region).0);
        let last_after = removed.last().and_then(|r| r.split_around(region).2);

        self.put_run(at, first_before.into_iter().chain(last_after));
        true
    }

    /// Returns `true` if every byte of `region` is inside the set.
    #[must_use]
    pub fn covers(&self, region: &Region) -> bool {
        self.uncovered(region).is_empty()
    }

    /// The parts of `region` not covered by any stored region, in order.
    #[must_use]
    pub fn uncovered(&self, region: &Region) -> Vec<Region> {
        let mut gaps = Vec::new();
        let mut cursor = region.addr();
        for stored in self.overlapping(region) {
            if let Ok(gap) = Region::from_bounds(cursor, stored.addr()) {
                gaps.push(gap);
            }
            cursor = cursor.max(stored.end());
        }
        if let Ok(tail) = Region::from_bounds(cursor, region.end()) {
            gaps.push(tail);
        }
        gaps
    }

    /// The parts of `region` covered by stored regions, in order.
    #[must_use]
    pub fn covered(&self, region: &Region) -> Vec<Region> {
        self.overlapping(region)
            .iter()
            .filter_map(|stored| stored.intersection(region))
            .collect()
    }
}
