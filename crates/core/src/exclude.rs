//! Globally excluded address ranges.

use alloc::vec::Vec;

use crate::region::{Region, RegionSet};

/// Ranges permanently exempt from tracking.
///
/// Exclusions only ever grow during an analysis session.
#[derive(Debug, Default, Clone)]
pub struct ExclusionList {
    ranges: RegionSet,
}

impl ExclusionList {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ranges: RegionSet::new(),
        }
    }

    pub fn add(&mut self, region: Region) {
        tracing::debug!(%region, "excluding region from analysis");
        self.ranges.add_region(region);
    }

    /// Returns `true` if every byte of `region` is excluded.
    #[must_use]
    pub fn is_excluded(&self, region: &Region) -> bool {
        self.ranges.covers(region)
    }

    /// Returns `true` if any byte of `region` is excluded.
    #[must_use]
    pub fn touches(&self, region: &Region) -> bool {
        self.ranges.contains(region)
    }

    /// The parts of `region` that remain subject to analysis.
    #[must_use]
    pub fn residue(&self, region: &Region) -> Vec<Region> {
        self.ranges.uncovered(region)
    }

    #[must_use]
    pub fn ranges(&self) -> &[Region] {
        self.ranges.as_slice()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
