//! Address ranges and the overlap engine that indexes them.

pub mod set;
pub mod types;

pub use set::{OverlapSet, RegionSet};
pub use types::{cmp_span, Region, RegionError, Span};

/// Returns `true` if `region` shares at least one byte with a region in `set`.
#[must_use]
pub fn is_in_mapping_set(region: &Region, set: &RegionSet) -> bool {
    set.contains(region)
}

/// Adds `region` to `set`, merging it with overlapping or adjacent regions.
pub fn add_region(region: Region, set: &mut RegionSet) {
    set.add_region(region);
}

/// Removes the bytes of `region` from `set`.
///
/// Returns `true` if any byte was removed.
pub fn remove_region(region: &Region, set: &mut RegionSet) -> bool {
    set.remove_region(region)
}

/// Returns `true` if the two regions share at least one byte.
#[must_use]
pub fn check_overlap(lhs: &Region, rhs: &Region) -> bool {
    cmp_span(lhs, rhs).is_eq()
}
