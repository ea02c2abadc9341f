use core::cmp::Ordering;
use core::fmt::{self, Display, Formatter};

/// Anything that occupies a contiguous, non-empty range of addresses.
///
/// The range is half-open: `[addr, addr + size)`. Implementors guarantee
/// `size() > 0` and that `addr() + size()` does not overflow.
pub trait Span {
    fn addr(&self) -> u64;
    fn size(&self) -> u64;

    /// One past the last byte covered.
    fn end(&self) -> u64 {
        self.addr() + self.size()
    }
}

/// Three-way overlap comparator.
///
/// Returns `Less` if `lhs` lies entirely before `rhs`, `Greater` if it lies
/// entirely after, and `Equal` if the two share at least one byte. Ranges
/// that merely touch (`lhs.end() == rhs.addr()`) are *not* equal.
///
/// The relation is not transitive: `a == b` and `b == c` does not imply
/// `a == c`. It is a total order only over pairwise-disjoint ranges, which
/// is exactly what [`OverlapSet`](super::set::OverlapSet) stores.
pub fn cmp_span<L, R>(lhs: &L, rhs: &R) -> Ordering
where
    L: Span + ?Sized,
    R: Span + ?Sized,
{
    if lhs.end() <= rhs.addr() {
        Ordering::Less
    } else if lhs.addr() >= rhs.end() {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Error constructing a [`Region`].
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// A region must cover at least one byte.
    ZeroSize { addr: u64 },
    /// `addr + size` does not fit in the address space.
    AddressOverflow { addr: u64, size: u64 },
}

impl Display for RegionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize { addr } => write!(f, "zero-sized region at {addr:#x}"),
            Self::AddressOverflow { addr, size } => {
                write!(f, "region {addr:#x}+{size:#x} overflows the address space")
            }
        }
    }
}

/// A non-empty, half-open byte range `[addr, addr + size)`.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawRegion", into = "RawRegion"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region {
    addr: u64,
    size: u64,
}

#[cfg(feature = "serde")]
#[derive(::serde::Serialize, ::serde::Deserialize)]
struct RawRegion {
    addr: u64,
    size: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawRegion> for Region {
    type Error = RegionError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        Self::new(raw.addr, raw.size)
    }
}

#[cfg(feature = "serde")]
impl From<Region> for RawRegion {
    fn from(region: Region) -> Self {
        Self {
            addr: region.addr,
            size: region.size,
        }
    }
}

impl Region {
    /// # Errors
    ///
    /// Returns [`RegionError::ZeroSize`] for an empty range and
    /// [`RegionError::AddressOverflow`] if the range wraps past `u64::MAX`.
    pub const fn new(addr: u64, size: u64) -> Result<Self, RegionError> {
        if size == 0 {
            return Err(RegionError::ZeroSize { addr });
        }
        if addr.checked_add(size).is_none() {
            return Err(RegionError::AddressOverflow { addr, size });
        }
        Ok(Self { addr, size })
    }

    /// Builds the region `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::ZeroSize`] if `end <= start`.
    pub const fn from_bounds(start: u64, end: u64) -> Result<Self, RegionError> {
        if end <= start {
            return Err(RegionError::ZeroSize { addr: start });
        }
        Ok(Self {
            addr: start,
            size: end - start,
        })
    }

    #[must_use]
    pub const fn addr(&self) -> u64 {
        self.addr
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub const fn end(&self) -> u64 {
        self.addr + self.size
    }

    #[must_use]
    pub const fn contains_addr(&self, addr: u64) -> bool {
        self.addr <= addr && addr < self.end()
    }

    /// Returns `true` if every byte of `other` lies inside `self`.
    #[must_use]
    pub const fn encloses(&self, other: &Self) -> bool {
        self.addr <= other.addr && other.end() <= self.end()
    }

    /// The bytes shared by both regions, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.addr.max(other.addr);
        let end = self.end().min(other.end());
        Self::from_bounds(start, end).ok()
    }

    /// Splits `self` around `cut` into the parts before, inside, and after it.
    #[must_use]
    pub fn split_around(&self, cut: &Self) -> (Option<Self>, Option<Self>, Option<Self>) {
        let before = Self::from_bounds(self.addr, self.end().min(cut.addr)).ok();
        let inside = self.intersection(cut);
        let after = Self::from_bounds(self.addr.max(cut.end()), self.end()).ok();
        (before, inside, after)
    }
}

impl Span for Region {
    fn addr(&self) -> u64 {
        self.addr
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.addr, self.end())
    }
}
