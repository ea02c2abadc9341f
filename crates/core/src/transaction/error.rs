use core::fmt::{self, Display, Formatter};

use derive_more::From;

use crate::region::{Region, RegionError};
use crate::store::{ThreadId, TxId};

/// Misuse of the transaction API. A failed call leaves all state unchanged.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, From)]
pub enum TxError {
    /// Registering an id that is already active.
    AlreadyActive(TxId),
    /// Operating on an id that is not active.
    NotActive(TxId),
    /// Removing a region the transaction does not fully own.
    RegionNotFound { tx: TxId, region: Region },
    /// Removing a thread that does not participate in the transaction.
    ThreadNotMember { tx: TxId, thread: ThreadId },
    /// The `(base, size)` pair does not describe a valid region.
    #[from]
    InvalidRegion(RegionError),
}

impl TxError {
    /// Stable, non-zero status code for clients that expect integers.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::AlreadyActive(_) => 1,
            Self::NotActive(_) => 2,
            Self::RegionNotFound { .. } => 3,
            Self::ThreadNotMember { .. } => 4,
            Self::InvalidRegion(_) => 5,
        }
    }
}

impl Display for TxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive(tx) => write!(f, "transaction {tx} is already active"),
            Self::NotActive(tx) => write!(f, "transaction {tx} is not active"),
            Self::RegionNotFound { tx, region } => {
                write!(f, "region {region} is not registered in transaction {tx}")
            }
            Self::ThreadNotMember { tx, thread } => {
                write!(f, "thread {thread} does not participate in transaction {tx}")
            }
            Self::InvalidRegion(err) => write!(f, "invalid region: {err}"),
        }
    }
}
