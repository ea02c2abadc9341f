//! Runtime consistency checking for persistent-memory programs.
//!
//! `pmcheck_core` observes the stores a monitored program makes to
//! persistent memory and answers two questions continuously:
//!
//! 1. **Durability** -- is a byte range currently dirty, partially flushed,
//!    or fully flushed? Stores mark bytes dirty, flushes promote dirty bytes
//!    to flushed, and a later store to flushed bytes makes them dirty again.
//! 2. **Transactional consistency** -- does a store made on a thread that
//!    participates in one or more transactions stay inside the regions those
//!    transactions registered?
//!
//! Both questions are answered by indexing address ranges in an
//! [`OverlapSet`](region::set::OverlapSet): a sorted array of disjoint
//! ranges searched with a three-way comparator where "equal" means
//! "shares at least one byte".
//!
//! # Entry point
//!
//! The main entry point is [`Checker`], an explicit analysis context. It is
//! fed the event stream of the monitored program (mappings, stores, flushes,
//! fences, and transaction boundaries) in the order they were observed.
//!
//! ```rust,ignore
//! use pmcheck_core::{Checker, Region, ThreadId, TxId};
//!
//! let mut checker = Checker::init_transactions(false);
//! checker.register_pmem_mapping(Region::new(0x1000, 0x1000)?);
//! checker.register_new_tx(TxId(7), ThreadId(1))?;
//! checker.add_obj_to_tx(TxId(7), 0x1000, 0x100)?;
//! checker.store(Region::new(0x1000, 8)?, 0xff, ThreadId(1), None);
//! assert_eq!(checker.get_tx_all_err(), 0);
//! ```
//!
//! Detected misuse in the monitored program never surfaces as an error:
//! it is recorded as a [`WarningEvent`](warning::WarningEvent) in a bounded,
//! deduplicating [`WarningRegister`](warning::WarningRegister). Only API
//! misuse (for example removing a transaction that is not active) is
//! returned as an `Err`.
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on public data
//!   types (`Region`, `StoreRecord`, `TraceEvent`, `WarningEvent`, ...).
//! - **`schemars`** -- enables `JsonSchema` for the trace format.
//!
//! This crate is `no_std` compatible (requires `alloc`). The text trace
//! parser lives in the separate `pmcheck_parser` crate.

#![cfg_attr(not(any(test, feature = "schemars")), no_std)]
extern crate alloc;

pub mod checker;
pub mod exclude;
pub mod region;
pub mod store;
pub mod trace;
pub mod tracker;
pub mod transaction;
pub mod warning;

pub use checker::config::{CheckerConfig, CrossTxPolicy};
pub use checker::report::Report;
pub use checker::{Checker, StoreOutcome};
pub use region::types::Region;
pub use store::{ContextHandle, StoreRecord, StoreState, ThreadId, TxId};
