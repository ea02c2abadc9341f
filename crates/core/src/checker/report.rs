use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use crate::store::{StoreRecord, TxId};
use crate::transaction::TxSummary;
use crate::warning::{WarningEvent, WarningKind};

/// Final state of an analysis.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Stores never flushed, in address order.
    pub unflushed: Vec<StoreRecord>,
    /// Stores flushed but not yet fenced, in address order.
    pub unfenced: Vec<StoreRecord>,
    /// Transactions never removed.
    pub leaked: Vec<TxId>,
    pub summary: TxSummary,
    /// Cumulative detections per kind, including events lost to overflow.
    pub detected: Vec<(WarningKind, u64)>,
    /// Events still held by the registers.
    pub warnings: Vec<WarningEvent>,
}

impl Report {
    /// Returns `true` if nothing is left unflushed and no violation was
    /// ever detected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unflushed.is_empty()
            && self.leaked.is_empty()
            && self.detected.iter().all(|(_, count)| *count == 0)
    }

    #[must_use]
    pub fn detected_of(&self, kind: WarningKind) -> u64 {
        self.detected
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, count)| *count)
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of stores not made persistent: {}", self.unflushed.len())?;
        for (i, store) in self.unflushed.iter().enumerate() {
            write!(
                f,
                "[{i}] {} {} value {:#x} seq {}",
                store.thread, store.region, store.value, store.seq
            )?;
            if let Some(context) = store.context {
                write!(f, " {context}")?;
            }
            writeln!(f)?;
        }
        if !self.unfenced.is_empty() {
            writeln!(f, "Number of stores flushed but not fenced: {}", self.unfenced.len())?;
        }
        for (kind, count) in &self.detected {
            if *count > 0 {
                writeln!(f, "{kind}: {count}")?;
            }
        }
        for tx in &self.leaked {
            writeln!(f, "Transaction {tx} was never ended")?;
        }
        write!(f, "{}", self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use crate::store::ThreadId;

    #[test]
    fn test_clean_report() {
        let report = Report {
            unflushed: Vec::new(),
            unfenced: Vec::new(),
            leaked: Vec::new(),
            summary: TxSummary::default(),
            detected: WarningKind::ALL.iter().map(|kind| (*kind, 0)).collect(),
            warnings: Vec::new(),
        };
        assert!(report.is_clean());
        assert_eq!(report.detected_of(WarningKind::MultipleStore), 0);
    }

    #[test]
    fn test_unflushed_store_is_listed() {
        let store = StoreRecord::new(Region::new(0x1000, 8).unwrap(), 4, 0xab, ThreadId(2));
        let report = Report {
            unflushed: vec![store],
            unfenced: Vec::new(),
            leaked: vec![TxId(9)],
            summary: TxSummary::default(),
            detected: Vec::new(),
            warnings: Vec::new(),
        };
        assert!(!report.is_clean());
        let text = report.to_string();
        assert!(text.starts_with("Number of stores not made persistent: 1\n"));
        assert!(text.contains("[0] t2 [0x1000, 0x1008) value 0xab seq 4"));
        assert!(text.contains("Transaction 9 was never ended"));
    }
}
