use alloc::vec::Vec;

use super::error::Error;
use crate::types::{SiteId, Tick, TransactionId, VariableId};

/// Successful result of processing one operation.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Transaction registered, snapshot captured.
    Begun { tx: TransactionId },
    /// Read admitted; `value` came from the snapshot or from the
    /// transaction's own staged write.
    Read {
        tx: TransactionId,
        variable: VariableId,
        value: i64,
    },
    /// Write staged against the sites that were healthy candidates.
    Staged {
        tx: TransactionId,
        variable: VariableId,
        value: i64,
        sites: Vec<SiteId>,
    },
    /// Both commit gates passed; writes propagated at tick `at`.
    Committed { tx: TransactionId, at: Tick },
    /// Site marked unhealthy, its SSI history discarded.
    SiteFailed { site: SiteId },
    /// Site healthy again. Snapshots were backfilled and the pending queue
    /// swept once; `replayed` holds the sweep's results in queue order.
    SiteRecovered {
        site: SiteId,
        replayed: Vec<Result<Outcome, Error>>,
    },
    /// State inspection of every site.
    Dump(DumpReport),
}

/// One site's slots in a [`DumpReport`]: `values[i]` is the current value
/// of `x{i+1}`, `None` where the variable is not hosted.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRow {
    pub site: SiteId,
    pub values: Vec<Option<i64>>,
}

/// Current value of every variable at every site, sites in ascending order.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport(pub Vec<SiteRow>);

impl DumpReport {
    /// The value of `variable` at `site`, if hosted there.
    #[must_use]
    pub fn value_at(&self, site: SiteId, variable: VariableId) -> Option<i64> {
        self.0
            .get(site.index())
            .and_then(|row| row.values.get(variable.index()))
            .copied()
            .flatten()
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use crate::TransactionManager;

    #[test]
    fn dump_report_round_trips_through_json() {
        let report = TransactionManager::new().dump();
        let json = serde_json::to_string(&report).expect("serialize");
        let back: DumpReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(report, back);
    }
}
