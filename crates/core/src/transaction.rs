use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::types::{SiteId, Tick, TransactionId, VariableId};

/// One entry in a transaction's append-only per-variable operation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEntry {
    /// A read served from the snapshot.
    Read,
    /// A staged write: the value, the sites that were healthy candidates
    /// when it was admitted, and the admission tick.
    Write {
        value: i64,
        sites: Vec<SiteId>,
        tick: Tick,
    },
}

/// A staged write flattened out of the record, borrowed for commit
/// validation and propagation.
#[derive(Debug, Clone, Copy)]
pub struct StagedWrite<'a> {
    pub variable: VariableId,
    pub value: i64,
    pub sites: &'a [SiteId],
    pub tick: Tick,
}

/// An in-flight transaction.
///
/// Owned by the manager while active. All reads are served from `snapshot`,
/// captured once at begin (and augmented by site recoveries for
/// non-replicated variables); `snapshot_sites` remembers which sites backed
/// each snapshotted value so reads can be deferred when every source is
/// down. The `record` is append-only and is what commit validation and the
/// per-site serialization graphs consume.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: TransactionId,
    start_time: Tick,
    commit_time: Option<Tick>,
    record: HashMap<VariableId, Vec<RecordEntry>>,
    snapshot: HashMap<VariableId, i64>,
    snapshot_sites: HashMap<VariableId, Vec<SiteId>>,
}

impl Transaction {
    #[must_use]
    pub fn new(id: TransactionId, start_time: Tick) -> Self {
        Self {
            id,
            start_time,
            commit_time: None,
            record: HashMap::new(),
            snapshot: HashMap::new(),
            snapshot_sites: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &TransactionId {
        &self.id
    }

    #[must_use]
    pub const fn start_time(&self) -> Tick {
        self.start_time
    }

    #[must_use]
    pub const fn commit_time(&self) -> Option<Tick> {
        self.commit_time
    }

    pub fn set_commit_time(&mut self, tick: Tick) {
        self.commit_time = Some(tick);
    }

    /// The value of this transaction's own latest staged write to
    /// `variable`, if any (read-your-writes).
    #[must_use]
    pub fn last_own_write(&self, variable: VariableId) -> Option<i64> {
        self.record.get(&variable)?.iter().rev().find_map(|entry| {
            if let RecordEntry::Write { value, .. } = entry {
                Some(*value)
            } else {
                None
            }
        })
    }

    pub fn log_read(&mut self, variable: VariableId) {
        self.record.entry(variable).or_default().push(RecordEntry::Read);
    }

    pub fn log_write(&mut self, variable: VariableId, value: i64, sites: Vec<SiteId>, tick: Tick) {
        self.record
            .entry(variable)
            .or_default()
            .push(RecordEntry::Write { value, sites, tick });
    }

    #[must_use]
    pub fn snapshot_value(&self, variable: VariableId) -> Option<i64> {
        self.snapshot.get(&variable).copied()
    }

    /// The sites whose copies backed `variable` in the snapshot.
    #[must_use]
    pub fn snapshot_sources(&self, variable: VariableId) -> &[SiteId] {
        self.snapshot_sites
            .get(&variable)
            .map_or(&[], Vec::as_slice)
    }

    /// Records `site`'s copy of `variable` into the snapshot. Later calls
    /// for the same variable overwrite the value (qualifying replicas hold
    /// identical copies) and accumulate the source site.
    pub fn snapshot_insert(&mut self, variable: VariableId, value: i64, site: SiteId) {
        self.snapshot.insert(variable, value);
        self.snapshot_sites.entry(variable).or_default().push(site);
    }

    /// Adds a recovered site's non-replicated variable to the snapshot,
    /// only if the variable is not already present.
    pub fn backfill(&mut self, variable: VariableId, value: i64, site: SiteId) {
        if self.snapshot.contains_key(&variable) {
            return;
        }
        self.snapshot.insert(variable, value);
        self.snapshot_sites.insert(variable, [site].into());
    }

    /// Variables with at least one read entry in the record.
    #[must_use]
    pub fn read_set(&self) -> HashSet<VariableId> {
        self.variables_with(|entry| matches!(entry, RecordEntry::Read))
    }

    /// Variables with at least one staged write in the record.
    #[must_use]
    pub fn write_set(&self) -> HashSet<VariableId> {
        self.variables_with(|entry| matches!(entry, RecordEntry::Write { .. }))
    }

    fn variables_with(&self, pred: impl Fn(&RecordEntry) -> bool) -> HashSet<VariableId> {
        self.record
            .iter()
            .filter(|(_, entries)| entries.iter().any(&pred))
            .map(|(&variable, _)| variable)
            .collect()
    }

    /// Every staged write in the record, in per-variable staging order.
    pub fn staged_writes(&self) -> impl Iterator<Item = StagedWrite<'_>> {
        self.record.iter().flat_map(|(&variable, entries)| {
            entries.iter().filter_map(move |entry| match entry {
                RecordEntry::Write { value, sites, tick } => Some(StagedWrite {
                    variable,
                    value: *value,
                    sites,
                    tick: *tick,
                }),
                RecordEntry::Read => None,
            })
        })
    }
}

/// The read/write footprint a site tracks once a transaction is admitted
/// into its serialization graph.
///
/// `commit_time` is the candidate commit tick the admission ran with; for
/// an accepted transaction it equals the final commit time.
#[derive(Debug, Clone)]
pub struct CommitFootprint {
    pub id: TransactionId,
    pub start_time: Tick,
    pub commit_time: Tick,
    pub read_set: HashSet<VariableId>,
    pub write_set: HashSet<VariableId>,
}

impl CommitFootprint {
    #[must_use]
    pub fn of(txn: &Transaction, commit_time: Tick) -> Self {
        Self {
            id: txn.id().clone(),
            start_time: txn.start_time(),
            commit_time,
            read_set: txn.read_set(),
            write_set: txn.write_set(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(index: u8) -> VariableId {
        VariableId::new(index).unwrap()
    }

    fn site(id: u8) -> SiteId {
        SiteId::new(id).unwrap()
    }

    #[test]
    fn commit_time_is_unset_until_commit() {
        let mut txn = Transaction::new(TransactionId::new("t1"), 1);
        assert_eq!(txn.commit_time(), None);
        txn.set_commit_time(9);
        assert_eq!(txn.commit_time(), Some(9));
    }

    #[test]
    fn read_your_writes_returns_latest_staged_value() {
        let mut txn = Transaction::new(TransactionId::new("t1"), 1);
        assert_eq!(txn.last_own_write(var(4)), None);

        txn.log_write(var(4), 10, vec![site(1)], 2);
        txn.log_read(var(4));
        txn.log_write(var(4), 11, vec![site(1)], 4);
        assert_eq!(txn.last_own_write(var(4)), Some(11));
        assert_eq!(txn.last_own_write(var(6)), None);
    }

    #[test]
    fn read_and_write_sets_come_from_the_record() {
        let mut txn = Transaction::new(TransactionId::new("t1"), 1);
        txn.log_read(var(2));
        txn.log_write(var(3), 5, vec![site(4)], 2);
        txn.log_read(var(3));

        assert_eq!(txn.read_set(), [var(2), var(3)].into_iter().collect());
        assert_eq!(txn.write_set(), [var(3)].into_iter().collect());
    }

    #[test]
    fn staged_writes_flatten_the_record() {
        let mut txn = Transaction::new(TransactionId::new("t1"), 1);
        txn.log_write(var(3), 5, vec![site(4)], 2);
        txn.log_write(var(3), 6, vec![site(4)], 3);
        txn.log_read(var(2));

        let writes: Vec<_> = txn.staged_writes().collect();
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().all(|w| w.variable == var(3)));
        assert_eq!(writes[0].value, 5);
        assert_eq!(writes[1].value, 6);
    }

    #[test]
    fn snapshot_sources_accumulate() {
        let mut txn = Transaction::new(TransactionId::new("t1"), 1);
        txn.snapshot_insert(var(2), 20, site(1));
        txn.snapshot_insert(var(2), 20, site(2));

        assert_eq!(txn.snapshot_value(var(2)), Some(20));
        assert_eq!(txn.snapshot_sources(var(2)), [site(1), site(2)]);
        assert!(txn.snapshot_sources(var(4)).is_empty());
    }

    #[test]
    fn backfill_does_not_clobber_existing_entries() {
        let mut txn = Transaction::new(TransactionId::new("t1"), 1);
        txn.snapshot_insert(var(5), 50, site(6));
        txn.backfill(var(5), 99, site(6));
        assert_eq!(txn.snapshot_value(var(5)), Some(50));

        txn.backfill(var(7), 70, site(8));
        assert_eq!(txn.snapshot_value(var(7)), Some(70));
        assert_eq!(txn.snapshot_sources(var(7)), [site(8)]);
    }

    #[test]
    fn footprint_captures_sets_and_times() {
        let mut txn = Transaction::new(TransactionId::new("t1"), 3);
        txn.log_read(var(2));
        txn.log_write(var(6), 1, vec![site(1)], 4);

        let footprint = CommitFootprint::of(&txn, 9);
        assert_eq!(footprint.id, TransactionId::new("t1"));
        assert_eq!(footprint.start_time, 3);
        assert_eq!(footprint.commit_time, 9);
        assert_eq!(footprint.read_set, [var(2)].into_iter().collect());
        assert_eq!(footprint.write_set, [var(6)].into_iter().collect());
    }
}
