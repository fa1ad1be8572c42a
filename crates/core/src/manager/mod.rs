//! The transaction manager: logical clock, site array, active-transaction
//! table, pending queue, and every admission and validation decision.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::op::Operation;
use crate::site::{DataRecord, Site};
use crate::transaction::{CommitFootprint, Transaction};
use crate::types::{SiteId, Tick, TransactionId, VariableId};

pub mod error;
pub mod outcome;

pub use error::Error;
pub use outcome::{DumpReport, Outcome, SiteRow};

/// Owns all simulation state and processes one operation at a time.
///
/// The manager is strictly sequential: the logical clock (`ticker`) totally
/// orders externally submitted operations, incrementing once per operation.
/// Operations replayed from the pending queue do not consume a tick, so
/// they keep their FIFO order among themselves without reordering against
/// clock-stamped events.
#[derive(Debug)]
pub struct TransactionManager {
    ticker: Tick,
    sites: Vec<Site>,
    transactions: HashMap<TransactionId, Transaction>,
    pending: VecDeque<Operation>,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    /// Ten healthy sites with initial data, an empty transaction table,
    /// and the clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ticker: 0,
            sites: SiteId::all().map(Site::new).collect(),
            transactions: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Current logical time.
    #[must_use]
    pub const fn now(&self) -> Tick {
        self.ticker
    }

    /// A transaction is active iff it is present in the manager's table.
    #[must_use]
    pub fn is_active(&self, tx: &TransactionId) -> bool {
        self.transactions.contains_key(tx)
    }

    /// Number of operations waiting for a recovery.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn site(&self, id: SiteId) -> &Site {
        &self.sites[id.index()]
    }

    /// Processes one operation record.
    ///
    /// This is the simulation's only entry point: the driving loop calls it
    /// once per parsed line with `replay = false`, and the recovery handler
    /// calls it once per replayed queue item with `replay = true` (which
    /// leaves the clock untouched).
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the operation was ignored, deferred, or
    /// aborted a transaction. The manager has already applied the
    /// corresponding state change; the error is a report, not a failure of
    /// the simulation.
    pub fn process_operation(&mut self, operation: Operation, replay: bool) -> Result<Outcome, Error> {
        if !replay {
            self.ticker += 1;
        }
        match operation {
            Operation::Begin { tx } => Ok(self.begin(tx)),
            Operation::Read { tx, variable } => self.read(tx, variable),
            Operation::Write {
                tx,
                variable,
                value,
            } => self.write(tx, variable, value),
            Operation::End { tx } => self.end(tx),
            Operation::Fail { site } => Ok(self.fail(site)),
            Operation::Recover { site } => Ok(self.recover(site)),
            Operation::Dump => Ok(Outcome::Dump(self.dump())),
            Operation::Unknown => {
                tracing::warn!("unrecognized operation, ignoring");
                Err(Error::UnknownOperation)
            }
        }
    }

    /// Current value of every variable at every site. Read-only and
    /// idempotent.
    #[must_use]
    pub fn dump(&self) -> DumpReport {
        DumpReport(
            self.sites
                .iter()
                .map(|site| SiteRow {
                    site: site.id(),
                    values: VariableId::all()
                        .map(|variable| site.record(variable).map(DataRecord::value))
                        .collect(),
                })
                .collect(),
        )
    }

    fn begin(&mut self, tx: TransactionId) -> Outcome {
        let mut txn = Transaction::new(tx.clone(), self.ticker);
        self.capture_snapshot(&mut txn);
        tracing::debug!(%tx, start = self.ticker, "transaction begun");
        self.transactions.insert(tx.clone(), txn);
        Outcome::Begun { tx }
    }

    /// Builds the consistent view a new transaction reads from.
    ///
    /// Non-replicated variables on healthy sites are copied
    /// unconditionally. A replicated copy is included only if it was
    /// written after the hosting site's most recent failure and before the
    /// transaction began -- otherwise the site may have missed updates
    /// while down, and the copy cannot be trusted. A variable absent from
    /// the snapshot is transiently unavailable to this transaction.
    fn capture_snapshot(&self, txn: &mut Transaction) {
        for site in &self.sites {
            if !site.is_healthy() {
                continue;
            }
            for (variable, record) in site.records() {
                let trusted = if variable.is_replicated() {
                    record.last_write_time() > site.last_down_time()
                        && record.last_write_time() < txn.start_time()
                } else {
                    true
                };
                if trusted {
                    txn.snapshot_insert(variable, record.value(), site.id());
                }
            }
        }
    }

    fn read(&mut self, tx: TransactionId, variable: VariableId) -> Result<Outcome, Error> {
        let Some(txn) = self.transactions.get(&tx) else {
            tracing::warn!(%tx, "operation for a transaction no longer active");
            return Err(Error::UnknownTransaction(tx));
        };

        // Read-your-writes: the transaction's own staged value wins and the
        // snapshot is not consulted.
        if let Some(value) = txn.last_own_write(variable) {
            tracing::debug!(%tx, %variable, value, "read served from own write");
            return Ok(Outcome::Read {
                tx,
                variable,
                value,
            });
        }

        if let Some(value) = txn.snapshot_value(variable) {
            // The snapshot value might be stale relative to an intervening
            // recovery; only serve it while some source site is still up.
            let any_source_up = txn
                .snapshot_sources(variable)
                .iter()
                .any(|&source| self.sites[source.index()].is_healthy());
            if !any_source_up {
                tracing::debug!(%tx, %variable, "no healthy snapshot source, deferring read");
                self.pending.push_back(Operation::Read {
                    tx: tx.clone(),
                    variable,
                });
                return Err(Error::Deferred(tx));
            }
            if let Some(txn) = self.transactions.get_mut(&tx) {
                txn.log_read(variable);
            }
            tracing::debug!(%tx, %variable, value, "read served from snapshot");
            return Ok(Outcome::Read {
                tx,
                variable,
                value,
            });
        }

        // Absent from the snapshot: a non-replicated variable may appear
        // once its home site recovers; a replicated one never will.
        if variable.home_site().is_some() {
            tracing::debug!(%tx, %variable, "variable unavailable, deferring read");
            self.pending.push_back(Operation::Read {
                tx: tx.clone(),
                variable,
            });
            Err(Error::Deferred(tx))
        } else {
            tracing::info!(%tx, %variable, "no available copy, aborting");
            self.purge(&tx);
            Err(Error::AbortedUnavailable(tx))
        }
    }

    fn write(
        &mut self,
        tx: TransactionId,
        variable: VariableId,
        value: i64,
    ) -> Result<Outcome, Error> {
        if !self.transactions.contains_key(&tx) {
            tracing::warn!(%tx, "operation for a transaction no longer active");
            return Err(Error::UnknownTransaction(tx));
        }

        let candidates: Vec<SiteId> = match variable.home_site() {
            Some(home) if self.sites[home.index()].is_healthy() => [home].into(),
            Some(_) => Vec::new(),
            None => self
                .sites
                .iter()
                .filter(|site| site.is_healthy())
                .map(Site::id)
                .collect(),
        };
        if candidates.is_empty() {
            tracing::debug!(%tx, %variable, "no writable copy, deferring write");
            self.pending.push_back(Operation::Write {
                tx: tx.clone(),
                variable,
                value,
            });
            return Err(Error::Deferred(tx));
        }

        let tick = self.ticker;
        if let Some(txn) = self.transactions.get_mut(&tx) {
            txn.log_write(variable, value, candidates.clone(), tick);
        }
        tracing::debug!(%tx, %variable, value, sites = ?candidates, "write staged");
        Ok(Outcome::Staged {
            tx,
            variable,
            value,
            sites: candidates,
        })
    }

    /// Commit validation: the available-copies gate, then the SSI gate
    /// (first-committer-wins followed by per-site graph admission). Both
    /// must pass before any write propagates.
    fn end(&mut self, tx: TransactionId) -> Result<Outcome, Error> {
        if !self.transactions.contains_key(&tx) {
            tracing::warn!(%tx, "operation for a transaction no longer active");
            return Err(Error::UnknownTransaction(tx));
        }
        let commit_tick = self.ticker;

        if let Some(site) = self.available_copies_violation(&tx) {
            tracing::info!(%tx, %site, "write target was down after staging, aborting");
            self.purge(&tx);
            return Err(Error::AvailableCopiesViolation(tx));
        }

        if self.first_committer_lost(&tx) {
            tracing::info!(%tx, "conflicting write committed first, aborting");
            self.purge(&tx);
            return Err(Error::CommitConflict(tx));
        }

        let Some(txn) = self.transactions.get(&tx) else {
            return Err(Error::UnknownTransaction(tx));
        };
        let footprint = CommitFootprint::of(txn, commit_tick);
        let admitted = self
            .sites
            .iter_mut()
            .filter(|site| site.is_healthy())
            .all(|site| site.admit_commit(&footprint));
        if !admitted {
            tracing::info!(%tx, "dangerous structure detected, aborting");
            self.purge(&tx);
            return Err(Error::SsiAnomaly(tx));
        }

        // Both gates passed: propagate every staged write into each of its
        // candidate sites, stamped with the commit tick.
        let writes: Vec<(VariableId, i64, Vec<SiteId>)> = self
            .transactions
            .get(&tx)
            .map(|txn| {
                txn.staged_writes()
                    .map(|w| (w.variable, w.value, w.sites.to_vec()))
                    .collect()
            })
            .unwrap_or_default();
        for (variable, value, sites) in writes {
            for site_id in sites {
                self.sites[site_id.index()].store(variable, value, commit_tick);
            }
        }

        // Per-site bookkeeping is purged only when this was the sole
        // remaining active transaction; otherwise committed footprints
        // accumulate at the sites for future conflict checks.
        let sole_remaining = self.transactions.len() == 1;
        if let Some(mut txn) = self.transactions.remove(&tx) {
            txn.set_commit_time(commit_tick);
            if sole_remaining {
                for site in &mut self.sites {
                    site.forget_transaction(txn.id());
                }
            }
        }
        tracing::info!(%tx, at = commit_tick, "transaction committed");
        Ok(Outcome::Committed {
            tx,
            at: commit_tick,
        })
    }

    /// A staged write is invalid if any of its candidate sites is down now
    /// or went down after the write was staged.
    fn available_copies_violation(&self, tx: &TransactionId) -> Option<SiteId> {
        let txn = self.transactions.get(tx)?;
        for write in txn.staged_writes() {
            for &site_id in write.sites {
                let site = &self.sites[site_id.index()];
                if !site.is_healthy() || site.last_down_time() > write.tick {
                    return Some(site_id);
                }
            }
        }
        None
    }

    /// First-committer-wins: a variable this transaction wrote already
    /// carries, on some healthy site, a write stamped after this
    /// transaction's start.
    fn first_committer_lost(&self, tx: &TransactionId) -> bool {
        let Some(txn) = self.transactions.get(tx) else {
            return false;
        };
        let written = txn.write_set();
        self.sites.iter().filter(|site| site.is_healthy()).any(|site| {
            written.iter().any(|&variable| {
                site.record(variable)
                    .is_some_and(|record| record.last_write_time() > txn.start_time())
            })
        })
    }

    /// Removes a transaction's footprint from every site and drops it from
    /// the active table.
    fn purge(&mut self, tx: &TransactionId) {
        for site in &mut self.sites {
            site.forget_transaction(tx);
        }
        self.transactions.remove(tx);
    }

    fn fail(&mut self, site: SiteId) -> Outcome {
        self.sites[site.index()].mark_failed();
        tracing::info!(%site, "site failed");
        Outcome::SiteFailed { site }
    }

    fn recover(&mut self, site: SiteId) -> Outcome {
        // Stamp the instant before the recovery operation itself.
        let last_down = self.ticker - 1;
        self.sites[site.index()].mark_recovered(last_down);
        tracing::info!(%site, last_down, "site recovered");

        // Non-replicated variables hosted here become visible to every
        // active transaction whose snapshot lacks them, with this site as
        // their source.
        let backfill: Vec<(VariableId, i64)> = self.sites[site.index()]
            .records()
            .filter(|(variable, _)| variable.home_site().is_some())
            .map(|(variable, record)| (variable, record.value()))
            .collect();
        for txn in self.transactions.values_mut() {
            for &(variable, value) in &backfill {
                txn.backfill(variable, value, site);
            }
        }

        let replayed = self.replay_pending();
        Outcome::SiteRecovered { site, replayed }
    }

    /// One bounded sweep over the pending queue: everything queued before
    /// this recovery is retried once, in original order, without advancing
    /// the clock. Operations deferred again during the sweep end up at the
    /// back of the queue and wait for the next recovery.
    fn replay_pending(&mut self) -> Vec<Result<Outcome, Error>> {
        let mut results = Vec::new();
        for _ in 0..self.pending.len() {
            let Some(operation) = self.pending.pop_front() else {
                break;
            };
            tracing::debug!(?operation, "replaying pending operation");
            results.push(self.process_operation(operation, true));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(index: u8) -> VariableId {
        VariableId::new(index).unwrap()
    }

    fn sid(id: u8) -> SiteId {
        SiteId::new(id).unwrap()
    }

    fn tid(id: &str) -> TransactionId {
        TransactionId::new(id)
    }

    fn begin(tm: &mut TransactionManager, tx: &str) {
        tm.process_operation(Operation::Begin { tx: tid(tx) }, false)
            .unwrap();
    }

    #[test]
    fn ticker_counts_external_operations_only() {
        let mut tm = TransactionManager::new();
        assert_eq!(tm.now(), 0);
        begin(&mut tm, "t1");
        assert_eq!(tm.now(), 1);
        tm.process_operation(Operation::Dump, false).unwrap();
        assert_eq!(tm.now(), 2);
        // Replayed operations leave the clock alone.
        let _ = tm.process_operation(
            Operation::Read {
                tx: tid("t1"),
                variable: var(2),
            },
            true,
        );
        assert_eq!(tm.now(), 2);
    }

    #[test]
    fn unknown_operation_is_reported_and_ignored() {
        let mut tm = TransactionManager::new();
        let result = tm.process_operation(Operation::Unknown, false);
        assert_eq!(result, Err(Error::UnknownOperation));
        // It still consumed a tick, like any externally submitted line.
        assert_eq!(tm.now(), 1);
    }

    #[test]
    fn operations_on_missing_transactions_are_noops() {
        let mut tm = TransactionManager::new();
        let read = tm.process_operation(
            Operation::Read {
                tx: tid("t9"),
                variable: var(2),
            },
            false,
        );
        assert_eq!(read, Err(Error::UnknownTransaction(tid("t9"))));

        let write = tm.process_operation(
            Operation::Write {
                tx: tid("t9"),
                variable: var(2),
                value: 1,
            },
            false,
        );
        assert_eq!(write, Err(Error::UnknownTransaction(tid("t9"))));
        // Neither got queued.
        assert_eq!(tm.pending_len(), 0);
    }

    #[test]
    fn snapshot_skips_unhealthy_sites() {
        let mut tm = TransactionManager::new();
        // x1's only home is site 2.
        tm.process_operation(Operation::Fail { site: sid(2) }, false)
            .unwrap();
        begin(&mut tm, "t1");
        let read = tm.process_operation(
            Operation::Read {
                tx: tid("t1"),
                variable: var(1),
            },
            false,
        );
        // Non-replicated and absent from the snapshot: deferred, not aborted.
        assert_eq!(read, Err(Error::Deferred(tid("t1"))));
        assert_eq!(tm.pending_len(), 1);
        assert!(tm.is_active(&tid("t1")));
    }

    #[test]
    fn replicated_variable_with_no_trusted_copy_aborts_the_reader() {
        let mut tm = TransactionManager::new();
        for site in SiteId::all() {
            tm.process_operation(Operation::Fail { site }, false).unwrap();
        }
        begin(&mut tm, "t1");
        let read = tm.process_operation(
            Operation::Read {
                tx: tid("t1"),
                variable: var(2),
            },
            false,
        );
        assert_eq!(read, Err(Error::AbortedUnavailable(tid("t1"))));
        assert!(!tm.is_active(&tid("t1")));
    }

    #[test]
    fn write_defers_when_the_home_site_is_down() {
        let mut tm = TransactionManager::new();
        begin(&mut tm, "t1");
        // x1 lives only on site 2.
        tm.process_operation(Operation::Fail { site: sid(2) }, false)
            .unwrap();
        let write = tm.process_operation(
            Operation::Write {
                tx: tid("t1"),
                variable: var(1),
                value: 5,
            },
            false,
        );
        assert_eq!(write, Err(Error::Deferred(tid("t1"))));
        assert_eq!(tm.pending_len(), 1);
    }

    #[test]
    fn replicated_write_targets_every_healthy_site() {
        let mut tm = TransactionManager::new();
        begin(&mut tm, "t1");
        tm.process_operation(Operation::Fail { site: sid(3) }, false)
            .unwrap();
        let staged = tm
            .process_operation(
                Operation::Write {
                    tx: tid("t1"),
                    variable: var(2),
                    value: 7,
                },
                false,
            )
            .unwrap();
        match staged {
            Outcome::Staged { sites, .. } => {
                assert_eq!(sites.len() as u8, crate::types::NUM_SITES - 1);
                assert!(!sites.contains(&sid(3)));
            }
            other => panic!("expected a staged write, got {other:?}"),
        }
    }
}
