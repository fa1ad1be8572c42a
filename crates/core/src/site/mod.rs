//! A replica site: hosted data, health state, and the per-site SSI
//! bookkeeping (serialization graph plus tracked commit footprints).

use hashbrown::HashMap;

use crate::graph::{EdgeKind, SerializationGraph};
use crate::transaction::CommitFootprint;
use crate::types::{SiteId, Tick, TransactionId, VariableId};

pub mod data;

pub use data::DataRecord;

/// One replica in the simulated store.
///
/// A site keeps a copy of every replicated variable and of the
/// non-replicated variables it is home to. Failure flips the health flag
/// and wipes the SSI history (it is not trusted across a failure); the
/// data cells survive. Recovery stamps `last_down_time`, which the
/// snapshot-construction and available-copies rules compare write
/// timestamps against.
#[derive(Debug, Clone)]
pub struct Site {
    id: SiteId,
    healthy: bool,
    last_down_time: Tick,
    data: HashMap<VariableId, DataRecord>,
    graph: SerializationGraph,
    tracked: HashMap<TransactionId, CommitFootprint>,
}

impl Site {
    /// A healthy site populated with its share of the initial data.
    #[must_use]
    pub fn new(id: SiteId) -> Self {
        let data = VariableId::all()
            .filter(|variable| variable.hosted_on(id))
            .map(|variable| (variable, DataRecord::initial(variable.initial_value())))
            .collect();
        Self {
            id,
            healthy: true,
            // Below tick 0 so the initial values qualify for snapshots.
            last_down_time: -1,
            data,
            graph: SerializationGraph::default(),
            tracked: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SiteId {
        self.id
    }

    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.healthy
    }

    #[must_use]
    pub const fn last_down_time(&self) -> Tick {
        self.last_down_time
    }

    /// The hosted copy of `variable`, if this site has one.
    #[must_use]
    pub fn record(&self, variable: VariableId) -> Option<&DataRecord> {
        self.data.get(&variable)
    }

    /// Every hosted variable with its current cell.
    pub fn records(&self) -> impl Iterator<Item = (VariableId, &DataRecord)> {
        self.data.iter().map(|(&variable, record)| (variable, record))
    }

    /// Applies a committed write to the hosted copy of `variable`.
    pub fn store(&mut self, variable: VariableId, value: i64, tick: Tick) {
        if let Some(record) = self.data.get_mut(&variable) {
            record.store(value, tick);
        }
    }

    /// Admits a committing transaction into this site's serialization
    /// graph, per the SSI rules.
    ///
    /// With no tracked transactions yet the footprint is registered as a
    /// bare vertex and accepted unconditionally. Otherwise conflict edges
    /// against every tracked footprint are inserted first:
    ///
    /// - `other` committed before this one started and the write-sets
    ///   intersect: write-write edge `other -> this`;
    /// - `other` committed before this one started and `other`'s writes
    ///   intersect this one's reads: write-read edge `other -> this`;
    /// - `other` started before the candidate commit tick and `other`'s
    ///   reads intersect this one's writes: read-write edge `other -> this`;
    /// - this one started before `other` committed and this one's reads
    ///   intersect `other`'s writes: read-write edge `this -> other`.
    ///
    /// Returns `false` (and withdraws the vertex) if the insertion closes
    /// a dangerous cycle; the caller aborts and purges the transaction
    /// everywhere.
    pub fn admit_commit(&mut self, footprint: &CommitFootprint) -> bool {
        if self.tracked.is_empty() {
            self.graph.add_vertex(footprint.id.clone());
            self.tracked
                .insert(footprint.id.clone(), footprint.clone());
            return true;
        }

        for other in self.tracked.values() {
            if other.commit_time < footprint.start_time {
                if !other.write_set.is_disjoint(&footprint.write_set) {
                    self.graph.add_edge(
                        other.id.clone(),
                        footprint.id.clone(),
                        EdgeKind::WriteWrite,
                    );
                }
                if !other.write_set.is_disjoint(&footprint.read_set) {
                    self.graph.add_edge(
                        other.id.clone(),
                        footprint.id.clone(),
                        EdgeKind::WriteRead,
                    );
                }
            }
            if other.start_time < footprint.commit_time
                && !other.read_set.is_disjoint(&footprint.write_set)
            {
                self.graph
                    .add_edge(other.id.clone(), footprint.id.clone(), EdgeKind::ReadWrite);
            }
            if footprint.start_time < other.commit_time
                && !footprint.read_set.is_disjoint(&other.write_set)
            {
                self.graph
                    .add_edge(footprint.id.clone(), other.id.clone(), EdgeKind::ReadWrite);
            }
        }

        if self.graph.has_dangerous_cycle() {
            tracing::debug!(site = %self.id, tx = %footprint.id, "dangerous structure, rejecting commit");
            self.graph.remove_transaction(&footprint.id);
            return false;
        }
        self.tracked
            .insert(footprint.id.clone(), footprint.clone());
        true
    }

    /// Drops every trace of a transaction from this site's SSI state.
    pub fn forget_transaction(&mut self, tx: &TransactionId) {
        self.graph.remove_transaction(tx);
        self.tracked.remove(tx);
    }

    #[must_use]
    pub fn is_tracking(&self, tx: &TransactionId) -> bool {
        self.tracked.contains_key(tx)
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    #[must_use]
    pub const fn graph(&self) -> &SerializationGraph {
        &self.graph
    }

    /// Marks the site failed and discards its SSI history. Data cells are
    /// retained.
    pub fn mark_failed(&mut self) {
        self.healthy = false;
        self.tracked.clear();
        self.graph = SerializationGraph::default();
    }

    /// Marks the site healthy again and stamps its last down time.
    pub fn mark_recovered(&mut self, last_down_time: Tick) {
        self.healthy = true;
        self.last_down_time = last_down_time;
    }
}
