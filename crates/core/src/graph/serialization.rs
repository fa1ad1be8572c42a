use alloc::collections::btree_map;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::types::TransactionId;

/// Conflict label carried by a serialization-graph edge.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    /// Both transactions wrote a common variable.
    WriteWrite,
    /// The source's write-set intersects the target's read-set.
    WriteRead,
    /// The source's read-set intersects the target's write-set.
    ReadWrite,
}

/// Directed conflict multigraph over transaction identifiers.
///
/// Each vertex maps to its outgoing neighbors, and each edge carries the
/// *set* of [`EdgeKind`] labels observed between the two transactions (a
/// pair can conflict in more than one way). Every site owns one instance
/// and feeds it from [`Site::admit_commit`](crate::site::Site::admit_commit).
///
/// Backed by `BTreeMap` rather than a hash map so that traversal order --
/// and with it the whole simulation -- is deterministic for a given input
/// stream.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SerializationGraph {
    adjacency: BTreeMap<TransactionId, BTreeMap<TransactionId, BTreeSet<EdgeKind>>>,
}

/// One in-flight DFS position: the vertex, the consecutive read-write run
/// on the path that reached it, and the not-yet-explored neighbors.
struct Frame<'a> {
    vertex: &'a TransactionId,
    rw_run: u32,
    neighbors: btree_map::Iter<'a, TransactionId, BTreeSet<EdgeKind>>,
}

impl SerializationGraph {
    /// Adds a vertex with no edges (if not already present).
    pub fn add_vertex(&mut self, tx: TransactionId) {
        self.adjacency.entry(tx).or_default();
    }

    /// Inserts a directed edge `source -> target` labeled `kind`.
    ///
    /// Both vertices are added to the graph if not already present; an
    /// existing edge accumulates the new label.
    pub fn add_edge(&mut self, source: TransactionId, target: TransactionId, kind: EdgeKind) {
        self.adjacency.entry(target.clone()).or_default();
        self.adjacency
            .entry(source)
            .or_default()
            .entry(target)
            .or_default()
            .insert(kind);
    }

    /// Returns the labels on the edge `source -> target`, if present.
    #[must_use]
    pub fn edge_labels(&self, source: &TransactionId, target: &TransactionId) -> Option<&BTreeSet<EdgeKind>> {
        self.adjacency.get(source)?.get(target)
    }

    #[must_use]
    pub fn contains(&self, tx: &TransactionId) -> bool {
        self.adjacency.contains_key(tx)
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Deletes a transaction's vertex and every edge referencing it.
    pub fn remove_transaction(&mut self, tx: &TransactionId) {
        self.adjacency.remove(tx);
        for neighbors in self.adjacency.values_mut() {
            neighbors.remove(tx);
        }
    }

    /// Detects the SSI non-serializability signature: a cycle containing
    /// two read-write edges that are adjacent along the cycle.
    ///
    /// Iterative depth-first traversal from every vertex. Along the current
    /// path a running count of consecutive read-write edges is maintained:
    /// a read-write edge takes the predecessor edge's count plus one, any
    /// other edge resets it to zero. Reaching a vertex already on the
    /// current path with the count at two or more is a dangerous cycle.
    #[must_use]
    pub fn has_dangerous_cycle(&self) -> bool {
        self.adjacency.keys().any(|start| self.dangerous_from(start))
    }

    fn dangerous_from(&self, start: &TransactionId) -> bool {
        let mut visited: BTreeSet<&TransactionId> = BTreeSet::new();
        let mut on_path: BTreeSet<&TransactionId> = BTreeSet::new();
        let mut stack: Vec<Frame<'_>> = Vec::new();

        let Some(neighbors) = self.adjacency.get(start) else {
            return false;
        };
        visited.insert(start);
        on_path.insert(start);
        stack.push(Frame {
            vertex: start,
            rw_run: 0,
            neighbors: neighbors.iter(),
        });

        while let Some(frame) = stack.last_mut() {
            if let Some((next, labels)) = frame.neighbors.next() {
                let rw_run = if labels.contains(&EdgeKind::ReadWrite) {
                    frame.rw_run + 1
                } else {
                    0
                };
                if rw_run >= 2 && on_path.contains(next) {
                    return true;
                }
                if visited.insert(next) {
                    let Some(next_neighbors) = self.adjacency.get(next) else {
                        continue;
                    };
                    on_path.insert(next);
                    stack.push(Frame {
                        vertex: next,
                        rw_run,
                        neighbors: next_neighbors.iter(),
                    });
                }
            } else {
                on_path.remove(frame.vertex);
                stack.pop();
            }
        }
        false
    }
}
