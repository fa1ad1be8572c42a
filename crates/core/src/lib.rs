//! Replicated transactional store simulation.
//!
//! `replisim_core` simulates a data store replicated across ten sites that
//! can fail and recover, under **Snapshot Isolation with dangerous-structure
//! detection (SSI)** combined with the **available-copies** replication
//! algorithm. The simulation is sequential and deterministic: "concurrent"
//! transactions are a logical notion encoded in timestamps on a single
//! logical clock, not parallel execution.
//!
//! Twenty variables `x1`..`x20` are spread over the sites: even-indexed
//! variables are replicated everywhere, odd-indexed variable `x_i` lives
//! only on site `1 + (i mod 10)`. Each transaction reads from a snapshot
//! captured when it begins; writes are staged in its record and propagate to
//! the replicas only at commit. A commit must pass two gates:
//!
//! 1. **Available copies** -- every site a staged write targeted stayed
//!    healthy from the staging tick through the commit.
//! 2. **SSI** -- first-committer-wins on the written variables, then
//!    admission into every healthy site's serialization graph, rejecting
//!    any cycle that contains two consecutive read-write edges.
//!
//! # Entry point
//!
//! Construct a [`TransactionManager`] and feed it [`Operation`] records via
//! [`TransactionManager::process_operation`]. Each call returns an
//! [`Outcome`] on success or an [`Error`] describing why the operation was
//! ignored, deferred, or caused an abort -- all error kinds are resolved
//! internally and none are fatal.
//!
//! ```rust,ignore
//! use replisim_core::{Operation, TransactionManager};
//!
//! let mut tm = TransactionManager::new();
//! match tm.process_operation(op, false) {
//!     Ok(outcome) => println!("{outcome:?}"),
//!     Err(err) => println!("{err:?}"),
//! }
//! ```
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on the public
//!   types (`Operation`, `Outcome`, `Error`, `DumpReport`, identifiers).
//!
//! This crate is `no_std` compatible (requires `alloc`). The textual
//! operation grammar lives in the separate `replisim_parser` crate.

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod graph;
pub mod manager;
pub mod op;
pub mod site;
pub mod transaction;
pub mod types;

pub use manager::error::Error;
pub use manager::outcome::{DumpReport, Outcome};
pub use manager::TransactionManager;
pub use op::Operation;
pub use types::{SiteId, Tick, TransactionId, VariableId};
