//! Shared helpers for driving the simulator in integration tests.
//!
//! Each helper submits one externally-stamped operation (replay = false),
//! exactly like the driving loop would.

#![allow(dead_code)]

use replisim_core::types::{SiteId, TransactionId, VariableId};
use replisim_core::{DumpReport, Error, Operation, Outcome, TransactionManager};

pub fn tid(id: &str) -> TransactionId {
    TransactionId::new(id)
}

pub fn var(index: u8) -> VariableId {
    VariableId::new(index).expect("variable index in 1..=20")
}

pub fn sid(id: u8) -> SiteId {
    SiteId::new(id).expect("site id in 1..=10")
}

pub fn begin(tm: &mut TransactionManager, tx: &str) -> Result<Outcome, Error> {
    tm.process_operation(Operation::Begin { tx: tid(tx) }, false)
}

pub fn read(tm: &mut TransactionManager, tx: &str, variable: u8) -> Result<Outcome, Error> {
    tm.process_operation(
        Operation::Read {
            tx: tid(tx),
            variable: var(variable),
        },
        false,
    )
}

pub fn write(
    tm: &mut TransactionManager,
    tx: &str,
    variable: u8,
    value: i64,
) -> Result<Outcome, Error> {
    tm.process_operation(
        Operation::Write {
            tx: tid(tx),
            variable: var(variable),
            value,
        },
        false,
    )
}

pub fn end(tm: &mut TransactionManager, tx: &str) -> Result<Outcome, Error> {
    tm.process_operation(Operation::End { tx: tid(tx) }, false)
}

pub fn fail(tm: &mut TransactionManager, site: u8) -> Result<Outcome, Error> {
    tm.process_operation(Operation::Fail { site: sid(site) }, false)
}

pub fn recover(tm: &mut TransactionManager, site: u8) -> Result<Outcome, Error> {
    tm.process_operation(Operation::Recover { site: sid(site) }, false)
}

pub fn dump(tm: &mut TransactionManager) -> DumpReport {
    match tm.process_operation(Operation::Dump, false) {
        Ok(Outcome::Dump(report)) => report,
        other => panic!("dump should always succeed, got {other:?}"),
    }
}

/// The value a read outcome served, panicking on anything else.
pub fn read_value(result: Result<Outcome, Error>) -> i64 {
    match result {
        Ok(Outcome::Read { value, .. }) => value,
        other => panic!("expected an admitted read, got {other:?}"),
    }
}

/// The candidate sites of a staged write, panicking on anything else.
pub fn staged_sites(result: Result<Outcome, Error>) -> Vec<SiteId> {
    match result {
        Ok(Outcome::Staged { sites, .. }) => sites,
        other => panic!("expected a staged write, got {other:?}"),
    }
}

/// The replay results carried by a recovery outcome.
pub fn replayed(result: Result<Outcome, Error>) -> Vec<Result<Outcome, Error>> {
    match result {
        Ok(Outcome::SiteRecovered { replayed, .. }) => replayed,
        other => panic!("expected a recovery, got {other:?}"),
    }
}
