use crate::types::TransactionId;

/// Why an operation did not produce an [`Outcome`](super::Outcome).
///
/// Every variant is resolved at the point of detection: by the time the
/// caller sees one, the manager has already queued the operation or aborted
/// and purged the transaction as required. None of them is fatal to the
/// simulation.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unrecognized operation kind; ignored without a state change.
    UnknownOperation,
    /// The operation referenced a transaction that is not in the active
    /// table (already committed or aborted); a no-op.
    UnknownTransaction(TransactionId),
    /// The read/write could not proceed against any available replica; it
    /// was appended to the pending queue for the next recovery.
    Deferred(TransactionId),
    /// A replicated variable missing from the snapshot had no healthy
    /// source at read time; the transaction was aborted and purged.
    AbortedUnavailable(TransactionId),
    /// First-committer-wins violation: another transaction committed a
    /// conflicting write after this one started.
    CommitConflict(TransactionId),
    /// Admitting the commit would close a cycle with two consecutive
    /// read-write edges in some site's serialization graph.
    SsiAnomaly(TransactionId),
    /// A site targeted by a staged write went down before the commit.
    AvailableCopiesViolation(TransactionId),
}

impl Error {
    /// The transaction the error concerns, if any.
    #[must_use]
    pub const fn transaction(&self) -> Option<&TransactionId> {
        match self {
            Self::UnknownOperation => None,
            Self::UnknownTransaction(tx)
            | Self::Deferred(tx)
            | Self::AbortedUnavailable(tx)
            | Self::CommitConflict(tx)
            | Self::SsiAnomaly(tx)
            | Self::AvailableCopiesViolation(tx) => Some(tx),
        }
    }

    /// Whether this error ended the transaction.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(
            self,
            Self::AbortedUnavailable(_)
                | Self::CommitConflict(_)
                | Self::SsiAnomaly(_)
                | Self::AvailableCopiesViolation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_classification() {
        let tx = TransactionId::new("t1");
        assert!(Error::CommitConflict(tx.clone()).is_abort());
        assert!(Error::AvailableCopiesViolation(tx.clone()).is_abort());
        assert!(!Error::Deferred(tx.clone()).is_abort());
        assert!(!Error::UnknownTransaction(tx.clone()).is_abort());
        assert!(!Error::UnknownOperation.is_abort());
    }

    #[test]
    fn transaction_accessor() {
        let tx = TransactionId::new("t1");
        assert_eq!(Error::SsiAnomaly(tx.clone()).transaction(), Some(&tx));
        assert_eq!(Error::UnknownOperation.transaction(), None);
    }
}
