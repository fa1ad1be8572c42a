use core::fmt::{Debug, Formatter, Result};

use crate::types::{SiteId, TransactionId, VariableId};

/// One operation record from the driving stream.
///
/// Produced by the external parsing collaborator (`replisim_parser`), one
/// per input line, and fed to
/// [`TransactionManager::process_operation`](crate::TransactionManager::process_operation).
/// Unrecognized operation kinds arrive as [`Operation::Unknown`], which the
/// core reports and ignores.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Clone, PartialEq, Eq)]
pub enum Operation {
    /// `begin(T)` -- start a transaction and capture its snapshot.
    Begin { tx: TransactionId },
    /// `R(T,x)` -- read a variable within a transaction.
    Read {
        tx: TransactionId,
        variable: VariableId,
    },
    /// `W(T,x,v)` -- stage a write within a transaction.
    Write {
        tx: TransactionId,
        variable: VariableId,
        value: i64,
    },
    /// `end(T)` -- attempt to commit a transaction.
    End { tx: TransactionId },
    /// `fail(s)` -- mark a site unhealthy.
    Fail { site: SiteId },
    /// `recover(s)` -- bring a failed site back.
    Recover { site: SiteId },
    /// `dump()` -- report every variable at every site.
    Dump,
    /// Anything the parser did not recognize. A no-op.
    Unknown,
}

impl Debug for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::Begin { tx } => write!(f, "begin({tx})"),
            Self::Read { tx, variable } => write!(f, "r({tx},{variable})"),
            Self::Write {
                tx,
                variable,
                value,
            } => write!(f, "w({tx},{variable},{value})"),
            Self::End { tx } => write!(f, "end({tx})"),
            Self::Fail { site } => write!(f, "fail({site})"),
            Self::Recover { site } => write!(f, "recover({site})"),
            Self::Dump => write!(f, "dump()"),
            Self::Unknown => write!(f, "<unknown>"),
        }
    }
}

impl Operation {
    /// The transaction an operation belongs to, if any.
    #[must_use]
    pub const fn transaction(&self) -> Option<&TransactionId> {
        match self {
            Self::Begin { tx }
            | Self::Read { tx, .. }
            | Self::Write { tx, .. }
            | Self::End { tx } => Some(tx),
            Self::Fail { .. } | Self::Recover { .. } | Self::Dump | Self::Unknown => None,
        }
    }
}
