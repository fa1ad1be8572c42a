use alloc::string::String;
use core::fmt::{Display, Formatter, Result};

/// Number of replica sites in the simulated store.
pub const NUM_SITES: u8 = 10;

/// Number of variables (`x1`..`x20`).
pub const NUM_VARIABLES: u8 = 20;

/// A logical clock value.
///
/// The manager's ticker increments once per externally submitted operation
/// (never for replayed ones). Signed so a site's initial `last_down_time`
/// can sit below tick 0, letting the initial values (stamped at tick 0)
/// qualify for snapshots.
pub type Tick = i64;

/// Identifier of a transaction, as named by the operation stream.
///
/// Identifiers are free-form and case-insensitive; they are lowercased on
/// construction so `begin(T1)` and `end(t1)` refer to the same transaction.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a replica site, `1..=10`.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId(u8);

impl SiteId {
    /// Returns `None` unless `id` is in `1..=10`.
    #[must_use]
    pub const fn new(id: u8) -> Option<Self> {
        if 1 <= id && id <= NUM_SITES {
            Some(Self(id))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position in the manager's site array.
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// All site identifiers in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=NUM_SITES).map(Self)
    }
}

impl Display for SiteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a variable, interned from the textual names `x1`..`x20`.
///
/// The replication placement is fixed at initialization and never changes:
/// even-indexed variables are replicated on every site, odd-indexed `x_i`
/// resides only on site `1 + (i mod 10)`.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(u8);

impl VariableId {
    /// Returns `None` unless `index` is in `1..=20`.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if 1 <= index && index <= NUM_VARIABLES {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Interns a textual name of the form `x<1..=20>`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let digits = name.strip_prefix('x').or_else(|| name.strip_prefix('X'))?;
        digits.parse::<u8>().ok().and_then(Self::new)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot in a dump row.
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Even-indexed variables have a copy on every site.
    #[must_use]
    pub const fn is_replicated(self) -> bool {
        self.0 % 2 == 0
    }

    /// The single owning site of a non-replicated variable, `None` for
    /// replicated ones.
    #[must_use]
    pub const fn home_site(self) -> Option<SiteId> {
        if self.is_replicated() {
            None
        } else {
            Some(SiteId(1 + self.0 % 10))
        }
    }

    /// Whether a copy of this variable lives on `site`.
    #[must_use]
    pub const fn hosted_on(self, site: SiteId) -> bool {
        match self.home_site() {
            None => true,
            Some(home) => home.0 == site.0,
        }
    }

    /// The value every hosting site starts with.
    #[must_use]
    pub const fn initial_value(self) -> i64 {
        10 * self.0 as i64
    }

    /// All variable identifiers in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=NUM_VARIABLES).map(Self)
    }
}

impl Display for VariableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "x{}", self.0)
    }
}
