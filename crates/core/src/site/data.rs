use crate::types::Tick;

/// One versioned value cell, owned by the site that hosts it.
///
/// Mutated only by a commit's write-propagation step; the write timestamp
/// is what the snapshot-construction and first-committer-wins rules compare
/// against.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRecord {
    value: i64,
    last_write_time: Tick,
}

impl DataRecord {
    /// A cell holding an initial value, stamped at tick 0.
    #[must_use]
    pub const fn initial(value: i64) -> Self {
        Self {
            value,
            last_write_time: 0,
        }
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    #[must_use]
    pub const fn last_write_time(&self) -> Tick {
        self.last_write_time
    }

    /// Overwrites the cell with a committed value.
    pub fn store(&mut self, value: i64, tick: Tick) {
        self.value = value;
        self.last_write_time = tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_updates_value_and_stamp() {
        let mut record = DataRecord::initial(30);
        assert_eq!(record.value(), 30);
        assert_eq!(record.last_write_time(), 0);

        record.store(7, 12);
        assert_eq!(record.value(), 7);
        assert_eq!(record.last_write_time(), 12);
    }
}
