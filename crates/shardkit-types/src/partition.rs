use std::fmt;

use serde::{Deserialize, Serialize};

/// Coordinate of one partition within a global object's partition grid.
///
/// Coordinates carry no uniqueness guarantee: two instances may contribute
/// partitions with the same index (replicated or overlapping shards).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionIndex {
    pub row: u64,
    pub column: u64,
}

impl PartitionIndex {
    pub const fn new(row: u64, column: u64) -> Self {
        Self { row, column }
    }
}

impl From<(u64, u64)> for PartitionIndex {
    fn from((row, column): (u64, u64)) -> Self {
        Self { row, column }
    }
}

impl From<PartitionIndex> for (u64, u64) {
    fn from(index: PartitionIndex) -> Self {
        (index.row, index.column)
    }
}

impl fmt::Display for PartitionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Logical size of a partition grid: partitions along rows and along columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionShape {
    pub rows: u64,
    pub columns: u64,
}

impl PartitionShape {
    pub const fn new(rows: u64, columns: u64) -> Self {
        Self { rows, columns }
    }

    /// Number of cells in the grid, `None` on overflow.
    pub fn cell_count(&self) -> Option<u64> {
        self.rows.checked_mul(self.columns)
    }
}

impl From<(u64, u64)> for PartitionShape {
    fn from((rows, columns): (u64, u64)) -> Self {
        Self { rows, columns }
    }
}

impl fmt::Display for PartitionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.columns)
    }
}
