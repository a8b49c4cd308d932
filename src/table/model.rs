// In-memory representation of a normalized time-series table.
// Row order is identity: downstream selection state references rows by index,
// so rows are never re-sorted or compacted after creation.

/// One location's record: identity columns plus cumulative counts per date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRow {
    /// Province or state; empty string when the source had no value.
    pub province_state: String,
    /// Country or region; always non-empty.
    pub country_region: String,
    /// Cumulative counts, one per date column, in date order.
    pub values: Vec<u64>,
}

/// A rectangular table: canonical date headers plus one row per location.
/// Immutable once published into a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    date_headers: Vec<String>,
    rows: Vec<LocationRow>,
}

impl NormalizedTable {
    pub(crate) fn new(date_headers: Vec<String>, rows: Vec<LocationRow>) -> Self {
        Self { date_headers, rows }
    }

    /// Canonical date-column headers, in chronological order.
    pub fn date_headers(&self) -> &[String] {
        &self.date_headers
    }

    /// All location rows, in source order.
    pub fn rows(&self) -> &[LocationRow] {
        &self.rows
    }

    /// Row at the given index, if in bounds.
    pub fn row(&self, index: usize) -> Option<&LocationRow> {
        self.rows.get(index)
    }

    /// Number of location rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when both tables list the same locations in the same order.
    pub(crate) fn same_locations(&self, other: &NormalizedTable) -> bool {
        self.rows.len() == other.rows.len()
            && self.rows.iter().zip(other.rows.iter()).all(|(a, b)| {
                a.province_state == b.province_state && a.country_region == b.country_region
            })
    }

    /// True when both tables cover the same locations and the same dates,
    /// i.e. they can be paired row-for-row and column-for-column.
    pub fn is_aligned_with(&self, other: &NormalizedTable) -> bool {
        self.date_headers == other.date_headers && self.same_locations(other)
    }
}
