// Location catalog derivation.
// One entry per table row; the entry's index is the selection key used by
// the UI's dropdown, so entry order must match table row order exactly.

use serde::Serialize;

use crate::table::NormalizedTable;

/// A selectable location: its stable row index and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationEntry {
    pub index: usize,
    pub name: String,
}

/// Ordered list of locations derived from one dataset snapshot, tagged with
/// the snapshot generation it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationCatalog {
    entries: Vec<LocationEntry>,
    generation: u64,
}

impl LocationCatalog {
    /// Build a catalog from a table, in row order.
    pub fn build(table: &NormalizedTable, generation: u64) -> Self {
        let entries = table
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| LocationEntry {
                index,
                name: display_name(&row.province_state, &row.country_region),
            })
            .collect();
        Self {
            entries,
            generation,
        }
    }

    pub fn entries(&self) -> &[LocationEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&LocationEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Province and country joined with ", "; the separator is dropped when the
/// province is empty.
fn display_name(province: &str, country: &str) -> String {
    if province.is_empty() {
        country.to_string()
    } else {
        format!("{province}, {country}")
    }
}
