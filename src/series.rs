// Series extraction.
// Slices selected rows across the date axis into named, chart-ready
// sequences. Values are taken verbatim; axis scaling is the renderer's job.

use serde::{Deserialize, Serialize};

use crate::catalog::LocationEntry;
use crate::error::{Result, TrackerError};
use crate::table::NormalizedTable;

/// Y-axis scale requested by the UI. Opaque to the data core; carried
/// through to the rendering layer unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisMode {
    Linear,
    #[default]
    Log,
}

/// One plotted line: a name plus aligned date and value sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<u64>,
}

/// Extract one series per resolved entry from a single table.
pub fn extract(resolved: &[LocationEntry], table: &NormalizedTable) -> Result<Vec<Series>> {
    resolved
        .iter()
        .map(|entry| series_for(entry, table))
        .collect()
}

/// Extract paired series (e.g. cases and deaths) for each resolved entry.
///
/// Both tables must cover the same locations and dates; series names carry
/// the table label as a suffix so the two lines per location stay apart.
pub fn extract_paired(
    resolved: &[LocationEntry],
    primary: (&str, &NormalizedTable),
    secondary: (&str, &NormalizedTable),
) -> Result<Vec<Series>> {
    let (primary_label, primary_table) = primary;
    let (secondary_label, secondary_table) = secondary;

    if !primary_table.is_aligned_with(secondary_table) {
        return Err(TrackerError::SchemaMismatch(format!(
            "{primary_label} and {secondary_label} tables do not share rows and dates"
        )));
    }

    let mut series = Vec::with_capacity(resolved.len() * 2);
    for entry in resolved {
        series.push(labeled(series_for(entry, primary_table)?, primary_label));
        series.push(labeled(series_for(entry, secondary_table)?, secondary_label));
    }
    Ok(series)
}

fn series_for(entry: &LocationEntry, table: &NormalizedTable) -> Result<Series> {
    let row = table
        .row(entry.index)
        .ok_or(TrackerError::InvalidSelector {
            index: entry.index,
            len: table.len(),
        })?;
    Ok(Series {
        name: entry.name.clone(),
        x: table.date_headers().to_vec(),
        y: row.values.clone(),
    })
}

fn labeled(mut series: Series, label: &str) -> Series {
    series.name = format!("{} ({})", series.name, label);
    series
}
