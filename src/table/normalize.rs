// CSV parsing and schema canonicalization.
// Pure transformation: identical input text yields identical tables.

use chrono::NaiveDate;
use csv::ReaderBuilder;

use crate::error::{Result, TrackerError};

use super::model::{LocationRow, NormalizedTable};

const PROVINCE: &str = "province_state";
const COUNTRY: &str = "country_region";

/// Parse raw delimited text into a NormalizedTable.
///
/// Headers are trimmed, lower-cased, and `/` separators mapped to `_`.
/// Columns whose canonical header parses as an `m_d_yy` date become the
/// value columns, kept in source order; other non-identity columns (lat,
/// long) are dropped. Date columns must be strictly chronological.
pub fn normalize(raw_text: &str) -> Result<NormalizedTable> {
    let mut reader = ReaderBuilder::new()
        .flexible(false)
        .from_reader(raw_text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TrackerError::MalformedTable(e.to_string()))?
        .iter()
        .map(canonical_header)
        .collect();

    let province_idx = headers
        .iter()
        .position(|h| h == PROVINCE)
        .ok_or_else(|| TrackerError::MalformedTable(format!("missing column {PROVINCE}")))?;
    let country_idx = headers
        .iter()
        .position(|h| h == COUNTRY)
        .ok_or_else(|| TrackerError::MalformedTable(format!("missing column {COUNTRY}")))?;

    let mut date_columns = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(date) = parse_date_header(header) {
            date_columns.push((idx, header.clone(), date));
        }
    }
    if date_columns.is_empty() {
        return Err(TrackerError::MalformedTable("no date columns".to_string()));
    }
    for pair in date_columns.windows(2) {
        if pair[0].2 >= pair[1].2 {
            return Err(TrackerError::MalformedTable(format!(
                "date columns out of chronological order near {}",
                pair[1].1
            )));
        }
    }

    let mut rows = Vec::new();
    for (record_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| TrackerError::MalformedTable(e.to_string()))?;
        // Header is line 1, so data rows start at line 2.
        let line = record_idx + 2;

        let province_state = clean_province(record.get(province_idx).unwrap_or(""));
        // Stored verbatim; only emptiness is validated.
        let country_region = record.get(country_idx).unwrap_or("").to_string();
        if country_region.trim().is_empty() {
            return Err(TrackerError::MalformedTable(format!(
                "row {line}: empty {COUNTRY}"
            )));
        }

        let mut values = Vec::with_capacity(date_columns.len());
        for (idx, header, _) in &date_columns {
            let field = record.get(*idx).unwrap_or("").trim();
            let value = field.parse::<u64>().map_err(|_| {
                TrackerError::MalformedTable(format!(
                    "row {line}, column {header}: expected a non-negative count, got {field:?}"
                ))
            })?;
            values.push(value);
        }

        rows.push(LocationRow {
            province_state,
            country_region,
            values,
        });
    }

    let date_headers = date_columns.into_iter().map(|(_, h, _)| h).collect();
    Ok(NormalizedTable::new(date_headers, rows))
}

/// Trim, lower-case, and map `/` separators to `_`.
fn canonical_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace('/', "_")
}

/// The source writes missing provinces as an empty field or a literal nan
/// token; both become the empty string.
fn clean_province(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Date headers look like `1_22_20` after separator mapping.
fn parse_date_header(header: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(header, "%m_%d_%y").ok()
}
