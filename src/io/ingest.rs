//! CSV ingest and schema validation.
//!
//! This module turns a daily-history CSV into a `Dataset` the pipeline can trust.
//!
//! Design goals:
//! - **Strict schema** for required columns (every missing name reported at once)
//! - **Case-sensitive** column names: `Y_vendite` does not satisfy `y_vendite`
//! - **Lenient cells**: empty or non-numeric values become `None`; whether that
//!   matters is decided later by the fit, which knows which columns it uses
//! - **Separation of concerns**: no filtering or fitting logic here

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{DATE_COLUMN, Dataset, TimeSeriesRecord};
use crate::error::AppError;

/// Open `path` and parse it as a dataset carrying at least `required` columns.
///
/// `ds` is always required, whether or not it is listed.
pub fn load_dataset(path: &Path, required: &[String]) -> Result<Dataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let dataset = parse_dataset(file, required)?;

    tracing::info!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Parse CSV content from any reader.
pub fn parse_dataset<R: Read>(reader: R, required: &[String]) -> Result<Dataset, AppError> {
    let mut reader = csv_reader(reader);
    let headers = normalized_headers(&mut reader)?;

    let mut required_all: Vec<String> = vec![DATE_COLUMN.to_string()];
    required_all.extend(required.iter().cloned());
    validate_columns(&headers, &required_all)?;

    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| AppError::schema(format!("Missing required column(s): {DATE_COLUMN}")))?;

    // Every other column is kept as a value column, in file order.
    let value_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != date_idx).collect();
    let columns: Vec<String> = value_idx.iter().map(|&i| headers[i].clone()).collect();

    let mut records = Vec::new();
    let mut non_numeric = BTreeSet::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, and CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::schema(format!("CSV parse error on line {line}: {e}")))?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        let raw_date = record.get(date_idx).unwrap_or("");
        let ds = parse_date(raw_date)
            .map_err(|msg| AppError::schema(format!("Line {line}: {msg}")))?;

        let values = parse_values(&record, &value_idx, &columns, &mut non_numeric);
        records.push(TimeSeriesRecord { ds, values });
    }

    if records.is_empty() {
        return Err(AppError::schema("Dataset is empty: the file has no data rows."));
    }

    if !non_numeric.is_empty() {
        tracing::debug!(columns = ?non_numeric, "columns with non-numeric cells");
    }

    Dataset::new(columns, records, non_numeric)
}

/// Check that every name in `required` is a header.
///
/// The error lists every missing name, sorted and deduplicated, so the report
/// does not depend on the order of either list.
pub fn validate_columns(headers: &[String], required: &[String]) -> Result<(), AppError> {
    let missing = missing_columns(headers, required);
    if missing.is_empty() {
        return Ok(());
    }

    let list: Vec<&str> = missing.iter().map(String::as_str).collect();
    Err(AppError::schema(format!("Missing required column(s): {}", list.join(", "))))
}

/// Names of the columns a run needs besides `ds`.
pub fn required_columns(targets: &[String], regressors: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(targets.len() + regressors.len());
    for name in targets.iter().chain(regressors) {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

/// Required names absent from `headers` (case-sensitive), sorted.
pub fn missing_columns(headers: &[String], required: &[String]) -> BTreeSet<String> {
    required
        .iter()
        .filter(|name| !headers.contains(name))
        .cloned()
        .collect()
}

/// Read only the header line of a CSV, normalised the way `parse_dataset` sees it.
pub fn read_headers<R: Read>(reader: R) -> Result<Vec<String>, AppError> {
    normalized_headers(&mut csv_reader(reader))
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn normalized_headers<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>, AppError> {
    Ok(reader
        .headers()
        .map_err(|e| AppError::schema(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect())
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM;
    // left in place, `ds` would be reported missing.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_values(
    record: &StringRecord,
    value_idx: &[usize],
    columns: &[String],
    non_numeric: &mut BTreeSet<String>,
) -> Vec<Option<f64>> {
    value_idx
        .iter()
        .zip(columns)
        .map(|(&i, name)| {
            let cell = record.get(i).unwrap_or("");
            if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                return None;
            }
            match cell.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    non_numeric.insert(name.clone());
                    None
                }
            }
        })
        .collect()
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO dates are the documented format; a trailing midnight timestamp (as
    // written by dataframe tools) is tolerated, as are two common alternatives.
    let s = s.trim();
    let s = s.split([' ', 'T']).next().unwrap_or(s);
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}' in `{DATE_COLUMN}`. Expected YYYY-MM-DD (or YYYY/MM/DD, DD/MM/YYYY)."
    ))
}
