//! Export forecasts and datasets to CSV.
//!
//! The forecast export is meant to be easy to consume in spreadsheets or
//! downstream scripts: `ds,yhat,yhat_lower,yhat_upper`, one row per frame date,
//! undefined values as empty cells.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{DATE_COLUMN, Dataset, ForecastResult};
use crate::error::AppError;
use crate::io::ingest::parse_date;

/// Write a forecast to a CSV file.
pub fn write_forecast_csv(path: &Path, result: &ForecastResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_forecast_to(file, result)?;

    tracing::info!(path = %path.display(), rows = result.rows.len(), "wrote forecast CSV");
    Ok(())
}

/// Write a forecast as CSV to any writer.
pub fn write_forecast_to<W: Write>(writer: W, result: &ForecastResult) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in &result.rows {
        csv.serialize(row)
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }
    csv.flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Re-read the `ds` column of an exported forecast.
pub fn read_forecast_dates(path: &Path) -> Result<Vec<NaiveDate>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::schema(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let Some(ds_idx) = headers.iter().position(|h| h == DATE_COLUMN) else {
        return Err(AppError::schema(format!("Missing required column(s): {DATE_COLUMN}")));
    };

    let mut dates = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i + 2;
        let record = record.map_err(|e| AppError::schema(format!("Line {line}: {e}")))?;
        let raw = record.get(ds_idx).unwrap_or("");
        let date = parse_date(raw).map_err(|e| AppError::schema(format!("Line {line}: {e}")))?;
        dates.push(date);
    }
    Ok(dates)
}

/// Write a dataset (`ds` first, then its columns) to a CSV file.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create CSV '{}': {e}", path.display())))?;

    let write_err = |e: csv::Error| AppError::io(format!("Failed to write CSV '{}': {e}", path.display()));

    let mut header = vec![DATE_COLUMN.to_string()];
    header.extend(dataset.columns().iter().cloned());
    csv.write_record(&header).map_err(write_err)?;

    for record in dataset.records() {
        let mut fields = Vec::with_capacity(header.len());
        fields.push(record.ds.to_string());
        fields.extend(record.values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        csv.write_record(&fields).map_err(write_err)?;
    }
    csv.flush()
        .map_err(|e| AppError::io(format!("Failed to flush CSV '{}': {e}", path.display())))?;

    tracing::info!(path = %path.display(), rows = dataset.len(), "wrote dataset CSV");
    Ok(())
}
