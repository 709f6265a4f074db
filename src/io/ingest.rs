//! CSV ingest.
//!
//! Turns a CSV with a header row into two-channel `Observations`:
//!
//! - the x column is either numeric or an ISO date (`YYYY-MM-DD`); dates become
//!   day offsets from the first row's date
//! - two numeric value columns become the interleaved `y` array
//!
//! Any unparseable cell is an error naming its line; nothing is silently skipped.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::Observations;
use crate::error::AppError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Where the independent variable comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XColumn {
    Numeric(String),
    Date(String),
}

impl XColumn {
    fn name(&self) -> &str {
        match self {
            XColumn::Numeric(name) | XColumn::Date(name) => name,
        }
    }
}

/// Column selection for ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub x: XColumn,
    pub y0: String,
    pub y1: String,
}

/// Load observations from a CSV file.
pub fn load_observations(path: &Path, columns: &ColumnSpec) -> Result<Observations, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_observations(file, columns)
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))
}

/// Read observations from any CSV source.
pub fn read_observations<R: Read>(reader: R, columns: &ColumnSpec) -> Result<Observations, AppError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV header: {e}")))?
        .clone();
    let x_idx = column_index(&headers, columns.x.name())?;
    let y0_idx = column_index(&headers, &columns.y0)?;
    let y1_idx = column_index(&headers, &columns.y1)?;

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut origin: Option<NaiveDate> = None;

    for (i, record) in rdr.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let record = record.map_err(|e| AppError::new(2, format!("line {line}: {e}")))?;

        let xi = match &columns.x {
            XColumn::Numeric(name) => parse_number(&record, x_idx, name, line)?,
            XColumn::Date(name) => {
                let raw = cell(&record, x_idx, name, line)?;
                let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
                    AppError::new(2, format!("line {line}: column '{name}': invalid date '{raw}': {e}"))
                })?;
                let start = *origin.get_or_insert(date);
                (date - start).num_days() as f64
            }
        };

        x.push(xi);
        y.push(parse_number(&record, y0_idx, &columns.y0, line)?);
        y.push(parse_number(&record, y1_idx, &columns.y1, line)?);
    }

    if x.is_empty() {
        return Err(AppError::new(2, "CSV has no data rows."));
    }

    Ok(Observations {
        x,
        y,
        labels: [columns.y0.clone(), columns.y1.clone()],
        origin,
    })
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, AppError> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        let available: Vec<&str> = headers.iter().collect();
        AppError::new(
            2,
            format!("Missing column '{name}' (available: {})", available.join(", ")),
        )
    })
}

fn cell<'r>(record: &'r StringRecord, idx: usize, name: &str, line: usize) -> Result<&'r str, AppError> {
    match record.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::new(2, format!("line {line}: column '{name}' is empty"))),
    }
}

fn parse_number(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<f64, AppError> {
    let raw = cell(record, idx, name, line)?;
    let value: f64 = raw
        .parse()
        .map_err(|e| AppError::new(2, format!("line {line}: column '{name}': invalid number '{raw}': {e}")))?;
    if !value.is_finite() {
        return Err(AppError::new(2, format!("line {line}: column '{name}' is not finite")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(x: XColumn) -> ColumnSpec {
        ColumnSpec {
            x,
            y0: "cases".to_string(),
            y1: "deaths".to_string(),
        }
    }

    #[test]
    fn numeric_x_is_read_and_interleaved() {
        let csv = "x,cases,deaths\n1,2,3\n2, 4 ,6\n3,6,9\n";
        let obs = read_observations(csv.as_bytes(), &columns(XColumn::Numeric("x".into()))).unwrap();
        assert_eq!(obs.x, vec![1.0, 2.0, 3.0]);
        assert_eq!(obs.y, vec![2.0, 3.0, 4.0, 6.0, 6.0, 9.0]);
        assert_eq!(obs.origin, None);
        assert_eq!(obs.labels, ["cases".to_string(), "deaths".to_string()]);
    }

    #[test]
    fn dates_become_day_offsets() {
        let csv = "date,deaths,cases\n2020-03-30,1,10\n2020-04-01,2,40\n2020-04-04,4,90\n";
        let obs = read_observations(csv.as_bytes(), &columns(XColumn::Date("date".into()))).unwrap();
        assert_eq!(obs.x, vec![0.0, 2.0, 5.0]);
        assert_eq!(obs.y, vec![10.0, 1.0, 40.0, 2.0, 90.0, 4.0]);
        assert_eq!(obs.origin, NaiveDate::from_ymd_opt(2020, 3, 30));
    }

    #[test]
    fn bad_cells_name_their_line() {
        let csv = "x,cases,deaths\n1,2,3\n2,oops,6\n";
        let err = read_observations(csv.as_bytes(), &columns(XColumn::Numeric("x".into()))).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().starts_with("line 3: column 'cases'"), "{err}");

        let csv = "x,cases,deaths\n1,,3\n";
        let err = read_observations(csv.as_bytes(), &columns(XColumn::Numeric("x".into()))).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn missing_column_and_empty_file_are_errors() {
        let csv = "x,cases\n1,2\n";
        let err = read_observations(csv.as_bytes(), &columns(XColumn::Numeric("x".into()))).unwrap_err();
        assert!(err.to_string().contains("Missing column 'deaths'"));

        let csv = "x,cases,deaths\n";
        assert!(read_observations(csv.as_bytes(), &columns(XColumn::Numeric("x".into()))).is_err());
    }
}
