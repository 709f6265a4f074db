//! Exports: fit reports (JSON) and observation tables (CSV).

use std::fs::File;
use std::path::Path;

use crate::domain::{FitReport, Observations};
use crate::error::AppError;

/// Write a fit report as pretty-printed JSON.
pub fn write_report_json(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a fit report written by `write_report_json`.
pub fn read_report_json(path: &Path) -> Result<FitReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))
}

/// Write observations as `x,<label0>,<label1>` CSV.
pub fn write_observations_csv(path: &Path, obs: &Observations) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    write_observations(&mut wtr, obs)?;
    wtr.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))
}

/// Write observations to any CSV writer.
pub fn write_observations<W: std::io::Write>(wtr: &mut csv::Writer<W>, obs: &Observations) -> Result<(), AppError> {
    wtr.write_record(["x", obs.labels[0].as_str(), obs.labels[1].as_str()])
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;
    for (i, xi) in obs.x.iter().enumerate() {
        wtr.write_record([
            xi.to_string(),
            obs.y[2 * i].to_string(),
            obs.y[2 * i + 1].to_string(),
        ])
        .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    Ok(())
}
