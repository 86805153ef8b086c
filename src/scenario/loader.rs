//! Load CFADS scenario matrices from CSV
//!
//! One row per simulated path, one column per period. A header row is optional;
//! blank lines are skipped.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::ScenarioMatrix;
use crate::error::{AmortizationError, Result};

/// Read a scenario matrix from any CSV source
pub fn read_scenarios<R: Read>(reader: R, has_headers: bool) -> Result<ScenarioMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let row = record
            .iter()
            .enumerate()
            .map(|(column, field)| {
                field.parse::<f64>().map_err(|_| AmortizationError::Parse {
                    row: row_idx,
                    column,
                    value: field.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        rows.push(row);
    }

    Ok(ScenarioMatrix::from_rows(&rows)?)
}

/// Load a scenario matrix from a CSV file
pub fn load_scenarios(path: &Path, has_headers: bool) -> Result<ScenarioMatrix> {
    let file = File::open(path)?;
    let matrix = read_scenarios(file, has_headers)?;
    log::info!(
        "Loaded {} CFADS paths x {} periods from {}",
        matrix.n_simulations(),
        matrix.n_periods(),
        path.display()
    );
    Ok(matrix)
}
