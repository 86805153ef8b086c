//! Error types for configuration, input shape and loading failures
//!
//! Breaches are not errors: hard interest shortfalls and balloon-cap bindings are
//! recorded on the period results and the simulation carries on.

use thiserror::Error;

/// Invalid loan terms, amortization parameters or covenant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("DSCR thresholds must satisfy 1.0 <= floor <= target <= accelerate (got floor={floor}, target={target}, accelerate={accelerate})")]
    DscrOrdering {
        floor: f64,
        target: f64,
        accelerate: f64,
    },

    #[error("max_deferral_pct must be in (0, 0.5], got {0}")]
    MaxDeferral(f64),

    #[error("deferral_rate must be >= 0, got {0}")]
    DeferralRate(f64),

    #[error("balloon_cap_pct must be > 0, got {0}")]
    BalloonCap(f64),

    #[error("balloon_year {balloon_year} must fall after the grace period ({grace_periods}) and within the tenor ({tenor_periods})")]
    BalloonYear {
        balloon_year: u32,
        grace_periods: u32,
        tenor_periods: u32,
    },

    #[error("principal must be > 0, got {0}")]
    Principal(f64),

    #[error("interest_rate must be finite and >= 0, got {0}")]
    InterestRate(f64),

    #[error("tenor_periods ({tenor_periods}) must exceed grace_periods ({grace_periods})")]
    Tenor {
        tenor_periods: u32,
        grace_periods: u32,
    },

    #[error("covenant must be finite and > 0, got {0}")]
    Covenant(f64),

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// CFADS input whose dimensions do not match the loan
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("CFADS path has {actual} periods, loan tenor is {expected}")]
    PathLength { expected: usize, actual: usize },

    #[error("scenario matrix has {actual} periods per row, loan tenor is {expected}")]
    ColumnCount { expected: usize, actual: usize },

    #[error("scenario row {row} has {actual} periods, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("scenario matrix is empty")]
    Empty,

    #[error("non-finite CFADS value at row {row}, period {period}")]
    NonFinite { row: usize, period: usize },
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum AmortizationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CFADS value {value:?} at row {row}, column {column}")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, AmortizationError>;
