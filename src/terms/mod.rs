//! Loan terms, contingent amortization parameters and deal configuration

mod config;
mod loan;
pub mod deal;

pub use config::{AmortizationConfig, AmortizationParams};
pub use loan::{validate_covenant, LoanTerms, LoanTermsInput};
pub use deal::{DealConfig, DEFAULT_COVENANT};
