//! Deal configuration file loading
//!
//! A deal file is JSON with a `loan` section, an optional `amortization`
//! section and an optional `covenant`:
//!
//! ```json
//! {
//!   "loan": { "principal": 50000000, "interest_rate": 0.055, "tenor_periods": 15, "grace_periods": 4 },
//!   "amortization": { "dscr_floor": 1.25, "max_deferral_pct": 0.30 },
//!   "covenant": 1.20
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{validate_covenant, AmortizationConfig, LoanTerms};
use crate::error::Result;

/// Default DSCR covenant used when a deal file does not set one
pub const DEFAULT_COVENANT: f64 = 1.20;

fn default_covenant() -> f64 {
    DEFAULT_COVENANT
}

/// Loan terms, contingent parameters and covenant for one deal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealConfig {
    pub loan: LoanTerms,

    #[serde(default)]
    pub amortization: AmortizationConfig,

    #[serde(default = "default_covenant")]
    pub covenant: f64,
}

impl DealConfig {
    /// Parse and validate a deal from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let deal: DealConfig = serde_json::from_str(json)?;
        deal.validate()?;
        Ok(deal)
    }

    /// Load and validate a deal file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let deal = Self::from_json_str(&json)?;
        log::info!(
            "Loaded deal from {}: principal={:.0}, rate={:.4}, tenor={}, grace={}",
            path.display(),
            deal.loan.principal(),
            deal.loan.interest_rate(),
            deal.loan.tenor_periods(),
            deal.loan.grace_periods(),
        );
        Ok(deal)
    }

    /// Cross-section checks that the per-section validation cannot see
    pub fn validate(&self) -> Result<()> {
        validate_covenant(self.covenant)?;
        self.loan.balloon_period(&self.amortization)?;
        Ok(())
    }
}
