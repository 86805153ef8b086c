//! Loan terms shared by both amortization structures

use serde::{Deserialize, Serialize};

use super::config::{finite, AmortizationConfig};
use crate::error::ConfigError;

/// Raw loan terms as read from a deal config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTermsInput {
    pub principal: f64,
    pub interest_rate: f64,
    pub tenor_periods: u32,
    #[serde(default)]
    pub grace_periods: u32,
}

/// Validated loan terms
///
/// The scheduled principal per amortizing period is derived once at
/// construction: `principal / (tenor_periods - grace_periods)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LoanTermsInput")]
pub struct LoanTerms {
    principal: f64,
    interest_rate: f64,
    tenor_periods: u32,
    grace_periods: u32,
    scheduled_principal_per_period: f64,
}

impl LoanTerms {
    pub fn new(
        principal: f64,
        interest_rate: f64,
        tenor_periods: u32,
        grace_periods: u32,
    ) -> Result<Self, ConfigError> {
        if !(principal.is_finite() && principal > 0.0) {
            return Err(ConfigError::Principal(principal));
        }
        if !(interest_rate.is_finite() && interest_rate >= 0.0) {
            return Err(ConfigError::InterestRate(interest_rate));
        }
        if tenor_periods <= grace_periods {
            return Err(ConfigError::Tenor {
                tenor_periods,
                grace_periods,
            });
        }

        let amortizing_periods = (tenor_periods - grace_periods) as f64;

        Ok(Self {
            principal,
            interest_rate,
            tenor_periods,
            grace_periods,
            scheduled_principal_per_period: principal / amortizing_periods,
        })
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn interest_rate(&self) -> f64 {
        self.interest_rate
    }

    pub fn tenor_periods(&self) -> u32 {
        self.tenor_periods
    }

    pub fn grace_periods(&self) -> u32 {
        self.grace_periods
    }

    pub fn scheduled_principal_per_period(&self) -> f64 {
        self.scheduled_principal_per_period
    }

    /// Number of periods in which principal amortizes
    pub fn amortizing_periods(&self) -> u32 {
        self.tenor_periods - self.grace_periods
    }

    /// Whether a 1-indexed period falls inside the grace window
    pub fn is_grace(&self, period: u32) -> bool {
        period <= self.grace_periods
    }

    /// Period at which the balloon falls due under `config`
    ///
    /// Must lie after the grace window and no later than the tenor.
    pub fn balloon_period(&self, config: &AmortizationConfig) -> Result<u32, ConfigError> {
        match config.balloon_year() {
            None => Ok(self.tenor_periods),
            Some(year) if year > self.grace_periods && year <= self.tenor_periods => Ok(year),
            Some(year) => Err(ConfigError::BalloonYear {
                balloon_year: year,
                grace_periods: self.grace_periods,
                tenor_periods: self.tenor_periods,
            }),
        }
    }
}

impl TryFrom<LoanTermsInput> for LoanTerms {
    type Error = ConfigError;

    fn try_from(input: LoanTermsInput) -> Result<Self, Self::Error> {
        Self::new(
            input.principal,
            input.interest_rate,
            input.tenor_periods,
            input.grace_periods,
        )
    }
}

/// Covenant thresholds must be finite and positive
pub fn validate_covenant(covenant: f64) -> Result<f64, ConfigError> {
    finite("covenant", covenant).map_err(|_| ConfigError::Covenant(covenant))?;
    if covenant <= 0.0 {
        return Err(ConfigError::Covenant(covenant));
    }
    Ok(covenant)
}
