//! Contingent amortization parameters

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Raw contingent amortization parameters, before validation
///
/// This is the shape read from deal config files. Missing fields take the
/// defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmortizationParams {
    /// Hard minimum DSCR preserved by deferring principal
    pub dscr_floor: f64,

    /// DSCR at which the full scheduled principal is paid
    pub dscr_target: f64,

    /// DSCR above which surplus cash retires deferred principal early
    pub dscr_accelerate: f64,

    /// Subordinated annual rate accruing on deferred principal
    pub deferral_rate: f64,

    /// Cap on cumulative deferral as a fraction of original principal
    pub max_deferral_pct: f64,

    /// Period at which the balloon falls due (defaults to the loan tenor)
    pub balloon_year: Option<u32>,

    /// Ceiling on the terminal balloon as a fraction of original principal
    pub balloon_cap_pct: Option<f64>,

    /// Whether high-DSCR periods sweep surplus cash into deferred principal
    pub catch_up_enabled: bool,
}

impl Default for AmortizationParams {
    fn default() -> Self {
        Self {
            dscr_floor: 1.25,
            dscr_target: 1.35,
            dscr_accelerate: 1.50,
            deferral_rate: 0.065,
            max_deferral_pct: 0.30,
            balloon_year: None,
            balloon_cap_pct: None,
            catch_up_enabled: true,
        }
    }
}

/// Validated, immutable contingent amortization parameters
///
/// Invariants hold for the lifetime of the value:
/// `1.0 <= dscr_floor <= dscr_target <= dscr_accelerate`,
/// `0 < max_deferral_pct <= 0.5`, `deferral_rate >= 0`, `balloon_cap_pct > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AmortizationParams")]
pub struct AmortizationConfig {
    dscr_floor: f64,
    dscr_target: f64,
    dscr_accelerate: f64,
    deferral_rate: f64,
    max_deferral_pct: f64,
    balloon_year: Option<u32>,
    balloon_cap_pct: Option<f64>,
    catch_up_enabled: bool,
}

impl AmortizationConfig {
    /// Validate parameters and build the config
    pub fn new(params: AmortizationParams) -> Result<Self, ConfigError> {
        finite("dscr_floor", params.dscr_floor)?;
        finite("dscr_target", params.dscr_target)?;
        finite("dscr_accelerate", params.dscr_accelerate)?;
        finite("deferral_rate", params.deferral_rate)?;
        finite("max_deferral_pct", params.max_deferral_pct)?;

        if !(1.0 <= params.dscr_floor
            && params.dscr_floor <= params.dscr_target
            && params.dscr_target <= params.dscr_accelerate)
        {
            return Err(ConfigError::DscrOrdering {
                floor: params.dscr_floor,
                target: params.dscr_target,
                accelerate: params.dscr_accelerate,
            });
        }

        if !(params.max_deferral_pct > 0.0 && params.max_deferral_pct <= 0.5) {
            return Err(ConfigError::MaxDeferral(params.max_deferral_pct));
        }

        if params.deferral_rate < 0.0 {
            return Err(ConfigError::DeferralRate(params.deferral_rate));
        }

        if let Some(cap) = params.balloon_cap_pct {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(ConfigError::BalloonCap(cap));
            }
        }

        // balloon_year is checked against the loan window in LoanTerms::balloon_period
        Ok(Self::from_params(params))
    }

    fn from_params(params: AmortizationParams) -> Self {
        Self {
            dscr_floor: params.dscr_floor,
            dscr_target: params.dscr_target,
            dscr_accelerate: params.dscr_accelerate,
            deferral_rate: params.deferral_rate,
            max_deferral_pct: params.max_deferral_pct,
            balloon_year: params.balloon_year,
            balloon_cap_pct: params.balloon_cap_pct,
            catch_up_enabled: params.catch_up_enabled,
        }
    }

    pub fn dscr_floor(&self) -> f64 {
        self.dscr_floor
    }

    pub fn dscr_target(&self) -> f64 {
        self.dscr_target
    }

    pub fn dscr_accelerate(&self) -> f64 {
        self.dscr_accelerate
    }

    pub fn deferral_rate(&self) -> f64 {
        self.deferral_rate
    }

    pub fn max_deferral_pct(&self) -> f64 {
        self.max_deferral_pct
    }

    pub fn balloon_year(&self) -> Option<u32> {
        self.balloon_year
    }

    pub fn balloon_cap_pct(&self) -> Option<f64> {
        self.balloon_cap_pct
    }

    pub fn catch_up_enabled(&self) -> bool {
        self.catch_up_enabled
    }
}

impl Default for AmortizationConfig {
    fn default() -> Self {
        Self::from_params(AmortizationParams::default())
    }
}

impl TryFrom<AmortizationParams> for AmortizationConfig {
    type Error = ConfigError;

    fn try_from(params: AmortizationParams) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}

pub(crate) fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AmortizationConfig::new(AmortizationParams::default()).unwrap();
        assert_eq!(config, AmortizationConfig::default());
        assert!(config.catch_up_enabled());
    }

    #[test]
    fn test_floor_above_target_rejected() {
        let params = AmortizationParams {
            dscr_floor: 1.40,
            dscr_target: 1.30,
            ..Default::default()
        };
        assert!(matches!(
            AmortizationConfig::new(params),
            Err(ConfigError::DscrOrdering { .. })
        ));
    }

    #[test]
    fn test_floor_below_one_rejected() {
        let params = AmortizationParams {
            dscr_floor: 0.95,
            ..Default::default()
        };
        assert!(AmortizationConfig::new(params).is_err());
    }

    #[test]
    fn test_target_above_accelerate_rejected() {
        let params = AmortizationParams {
            dscr_target: 1.60,
            dscr_accelerate: 1.50,
            ..Default::default()
        };
        assert!(matches!(
            AmortizationConfig::new(params),
            Err(ConfigError::DscrOrdering { .. })
        ));
    }

    #[test]
    fn test_equal_thresholds_allowed() {
        let params = AmortizationParams {
            dscr_floor: 1.0,
            dscr_target: 1.0,
            dscr_accelerate: 1.0,
            ..Default::default()
        };
        assert!(AmortizationConfig::new(params).is_ok());
    }

    #[test]
    fn test_max_deferral_bounds() {
        for pct in [0.0, -0.1, 0.51] {
            let params = AmortizationParams {
                max_deferral_pct: pct,
                ..Default::default()
            };
            assert_eq!(
                AmortizationConfig::new(params),
                Err(ConfigError::MaxDeferral(pct))
            );
        }

        let params = AmortizationParams {
            max_deferral_pct: 0.5,
            ..Default::default()
        };
        assert!(AmortizationConfig::new(params).is_ok());
    }

    #[test]
    fn test_negative_deferral_rate_rejected() {
        let params = AmortizationParams {
            deferral_rate: -0.01,
            ..Default::default()
        };
        assert_eq!(
            AmortizationConfig::new(params),
            Err(ConfigError::DeferralRate(-0.01))
        );
    }

    #[test]
    fn test_balloon_cap_must_be_positive() {
        let params = AmortizationParams {
            balloon_cap_pct: Some(0.0),
            ..Default::default()
        };
        assert_eq!(
            AmortizationConfig::new(params),
            Err(ConfigError::BalloonCap(0.0))
        );
    }

    #[test]
    fn test_nan_rejected() {
        let params = AmortizationParams {
            dscr_floor: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            AmortizationConfig::new(params),
            Err(ConfigError::NonFinite { field: "dscr_floor", .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: AmortizationConfig =
            serde_json::from_str(r#"{"dscr_floor": 1.3, "dscr_target": 1.4}"#).unwrap();
        assert_eq!(ok.dscr_floor(), 1.3);
        assert_eq!(ok.dscr_accelerate(), 1.50);

        let bad = serde_json::from_str::<AmortizationConfig>(r#"{"dscr_floor": 1.6}"#);
        assert!(bad.is_err());
    }
}
