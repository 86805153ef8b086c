//! Side-by-side simulation of both structures over shared CFADS paths

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::statistics::PortfolioStatistics;
use crate::amortization::{
    ContingentAmortizationEngine, PathSimulationResult, TraditionalAmortizationEngine,
};
use crate::error::{ConfigError, Result, ShapeError};
use crate::scenario::ScenarioMatrix;
use crate::terms::{validate_covenant, AmortizationConfig, LoanTerms};

/// Both structures run on the same CFADS path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureComparisonResult {
    /// Scenario row the path came from
    pub path_index: usize,

    pub traditional: PathSimulationResult,
    pub contingent: PathSimulationResult,

    /// Contingent minus traditional minimum DSCR
    pub dscr_improvement: f64,
    /// Traditional breached and contingent did not
    pub breach_avoided: bool,
    /// Contingent minus traditional final balloon
    pub additional_balloon: f64,
    /// Contingent minus traditional total interest paid
    pub additional_interest: f64,
}

impl StructureComparisonResult {
    pub fn new(
        path_index: usize,
        traditional: PathSimulationResult,
        contingent: PathSimulationResult,
    ) -> Self {
        let dscr_improvement = if contingent.min_dscr == traditional.min_dscr {
            0.0
        } else {
            contingent.min_dscr - traditional.min_dscr
        };

        Self {
            path_index,
            dscr_improvement,
            breach_avoided: traditional.breach_occurred && !contingent.breach_occurred,
            additional_balloon: contingent.final_balloon - traditional.final_balloon,
            additional_interest: contingent.total_interest_paid - traditional.total_interest_paid,
            traditional,
            contingent,
        }
    }
}

/// Runs the traditional and contingent engines over identical CFADS input
///
/// Engines hold no per-path state, so Monte Carlo rows are evaluated in
/// parallel against the same comparator.
#[derive(Debug, Clone)]
pub struct DualStructureComparator {
    traditional: TraditionalAmortizationEngine,
    contingent: ContingentAmortizationEngine,
    keep_paths: bool,
}

impl DualStructureComparator {
    pub fn new(terms: LoanTerms, config: AmortizationConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            traditional: TraditionalAmortizationEngine::new(terms.clone()),
            contingent: ContingentAmortizationEngine::new(terms, config)?,
            keep_paths: false,
        })
    }

    /// Retain every per-path comparison in the Monte Carlo statistics
    pub fn with_path_results(mut self, keep: bool) -> Self {
        self.keep_paths = keep;
        self
    }

    pub fn traditional(&self) -> &TraditionalAmortizationEngine {
        &self.traditional
    }

    pub fn contingent(&self) -> &ContingentAmortizationEngine {
        &self.contingent
    }

    /// Compare both structures on one CFADS path
    pub fn compare_single_path(&self, cfads_path: &[f64], covenant: f64) -> Result<StructureComparisonResult> {
        self.compare_path(0, cfads_path, covenant)
    }

    fn compare_path(&self, path_index: usize, cfads_path: &[f64], covenant: f64) -> Result<StructureComparisonResult> {
        let traditional = self.traditional.simulate_path(cfads_path, covenant)?;
        let contingent = self.contingent.simulate_path(cfads_path, covenant)?;
        Ok(StructureComparisonResult::new(path_index, traditional, contingent))
    }

    /// Run both structures over every scenario row and reduce to portfolio statistics
    ///
    /// Rows run in parallel; results are gathered in row order and reduced
    /// sequentially, so identical input gives bit-identical statistics.
    pub fn run_monte_carlo_comparison(
        &self,
        scenarios: &ScenarioMatrix,
        covenant: f64,
    ) -> Result<PortfolioStatistics> {
        validate_covenant(covenant)?;

        let expected = self.traditional.terms().tenor_periods() as usize;
        if scenarios.n_periods() != expected {
            return Err(ShapeError::ColumnCount {
                expected,
                actual: scenarios.n_periods(),
            }
            .into());
        }

        let n = scenarios.n_simulations();
        log::info!(
            "Running Monte Carlo comparison: {} paths x {} periods, covenant {:.2}x",
            n,
            expected,
            covenant
        );
        let start = Instant::now();

        let comparisons = (0..n)
            .into_par_iter()
            .map(|i| self.compare_path(i, scenarios.row(i), covenant))
            .collect::<Result<Vec<_>>>()?;

        let stats = PortfolioStatistics::from_comparisons(comparisons, covenant, self.keep_paths);

        log::info!(
            "Monte Carlo comparison complete in {:?}: breach probability {:.1}% traditional, {:.1}% contingent",
            start.elapsed(),
            stats.traditional.breach_probability * 100.0,
            stats.contingent.breach_probability * 100.0
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::BreachType;
    use crate::error::AmortizationError;
    use crate::terms::AmortizationParams;
    use approx::assert_relative_eq;

    const PRINCIPAL: f64 = 50_000_000.0;

    fn comparator() -> DualStructureComparator {
        let terms = LoanTerms::new(PRINCIPAL, 0.055, 15, 4).unwrap();
        let config = AmortizationConfig::new(AmortizationParams {
            dscr_floor: 1.25,
            max_deferral_pct: 0.30,
            ..Default::default()
        })
        .unwrap();
        DualStructureComparator::new(terms, config).unwrap()
    }

    /// Deterministic pseudo-random CFADS rows (LCG), so tests need no RNG crate
    fn synthetic_scenarios(n: usize, seed: u64) -> ScenarioMatrix {
        uniform_scenarios(n, seed, 3_000_000.0, 12_000_000.0)
    }

    fn uniform_scenarios(n: usize, seed: u64, low: f64, high: f64) -> ScenarioMatrix {
        let mut x = seed;
        let mut next = move || {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (x >> 11) as f64 / (1u64 << 53) as f64
        };
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|_| (0..15).map(|_| low + (high - low) * next()).collect())
            .collect();
        ScenarioMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_depressed_year_five_end_to_end() {
        let mut path = vec![10_000_000.0; 15];
        path[4] = 6_000_000.0;

        let cmp = comparator().compare_single_path(&path, 1.20).unwrap();

        let t5 = &cmp.traditional.periods[4];
        assert_eq!(t5.breach_type, Some(BreachType::SoftCovenant));
        assert_eq!(cmp.traditional.breach_year, Some(5));
        assert_eq!(cmp.traditional.breach_type, Some(BreachType::SoftCovenant));

        let c5 = &cmp.contingent.periods[4];
        assert!(c5.principal_deferred > 0.0);
        assert!(!c5.is_breach);
        assert_eq!(c5.breach_type, None);

        assert!(cmp.contingent.min_dscr >= cmp.traditional.min_dscr);
        assert!(cmp.dscr_improvement > 0.0);
    }

    #[test]
    fn test_breach_avoided_flag() {
        let mut path = vec![10_000_000.0; 15];
        path[4] = 6_000_000.0;
        let cmp = comparator().compare_single_path(&path, 1.20).unwrap();

        if !cmp.contingent.breach_occurred {
            assert!(cmp.breach_avoided);
        }
        assert_relative_eq!(
            cmp.additional_balloon,
            cmp.contingent.final_balloon - cmp.traditional.final_balloon
        );
        assert!(cmp.additional_interest > 0.0);
    }

    #[test]
    fn test_zero_rate_negative_cfads_breaches_both() {
        let terms = LoanTerms::new(10_000_000.0, 0.0, 5, 1).unwrap();
        let cmp = DualStructureComparator::new(terms, AmortizationConfig::default()).unwrap();
        let path = [1_000_000.0, -1_000_000.0, 5_000_000.0, 5_000_000.0, 5_000_000.0];
        let result = cmp.compare_single_path(&path, 1.20).unwrap();

        assert_eq!(result.traditional.breach_type, Some(BreachType::HardInterest));
        assert_eq!(result.contingent.breach_type, Some(BreachType::HardInterest));
        assert!(!result.breach_avoided);
    }

    #[test]
    fn test_high_cfads_no_difference() {
        let path = vec![100_000_000.0; 15];
        let cmp = comparator().compare_single_path(&path, 1.20).unwrap();

        assert!(!cmp.traditional.breach_occurred);
        assert!(!cmp.contingent.breach_occurred);
        assert!(cmp.contingent.final_balloon < 1.0);
        assert!(cmp.contingent.total_deferred < 1.0);
        assert!(cmp.additional_balloon.abs() < 1.0);
    }

    #[test]
    fn test_contingent_min_dscr_never_worse() {
        let terms = LoanTerms::new(PRINCIPAL, 0.055, 15, 4).unwrap();
        let config = AmortizationConfig::new(AmortizationParams {
            max_deferral_pct: 0.50,
            ..Default::default()
        })
        .unwrap();
        let cmp = DualStructureComparator::new(terms, config).unwrap();
        let scenarios = uniform_scenarios(200, 7, 6_000_000.0, 14_000_000.0);

        let mut checked = 0;
        for row in scenarios.rows() {
            let result = cmp.compare_single_path(row, 1.20).unwrap();
            // Forced cap payments trade DSCR for the deferral limit
            if result.contingent.periods.iter().any(|p| p.deferral_cap_binding) {
                continue;
            }
            checked += 1;
            assert!(
                result.contingent.min_dscr >= result.traditional.min_dscr - 1e-9,
                "contingent {} < traditional {}",
                result.contingent.min_dscr,
                result.traditional.min_dscr
            );
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_monte_carlo_is_deterministic() {
        let cmp = comparator();
        let scenarios = synthetic_scenarios(500, 42);

        let first = cmp.run_monte_carlo_comparison(&scenarios, 1.20).unwrap();
        let second = cmp.run_monte_carlo_comparison(&scenarios, 1.20).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.traditional.breach_probability.to_bits(),
            second.traditional.breach_probability.to_bits()
        );
        assert_eq!(
            first.contingent.dscr_percentiles.p50.to_bits(),
            second.contingent.dscr_percentiles.p50.to_bits()
        );
    }

    #[test]
    fn test_monte_carlo_statistics() {
        let cmp = comparator().with_path_results(true);
        let scenarios = synthetic_scenarios(300, 3);
        let stats = cmp.run_monte_carlo_comparison(&scenarios, 1.20).unwrap();

        assert_eq!(stats.n_simulations, 300);
        assert!(stats.traditional.breach_probability > 0.0);
        assert!(stats.contingent.breach_probability <= stats.traditional.breach_probability);
        assert_relative_eq!(
            stats.breach_probability_reduction,
            stats.traditional.breach_probability - stats.contingent.breach_probability
        );

        let p = &stats.contingent.dscr_percentiles;
        assert!(p.p5 <= p.p25 && p.p25 <= p.p50 && p.p50 <= p.p75 && p.p75 <= p.p95);
        assert!(stats.max_additional_balloon >= stats.avg_additional_balloon);
        assert_eq!(
            stats.traditional.is_bankable,
            stats.traditional.breach_probability < 0.20
        );
        assert!(stats.key_finding.contains("1.20x"));

        let paths = stats.paths.as_ref().unwrap();
        assert_eq!(paths.len(), 300);
        assert!(paths.iter().enumerate().all(|(i, p)| p.path_index == i));
        assert_eq!(
            stats.breaches_avoided,
            paths.iter().filter(|p| p.breach_avoided).count()
        );
    }

    #[test]
    fn test_all_strong_paths_bankable() {
        let scenarios = ScenarioMatrix::repeated(&[100_000_000.0; 15], 20).unwrap();
        let stats = comparator().run_monte_carlo_comparison(&scenarios, 1.20).unwrap();

        assert_eq!(stats.traditional.breach_count, 0);
        assert_eq!(stats.contingent.breach_count, 0);
        assert!(stats.traditional.is_bankable && stats.contingent.is_bankable);
        assert_eq!(stats.relative_breach_reduction, 0.0);
        assert!(stats.key_finding.starts_with("Neither structure breached"));
        assert!(stats.paths.is_none());
    }

    #[test]
    fn test_column_mismatch_rejected() {
        let scenarios = ScenarioMatrix::repeated(&[1.0; 12], 3).unwrap();
        let err = comparator().run_monte_carlo_comparison(&scenarios, 1.20).unwrap_err();
        assert!(matches!(
            err,
            AmortizationError::Shape(ShapeError::ColumnCount { expected: 15, actual: 12 })
        ));
    }

    #[test]
    fn test_invalid_covenant_rejected() {
        let scenarios = ScenarioMatrix::repeated(&[1.0; 15], 1).unwrap();
        let err = comparator().run_monte_carlo_comparison(&scenarios, 0.0).unwrap_err();
        assert!(matches!(err, AmortizationError::Config(ConfigError::Covenant(_))));
    }

    #[test]
    fn test_statistics_serialize_with_stable_names() {
        let scenarios = synthetic_scenarios(10, 1);
        let stats = comparator().run_monte_carlo_comparison(&scenarios, 1.20).unwrap();
        let json = serde_json::to_value(&stats).unwrap();

        for key in [
            "n_simulations",
            "breach_probability_reduction",
            "relative_breach_reduction",
            "avg_additional_balloon",
            "max_additional_balloon",
            "key_finding",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json["traditional"]["dscr_percentiles"].get("p95").is_some());
        assert!(json["contingent"].get("is_bankable").is_some());
    }
}
