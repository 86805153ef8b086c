//! Monte Carlo reductions over per-path comparison results

use serde::{Deserialize, Serialize};

use super::comparator::StructureComparisonResult;
use crate::amortization::{BreachType, PathSimulationResult};

/// A structure is bankable when its simulated breach probability is below this
pub const BANKABILITY_THRESHOLD: f64 = 0.20;

/// Percentile from a **sorted** slice using linear interpolation
///
/// `p` is in percent. Infinite values are allowed (paths with no debt service).
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper || sorted[lower] == sorted[upper] {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * frac
    }
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Percentile band of path minimum DSCR
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DscrPercentiles {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

impl DscrPercentiles {
    pub fn from_values(values: Vec<f64>) -> Self {
        let s = sorted(values);
        Self {
            p5: percentile_sorted(&s, 5.0),
            p25: percentile_sorted(&s, 25.0),
            p50: percentile_sorted(&s, 50.0),
            p75: percentile_sorted(&s, 75.0),
            p95: percentile_sorted(&s, 95.0),
        }
    }
}

/// Distribution of terminal balloon sizes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalloonStatistics {
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
}

impl BalloonStatistics {
    pub fn from_values(values: Vec<f64>) -> Self {
        let n = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / n;
        let s = sorted(values);
        Self {
            mean,
            p50: percentile_sorted(&s, 50.0),
            p95: percentile_sorted(&s, 95.0),
            max: s.last().copied().unwrap_or(0.0),
        }
    }
}

/// Monte Carlo statistics for one amortization structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureStatistics {
    pub breach_probability: f64,
    pub breach_count: usize,
    pub hard_interest_breaches: usize,
    pub soft_covenant_breaches: usize,
    pub balloon_cap_breaches: usize,
    pub dscr_percentiles: DscrPercentiles,
    /// Mean of finite path minimum DSCRs
    pub mean_min_dscr: f64,
    pub balloon: BalloonStatistics,
    pub mean_total_interest: f64,
    pub mean_total_deferred: f64,
    pub is_bankable: bool,
}

impl StructureStatistics {
    pub fn from_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a PathSimulationResult>,
    {
        let mut n = 0usize;
        let mut breach_count = 0usize;
        let mut hard = 0usize;
        let mut soft = 0usize;
        let mut balloon_cap = 0usize;
        let mut min_dscrs = Vec::new();
        let mut balloons = Vec::new();
        let mut total_interest = 0.0;
        let mut total_deferred = 0.0;

        for path in paths {
            n += 1;
            if path.breach_occurred {
                breach_count += 1;
            }
            match path.breach_type {
                Some(BreachType::HardInterest) => hard += 1,
                Some(BreachType::SoftCovenant) => soft += 1,
                Some(BreachType::BalloonCapBinding) => balloon_cap += 1,
                None => {}
            }
            min_dscrs.push(path.min_dscr);
            balloons.push(path.final_balloon);
            total_interest += path.total_interest_paid;
            total_deferred += path.total_deferred;
        }

        let denom = n.max(1) as f64;
        let finite: Vec<f64> = min_dscrs.iter().copied().filter(|v| v.is_finite()).collect();
        let mean_min_dscr = if finite.is_empty() {
            f64::INFINITY
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        };
        let breach_probability = breach_count as f64 / denom;

        Self {
            breach_probability,
            breach_count,
            hard_interest_breaches: hard,
            soft_covenant_breaches: soft,
            balloon_cap_breaches: balloon_cap,
            dscr_percentiles: DscrPercentiles::from_values(min_dscrs),
            mean_min_dscr,
            balloon: BalloonStatistics::from_values(balloons),
            mean_total_interest: total_interest / denom,
            mean_total_deferred: total_deferred / denom,
            is_bankable: breach_probability < BANKABILITY_THRESHOLD,
        }
    }
}

/// Portfolio-level comparison of the two structures over all simulated paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStatistics {
    pub n_simulations: usize,
    pub covenant: f64,

    pub traditional: StructureStatistics,
    pub contingent: StructureStatistics,

    /// Paths where the traditional structure breached and the contingent one did not
    pub breaches_avoided: usize,
    pub avg_additional_balloon: f64,
    pub max_additional_balloon: f64,
    pub avg_dscr_improvement: f64,

    /// Traditional minus contingent breach probability
    pub breach_probability_reduction: f64,
    /// Reduction relative to the traditional breach probability
    pub relative_breach_reduction: f64,

    pub key_finding: String,

    /// Per-path comparisons, in scenario row order, when retained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<StructureComparisonResult>>,
}

impl PortfolioStatistics {
    /// Reduce per-path comparisons (in row order) into portfolio statistics
    pub fn from_comparisons(
        comparisons: Vec<StructureComparisonResult>,
        covenant: f64,
        keep_paths: bool,
    ) -> Self {
        let n = comparisons.len();
        let denom = n.max(1) as f64;

        let traditional = StructureStatistics::from_paths(comparisons.iter().map(|c| &c.traditional));
        let contingent = StructureStatistics::from_paths(comparisons.iter().map(|c| &c.contingent));

        let breaches_avoided = comparisons.iter().filter(|c| c.breach_avoided).count();
        let avg_additional_balloon =
            comparisons.iter().map(|c| c.additional_balloon).sum::<f64>() / denom;
        let max_additional_balloon = if n == 0 {
            0.0
        } else {
            comparisons
                .iter()
                .map(|c| c.additional_balloon)
                .fold(f64::NEG_INFINITY, f64::max)
        };

        let finite_improvements: Vec<f64> = comparisons
            .iter()
            .map(|c| c.dscr_improvement)
            .filter(|v| v.is_finite())
            .collect();
        let avg_dscr_improvement = if finite_improvements.is_empty() {
            0.0
        } else {
            finite_improvements.iter().sum::<f64>() / finite_improvements.len() as f64
        };

        let breach_probability_reduction =
            traditional.breach_probability - contingent.breach_probability;
        let relative_breach_reduction = if traditional.breach_probability > 0.0 {
            breach_probability_reduction / traditional.breach_probability
        } else {
            0.0
        };

        let key_finding = key_finding(
            &traditional,
            &contingent,
            covenant,
            n,
            relative_breach_reduction,
            avg_additional_balloon,
        );

        Self {
            n_simulations: n,
            covenant,
            traditional,
            contingent,
            breaches_avoided,
            avg_additional_balloon,
            max_additional_balloon,
            avg_dscr_improvement,
            breach_probability_reduction,
            relative_breach_reduction,
            key_finding,
            paths: keep_paths.then_some(comparisons),
        }
    }
}

/// Format a currency amount in millions
pub fn format_millions(amount: f64) -> String {
    format!("${:.2}M", amount / 1_000_000.0)
}

fn bankable_word(stats: &StructureStatistics) -> &'static str {
    if stats.is_bankable {
        "bankable"
    } else {
        "not bankable"
    }
}

/// One-paragraph summary templated from the computed statistics
fn key_finding(
    traditional: &StructureStatistics,
    contingent: &StructureStatistics,
    covenant: f64,
    n_simulations: usize,
    relative_reduction: f64,
    avg_additional_balloon: f64,
) -> String {
    let t = traditional.breach_probability * 100.0;
    let c = contingent.breach_probability * 100.0;

    let headline = if traditional.breach_count == 0 && contingent.breach_count == 0 {
        format!(
            "Neither structure breached the {:.2}x covenant across {} simulated paths.",
            covenant, n_simulations
        )
    } else if contingent.breach_probability < traditional.breach_probability {
        format!(
            "Contingent amortization reduces breach probability from {:.1}% to {:.1}% ({:.0}% relative reduction) at a {:.2}x covenant, with an average additional balloon of {}.",
            t,
            c,
            relative_reduction * 100.0,
            covenant,
            format_millions(avg_additional_balloon)
        )
    } else {
        format!(
            "Contingent amortization does not reduce breach probability at a {:.2}x covenant ({:.1}% traditional vs {:.1}% contingent).",
            covenant, t, c
        )
    };

    format!(
        "{} Traditional structure is {}; contingent structure is {} (threshold {:.0}% breach probability).",
        headline,
        bankable_word(traditional),
        bankable_word(contingent),
        BANKABILITY_THRESHOLD * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::Structure;
    use approx::assert_relative_eq;

    fn path(min_dscr: f64, breach: Option<BreachType>, balloon: f64) -> PathSimulationResult {
        let mut p = PathSimulationResult::new(Structure::Contingent);
        p.min_dscr = min_dscr;
        p.breach_occurred = breach.is_some();
        p.breach_type = breach;
        p.final_balloon = balloon;
        p
    }

    #[test]
    fn test_percentile_interpolation() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&s, 50.0), 3.0);
        assert_eq!(percentile_sorted(&s, 0.0), 1.0);
        assert_eq!(percentile_sorted(&s, 100.0), 5.0);
        assert_relative_eq!(percentile_sorted(&s, 25.0), 2.0);
        assert_relative_eq!(percentile_sorted(&s, 5.0), 1.2);
        assert_eq!(percentile_sorted(&[7.0], 95.0), 7.0);
    }

    #[test]
    fn test_percentile_with_infinite_values() {
        let s = [1.0, f64::INFINITY, f64::INFINITY];
        assert_eq!(percentile_sorted(&s, 95.0), f64::INFINITY);
        assert_eq!(percentile_sorted(&s, 0.0), 1.0);
        assert!(!percentile_sorted(&s, 75.0).is_nan());
    }

    #[test]
    fn test_structure_statistics() {
        let paths = vec![
            path(0.8, Some(BreachType::SoftCovenant), 0.0),
            path(0.5, Some(BreachType::HardInterest), 0.0),
            path(1.5, None, 2_000_000.0),
            path(1.6, None, 0.0),
            path(f64::INFINITY, None, 0.0),
        ];
        let stats = StructureStatistics::from_paths(&paths);

        assert_eq!(stats.breach_count, 2);
        assert_relative_eq!(stats.breach_probability, 0.4);
        assert_eq!(stats.hard_interest_breaches, 1);
        assert_eq!(stats.soft_covenant_breaches, 1);
        assert!(!stats.is_bankable);
        assert_eq!(stats.dscr_percentiles.p50, 1.5);
        assert_relative_eq!(stats.mean_min_dscr, (0.8 + 0.5 + 1.5 + 1.6) / 4.0);
        assert_relative_eq!(stats.balloon.mean, 400_000.0);
        assert_eq!(stats.balloon.max, 2_000_000.0);
    }

    #[test]
    fn test_bankability_threshold_is_strict() {
        let mut paths: Vec<_> = (0..4).map(|_| path(1.5, None, 0.0)).collect();
        paths.push(path(0.9, Some(BreachType::SoftCovenant), 0.0));
        let stats = StructureStatistics::from_paths(&paths);
        assert_relative_eq!(stats.breach_probability, 0.2);
        assert!(!stats.is_bankable);
    }

    #[test]
    fn test_format_millions() {
        assert_eq!(format_millions(2_345_678.0), "$2.35M");
    }
}
