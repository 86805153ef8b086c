//! Per-path mutable loan state

use crate::terms::LoanTerms;

/// Absolute tolerance for "effectively zero" comparisons
pub const EPSILON: f64 = 1e-6;

/// State of one loan while a single CFADS path is simulated
///
/// Created fresh for every path and owned by that simulation only, so engines
/// themselves stay immutable and can be shared across worker threads.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    /// Outstanding principal (never negative, never increases)
    pub remaining_balance: f64,

    /// Principal deferred so far and not yet retired
    pub cumulative_deferred: f64,
}

impl EngineState {
    /// Initial state: full principal outstanding, nothing deferred
    pub fn new(terms: &LoanTerms) -> Self {
        Self {
            remaining_balance: terms.principal(),
            cumulative_deferred: 0.0,
        }
    }

    /// Subordinated interest accruing on deferred principal for one period
    pub fn deferred_interest_accrued(&self, deferral_rate: f64) -> f64 {
        self.cumulative_deferred * deferral_rate
    }

    /// Reduce the outstanding balance by a principal payment, flooring at zero
    pub fn pay_principal(&mut self, amount: f64) {
        self.remaining_balance = (self.remaining_balance - amount).max(0.0);
        if self.remaining_balance < EPSILON {
            self.remaining_balance = 0.0;
        }
    }

    /// Set cumulative deferral, clearing float dust
    pub fn set_deferred(&mut self, amount: f64) {
        self.cumulative_deferred = if amount < EPSILON { 0.0 } else { amount };
    }
}

/// `numerator / denominator`, or +inf when there is effectively nothing to cover
pub fn coverage_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < EPSILON {
        f64::INFINITY
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let terms = LoanTerms::new(1_000_000.0, 0.05, 10, 2).unwrap();
        let state = EngineState::new(&terms);
        assert_eq!(state.remaining_balance, 1_000_000.0);
        assert_eq!(state.cumulative_deferred, 0.0);
        assert_eq!(state.deferred_interest_accrued(0.08), 0.0);
    }

    #[test]
    fn test_balance_floors_at_zero() {
        let terms = LoanTerms::new(100.0, 0.05, 10, 0).unwrap();
        let mut state = EngineState::new(&terms);
        state.pay_principal(150.0);
        assert_eq!(state.remaining_balance, 0.0);

        let mut state = EngineState::new(&terms);
        state.pay_principal(100.0 - 1e-9);
        assert_eq!(state.remaining_balance, 0.0);
    }

    #[test]
    fn test_coverage_ratio_infinite_without_service() {
        assert_eq!(coverage_ratio(10.0, 0.0), f64::INFINITY);
        assert_eq!(coverage_ratio(10.0, 5.0), 2.0);
    }
}
