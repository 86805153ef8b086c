//! Fixed-schedule amortization
//!
//! Principal amortizes straight-line after the grace period whatever the cash
//! flow. A period whose CFADS does not cover the schedule is a breach fact; the
//! schedule itself never adapts.

use super::results::{BreachType, PathSimulationResult, PaymentRegime, PeriodPaymentResult, Structure};
use super::state::{coverage_ratio, EngineState, EPSILON};
use crate::error::{Result, ShapeError};
use crate::terms::{validate_covenant, LoanTerms};

/// Traditional CFADS-independent amortization engine
#[derive(Debug, Clone)]
pub struct TraditionalAmortizationEngine {
    terms: LoanTerms,
}

impl TraditionalAmortizationEngine {
    pub fn new(terms: LoanTerms) -> Self {
        Self { terms }
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    /// Run the fixed schedule over one CFADS path
    pub fn simulate_path(&self, cfads_path: &[f64], covenant: f64) -> Result<PathSimulationResult> {
        validate_covenant(covenant)?;
        check_path(&self.terms, cfads_path)?;

        let mut result = PathSimulationResult::new(Structure::Traditional);
        let mut state = EngineState::new(&self.terms);

        for (idx, &cfads) in cfads_path.iter().enumerate() {
            let period = idx as u32 + 1;
            let row = self.calculate_period_payment(&mut state, period, cfads, covenant);
            result.add_period(row, self.terms.is_grace(period));
        }

        result.final_balloon = state.remaining_balance;
        Ok(result)
    }

    /// Compute one period of the fixed schedule and advance `state`
    pub fn calculate_period_payment(
        &self,
        state: &mut EngineState,
        period: u32,
        cfads: f64,
        covenant: f64,
    ) -> PeriodPaymentResult {
        let mut row = PeriodPaymentResult::new(period, cfads);

        let interest_due = state.remaining_balance * self.terms.interest_rate();
        row.interest_due = interest_due;
        row.interest_paid = interest_due;

        if self.terms.is_grace(period) {
            row.regime = PaymentRegime::Grace;
            row.realized_dscr = coverage_ratio(cfads, interest_due);
            row.effective_dscr = row.realized_dscr;
            row.remaining_balance = state.remaining_balance;
            return row;
        }

        let principal_due = self
            .terms
            .scheduled_principal_per_period()
            .min(state.remaining_balance);
        let total_service = interest_due + principal_due;

        row.scheduled_principal = principal_due;
        row.principal_paid = principal_due;
        row.funding_shortfall = (total_service - cfads.max(0.0)).max(0.0);
        row.realized_dscr = coverage_ratio(cfads, total_service);
        row.effective_dscr = row.realized_dscr;

        row.breach_type = if cfads + EPSILON < interest_due {
            row.regime = PaymentRegime::HardBreach;
            Some(BreachType::HardInterest)
        } else if row.realized_dscr + EPSILON < covenant {
            Some(BreachType::SoftCovenant)
        } else {
            None
        };
        row.is_breach = row.breach_type.is_some();

        // Nominal schedule: the balance falls whether or not cash covered it
        state.pay_principal(principal_due);
        row.remaining_balance = state.remaining_balance;

        row
    }
}

/// CFADS path must have exactly one finite value per tenor period
pub(crate) fn check_path(terms: &LoanTerms, cfads_path: &[f64]) -> std::result::Result<(), ShapeError> {
    let expected = terms.tenor_periods() as usize;
    if cfads_path.len() != expected {
        return Err(ShapeError::PathLength {
            expected,
            actual: cfads_path.len(),
        });
    }
    if let Some(idx) = cfads_path.iter().position(|v| !v.is_finite()) {
        return Err(ShapeError::NonFinite {
            row: 0,
            period: idx + 1,
        });
    }
    Ok(())
}
