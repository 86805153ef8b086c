//! DSCR-contingent amortization
//!
//! Each period the engine infers its regime from CFADS, interest due and the
//! DSCR floor, then runs the principal waterfall as ordered adjustment steps:
//!
//! 1. `principal_base` - scheduled principal bounded by cash, the DSCR floor and the balance
//! 2. `catch_up_payment` - half the surplus swept into deferred principal in strong periods
//! 3. `deferral_cap_payment` - forced payment keeping cumulative deferral at the cap
//! 4. `balloon_cap_paydown` - forced paydown keeping the projected balloon at the cap
//!
//! Later steps can partly undo earlier ones, so the order is fixed.

use super::results::{
    worst_breach, BreachType, PathSimulationResult, PaymentRegime, PeriodPaymentResult, Structure,
};
use super::state::{coverage_ratio, EngineState, EPSILON};
use super::traditional::check_path;
use crate::error::{ConfigError, Result};
use crate::terms::{validate_covenant, AmortizationConfig, LoanTerms};

/// Share of post-base surplus cash swept into deferred principal
pub const CATCH_UP_SHARE: f64 = 0.5;

/// Forced paydown sized by the balloon-cap projection
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BalloonCapAdjustment {
    /// Retires deferred principal (and the balance carrying it)
    pub deferred_paydown: f64,
    /// Retires scheduled balance
    pub balance_paydown: f64,
}

impl BalloonCapAdjustment {
    pub fn total(&self) -> f64 {
        self.deferred_paydown + self.balance_paydown
    }

    pub fn is_binding(&self) -> bool {
        self.total() > EPSILON
    }
}

/// Contingent amortization engine
///
/// Holds only read-only terms and parameters. Per-path state lives in an
/// [`EngineState`] created by [`simulate_path`](Self::simulate_path), so a single
/// engine can be shared by any number of worker threads.
#[derive(Debug, Clone)]
pub struct ContingentAmortizationEngine {
    terms: LoanTerms,
    config: AmortizationConfig,
    balloon_period: u32,
}

impl ContingentAmortizationEngine {
    /// Build an engine, checking the balloon year against the loan window
    pub fn new(terms: LoanTerms, config: AmortizationConfig) -> std::result::Result<Self, ConfigError> {
        let balloon_period = terms.balloon_period(&config)?;
        Ok(Self {
            terms,
            config,
            balloon_period,
        })
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    pub fn config(&self) -> &AmortizationConfig {
        &self.config
    }

    pub fn balloon_period(&self) -> u32 {
        self.balloon_period
    }

    /// Ceiling on cumulative deferred principal
    pub fn max_deferral(&self) -> f64 {
        self.terms.principal() * self.config.max_deferral_pct()
    }

    /// Ceiling on the terminal balloon, if configured
    pub fn balloon_cap(&self) -> Option<f64> {
        self.config
            .balloon_cap_pct()
            .map(|pct| self.terms.principal() * pct)
    }

    /// Run one CFADS path from a fresh state
    pub fn simulate_path(&self, cfads_path: &[f64], covenant: f64) -> Result<PathSimulationResult> {
        validate_covenant(covenant)?;
        check_path(&self.terms, cfads_path)?;

        let mut result = PathSimulationResult::new(Structure::Contingent);
        let mut state = EngineState::new(&self.terms);

        for (idx, &cfads) in cfads_path.iter().enumerate() {
            let period = idx as u32 + 1;
            let row = self.calculate_period_payment(&mut state, period, cfads, covenant);
            result.add_period(row, self.terms.is_grace(period));
        }

        result.final_balloon = self.final_balloon(&state);

        if let Some(kind) = result.breach_type {
            log::debug!(
                "Contingent path breach: {} in period {:?}, min DSCR {:.3}, balloon {:.0}",
                kind,
                result.breach_year,
                result.min_dscr,
                result.final_balloon
            );
        }

        Ok(result)
    }

    /// Terminal balloon: balance plus deferred principal with one period of
    /// deferral interest, clamped to the cap when one is configured
    pub fn final_balloon(&self, state: &EngineState) -> f64 {
        let balloon = state.remaining_balance
            + state.cumulative_deferred * (1.0 + self.config.deferral_rate());
        match self.balloon_cap() {
            Some(cap) => balloon.min(cap),
            None => balloon,
        }
    }

    /// Compute one period and advance `state`
    pub fn calculate_period_payment(
        &self,
        state: &mut EngineState,
        period: u32,
        cfads: f64,
        covenant: f64,
    ) -> PeriodPaymentResult {
        let mut row = PeriodPaymentResult::new(period, cfads);

        // Deferred principal accrues subordinated interest on top of senior interest
        let interest_due = state.remaining_balance * self.terms.interest_rate()
            + state.deferred_interest_accrued(self.config.deferral_rate());
        row.interest_due = interest_due;

        if self.terms.is_grace(period) {
            self.grace_period(state, &mut row);
        } else if cfads + EPSILON < interest_due {
            self.hard_breach_period(state, &mut row);
        } else {
            self.amortizing_period(state, &mut row, covenant);
        }

        row.cumulative_deferred = state.cumulative_deferred;
        row.deferred_interest_accrued = state.deferred_interest_accrued(self.config.deferral_rate());
        row.remaining_balance = state.remaining_balance;
        row
    }

    /// Construction financing: interest is backstopped, nothing amortizes
    fn grace_period(&self, _state: &EngineState, row: &mut PeriodPaymentResult) {
        row.regime = PaymentRegime::Grace;
        row.interest_paid = row.interest_due;
        row.realized_dscr = coverage_ratio(row.cfads, row.interest_due);
        row.effective_dscr = row.realized_dscr;
    }

    /// CFADS below interest: pay what there is, defer the period's principal
    fn hard_breach_period(&self, state: &mut EngineState, row: &mut PeriodPaymentResult) {
        let scheduled = self.scheduled_due(state);
        let headroom = (self.max_deferral() - state.cumulative_deferred).max(0.0);
        let deferred = scheduled.min(headroom);

        row.regime = PaymentRegime::HardBreach;
        row.scheduled_principal = scheduled;
        row.interest_paid = row.cfads.max(0.0);
        row.principal_deferred = deferred;
        row.principal_shortfall = scheduled - deferred;
        row.deferral_cap_binding = row.principal_shortfall > EPSILON;

        // Interest is not fully serviced, so coverage is measured against interest due.
        // With no interest due (zero-rate loan, negative CFADS) fall back to the schedule.
        row.effective_dscr = coverage_ratio(row.cfads, row.interest_due + scheduled);
        row.realized_dscr = if row.interest_due > EPSILON {
            coverage_ratio(row.cfads, row.interest_due)
        } else {
            row.effective_dscr
        };
        row.breach_type = Some(BreachType::HardInterest);
        row.is_breach = true;

        state.set_deferred(state.cumulative_deferred + deferred);
    }

    /// Interest covered: run the principal waterfall
    fn amortizing_period(&self, state: &mut EngineState, row: &mut PeriodPaymentResult, covenant: f64) {
        let cfads = row.cfads;
        let interest_due = row.interest_due;
        let scheduled = self.scheduled_due(state);
        let remaining_cfads = cfads - interest_due;

        let (principal_base, floor_ceiling) =
            self.principal_base(cfads, interest_due, scheduled, state.remaining_balance);

        let catch_up = self.catch_up_payment(
            cfads,
            interest_due,
            state.cumulative_deferred,
            principal_base,
            floor_ceiling,
            state.remaining_balance,
        );

        let deferred_this_period = (scheduled - principal_base).max(0.0);
        let forced_deferral =
            self.deferral_cap_payment(state.cumulative_deferred, deferred_this_period, catch_up);
        let deferred_net = deferred_this_period - forced_deferral;

        state.set_deferred(state.cumulative_deferred + deferred_net - catch_up);
        state.pay_principal(principal_base + catch_up + forced_deferral);

        let balloon = self.balloon_cap_paydown(row.period, state.remaining_balance, state.cumulative_deferred);
        if balloon.is_binding() {
            state.set_deferred(state.cumulative_deferred - balloon.deferred_paydown);
            state.pay_principal(balloon.total());
        }

        let principal_paid = principal_base + catch_up + forced_deferral + balloon.total();
        let funding_shortfall = (principal_paid - remaining_cfads.max(0.0)).max(0.0);

        if balloon.is_binding() && funding_shortfall > EPSILON {
            // Balances are still reduced: the paydown is assumed funded outside the waterfall
            log::warn!(
                "Period {}: balloon-cap paydown of {:.0} exceeds available cash by {:.0}",
                row.period,
                balloon.total(),
                funding_shortfall
            );
        }

        row.regime = if catch_up > EPSILON {
            PaymentRegime::CatchUp
        } else if deferred_this_period > EPSILON {
            PaymentRegime::Constrained
        } else {
            PaymentRegime::Normal
        };

        row.interest_paid = interest_due;
        row.scheduled_principal = scheduled;
        row.principal_paid = principal_paid;
        row.principal_deferred = deferred_net;
        row.principal_catch_up = catch_up;
        row.forced_deferral_paydown = forced_deferral;
        row.forced_balloon_paydown = balloon.total();
        row.funding_shortfall = funding_shortfall;
        row.deferral_cap_binding = forced_deferral > EPSILON;

        row.realized_dscr = coverage_ratio(cfads, interest_due + principal_paid);
        row.effective_dscr = coverage_ratio(cfads, interest_due + scheduled);

        let soft = (row.realized_dscr + EPSILON < covenant).then_some(BreachType::SoftCovenant);
        let binding = balloon.is_binding().then_some(BreachType::BalloonCapBinding);
        row.breach_type = worst_breach(soft, binding);
        row.is_breach = row.breach_type.is_some();
    }

    /// Scheduled principal for the current period, never more than the balance
    fn scheduled_due(&self, state: &EngineState) -> f64 {
        self.terms
            .scheduled_principal_per_period()
            .min(state.remaining_balance)
    }

    /// Step 1: principal payable without breaching cash, floor or balance
    ///
    /// Returns `(principal_base, max_principal_for_floor)`.
    pub fn principal_base(&self, cfads: f64, interest_due: f64, scheduled: f64, balance: f64) -> (f64, f64) {
        let remaining_cfads = (cfads - interest_due).max(0.0);
        let floor_ceiling = (cfads / self.config.dscr_floor() - interest_due).max(0.0);
        let base = remaining_cfads.min(scheduled).min(floor_ceiling).min(balance);
        (base.max(0.0), floor_ceiling)
    }

    /// Step 2: catch-up on deferred principal when DSCR clears the accelerate threshold
    ///
    /// Sweeps [`CATCH_UP_SHARE`] of the surplus, bounded by the deferred balance
    /// and the outstanding balance. The sweep is also held under the DSCR floor
    /// ceiling so a catch-up period can never itself fall below the floor.
    pub fn catch_up_payment(
        &self,
        cfads: f64,
        interest_due: f64,
        cumulative_deferred: f64,
        principal_base: f64,
        floor_ceiling: f64,
        balance: f64,
    ) -> f64 {
        if !self.config.catch_up_enabled() || cumulative_deferred <= EPSILON {
            return 0.0;
        }

        let dscr_before = coverage_ratio(cfads, interest_due + principal_base);
        if dscr_before <= self.config.dscr_accelerate() {
            return 0.0;
        }

        let surplus = (cfads - interest_due - principal_base).max(0.0);
        (CATCH_UP_SHARE * surplus)
            .min(cumulative_deferred)
            .min((floor_ceiling - principal_base).max(0.0))
            .min((balance - principal_base).max(0.0))
    }

    /// Step 3: payment needed to hold cumulative deferral at the cap
    pub fn deferral_cap_payment(&self, cumulative_deferred: f64, deferred_this_period: f64, catch_up: f64) -> f64 {
        let projected = cumulative_deferred + deferred_this_period - catch_up;
        let excess = projected - self.max_deferral();
        if excess > EPSILON {
            // Only this period's new deferral can be converted into payment
            excess.min(deferred_this_period)
        } else {
            0.0
        }
    }

    /// Projected balloon at the balloon period after straight-line amortization
    /// of the balance and compounding of deferred principal
    pub fn projected_balloon(&self, period: u32, balance: f64, cumulative_deferred: f64) -> f64 {
        let remaining = self.balloon_period.saturating_sub(period);
        let growth = (1.0 + self.config.deferral_rate()).powi(remaining as i32);
        let amortizable = self.terms.scheduled_principal_per_period() * remaining as f64;
        (balance - amortizable).max(0.0) + cumulative_deferred * growth
    }

    /// Step 4: paydown bringing the projected balloon back to the cap
    ///
    /// Deferred principal is retired first, then balance. Paying deferred
    /// principal also lowers the balance carrying it, so both effects are
    /// counted when sizing.
    pub fn balloon_cap_paydown(&self, period: u32, balance: f64, cumulative_deferred: f64) -> BalloonCapAdjustment {
        let Some(cap) = self.balloon_cap() else {
            return BalloonCapAdjustment::default();
        };
        if period >= self.balloon_period {
            return BalloonCapAdjustment::default();
        }

        let projected = self.projected_balloon(period, balance, cumulative_deferred);
        let excess = projected - cap;
        if excess <= EPSILON {
            return BalloonCapAdjustment::default();
        }

        let remaining = self.balloon_period - period;
        let growth = (1.0 + self.config.deferral_rate()).powi(remaining as i32);
        let amortizable = self.terms.scheduled_principal_per_period() * remaining as f64;
        let headroom = (balance - amortizable).max(0.0);

        // Each unit of deferred paydown removes `growth` plus one unit of balance
        // headroom while headroom remains
        let deferred_paydown = if excess <= headroom * (growth + 1.0) {
            excess / (growth + 1.0)
        } else {
            (excess - headroom) / growth
        }
        .min(cumulative_deferred);

        let reduced = deferred_paydown * growth + deferred_paydown.min(headroom);
        let headroom_left = headroom - deferred_paydown.min(headroom);
        let balance_paydown = (excess - reduced).max(0.0).min(headroom_left);

        BalloonCapAdjustment {
            deferred_paydown,
            balance_paydown,
        }
    }
}
