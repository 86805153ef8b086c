//! Period and path output records for both amortization structures

use serde::{Deserialize, Serialize};

/// Classification of a breach period
///
/// Precedence for path summaries: `HardInterest` > `BalloonCapBinding` > `SoftCovenant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachType {
    /// CFADS could not cover interest due
    HardInterest,
    /// Realized DSCR below the covenant
    SoftCovenant,
    /// Projected balloon above the cap forced an out-of-schedule paydown
    BalloonCapBinding,
}

impl BreachType {
    pub fn severity(self) -> u8 {
        match self {
            BreachType::SoftCovenant => 1,
            BreachType::BalloonCapBinding => 2,
            BreachType::HardInterest => 3,
        }
    }

    /// Whether a later breach of this type replaces `recorded` in a path summary
    ///
    /// Only a balloon-cap binding replaces an earlier, softer breach; otherwise
    /// the first breach of the path stands.
    pub fn overrides(self, recorded: BreachType) -> bool {
        self == BreachType::BalloonCapBinding && self.severity() > recorded.severity()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BreachType::HardInterest => "hard_interest",
            BreachType::SoftCovenant => "soft_covenant",
            BreachType::BalloonCapBinding => "balloon_cap_binding",
        }
    }
}

impl std::fmt::Display for BreachType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Higher-precedence of two optional classifications for the same period
pub fn worst_breach(a: Option<BreachType>, b: Option<BreachType>) -> Option<BreachType> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if y.severity() > x.severity() { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Payment regime the contingent engine inferred for a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRegime {
    /// Construction period: interest only, no breach possible
    Grace,
    /// Full scheduled principal paid
    Normal,
    /// DSCR floor or cash bound principal; part of the schedule deferred
    Constrained,
    /// Surplus cash retired deferred principal
    CatchUp,
    /// CFADS below interest due
    HardBreach,
}

/// Which amortization structure produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Structure {
    Traditional,
    Contingent,
}

/// Payment facts for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodPaymentResult {
    /// 1-indexed period
    pub period: u32,
    pub cfads: f64,
    pub regime: PaymentRegime,

    // Interest
    pub interest_due: f64,
    pub interest_paid: f64,

    // Principal
    pub scheduled_principal: f64,
    pub principal_paid: f64,
    pub principal_deferred: f64,
    pub principal_catch_up: f64,
    pub forced_deferral_paydown: f64,
    pub forced_balloon_paydown: f64,
    /// Scheduled principal neither paid nor deferrable (deferral cap reached)
    pub principal_shortfall: f64,
    /// Principal paid beyond the cash left after interest
    pub funding_shortfall: f64,

    // Post-period state
    pub cumulative_deferred: f64,
    pub deferred_interest_accrued: f64,
    pub remaining_balance: f64,

    // Metrics
    pub realized_dscr: f64,
    pub effective_dscr: f64,
    pub breach_type: Option<BreachType>,
    pub is_breach: bool,
    pub deferral_cap_binding: bool,
}

impl PeriodPaymentResult {
    /// Empty row for a period; engines fill in the rest
    pub fn new(period: u32, cfads: f64) -> Self {
        Self {
            period,
            cfads,
            regime: PaymentRegime::Normal,
            interest_due: 0.0,
            interest_paid: 0.0,
            scheduled_principal: 0.0,
            principal_paid: 0.0,
            principal_deferred: 0.0,
            principal_catch_up: 0.0,
            forced_deferral_paydown: 0.0,
            forced_balloon_paydown: 0.0,
            principal_shortfall: 0.0,
            funding_shortfall: 0.0,
            cumulative_deferred: 0.0,
            deferred_interest_accrued: 0.0,
            remaining_balance: 0.0,
            realized_dscr: f64::INFINITY,
            effective_dscr: f64::INFINITY,
            breach_type: None,
            is_breach: false,
            deferral_cap_binding: false,
        }
    }

    /// Interest plus principal actually paid
    pub fn total_debt_service(&self) -> f64 {
        self.interest_paid + self.principal_paid
    }
}

/// Complete result of simulating one CFADS path under one structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSimulationResult {
    pub structure: Structure,

    /// Period rows in order
    pub periods: Vec<PeriodPaymentResult>,

    /// Terminal lump sum due at maturity
    pub final_balloon: f64,

    pub total_interest_paid: f64,
    pub total_principal_paid: f64,
    pub total_deferred: f64,
    pub total_catch_up: f64,
    pub total_forced_paydown: f64,

    /// Minimum realized DSCR over post-grace periods
    pub min_dscr: f64,
    /// Mean of finite post-grace realized DSCRs
    pub avg_dscr: Option<f64>,

    pub breach_occurred: bool,
    pub breach_year: Option<u32>,
    pub breach_type: Option<BreachType>,
    /// Number of periods flagged as a breach
    pub breach_periods: u32,

    pub max_cumulative_deferred: f64,
    pub final_remaining_balance: f64,
    pub final_cumulative_deferred: f64,

    #[serde(skip)]
    dscr_sum: f64,
    #[serde(skip)]
    dscr_count: u32,
}

impl PathSimulationResult {
    pub fn new(structure: Structure) -> Self {
        Self {
            structure,
            periods: Vec::new(),
            final_balloon: 0.0,
            total_interest_paid: 0.0,
            total_principal_paid: 0.0,
            total_deferred: 0.0,
            total_catch_up: 0.0,
            total_forced_paydown: 0.0,
            min_dscr: f64::INFINITY,
            avg_dscr: None,
            breach_occurred: false,
            breach_year: None,
            breach_type: None,
            breach_periods: 0,
            max_cumulative_deferred: 0.0,
            final_remaining_balance: 0.0,
            final_cumulative_deferred: 0.0,
            dscr_sum: 0.0,
            dscr_count: 0,
        }
    }

    /// Add a period row, updating totals, DSCR tracking and the breach summary
    pub fn add_period(&mut self, row: PeriodPaymentResult, in_grace: bool) {
        self.total_interest_paid += row.interest_paid;
        self.total_principal_paid += row.principal_paid;
        self.total_deferred += row.principal_deferred;
        self.total_catch_up += row.principal_catch_up;
        self.total_forced_paydown += row.forced_deferral_paydown + row.forced_balloon_paydown;
        self.max_cumulative_deferred = self.max_cumulative_deferred.max(row.cumulative_deferred);

        if !in_grace {
            self.min_dscr = self.min_dscr.min(row.realized_dscr);
            if row.realized_dscr.is_finite() {
                self.dscr_sum += row.realized_dscr;
                self.dscr_count += 1;
                self.avg_dscr = Some(self.dscr_sum / self.dscr_count as f64);
            }
        }

        if row.is_breach {
            self.breach_periods += 1;
            if let Some(kind) = row.breach_type {
                self.record_breach(row.period, kind);
            }
        }

        self.final_remaining_balance = row.remaining_balance;
        self.final_cumulative_deferred = row.cumulative_deferred;
        self.periods.push(row);
    }

    fn record_breach(&mut self, period: u32, kind: BreachType) {
        let replace = match self.breach_type {
            None => true,
            Some(recorded) => kind.overrides(recorded),
        };
        if replace {
            self.breach_occurred = true;
            self.breach_year = Some(period);
            self.breach_type = Some(kind);
        }
    }

    /// Periods in which any principal was deferred
    pub fn deferral_periods(&self) -> usize {
        self.periods
            .iter()
            .filter(|p| p.principal_deferred > 0.0)
            .count()
    }
}
