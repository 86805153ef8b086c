//! Traditional and DSCR-contingent amortization engines

mod state;
mod results;
mod traditional;
mod contingent;

pub use state::{coverage_ratio, EngineState, EPSILON};
pub use results::{
    worst_breach, BreachType, PathSimulationResult, PaymentRegime, PeriodPaymentResult, Structure,
};
pub use traditional::TraditionalAmortizationEngine;
pub use contingent::{BalloonCapAdjustment, ContingentAmortizationEngine, CATCH_UP_SHARE};
