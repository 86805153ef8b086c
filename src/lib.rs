//! DSCR Amortization - traditional vs DSCR-contingent project finance debt
//!
//! This library provides:
//! - Fixed straight-line amortization with covenant breach detection
//! - Contingent amortization that defers principal when DSCR would fall below a floor
//! - Catch-up of deferred principal in strong periods, deferral and balloon caps
//! - Monte Carlo comparison of both structures over shared CFADS scenarios

pub mod error;
pub mod terms;
pub mod amortization;
pub mod scenario;
pub mod comparison;

// Re-export commonly used types
pub use error::{AmortizationError, ConfigError, Result, ShapeError};
pub use terms::{AmortizationConfig, AmortizationParams, DealConfig, LoanTerms};
pub use amortization::{
    BreachType, ContingentAmortizationEngine, EngineState, PathSimulationResult,
    PeriodPaymentResult, TraditionalAmortizationEngine,
};
pub use comparison::{DualStructureComparator, PortfolioStatistics, StructureComparisonResult};
pub use scenario::ScenarioMatrix;
