//! Traditional vs contingent comparison over one path or a Monte Carlo scenario set

mod comparator;
mod statistics;

pub use comparator::{DualStructureComparator, StructureComparisonResult};
pub use statistics::{
    format_millions, percentile_sorted, BalloonStatistics, DscrPercentiles, PortfolioStatistics,
    StructureStatistics, BANKABILITY_THRESHOLD,
};
