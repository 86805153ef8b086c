//! DSCR Amortization CLI
//!
//! Runs the Monte Carlo comparison of traditional and contingent amortization
//! for one deal over a CSV of simulated CFADS paths

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;

use dscr_amortization::amortization::{BreachType, PaymentRegime, PeriodPaymentResult, Structure};
use dscr_amortization::comparison::{format_millions, StructureStatistics};
use dscr_amortization::scenario::load_scenarios;
use dscr_amortization::{DealConfig, DualStructureComparator, PortfolioStatistics};

#[derive(Parser)]
#[command(
    name = "dscr_amortization",
    version,
    about = "Compare traditional and DSCR-contingent amortization over simulated CFADS paths"
)]
struct Cli {
    /// Deal configuration (JSON)
    #[arg(long)]
    deal: PathBuf,

    /// CFADS scenarios (CSV, one row per path, one column per period)
    #[arg(long)]
    scenarios: PathBuf,

    /// Override the covenant from the deal file
    #[arg(long)]
    covenant: Option<f64>,

    /// Scenario CSV has no header row
    #[arg(long)]
    no_header: bool,

    /// Print portfolio statistics as JSON
    #[arg(long)]
    json: bool,

    /// Include every per-path comparison in the JSON output
    #[arg(long, requires = "json")]
    keep_paths: bool,

    /// Write the period schedule of one path for both structures to CSV
    #[arg(long)]
    schedule: Option<PathBuf>,

    /// Scenario row used for --schedule
    #[arg(long, default_value_t = 0)]
    schedule_path: usize,
}

/// Flat schedule row for CSV output
#[derive(Serialize)]
struct ScheduleRow {
    structure: Structure,
    period: u32,
    cfads: f64,
    regime: PaymentRegime,
    interest_due: f64,
    interest_paid: f64,
    scheduled_principal: f64,
    principal_paid: f64,
    principal_deferred: f64,
    principal_catch_up: f64,
    forced_paydown: f64,
    principal_shortfall: f64,
    cumulative_deferred: f64,
    remaining_balance: f64,
    realized_dscr: f64,
    breach_type: Option<BreachType>,
}

impl ScheduleRow {
    fn new(structure: Structure, row: &PeriodPaymentResult) -> Self {
        Self {
            structure,
            period: row.period,
            cfads: row.cfads,
            regime: row.regime,
            interest_due: row.interest_due,
            interest_paid: row.interest_paid,
            scheduled_principal: row.scheduled_principal,
            principal_paid: row.principal_paid,
            principal_deferred: row.principal_deferred,
            principal_catch_up: row.principal_catch_up,
            forced_paydown: row.forced_deferral_paydown + row.forced_balloon_paydown,
            principal_shortfall: row.principal_shortfall,
            cumulative_deferred: row.cumulative_deferred,
            remaining_balance: row.remaining_balance,
            realized_dscr: row.realized_dscr,
            breach_type: row.breach_type,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let deal = DealConfig::load(&cli.deal)
        .with_context(|| format!("Failed to load deal from {}", cli.deal.display()))?;
    let covenant = cli.covenant.unwrap_or(deal.covenant);

    let scenarios = load_scenarios(&cli.scenarios, !cli.no_header)
        .with_context(|| format!("Failed to load scenarios from {}", cli.scenarios.display()))?;

    let comparator = DualStructureComparator::new(deal.loan.clone(), deal.amortization.clone())?
        .with_path_results(cli.keep_paths);

    let stats = comparator.run_monte_carlo_comparison(&scenarios, covenant)?;

    if let Some(schedule_path) = &cli.schedule {
        if cli.schedule_path >= scenarios.n_simulations() {
            bail!(
                "--schedule-path {} out of range ({} paths)",
                cli.schedule_path,
                scenarios.n_simulations()
            );
        }

        let comparison =
            comparator.compare_single_path(scenarios.row(cli.schedule_path), covenant)?;
        let mut writer = csv::Writer::from_path(schedule_path)
            .with_context(|| format!("Failed to create {}", schedule_path.display()))?;
        for (structure, result) in [
            (Structure::Traditional, &comparison.traditional),
            (Structure::Contingent, &comparison.contingent),
        ] {
            for row in &result.periods {
                writer.serialize(ScheduleRow::new(structure, row))?;
            }
        }
        writer.flush()?;
        log::info!(
            "Wrote schedule for path {} to {}",
            cli.schedule_path,
            schedule_path.display()
        );
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(&deal, &stats);
    }

    Ok(())
}

fn print_summary(deal: &DealConfig, stats: &PortfolioStatistics) {
    println!("DSCR Amortization Comparison");
    println!("============================\n");

    println!("Deal:");
    println!("  Principal: {}", format_millions(deal.loan.principal()));
    println!("  Interest Rate: {:.2}%", deal.loan.interest_rate() * 100.0);
    println!(
        "  Tenor: {} periods ({} grace)",
        deal.loan.tenor_periods(),
        deal.loan.grace_periods()
    );
    println!(
        "  DSCR Floor: {:.2}x  Max Deferral: {:.0}%",
        deal.amortization.dscr_floor(),
        deal.amortization.max_deferral_pct() * 100.0
    );
    println!("  Covenant: {:.2}x", stats.covenant);
    println!("  Simulations: {}", stats.n_simulations);
    println!();

    println!(
        "{:<28} {:>14} {:>14}",
        "", "Traditional", "Contingent"
    );
    println!("{}", "-".repeat(58));
    print_pair("Breach probability", &stats.traditional, &stats.contingent, |s| {
        format!("{:.1}%", s.breach_probability * 100.0)
    });
    print_pair("  Hard (interest)", &stats.traditional, &stats.contingent, |s| {
        s.hard_interest_breaches.to_string()
    });
    print_pair("  Soft (covenant)", &stats.traditional, &stats.contingent, |s| {
        s.soft_covenant_breaches.to_string()
    });
    print_pair("  Balloon cap", &stats.traditional, &stats.contingent, |s| {
        s.balloon_cap_breaches.to_string()
    });
    print_pair("Min DSCR P5", &stats.traditional, &stats.contingent, |s| {
        format!("{:.3}x", s.dscr_percentiles.p5)
    });
    print_pair("Min DSCR P50", &stats.traditional, &stats.contingent, |s| {
        format!("{:.3}x", s.dscr_percentiles.p50)
    });
    print_pair("Min DSCR P95", &stats.traditional, &stats.contingent, |s| {
        format!("{:.3}x", s.dscr_percentiles.p95)
    });
    print_pair("Mean balloon", &stats.traditional, &stats.contingent, |s| {
        format_millions(s.balloon.mean)
    });
    print_pair("P95 balloon", &stats.traditional, &stats.contingent, |s| {
        format_millions(s.balloon.p95)
    });
    print_pair("Mean total interest", &stats.traditional, &stats.contingent, |s| {
        format_millions(s.mean_total_interest)
    });
    print_pair("Bankable", &stats.traditional, &stats.contingent, |s| {
        if s.is_bankable { "yes" } else { "no" }.to_string()
    });
    println!();

    println!("Comparison:");
    println!("  Breaches avoided: {}", stats.breaches_avoided);
    println!(
        "  Breach probability reduction: {:.1} pts ({:.0}% relative)",
        stats.breach_probability_reduction * 100.0,
        stats.relative_breach_reduction * 100.0
    );
    println!("  Avg DSCR improvement: {:.3}x", stats.avg_dscr_improvement);
    println!(
        "  Additional balloon: avg {}, max {}",
        format_millions(stats.avg_additional_balloon),
        format_millions(stats.max_additional_balloon)
    );
    println!();
    println!("Key finding: {}", stats.key_finding);
}

fn print_pair<F>(label: &str, traditional: &StructureStatistics, contingent: &StructureStatistics, f: F)
where
    F: Fn(&StructureStatistics) -> String,
{
    println!("{:<28} {:>14} {:>14}", label, f(traditional), f(contingent));
}
