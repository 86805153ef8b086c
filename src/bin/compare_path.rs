//! Compare traditional and contingent amortization on a single CFADS path
//!
//! The path is given on the command line or taken from one row of a scenario CSV

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use dscr_amortization::comparison::format_millions;
use dscr_amortization::scenario::load_scenarios;
use dscr_amortization::{DealConfig, DualStructureComparator, PathSimulationResult};

#[derive(Parser)]
#[command(name = "compare_path", about = "Compare both amortization structures on one CFADS path")]
struct Args {
    /// Deal configuration (JSON)
    #[arg(long)]
    deal: PathBuf,

    /// CFADS per period, comma separated
    #[arg(long, value_delimiter = ',', conflicts_with = "scenarios")]
    cfads: Vec<f64>,

    /// Scenario CSV to take the path from
    #[arg(long)]
    scenarios: Option<PathBuf>,

    /// Row of the scenario CSV
    #[arg(long, default_value_t = 0)]
    row: usize,

    /// Scenario CSV has no header row
    #[arg(long)]
    no_header: bool,

    /// Override the covenant from the deal file
    #[arg(long)]
    covenant: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let deal = DealConfig::load(&args.deal)
        .with_context(|| format!("Failed to load deal from {}", args.deal.display()))?;
    let covenant = args.covenant.unwrap_or(deal.covenant);

    let path: Vec<f64> = match &args.scenarios {
        Some(csv_path) => {
            let scenarios = load_scenarios(csv_path, !args.no_header)?;
            if args.row >= scenarios.n_simulations() {
                bail!("--row {} out of range ({} paths)", args.row, scenarios.n_simulations());
            }
            scenarios.row(args.row).to_vec()
        }
        None if args.cfads.is_empty() => bail!("Provide --cfads or --scenarios"),
        None => args.cfads.clone(),
    };

    let comparator = DualStructureComparator::new(deal.loan.clone(), deal.amortization.clone())?;
    let result = comparator.compare_single_path(&path, covenant)?;

    println!("Covenant {:.2}x, {} periods\n", covenant, path.len());
    print_schedule("Traditional", &result.traditional);
    print_schedule("Contingent", &result.contingent);

    println!("Comparison:");
    println!("  DSCR improvement: {:.3}x", result.dscr_improvement);
    println!("  Breach avoided: {}", result.breach_avoided);
    println!("  Additional balloon: {}", format_millions(result.additional_balloon));
    println!("  Additional interest: {}", format_millions(result.additional_interest));

    Ok(())
}

fn print_schedule(label: &str, result: &PathSimulationResult) {
    println!("{} structure:", label);
    println!(
        "{:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>14} {:>8} {:>14}",
        "Period", "CFADS", "Interest", "Principal", "Service", "Deferred", "CatchUp", "Balance", "DSCR", "Breach"
    );
    println!("{}", "-".repeat(125));

    for row in &result.periods {
        println!(
            "{:>6} {:>12.0} {:>12.0} {:>12.0} {:>12.0} {:>12.0} {:>12.0} {:>14.0} {:>8.3} {:>14}",
            row.period,
            row.cfads,
            row.interest_paid,
            row.principal_paid,
            row.total_debt_service(),
            row.principal_deferred,
            row.principal_catch_up,
            row.remaining_balance,
            row.realized_dscr,
            row.breach_type.map(|b| b.as_str()).unwrap_or("-"),
        );
    }

    println!();
    println!("  Min DSCR: {:.3}x", result.min_dscr);
    println!("  Final balloon: {}", format_millions(result.final_balloon));
    println!(
        "  Deferral periods: {} (total deferred {})",
        result.deferral_periods(),
        format_millions(result.total_deferred)
    );
    match (result.breach_year, result.breach_type) {
        (Some(year), Some(kind)) => println!("  Breach: period {} ({})", year, kind),
        _ => println!("  No breach"),
    }
    println!();
}
