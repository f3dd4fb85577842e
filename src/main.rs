use clap::Parser;
use std::process::ExitCode;

use coop_flux_scheduler::domain::scheduler::SchedulerConfig;
use coop_flux_scheduler::error::{Error, Result};
use coop_flux_scheduler::generate_schedule;
use coop_flux_scheduler::loader::parser::load_config;
use coop_flux_scheduler::loader::writer::{ReportFormat, write_report, write_trace};
use coop_flux_scheduler::logger;

/// Plans cooperative content delivery from a roadside source to downloading vehicles,
/// directly or over one relay vehicle.
#[derive(Debug, Parser)]
#[command(name = "coop_flux_scheduler", version, about)]
struct Cli {
    /// Scenario file: text protocol, or JSON when the name ends in `.json`.
    input: String,

    /// Where to write the schedule.
    output: String,

    /// JSON scheduler settings (`iterationCap`, `verifyInvariants`).
    #[arg(long)]
    config: Option<String>,

    /// Write the optimizer trace as CSV to this file.
    #[arg(long)]
    stats: Option<String>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Overrides the optimizer iteration cap.
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Skips the capacity, contention and flow-conservation checks.
    #[arg(long)]
    no_verify: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SchedulerConfig::default(),
    };

    if cli.max_iterations.is_some() {
        config.iteration_cap = cli.max_iterations;
    }
    if cli.no_verify {
        config.verify_invariants = false;
    }

    log::info!("Scheduling '{}' with {:?}.", cli.input, config);

    let outcome = generate_schedule(&cli.input, &config)?;
    write_report(&outcome, &cli.output, cli.format)?;

    if let Some(stats) = &cli.stats {
        write_trace(&outcome, stats)?;
    }

    Ok(())
}

fn exit_code(error: &Error) -> u8 {
    if error.is_input_error() {
        2
    } else if error.is_invariant_violation() {
        3
    } else {
        1
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Scheduling failed: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
