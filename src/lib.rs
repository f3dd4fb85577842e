use crate::domain::scheduler::{ScheduleOutcome, SchedulerConfig, compute_schedule};
use crate::error::Result;
use crate::loader::parser::load_scenario;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads a scenario file (text protocol or `.json`) and computes its schedule.
///
/// The caller installs the logger, see `logger::init`.
pub fn generate_schedule(file_path: &str, config: &SchedulerConfig) -> Result<ScheduleOutcome> {
    let scenario = load_scenario(file_path)?;
    log::info!("Scenario validated. Starting schedule computation.");

    compute_schedule(&scenario, config)
}
