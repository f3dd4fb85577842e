use std::time::{Duration, Instant};

use crate::api::scheduler_config_dto::SchedulerConfigDto;
use crate::domain::scenario::Scenario;
use crate::domain::schedule::flux_scheme::NodeSchedule;
use crate::domain::schedule::optimizer::OptimizerOutcome;
use crate::domain::schedule::scheme::ScheduleContext;
use crate::domain::utils::id::NodeId;
use crate::domain::utils::statistics::StatisticEvent;
use crate::error::{Error, Result};

/// Knobs of one scheduling invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on optimizer passes. `None` means `downloaderNum * slotNum / 2`.
    pub iteration_cap: Option<usize>,

    /// Check capacity, contention and flow conservation before extraction.
    pub verify_invariants: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig { iteration_cap: None, verify_invariants: true }
    }
}

impl SchedulerConfig {
    pub fn from_dto(dto: SchedulerConfigDto) -> Self {
        let defaults = SchedulerConfig::default();

        SchedulerConfig {
            iteration_cap: dto.iteration_cap.or(defaults.iteration_cap),
            verify_invariants: dto.verify_invariants.unwrap_or(defaults.verify_invariants),
        }
    }
}

/// What one downloader gets out of the schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloaderSummary {
    pub node: NodeId,
    pub consuming_rate: f64,

    /// Bytes of its own content the downloader held before the horizon.
    pub initial_holdings: i64,

    /// Bytes delivered to the downloader over the horizon.
    pub received_amount: i64,
}

/// Everything one invocation hands back to the caller.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub node_schedules: Vec<NodeSchedule>,
    pub downloaders: Vec<DownloaderSummary>,
    pub total_received: i64,

    /// Optimizer passes performed.
    pub iterations: usize,

    pub optimizer: OptimizerOutcome,

    /// Wall-clock cost of the computation, part of the output contract.
    pub computation_time: Duration,

    pub trace: Vec<StatisticEvent>,
}

impl ScheduleOutcome {
    /// Schedules sent by `node`, if it sends anything.
    pub fn schedule_of(&self, node: NodeId) -> Option<&NodeSchedule> {
        self.node_schedules.iter().find(|s| s.node == node)
    }

    pub fn received_by(&self, node: NodeId) -> Option<i64> {
        self.downloaders.iter().find(|d| d.node == node).map(|d| d.received_amount)
    }
}

fn initial_holdings(scenario: &Scenario, downloader: NodeId) -> i64 {
    scenario
        .storage
        .iter()
        .filter(|row| row.node == downloader)
        .flat_map(|row| row.holdings.iter())
        .filter(|h| h.downloader == downloader)
        .map(|h| h.bytes)
        .sum()
}

fn summarize(scenario: &Scenario, received: &[i64]) -> Vec<DownloaderSummary> {
    scenario
        .downloaders
        .iter()
        .zip(received.iter())
        .map(|(downloader, received)| DownloaderSummary {
            node: downloader.node,
            consuming_rate: downloader.consuming_rate,
            initial_holdings: initial_holdings(scenario, downloader.node),
            received_amount: *received,
        })
        .collect()
}

/// Runs one complete scheduling invocation: graph, arc paths, greedy baseline, local search,
/// storage replay and extraction. All working state is dropped before returning.
///
/// # Returns
/// The per-sender schedule together with delivered amounts and the elapsed computation time.
pub fn compute_schedule(scenario: &Scenario, config: &SchedulerConfig) -> Result<ScheduleOutcome> {
    let started = Instant::now();
    scenario.validate()?;

    if scenario.downloaders.is_empty() || scenario.links.is_empty() {
        log::info!("Nothing to schedule: {} downloaders, {} links.", scenario.downloaders.len(), scenario.links.len());

        return Ok(ScheduleOutcome {
            node_schedules: Vec::new(),
            downloaders: summarize(scenario, &vec![0; scenario.downloaders.len()]),
            total_received: 0,
            iterations: 0,
            optimizer: OptimizerOutcome::default(),
            computation_time: started.elapsed(),
            trace: Vec::new(),
        });
    }

    let mut context = ScheduleContext::new(scenario, config.clone())?;

    context.build_initial_scheme()?;
    let optimizer = context.optimize()?;

    if config.verify_invariants {
        context.verify_invariants()?;
    }

    let tally = context.graph.simulate_storage()?;
    let extraction = context.extract()?;

    if config.verify_invariants {
        for (index, (extracted, simulated)) in extraction.delivered.iter().zip(tally.received.iter()).enumerate() {
            if extracted != simulated {
                return Err(Error::InvariantViolation(format!(
                    "downloader {} is scheduled {} bytes but the storage replay delivers {}",
                    context.graph.downloaders[index], extracted, simulated
                )));
            }
        }
    }

    let computation_time = started.elapsed();

    log::info!(
        "Schedule computed in {:.3} ms: {} bytes for {} downloaders after {} optimizer passes.",
        computation_time.as_secs_f64() * 1000.0,
        tally.total_received,
        scenario.downloaders.len(),
        optimizer.passes
    );

    Ok(ScheduleOutcome {
        node_schedules: extraction.node_schedules,
        downloaders: summarize(scenario, &tally.received),
        total_received: tally.total_received,
        iterations: optimizer.passes,
        optimizer,
        computation_time,
        trace: std::mem::take(&mut context.trace),
    })
}
