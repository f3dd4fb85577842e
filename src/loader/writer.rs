use clap::ValueEnum;
use std::fs;

use crate::api::schedule_report_dto::ScheduleReportDto;
use crate::domain::scheduler::ScheduleOutcome;
use crate::domain::utils::statistics::write_csv;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Line-based report, one flux scheme per line.
    #[default]
    Text,
    /// Pretty-printed `ScheduleReportDto`.
    Json,
}

/// Renders the line-based report.
///
/// Header lines start with `#`. Each downloader gets one summary line, then every sending node
/// gets a `node <id> <count>` line followed by its schemes as `<slot> <dest> <downloader> <bytes> <segment>`.
pub fn render_text(outcome: &ScheduleOutcome) -> String {
    let mut out = String::new();

    out.push_str(&format!("# computationTimeMs {:.3}\n", outcome.computation_time.as_secs_f64() * 1000.0));
    out.push_str(&format!("# iterations {}\n", outcome.iterations));
    out.push_str(&format!("# totalReceived {}\n", outcome.total_received));

    for downloader in outcome.downloaders.iter() {
        out.push_str(&format!(
            "downloader {} received {} initial {} rate {}\n",
            downloader.node, downloader.received_amount, downloader.initial_holdings, downloader.consuming_rate
        ));
    }

    for node_schedule in outcome.node_schedules.iter() {
        out.push_str(&format!("node {} {}\n", node_schedule.node, node_schedule.schemes.len()));

        for scheme in node_schedule.schemes.iter() {
            out.push_str(&format!("{}\n", scheme));
        }
    }

    out
}

pub fn render_json(outcome: &ScheduleReportDto) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

pub fn write_report(outcome: &ScheduleOutcome, file_path: &str, format: ReportFormat) -> Result<()> {
    let content = match format {
        ReportFormat::Text => render_text(outcome),
        ReportFormat::Json => render_json(&ScheduleReportDto::from_outcome(outcome))?,
    };

    fs::write(file_path, content)?;
    log::info!("Schedule written to '{}' ({:?}).", file_path, format);

    Ok(())
}

/// Writes the optimizer trace of `outcome` as `;`-separated CSV.
pub fn write_trace(outcome: &ScheduleOutcome, file_path: &str) -> Result<()> {
    write_csv(file_path, &outcome.trace)?;
    log::info!("Optimizer trace with {} events written to '{}'.", outcome.trace.len(), file_path);

    Ok(())
}
