use serde::Serialize;

use crate::domain::schedule::flux_scheme::NodeSchedule;
use crate::domain::scheduler::{DownloaderSummary, ScheduleOutcome};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReportDto {
    pub computation_time_ms: f64,
    pub iterations: usize,
    pub total_received: i64,
    pub downloaders: Vec<DownloaderReportDto>,
    pub nodes: Vec<NodeReportDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloaderReportDto {
    pub node_id: usize,
    pub consuming_rate: f64,
    pub initial_holdings: i64,
    pub received_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReportDto {
    pub node_id: usize,
    pub schemes: Vec<FluxSchemeReportDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxSchemeReportDto {
    /// 1-based slot number.
    pub slot: usize,
    pub destination: usize,
    pub downloader_id: usize,
    pub byte_amount: i64,
    /// Half-open `[begin, end)` byte ranges.
    pub segment: Vec<(i64, i64)>,
}

impl ScheduleReportDto {
    pub fn from_outcome(outcome: &ScheduleOutcome) -> Self {
        ScheduleReportDto {
            computation_time_ms: outcome.computation_time.as_secs_f64() * 1000.0,
            iterations: outcome.iterations,
            total_received: outcome.total_received,
            downloaders: outcome.downloaders.iter().map(DownloaderReportDto::from_summary).collect(),
            nodes: outcome.node_schedules.iter().map(NodeReportDto::from_node_schedule).collect(),
        }
    }
}

impl DownloaderReportDto {
    fn from_summary(summary: &DownloaderSummary) -> Self {
        DownloaderReportDto {
            node_id: summary.node.index,
            consuming_rate: summary.consuming_rate,
            initial_holdings: summary.initial_holdings,
            received_amount: summary.received_amount,
        }
    }
}

impl NodeReportDto {
    fn from_node_schedule(node_schedule: &NodeSchedule) -> Self {
        let schemes = node_schedule
            .schemes
            .iter()
            .map(|scheme| FluxSchemeReportDto {
                slot: scheme.slot,
                destination: scheme.destination.index,
                downloader_id: scheme.downloader_id.index,
                byte_amount: scheme.byte_amount,
                segment: scheme.segment.ranges().iter().map(|r| (r.begin, r.end)).collect(),
            })
            .collect();

        NodeReportDto { node_id: node_schedule.node.index, schemes }
    }
}
