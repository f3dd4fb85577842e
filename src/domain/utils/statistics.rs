use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Each optimizer event consists of a set of key-value-pairs with the measured data of one pass.
/// This enum specifies all allowed key values and thus the column in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatParameter {
    /// Optimizer pass counter, starting at 1. The initial scheme is pass 0.
    Iteration,

    /// Description why this entry was made
    LogDescription,

    /// Node id of the starved downloader the pass worked on.
    Downloader,

    /// Arc path index of the committed move.
    ArcPath,

    /// Slot reassigned to the first hop.
    HopOneSlot,

    /// Slot reassigned to the second hop.
    HopTwoSlot,

    /// Predicted change of the total delivered bytes.
    Delta,

    /// Total delivered bytes after the pass.
    TotalReceived,

    /// Best total delivered bytes seen so far.
    BestTotal,

    /// Time since optimizer start in ms
    ProcessingTime,
}

impl StatParameter {
    /// All parameters in column order.
    pub const ALL: [StatParameter; 10] = [
        StatParameter::Iteration,
        StatParameter::LogDescription,
        StatParameter::Downloader,
        StatParameter::ArcPath,
        StatParameter::HopOneSlot,
        StatParameter::HopTwoSlot,
        StatParameter::Delta,
        StatParameter::TotalReceived,
        StatParameter::BestTotal,
        StatParameter::ProcessingTime,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            StatParameter::Iteration => "Iteration",
            StatParameter::LogDescription => "LogDescription",
            StatParameter::Downloader => "Downloader",
            StatParameter::ArcPath => "ArcPath",
            StatParameter::HopOneSlot => "HopOneSlot",
            StatParameter::HopTwoSlot => "HopTwoSlot",
            StatParameter::Delta => "Delta",
            StatParameter::TotalReceived => "TotalReceived",
            StatParameter::BestTotal => "BestTotal",
            StatParameter::ProcessingTime => "ProcessingTime",
        }
    }

    /// Returns the defined order of columns for the CSV header
    pub fn headers() -> Vec<&'static str> {
        StatParameter::ALL.iter().map(|p| p.header()).collect()
    }
}

/// store values in their native format, only format them when writing to the CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl StatValue {
    fn render(&self) -> String {
        match self {
            StatValue::Text(t) => t.clone(),
            StatValue::Integer(i) => i.to_string(),
            StatValue::Float(f) => format!("{:.3}", f),
            StatValue::Bool(b) => b.to_string(),
        }
    }
}

// Automatic conversion helpers
impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Integer(v)
    }
}

impl From<usize> for StatValue {
    fn from(v: usize) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        StatValue::Bool(v)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticEvent {
    data: HashMap<StatParameter, StatValue>,
}

impl StatisticEvent {
    pub fn new() -> Self {
        Self { data: HashMap::new() }
    }

    pub fn set<V: Into<StatValue>>(&mut self, param: StatParameter, value: V) -> &mut Self {
        self.data.insert(param, value.into());
        self
    }

    /// Converts the event into a row following the header order. Missing values become `NA`.
    pub fn to_row(&self) -> Vec<String> {
        StatParameter::ALL
            .iter()
            .map(|param| match self.data.get(param) {
                Some(val) => val.render(),
                None => "NA".to_string(),
            })
            .collect()
    }
}

/// Writes the optimizer trace as a `;` separated CSV file.
pub fn write_csv<P: AsRef<Path>>(path: P, events: &[StatisticEvent]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_events(file, events)
}

/// Writes the optimizer trace to any writer, header first.
pub fn write_events<W: Write>(writer: W, events: &[StatisticEvent]) -> Result<()> {
    let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);

    csv_wtr.write_record(StatParameter::headers())?;

    for event in events {
        csv_wtr.write_record(event.to_row())?;
    }

    csv_wtr.flush()?;
    Ok(())
}
