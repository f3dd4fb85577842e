use serde::Deserialize;

/// Optional scheduler settings file. Every key may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfigDto {
    /// Upper bound on optimizer passes; `downloaderNum * slotNum / 2` when absent.
    pub iteration_cap: Option<usize>,
    pub verify_invariants: Option<bool>,
}
