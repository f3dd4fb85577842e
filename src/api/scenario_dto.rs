use serde::{Deserialize, Serialize};

/// Raw scenario as read from the text protocol or from JSON.
///
/// Counts are kept as declared so that `Scenario::from_dto` can reject inputs whose
/// sections disagree with their header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    pub node_num: usize,
    pub link_num: usize,
    pub downloader_num: usize,
    pub slot_num: usize,
    pub links: Vec<LinkDto>,
    #[serde(default)]
    pub storage: Vec<NodeStorageDto>,
    pub downloaders: Vec<DownloaderDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDto {
    pub src: usize,
    pub dst: usize,
    pub bandwidth: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStorageDto {
    pub node_id: usize,
    #[serde(default)]
    pub holdings: Vec<HoldingDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingDto {
    pub downloader_id: usize,
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloaderDto {
    pub node_id: usize,
    pub consuming_rate: f64,
}
