use std::collections::HashSet;

use crate::api::scenario_dto::ScenarioDto;
use crate::domain::utils::id::NodeId;
use crate::error::{Error, Result};

/// The content source (RSU). It only ever sends.
pub const SOURCE_NODE: NodeId = NodeId::new(0);

/// A directed link with a bandwidth for every slot of the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTuple {
    pub source: NodeId,
    pub target: NodeId,
    pub bandwidth: Vec<i64>,
}

/// Bytes of one downloader's content held by a node at the start of the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holding {
    pub downloader: NodeId,
    pub bytes: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStorage {
    pub node: NodeId,
    pub holdings: Vec<Holding>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Downloader {
    pub node: NodeId,
    /// Passed through to the caller, not used by the optimizer.
    pub consuming_rate: f64,
}

/// Validated input of one scheduling invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub node_num: usize,
    pub slot_num: usize,
    pub links: Vec<LinkTuple>,
    pub storage: Vec<NodeStorage>,
    pub downloaders: Vec<Downloader>,
}

impl Scenario {
    /// Builds and validates a scenario from its DTO. Declared counts must match the listed entries.
    pub fn from_dto(dto: ScenarioDto) -> Result<Scenario> {
        if dto.links.len() != dto.link_num {
            return Err(Error::InvalidInput(format!("declared {} links but {} were listed", dto.link_num, dto.links.len())));
        }

        if dto.downloaders.len() != dto.downloader_num {
            return Err(Error::InvalidInput(format!(
                "declared {} downloaders but {} were listed",
                dto.downloader_num,
                dto.downloaders.len()
            )));
        }

        let scenario = Scenario {
            node_num: dto.node_num,
            slot_num: dto.slot_num,
            links: dto
                .links
                .into_iter()
                .map(|link| LinkTuple { source: NodeId::new(link.src), target: NodeId::new(link.dst), bandwidth: link.bandwidth })
                .collect(),
            storage: dto
                .storage
                .into_iter()
                .map(|row| NodeStorage {
                    node: NodeId::new(row.node_id),
                    holdings: row.holdings.into_iter().map(|h| Holding { downloader: NodeId::new(h.downloader_id), bytes: h.size }).collect(),
                })
                .collect(),
            downloaders: dto
                .downloaders
                .into_iter()
                .map(|d| Downloader { node: NodeId::new(d.node_id), consuming_rate: d.consuming_rate })
                .collect(),
        };

        scenario.validate()?;
        Ok(scenario)
    }

    pub fn downloader_num(&self) -> usize {
        self.downloaders.len()
    }

    /// Index of the downloader living on `node`, if any.
    pub fn downloader_index(&self, node: NodeId) -> Option<usize> {
        self.downloaders.iter().position(|d| d.node == node)
    }

    /// Rejects every input the graph construction would otherwise mis-schedule silently.
    pub fn validate(&self) -> Result<()> {
        if self.node_num == 0 && (!self.links.is_empty() || !self.downloaders.is_empty()) {
            return Err(Error::InvalidInput("a scenario with links or downloaders needs at least the source node".to_string()));
        }

        let bandwidth_total = self.validate_links()?;
        self.validate_downloaders()?;
        self.validate_storage(bandwidth_total)?;

        Ok(())
    }

    /// # Returns
    /// The bandwidth of all links summed over the horizon. Every flow and storage sum stays below it.
    fn validate_links(&self) -> Result<i64> {
        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
        let mut bandwidth_total: i64 = 0;

        for (position, link) in self.links.iter().enumerate() {
            if link.source.index >= self.node_num || link.target.index >= self.node_num {
                return Err(Error::InvalidInput(format!(
                    "link tuple {} ({} -> {}) references a node outside 0..{}",
                    position, link.source, link.target, self.node_num
                )));
            }

            if link.source == link.target {
                return Err(Error::InvalidInput(format!("link tuple {} is a self loop on node {}", position, link.source)));
            }

            if link.target == SOURCE_NODE {
                return Err(Error::InvalidInput(format!("link tuple {} ({} -> {}) points into the source node", position, link.source, link.target)));
            }

            if link.bandwidth.len() != self.slot_num {
                return Err(Error::InvalidInput(format!(
                    "link tuple {} ({} -> {}) has {} bandwidth values, expected {}",
                    position,
                    link.source,
                    link.target,
                    link.bandwidth.len(),
                    self.slot_num
                )));
            }

            if let Some(slot) = link.bandwidth.iter().position(|bw| *bw < 0) {
                return Err(Error::InvalidInput(format!(
                    "link tuple {} ({} -> {}) has a negative bandwidth in slot {}",
                    position, link.source, link.target, slot
                )));
            }

            if position > 0 && self.links[position - 1].source > link.source {
                return Err(Error::InvalidInput(format!(
                    "link tuples must be sorted by source node: tuple {} (source {}) follows source {}",
                    position,
                    link.source,
                    self.links[position - 1].source
                )));
            }

            if !seen.insert((link.source, link.target)) {
                return Err(Error::InvalidInput(format!("duplicate link tuple {} -> {}", link.source, link.target)));
            }

            bandwidth_total = link.bandwidth.iter().try_fold(bandwidth_total, |total, bw| total.checked_add(*bw)).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "link tuple {} ({} -> {}) pushes the summed bandwidth past {}",
                    position,
                    link.source,
                    link.target,
                    i64::MAX
                ))
            })?;
        }

        Ok(bandwidth_total)
    }

    fn validate_downloaders(&self) -> Result<()> {
        let mut seen: HashSet<NodeId> = HashSet::new();

        for downloader in self.downloaders.iter() {
            if downloader.node == SOURCE_NODE || downloader.node.index >= self.node_num {
                return Err(Error::InvalidInput(format!("downloader id {} is not a vehicle node in 1..{}", downloader.node, self.node_num)));
            }

            if !seen.insert(downloader.node) {
                return Err(Error::InvalidInput(format!("downloader {} is listed twice", downloader.node)));
            }

            if !downloader.consuming_rate.is_finite() || downloader.consuming_rate < 0.0 {
                return Err(Error::InvalidInput(format!("downloader {} has an invalid consuming rate {}", downloader.node, downloader.consuming_rate)));
            }
        }

        Ok(())
    }

    fn validate_storage(&self, bandwidth_total: i64) -> Result<()> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut content_total = bandwidth_total;

        for row in self.storage.iter() {
            if row.node.index >= self.node_num {
                return Err(Error::InvalidInput(format!("storage row for node {} is outside 0..{}", row.node, self.node_num)));
            }

            if !seen.insert(row.node) {
                return Err(Error::InvalidInput(format!("storage row for node {} is listed twice", row.node)));
            }

            for holding in row.holdings.iter() {
                if self.downloader_index(holding.downloader).is_none() {
                    return Err(Error::InvalidInput(format!("node {} holds content of unknown downloader {}", row.node, holding.downloader)));
                }

                if holding.bytes < 0 {
                    return Err(Error::InvalidInput(format!("node {} holds a negative amount for downloader {}", row.node, holding.downloader)));
                }

                content_total = content_total.checked_add(holding.bytes).ok_or_else(|| {
                    Error::InvalidInput(format!("holdings of node {} push the summed content past {}", row.node, i64::MAX))
                })?;
            }
        }

        Ok(())
    }
}
