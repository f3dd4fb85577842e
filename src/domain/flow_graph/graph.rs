use std::collections::HashMap;

use crate::domain::scenario::{SOURCE_NODE, Scenario};
use crate::domain::utils::id::{ArcId, NodeId};
use crate::error::{Error, Result};

/// A network participant. Index 0 is the source, every other node is a vehicle.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,

    /// Outgoing arcs in construction order: input tuples first, mirrored arcs after.
    pub out_arcs: Vec<ArcId>,

    /// `storage[slot][downloader]`: bytes of a downloader's content held at the boundary of `slot`.
    /// Row 0 holds the initial amounts, row `slot_num` the amounts after the last slot.
    pub storage: Vec<Vec<i64>>,
}

/// A directed edge between two nodes for the whole horizon.
#[derive(Debug, Clone)]
pub struct Arc {
    pub id: ArcId,
    pub from: NodeId,
    pub to: NodeId,

    /// Capacity per slot.
    pub bandwidth: Vec<i64>,

    /// Committed flow per slot, never above `bandwidth`.
    pub flow: Vec<i64>,

    /// Downloader index whose content the flow carries.
    pub owner: Vec<Option<usize>>,

    /// `false` while a conflicting arc is active in the slot.
    pub idle: Vec<bool>,

    /// The arc representing the opposite direction of the same physical link.
    pub reverse: Option<ArcId>,

    /// Synthesised by `undirectify` rather than read from the input.
    pub is_mirror: bool,
}

impl Arc {
    fn new(id: ArcId, from: NodeId, to: NodeId, bandwidth: Vec<i64>, is_mirror: bool) -> Self {
        let slot_num = bandwidth.len();

        Arc { id, from, to, bandwidth, flow: vec![0; slot_num], owner: vec![None; slot_num], idle: vec![true; slot_num], reverse: None, is_mirror }
    }

    pub fn is_incident_to(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

/// Adjacency-list graph of one scheduling invocation.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    pub nodes: Vec<Node>,
    pub arcs: Vec<Arc>,
    pub slot_num: usize,

    /// Node of every downloader, indexed by downloader index.
    pub downloaders: Vec<NodeId>,

    /// Downloader index of every node, `None` for non-downloaders.
    downloader_index: Vec<Option<usize>>,

    /// Undirected one-hop neighbourhood of every node, sorted.
    neighbors: Vec<Vec<NodeId>>,
}

impl FlowGraph {
    /// Builds the graph from a scenario: arc chains in tuple order, then `undirectify`,
    /// then the initial storage table.
    pub fn build(scenario: &Scenario) -> Result<FlowGraph> {
        scenario.validate()?;

        let downloader_num = scenario.downloader_num();
        let slot_num = scenario.slot_num;

        let nodes: Vec<Node> = (0..scenario.node_num)
            .map(|index| Node { id: NodeId::new(index), out_arcs: Vec::new(), storage: vec![vec![0; downloader_num]; slot_num + 1] })
            .collect();

        let mut downloader_index: Vec<Option<usize>> = vec![None; scenario.node_num];
        for (index, downloader) in scenario.downloaders.iter().enumerate() {
            downloader_index[downloader.node.index] = Some(index);
        }

        let mut graph = FlowGraph {
            nodes,
            arcs: Vec::with_capacity(scenario.links.len() * 2),
            slot_num,
            downloaders: scenario.downloaders.iter().map(|d| d.node).collect(),
            downloader_index,
            neighbors: vec![Vec::new(); scenario.node_num],
        };

        for link in scenario.links.iter() {
            graph.push_arc(link.source, link.target, link.bandwidth.clone(), false);
        }

        graph.undirectify();
        graph.setup_neighbors();
        graph.load_storage(scenario)?;

        log::debug!(
            "FlowGraph built: {} nodes, {} arcs ({} mirrored), {} downloaders, {} slots.",
            graph.nodes.len(),
            graph.arcs.len(),
            graph.arcs.iter().filter(|a| a.is_mirror).count(),
            downloader_num,
            slot_num
        );

        Ok(graph)
    }

    fn push_arc(&mut self, from: NodeId, to: NodeId, bandwidth: Vec<i64>, is_mirror: bool) -> ArcId {
        let id = ArcId::new(self.arcs.len());
        self.arcs.push(Arc::new(id, from, to, bandwidth, is_mirror));
        self.nodes[from.index].out_arcs.push(id);
        id
    }

    /// Pairs every input arc with a reverse arc carrying the same per-slot bandwidth.
    ///
    /// Arcs leaving the source are never mirrored: the source only sends. An explicitly
    /// listed reverse tuple is paired instead of mirrored.
    fn undirectify(&mut self) {
        let input_arc_num = self.arcs.len();
        let lookup: HashMap<(NodeId, NodeId), ArcId> = self.arcs.iter().map(|a| ((a.from, a.to), a.id)).collect();

        for index in 0..input_arc_num {
            let (from, to) = (self.arcs[index].from, self.arcs[index].to);

            if from == SOURCE_NODE || self.arcs[index].reverse.is_some() {
                continue;
            }

            let reverse = match lookup.get(&(to, from)) {
                Some(existing) => *existing,
                None => {
                    let bandwidth = self.arcs[index].bandwidth.clone();
                    self.push_arc(to, from, bandwidth, true)
                }
            };

            self.arcs[index].reverse = Some(reverse);
            self.arcs[reverse.index].reverse = Some(ArcId::new(index));
        }
    }

    fn setup_neighbors(&mut self) {
        for arc in self.arcs.iter() {
            self.neighbors[arc.from.index].push(arc.to);
            self.neighbors[arc.to.index].push(arc.from);
        }

        for list in self.neighbors.iter_mut() {
            list.sort();
            list.dedup();
        }
    }

    fn load_storage(&mut self, scenario: &Scenario) -> Result<()> {
        for row in scenario.storage.iter() {
            for holding in row.holdings.iter() {
                let downloader = self.downloader_index(holding.downloader).ok_or_else(|| {
                    Error::InvalidInput(format!("node {} holds content of unknown downloader {}", row.node, holding.downloader))
                })?;

                self.nodes[row.node.index].storage[0][downloader] += holding.bytes;
            }
        }

        Ok(())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index]
    }

    pub fn arc(&self, id: ArcId) -> &Arc {
        &self.arcs[id.index]
    }

    pub fn downloader_num(&self) -> usize {
        self.downloaders.len()
    }

    pub fn downloader_index(&self, node: NodeId) -> Option<usize> {
        self.downloader_index.get(node.index).copied().flatten()
    }

    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        &self.neighbors[node.index]
    }

    pub fn out_arcs(&self, node: NodeId) -> impl Iterator<Item = &Arc> + '_ {
        self.nodes[node.index].out_arcs.iter().map(move |id| &self.arcs[id.index])
    }

    /// `node` together with its one-hop neighbours.
    fn closed_neighborhood(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(node).chain(self.neighbors[node.index].iter().copied())
    }

    /// `true` when `a` and `b` cannot both be active in the same slot: one of `b`'s endpoints is an
    /// endpoint of `a` or a one-hop neighbour of one.
    pub fn conflicts(&self, a: ArcId, b: ArcId) -> bool {
        let arc_a = &self.arcs[a.index];
        let arc_b = &self.arcs[b.index];

        self.closed_neighborhood(arc_a.from).chain(self.closed_neighborhood(arc_a.to)).any(|node| arc_b.is_incident_to(node))
    }

    /// Every arc incident to the endpoints of `arc` or to any of their one-hop neighbours, `arc` included.
    pub fn interference_set(&self, arc: ArcId) -> Vec<ArcId> {
        let arc_ref = &self.arcs[arc.index];
        let mut blocked = vec![false; self.nodes.len()];

        for node in self.closed_neighborhood(arc_ref.from).chain(self.closed_neighborhood(arc_ref.to)) {
            blocked[node.index] = true;
        }

        self.arcs.iter().filter(|a| blocked[a.from.index] || blocked[a.to.index]).map(|a| a.id).collect()
    }

    /// Marks `arc` as the active transmission of `slot` and every interfering arc as non-idle.
    pub fn occupy_slot(&mut self, slot: usize, arc: ArcId) {
        self.vacate_slot(slot);

        for blocked in self.interference_set(arc) {
            self.arcs[blocked.index].idle[slot] = false;
        }
    }

    /// Restores the idle flag of every arc in `slot`.
    pub fn vacate_slot(&mut self, slot: usize) {
        for arc in self.arcs.iter_mut() {
            arc.idle[slot] = true;
        }
    }

    /// Commits `amount` bytes of `downloader`'s content on `arc` in `slot`.
    pub fn assign_flow(&mut self, arc: ArcId, slot: usize, amount: i64, downloader: usize) -> Result<()> {
        let arc_ref = &mut self.arcs[arc.index];

        if amount < 0 || amount > arc_ref.bandwidth[slot] {
            return Err(Error::InvariantViolation(format!(
                "flow {} on arc {} ({} -> {}) in slot {} exceeds bandwidth {}",
                amount, arc, arc_ref.from, arc_ref.to, slot, arc_ref.bandwidth[slot]
            )));
        }

        arc_ref.flow[slot] = amount;
        arc_ref.owner[slot] = Some(downloader);
        Ok(())
    }

    pub fn clear_flow(&mut self, arc: ArcId, slot: usize) {
        let arc_ref = &mut self.arcs[arc.index];
        arc_ref.flow[slot] = 0;
        arc_ref.owner[slot] = None;
    }

    /// Arcs carrying flow in `slot`.
    pub fn active_arcs(&self, slot: usize) -> Vec<ArcId> {
        self.arcs.iter().filter(|a| a.flow[slot] > 0).map(|a| a.id).collect()
    }
}
