use std::collections::BTreeSet;

use crate::domain::flow_graph::arc_path::ArcPaths;
use crate::domain::flow_graph::graph::FlowGraph;
use crate::domain::scenario::Scenario;
use crate::domain::schedule::capacity_replay::{SlotAmount, Transfer, replay_two_hop};
use crate::domain::scheduler::SchedulerConfig;
use crate::domain::utils::id::{ArcId, ArcPathId};
use crate::domain::utils::statistics::StatisticEvent;
use crate::error::Result;

/// The path hop holding a slot. Hop 0 is the first (or only) hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub path: ArcPathId,
    pub hop: usize,
}

/// Slots committed to one arc path, split by hop. Direct paths only use `first_hop`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChosenSlots {
    pub first_hop: BTreeSet<usize>,
    pub second_hop: BTreeSet<usize>,
}

impl ChosenSlots {
    pub fn hop(&self, hop: usize) -> &BTreeSet<usize> {
        if hop == 0 { &self.first_hop } else { &self.second_hop }
    }

    pub fn insert(&mut self, hop: usize, slot: usize) {
        if hop == 0 {
            self.first_hop.insert(slot);
        } else {
            self.second_hop.insert(slot);
        }
    }

    /// Removes `slot` from whichever hop holds it.
    pub fn remove(&mut self, slot: usize) -> bool {
        let first = self.first_hop.remove(&slot);
        let second = self.second_hop.remove(&slot);
        first || second
    }

    pub fn contains(&self, hop: usize, slot: usize) -> bool {
        self.hop(hop).contains(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.first_hop.is_empty() && self.second_hop.is_empty()
    }
}

/// Committed assignment of slots to path hops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeState {
    /// `occupants[slot]`: the single path hop transmitting in that slot.
    pub occupants: Vec<Option<Occupant>>,

    /// `chosen[path]`: slots committed to each path.
    pub chosen: Vec<ChosenSlots>,

    /// `delivered[path]`: bytes the path currently brings to its downloader.
    pub delivered: Vec<i64>,
}

impl SchemeState {
    pub fn new(slot_num: usize, path_num: usize) -> Self {
        SchemeState { occupants: vec![None; slot_num], chosen: vec![ChosenSlots::default(); path_num], delivered: vec![0; path_num] }
    }
}

/// Per-slot flow of one path for a given slot choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFlow {
    pub first_hop: Vec<SlotAmount>,
    pub second_hop: Vec<SlotAmount>,
    pub transfers: Vec<Transfer>,
    pub delivered: i64,
}

impl PathFlow {
    pub fn hop(&self, hop: usize) -> &[SlotAmount] {
        if hop == 0 { &self.first_hop } else { &self.second_hop }
    }
}

/// Deep copy of everything a committed scheme consists of.
#[derive(Debug, Clone)]
pub struct SchemeSnapshot {
    state: SchemeState,
    flows: Vec<Vec<i64>>,
    owners: Vec<Vec<Option<usize>>>,
    pub total_received: i64,
}

/// Working set of one scheduling invocation: graph, enumerated paths and the committed scheme.
#[derive(Debug, Clone)]
pub struct ScheduleContext {
    pub graph: FlowGraph,
    pub paths: ArcPaths,
    pub state: SchemeState,
    pub config: SchedulerConfig,

    /// Optimizer events of this invocation.
    pub trace: Vec<StatisticEvent>,
}

impl ScheduleContext {
    pub fn new(scenario: &Scenario, config: SchedulerConfig) -> Result<Self> {
        let graph = FlowGraph::build(scenario)?;
        let paths = ArcPaths::enumerate(&graph);
        let state = SchemeState::new(graph.slot_num, paths.len());

        log::info!(
            "ScheduleContext ready: {} nodes, {} arcs, {} arc paths, {} downloaders, {} slots.",
            graph.nodes.len(),
            graph.arcs.len(),
            paths.len(),
            graph.downloader_num(),
            graph.slot_num
        );

        Ok(ScheduleContext { graph, paths, state, config, trace: Vec::new() })
    }

    pub fn slot_num(&self) -> usize {
        self.graph.slot_num
    }

    pub fn downloader_num(&self) -> usize {
        self.graph.downloader_num()
    }

    /// Sum of the cached delivered amounts of all paths.
    pub fn total_delivered(&self) -> i64 {
        self.state.delivered.iter().sum()
    }

    fn hop_capacities(&self, arc: ArcId, slots: &BTreeSet<usize>) -> Vec<SlotAmount> {
        let bandwidth = &self.graph.arc(arc).bandwidth;
        slots.iter().map(|slot| SlotAmount::new(*slot, bandwidth[*slot])).collect()
    }

    /// Computes the flow `path` would carry on `chosen`, without committing anything.
    ///
    /// Direct paths use the full bandwidth of every chosen slot. Relay paths replay both hops
    /// against each other, see `replay_two_hop`.
    pub fn path_flow(&self, path: ArcPathId, chosen: &ChosenSlots) -> PathFlow {
        let path = self.paths.get(path);
        let first_hop = self.hop_capacities(path.arcs[0], &chosen.first_hop);

        if path.is_direct() {
            let delivered = first_hop.iter().map(|s| s.amount).sum();
            return PathFlow { first_hop, second_hop: Vec::new(), transfers: Vec::new(), delivered };
        }

        let second_hop = self.hop_capacities(path.arcs[1], &chosen.second_hop);
        let replay = replay_two_hop(&first_hop, &second_hop);

        PathFlow { first_hop: replay.hop_one, second_hop: replay.hop_two, transfers: replay.transfers, delivered: replay.delivered }
    }

    /// Records `slot` as held by `hop` of `path`. Flow is written by `commit_path_flow`.
    pub fn assign_slot(&mut self, path: ArcPathId, hop: usize, slot: usize) {
        self.state.chosen[path.index].insert(hop, slot);
        self.state.occupants[slot] = Some(Occupant { path, hop });
    }

    /// Frees `slot`: zeroes the occupant's flow and drops the slot from its chosen set.
    ///
    /// # Returns
    /// The evicted path, which must be re-committed to reconcile its remaining slots.
    pub fn evict_slot(&mut self, slot: usize) -> Option<ArcPathId> {
        let occupant = self.state.occupants[slot].take()?;
        let arc = self.paths.get(occupant.path).arcs[occupant.hop];

        self.graph.clear_flow(arc, slot);
        self.graph.vacate_slot(slot);
        self.state.chosen[occupant.path.index].remove(slot);

        Some(occupant.path)
    }

    /// Recomputes the flow of `path` on its chosen slots and writes it to the arcs.
    ///
    /// Slots left without flow are released.
    ///
    /// # Returns
    /// The released slots.
    pub fn commit_path_flow(&mut self, path_id: ArcPathId) -> Result<Vec<usize>> {
        let path = self.paths.get(path_id).clone();
        let flow = self.path_flow(path_id, &self.state.chosen[path_id.index]);
        let mut released: Vec<usize> = Vec::new();

        for (hop, arc) in path.arcs.iter().enumerate() {
            for entry in flow.hop(hop) {
                if entry.amount > 0 {
                    self.graph.assign_flow(*arc, entry.slot, entry.amount, path.downloader)?;
                    self.state.occupants[entry.slot] = Some(Occupant { path: path_id, hop });
                    self.graph.occupy_slot(entry.slot, *arc);
                    continue;
                }

                self.graph.clear_flow(*arc, entry.slot);
                self.state.chosen[path_id.index].remove(entry.slot);

                if self.state.occupants[entry.slot].is_some_and(|o| o.path == path_id) {
                    self.state.occupants[entry.slot] = None;
                    self.graph.vacate_slot(entry.slot);
                }

                released.push(entry.slot);
            }
        }

        self.state.delivered[path_id.index] = flow.delivered;

        if !released.is_empty() {
            log::debug!("Arc path {} released slots {:?} after reconciling its flow.", path_id, released);
        }

        Ok(released)
    }

    pub fn snapshot(&self, total_received: i64) -> SchemeSnapshot {
        SchemeSnapshot {
            state: self.state.clone(),
            flows: self.graph.arcs.iter().map(|a| a.flow.clone()).collect(),
            owners: self.graph.arcs.iter().map(|a| a.owner.clone()).collect(),
            total_received,
        }
    }

    /// Reinstates a snapshot, including the interference flags of every slot.
    pub fn restore(&mut self, snapshot: &SchemeSnapshot) {
        self.state = snapshot.state.clone();

        for (arc, (flow, owner)) in self.graph.arcs.iter_mut().zip(snapshot.flows.iter().zip(snapshot.owners.iter())) {
            arc.flow.clone_from(flow);
            arc.owner.clone_from(owner);
        }

        for slot in 0..self.slot_num() {
            match self.state.occupants[slot] {
                Some(occupant) => {
                    let arc = self.paths.get(occupant.path).arcs[occupant.hop];
                    self.graph.occupy_slot(slot, arc);
                }
                None => self.graph.vacate_slot(slot),
            }
        }
    }
}
