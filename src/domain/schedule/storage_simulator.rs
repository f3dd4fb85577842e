use crate::domain::flow_graph::graph::FlowGraph;
use crate::domain::scenario::SOURCE_NODE;
use crate::error::{Error, Result};

/// Result of replaying the committed flows through every node's storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryTally {
    /// Bytes each downloader received over the horizon, by downloader index.
    pub received: Vec<i64>,

    /// Sum of `received`, the optimization objective.
    pub total_received: i64,

    /// Bytes the source sent per downloader. The source is never clamped.
    pub source_consumed: Vec<i64>,

    /// Bytes dropped because a relay forwarded more than it held.
    pub clamped: i64,
}

impl FlowGraph {
    /// Replays committed flows slot by slot into the `storage` table of every node.
    ///
    /// In slot `j` every node starts from its row `j`. An arc moves `min(flow, held)` bytes, where `held`
    /// is what the sender stored at the start of the slot, so relayed bytes must have arrived in an
    /// earlier slot. The source has unlimited supply.
    pub fn simulate_storage(&mut self) -> Result<DeliveryTally> {
        let downloader_num = self.downloader_num();
        let slot_num = self.slot_num;

        let mut tally = DeliveryTally { received: vec![0; downloader_num], total_received: 0, source_consumed: vec![0; downloader_num], clamped: 0 };

        for slot in 0..slot_num {
            for node in self.nodes.iter_mut() {
                let (before, after) = node.storage.split_at_mut(slot + 1);
                after[0].clone_from(&before[slot]);
            }

            for arc_index in 0..self.arcs.len() {
                let arc = &self.arcs[arc_index];
                let flow = arc.flow[slot];

                if flow == 0 {
                    continue;
                }

                if flow > arc.bandwidth[slot] || flow < 0 {
                    return Err(Error::InvariantViolation(format!(
                        "arc {} ({} -> {}) carries {} bytes in slot {} with bandwidth {}",
                        arc.id, arc.from, arc.to, flow, slot, arc.bandwidth[slot]
                    )));
                }

                let downloader = arc.owner[slot].ok_or_else(|| {
                    Error::InvariantViolation(format!("arc {} ({} -> {}) carries flow in slot {} without an owning downloader", arc.id, arc.from, arc.to, slot))
                })?;

                let (from, to) = (arc.from, arc.to);

                let transferred = if from == SOURCE_NODE {
                    tally.source_consumed[downloader] += flow;
                    flow
                } else {
                    let held = self.nodes[from.index].storage[slot][downloader];
                    let moved = flow.min(held.max(0));

                    if moved < flow {
                        log::debug!("Node {} holds {} bytes for downloader {} in slot {} but should forward {}.", from, held, downloader, slot, flow);
                        tally.clamped += flow - moved;
                    }

                    self.nodes[from.index].storage[slot + 1][downloader] -= moved;
                    moved
                };

                self.nodes[to.index].storage[slot + 1][downloader] += transferred;
            }
        }

        for (downloader, node) in self.downloaders.iter().enumerate() {
            let storage = &self.nodes[node.index].storage;
            tally.received[downloader] = storage[slot_num][downloader] - storage[0][downloader];
        }

        tally.total_received = tally.received.iter().sum();

        Ok(tally)
    }
}
