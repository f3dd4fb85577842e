use std::collections::{BTreeMap, HashMap};

use crate::domain::schedule::flux_scheme::{FluxScheme, NodeSchedule};
use crate::domain::schedule::scheme::{ChosenSlots, ScheduleContext};
use crate::domain::schedule::segment::{ByteRange, Segment};
use crate::domain::utils::id::{ArcPathId, NodeId};
use crate::error::{Error, Result};

/// Per-sender instruction lists of a finished scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Sending nodes in ascending id order, each with its slot-ordered schemes.
    pub node_schedules: Vec<NodeSchedule>,

    /// Bytes arriving at every downloader, by downloader index.
    pub delivered: Vec<i64>,
}

impl ScheduleContext {
    /// Drops arc paths without committed flow and renumbers the rest.
    ///
    /// # Returns
    /// The number of dropped paths.
    pub fn compact_paths(&mut self) -> usize {
        let delivered = self.state.delivered.clone();
        let before = self.paths.len();
        let former_ids = self.paths.retain(|p| delivered[p.id.index] > 0);

        let mut renumbered: Vec<Option<ArcPathId>> = vec![None; before];
        for (index, former) in former_ids.iter().enumerate() {
            renumbered[former.index] = Some(ArcPathId::new(index));
        }

        self.state.chosen = former_ids.iter().map(|former| self.state.chosen[former.index].clone()).collect();
        self.state.delivered = former_ids.iter().map(|former| delivered[former.index]).collect();

        for occupant in self.state.occupants.iter_mut() {
            *occupant = occupant.and_then(|mut o| {
                o.path = renumbered[o.path.index]?;
                Some(o)
            });
        }

        before - self.paths.len()
    }

    /// Turns the committed scheme into per-sender `FluxScheme` lists.
    ///
    /// Every downloader's content is numbered by arrival: its final-hop deliveries, taken in slot order,
    /// get consecutive byte ranges starting at offset 0. The relay's receiving slots then get exactly
    /// the ranges they later forward, which splits a hop-one segment where a direct delivery landed
    /// in between.
    pub fn extract(&mut self) -> Result<Extraction> {
        let dropped = self.compact_paths();
        if dropped > 0 {
            log::debug!("Dropped {} arc paths without flow before extraction.", dropped);
        }

        let mut by_sender: BTreeMap<NodeId, Vec<FluxScheme>> = BTreeMap::new();
        let mut delivered = vec![0; self.downloader_num()];

        for downloader in 0..self.downloader_num() {
            let downloader_node = self.graph.downloaders[downloader];
            let paths: Vec<ArcPathId> = self.paths.for_downloader(downloader).iter().map(|p| p.id).collect();

            // (slot, path, bytes) of every delivery into the downloader
            let mut arrivals: Vec<(usize, ArcPathId, i64)> = Vec::new();
            for path in paths.iter() {
                let last_hop = self.paths.get(*path).hop_count() - 1;
                let flow = self.path_flow(*path, &self.state.chosen[path.index]);
                arrivals.extend(flow.hop(last_hop).iter().filter(|s| s.amount > 0).map(|s| (s.slot, *path, s.amount)));
            }
            arrivals.sort();

            let mut offsets: HashMap<(ArcPathId, usize), i64> = HashMap::new();
            let mut cursor: i64 = 0;
            for (slot, path, amount) in arrivals.iter() {
                offsets.insert((*path, *slot), cursor);
                cursor += amount;
            }
            delivered[downloader] = cursor;

            for path in paths {
                let chosen = self.state.chosen[path.index].clone();
                self.extract_path(path, &chosen, downloader_node, &offsets, &mut by_sender)?;
            }
        }

        let node_schedules: Vec<NodeSchedule> = by_sender
            .into_iter()
            .map(|(node, mut schemes)| {
                schemes.sort_by_key(|s| (s.slot, s.downloader_id, s.destination));
                NodeSchedule { node, schemes }
            })
            .collect();

        log::info!(
            "Extracted {} flux schemes for {} sending nodes, delivering {} bytes.",
            node_schedules.iter().map(|n| n.schemes.len()).sum::<usize>(),
            node_schedules.len(),
            delivered.iter().sum::<i64>()
        );

        Ok(Extraction { node_schedules, delivered })
    }

    fn extract_path(
        &self,
        path_id: ArcPathId,
        chosen: &ChosenSlots,
        downloader_node: NodeId,
        offsets: &HashMap<(ArcPathId, usize), i64>,
        by_sender: &mut BTreeMap<NodeId, Vec<FluxScheme>>,
    ) -> Result<()> {
        let path = self.paths.get(path_id);
        let flow = self.path_flow(path_id, chosen);
        let last_hop = path.hop_count() - 1;
        let last_arc = self.graph.arc(path.last_arc());

        let arrival_offset = |slot: usize| -> Result<i64> {
            offsets
                .get(&(path_id, slot))
                .copied()
                .ok_or_else(|| Error::InvariantViolation(format!("delivery of arc path {} in slot {} has no byte offset", path_id, slot)))
        };

        for entry in flow.hop(last_hop).iter().filter(|s| s.amount > 0) {
            let begin = arrival_offset(entry.slot)?;
            by_sender.entry(last_arc.from).or_default().push(FluxScheme {
                slot: entry.slot + 1,
                destination: last_arc.to,
                downloader_id: downloader_node,
                byte_amount: entry.amount,
                segment: Segment::from_range(begin, begin + entry.amount),
            });
        }

        if path.is_direct() {
            return Ok(());
        }

        // Hand every forwarding slot's range to the receiving slots it drew from, in replay order.
        let mut received: BTreeMap<usize, Vec<ByteRange>> = BTreeMap::new();
        let mut forwarded: HashMap<usize, i64> = HashMap::new();

        for transfer in flow.transfers.iter() {
            let taken = forwarded.entry(transfer.hop_two_slot).or_insert(0);
            let begin = arrival_offset(transfer.hop_two_slot)? + *taken;
            *taken += transfer.amount;

            received.entry(transfer.hop_one_slot).or_default().push(ByteRange::new(begin, begin + transfer.amount));
        }

        let first_arc = self.graph.arc(path.arcs[0]);

        for entry in flow.first_hop.iter().filter(|s| s.amount > 0) {
            let mut ranges = received.remove(&entry.slot).unwrap_or_default();
            ranges.sort();

            let mut segment = Segment::new();
            for range in ranges {
                segment.push(range)?;
            }

            if segment.byte_len() != entry.amount {
                return Err(Error::InvariantViolation(format!(
                    "relay slot {} of arc path {} carries {} bytes but its segment covers {}",
                    entry.slot,
                    path_id,
                    entry.amount,
                    segment.byte_len()
                )));
            }

            by_sender.entry(first_arc.from).or_default().push(FluxScheme {
                slot: entry.slot + 1,
                destination: first_arc.to,
                downloader_id: downloader_node,
                byte_amount: entry.amount,
                segment,
            });
        }

        Ok(())
    }
}
