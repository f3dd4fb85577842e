use std::time::Instant;

use crate::domain::schedule::scheme::ScheduleContext;
use crate::domain::utils::id::ArcPathId;
use crate::domain::utils::statistics::{StatParameter, StatisticEvent};
use crate::error::Result;

/// Delta of a candidate that would change nothing.
pub const NO_OP_DELTA: i64 = i64::MIN / 2;

/// Predicted effect of reassigning two slots to a relay path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveDelta {
    /// Change of the total delivered bytes over all downloaders.
    pub total: i64,

    /// Change of the bytes delivered to the downloader the relay path serves.
    pub starved_gain: i64,
}

impl MoveDelta {
    pub fn no_op() -> Self {
        MoveDelta { total: NO_OP_DELTA, starved_gain: 0 }
    }

    pub fn is_no_op(&self) -> bool {
        self.total == NO_OP_DELTA
    }
}

/// Reassignment of `hop_one_slot` to the first hop and `hop_two_slot` to the second hop of `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayMove {
    pub path: ArcPathId,
    pub hop_one_slot: usize,
    pub hop_two_slot: usize,
    pub delta: MoveDelta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizerOutcome {
    /// Loop passes, bounded by the iteration cap.
    pub passes: usize,

    /// Passes that committed a move.
    pub committed_moves: usize,

    pub initial_total: i64,
    pub best_total: i64,

    /// Every recorded better-scheme total, starting with the initial one.
    pub best_history: Vec<i64>,

    /// The loop ended because no downloader had a relay move left, not because of the cap.
    pub exhausted: bool,

    /// The final scheme was worse than the best one and got replaced by it.
    pub reverted: bool,
}

impl ScheduleContext {
    /// `downloaderNum * slotNum / 2` unless configured otherwise.
    pub fn iteration_cap(&self) -> usize {
        self.config.iteration_cap.unwrap_or(self.downloader_num() * self.slot_num() / 2)
    }

    /// Net change in delivered bytes if `hop_one_slot` went to the first hop of `path` and `hop_two_slot`
    /// to its second hop.
    ///
    /// Every path currently holding one of the two slots loses it; relay paths losing one hop are
    /// replayed on what is left, which covers the cascade onto their other hop. The moved path is replayed
    /// with both new slots.
    pub fn alternative_flow_delta(&self, path: ArcPathId, hop_one_slot: usize, hop_two_slot: usize) -> MoveDelta {
        let chosen = &self.state.chosen[path.index];

        if hop_one_slot == hop_two_slot || (chosen.contains(0, hop_one_slot) && chosen.contains(1, hop_two_slot)) {
            return MoveDelta::no_op();
        }

        let mut affected: Vec<ArcPathId> = Vec::with_capacity(3);
        for slot in [hop_one_slot, hop_two_slot] {
            if let Some(occupant) = self.state.occupants[slot] {
                if !affected.contains(&occupant.path) {
                    affected.push(occupant.path);
                }
            }
        }
        if !affected.contains(&path) {
            affected.push(path);
        }

        let served = self.paths.get(path).downloader;
        let mut delta = MoveDelta { total: 0, starved_gain: 0 };

        for candidate in affected {
            let mut slots = self.state.chosen[candidate.index].clone();
            slots.remove(hop_one_slot);
            slots.remove(hop_two_slot);

            if candidate == path {
                slots.insert(0, hop_one_slot);
                slots.insert(1, hop_two_slot);
            }

            let change = self.path_flow(candidate, &slots).delivered - self.state.delivered[candidate.index];
            delta.total += change;

            if self.paths.get(candidate).downloader == served {
                delta.starved_gain += change;
            }
        }

        delta
    }

    /// Scans every relay path of `downloader` and every ordered pair of distinct slots.
    ///
    /// Only moves that raise the downloader's own delivered amount qualify; among them the largest total
    /// delta wins, ties going to the first found.
    pub fn best_relay_move(&self, downloader: usize) -> Option<RelayMove> {
        let slot_num = self.slot_num();
        let mut best: Option<RelayMove> = None;

        for path in self.paths.relay_paths(downloader) {
            let hop_one = self.graph.arc(path.arcs[0]);
            let hop_two = self.graph.arc(path.arcs[1]);

            for hop_one_slot in 0..slot_num {
                if hop_one.bandwidth[hop_one_slot] <= 0 {
                    continue;
                }

                for hop_two_slot in 0..slot_num {
                    if hop_two_slot == hop_one_slot || hop_two.bandwidth[hop_two_slot] <= 0 {
                        continue;
                    }

                    let delta = self.alternative_flow_delta(path.id, hop_one_slot, hop_two_slot);

                    if delta.is_no_op() || delta.starved_gain <= 0 {
                        continue;
                    }

                    if best.is_none_or(|b| delta.total > b.delta.total) {
                        best = Some(RelayMove { path: path.id, hop_one_slot, hop_two_slot, delta });
                    }
                }
            }
        }

        best
    }

    /// Commits a relay move: evicts both slots, hands them to the path, reconciles every touched path
    /// and re-fills slots the cascade released.
    pub fn apply_relay_move(&mut self, relay_move: &RelayMove) -> Result<()> {
        let mut touched: Vec<ArcPathId> = Vec::with_capacity(3);

        for slot in [relay_move.hop_one_slot, relay_move.hop_two_slot] {
            if let Some(evicted) = self.evict_slot(slot) {
                if !touched.contains(&evicted) {
                    touched.push(evicted);
                }
            }
        }

        self.assign_slot(relay_move.path, 0, relay_move.hop_one_slot);
        self.assign_slot(relay_move.path, 1, relay_move.hop_two_slot);

        if !touched.contains(&relay_move.path) {
            touched.push(relay_move.path);
        }

        let mut released: Vec<usize> = Vec::new();
        for path in touched {
            released.extend(self.commit_path_flow(path)?);
        }

        self.refill_slots(&released)
    }

    /// The downloader with the smallest received amount that still has relay moves to try.
    fn starved_downloader(received: &[i64], exhausted: &[bool]) -> Option<usize> {
        (0..received.len()).filter(|d| !exhausted[*d]).min_by_key(|d| (received[*d], *d))
    }

    /// Local search over relay reassignments.
    ///
    /// Each pass picks the most starved downloader and commits its best relay move. Moves may lower the total,
    /// so the best scheme seen is kept and reinstated at the end if the last one is worse.
    pub fn optimize(&mut self) -> Result<OptimizerOutcome> {
        let started = Instant::now();
        let cap = self.iteration_cap();
        let slot_num = self.slot_num();

        let mut tally = self.graph.simulate_storage()?;
        let mut outcome = OptimizerOutcome {
            initial_total: tally.total_received,
            best_total: tally.total_received,
            best_history: vec![tally.total_received],
            ..Default::default()
        };
        let mut best = self.snapshot(tally.total_received);

        // Relay moves need two distinct slots.
        let mut exhausted: Vec<bool> = (0..self.downloader_num()).map(|d| slot_num < 2 || self.paths.relay_paths(d).next().is_none()).collect();

        self.record_pass(0, "initial scheme", None, None, tally.total_received, outcome.best_total, &started);

        while outcome.passes < cap {
            let Some(starved) = Self::starved_downloader(&tally.received, &exhausted) else {
                outcome.exhausted = true;
                break;
            };

            outcome.passes += 1;

            let Some(relay_move) = self.best_relay_move(starved) else {
                exhausted[starved] = true;
                log::debug!("Pass {}: downloader {} has no improving relay move left.", outcome.passes, self.graph.downloaders[starved]);
                self.record_pass(outcome.passes, "downloader exhausted", Some(starved), None, tally.total_received, outcome.best_total, &started);
                continue;
            };

            self.apply_relay_move(&relay_move)?;
            if self.config.verify_invariants {
                self.verify_flow_conservation()?;
            }
            tally = self.graph.simulate_storage()?;
            outcome.committed_moves += 1;

            log::debug!(
                "Pass {}: downloader {} takes slots {} / {} on arc path {} (predicted delta {}), total now {}.",
                outcome.passes,
                self.graph.downloaders[starved],
                relay_move.hop_one_slot,
                relay_move.hop_two_slot,
                relay_move.path,
                relay_move.delta.total,
                tally.total_received
            );

            if tally.total_received > outcome.best_total {
                outcome.best_total = tally.total_received;
                outcome.best_history.push(tally.total_received);
                best = self.snapshot(tally.total_received);
                log::debug!("Pass {}: new best scheme delivers {} bytes.", outcome.passes, tally.total_received);
            }

            self.record_pass(outcome.passes, "relay move", Some(starved), Some(&relay_move), tally.total_received, outcome.best_total, &started);
        }

        if outcome.passes >= cap && !outcome.exhausted {
            log::debug!("Optimizer stopped at its iteration cap of {} passes.", cap);
        }

        if tally.total_received < best.total_received {
            log::warn!("Final scheme delivers {} bytes, reverting to the best scheme with {} bytes.", tally.total_received, best.total_received);
            self.restore(&best);
            outcome.reverted = true;
        }

        log::info!(
            "Optimizer finished after {} passes ({} moves): {} -> {} bytes in {:.3} ms.",
            outcome.passes,
            outcome.committed_moves,
            outcome.initial_total,
            outcome.best_total,
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(outcome)
    }

    fn record_pass(
        &mut self,
        pass: usize,
        description: &str,
        downloader: Option<usize>,
        relay_move: Option<&RelayMove>,
        total_received: i64,
        best_total: i64,
        started: &Instant,
    ) {
        let mut event = StatisticEvent::new();
        event
            .set(StatParameter::Iteration, pass)
            .set(StatParameter::LogDescription, description)
            .set(StatParameter::TotalReceived, total_received)
            .set(StatParameter::BestTotal, best_total)
            .set(StatParameter::ProcessingTime, started.elapsed().as_secs_f64() * 1000.0);

        if let Some(downloader) = downloader {
            event.set(StatParameter::Downloader, self.graph.downloaders[downloader].index);
        }

        if let Some(relay_move) = relay_move {
            event
                .set(StatParameter::ArcPath, relay_move.path.index)
                .set(StatParameter::HopOneSlot, relay_move.hop_one_slot)
                .set(StatParameter::HopTwoSlot, relay_move.hop_two_slot)
                .set(StatParameter::Delta, relay_move.delta.total);
        }

        self.trace.push(event);
    }
}
