use crate::domain::schedule::scheme::ScheduleContext;
use crate::domain::utils::id::ArcPathId;
use crate::error::Result;

impl ScheduleContext {
    /// Finds the direct path with the largest bandwidth in `slot` among all downloaders.
    ///
    /// Only idle arcs with positive bandwidth qualify. Ties go to the lowest downloader index.
    pub fn best_direct_path(&self, slot: usize) -> Option<ArcPathId> {
        let mut best: Option<(ArcPathId, i64)> = None;

        for downloader in 0..self.downloader_num() {
            let Some(path) = self.paths.direct_path(downloader) else {
                continue;
            };

            let arc = self.graph.arc(path.arcs[0]);
            let bandwidth = arc.bandwidth[slot];

            if bandwidth <= 0 || !arc.idle[slot] {
                continue;
            }

            if best.is_none_or(|(_, best_bandwidth)| bandwidth > best_bandwidth) {
                best = Some((path.id, bandwidth));
            }
        }

        best.map(|(path, _)| path)
    }

    /// Gives an empty `slot` to the best direct path, with that path's full bandwidth as flow.
    ///
    /// # Returns
    /// `true` if the slot was filled.
    pub fn fill_slot_with_direct(&mut self, slot: usize) -> Result<bool> {
        if self.state.occupants[slot].is_some() {
            return Ok(false);
        }

        let Some(path_id) = self.best_direct_path(slot) else {
            return Ok(false);
        };

        let path = self.paths.get(path_id);
        let (arc, downloader) = (path.arcs[0], path.downloader);
        let bandwidth = self.graph.arc(arc).bandwidth[slot];

        self.graph.assign_flow(arc, slot, bandwidth, downloader)?;
        self.graph.occupy_slot(slot, arc);
        self.assign_slot(path_id, 0, slot);
        self.state.delivered[path_id.index] += bandwidth;

        Ok(true)
    }

    /// Greedy baseline: every slot, processed in order, goes to the best direct link of that slot.
    ///
    /// # Returns
    /// The total amount delivered by the baseline.
    pub fn build_initial_scheme(&mut self) -> Result<i64> {
        let mut filled: usize = 0;

        for slot in 0..self.slot_num() {
            if self.fill_slot_with_direct(slot)? {
                filled += 1;
            }
        }

        let total = self.total_delivered();
        log::info!("Initial scheme fills {} of {} slots with direct links, delivering {} bytes.", filled, self.slot_num(), total);

        Ok(total)
    }

    /// Re-fills slots released during a cascade the same way the initial scheme would.
    pub fn refill_slots(&mut self, slots: &[usize]) -> Result<()> {
        for slot in slots.iter() {
            if self.fill_slot_with_direct(*slot)? {
                log::debug!("Released slot {} re-filled with a direct link.", slot);
            }
        }

        Ok(())
    }
}
