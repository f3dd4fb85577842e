use crate::domain::schedule::scheme::ScheduleContext;
use crate::error::{Error, Result};

impl ScheduleContext {
    /// Every committed flow lies within `[0, bandwidth]` of its arc and slot.
    pub fn verify_capacity(&self) -> Result<()> {
        for arc in self.graph.arcs.iter() {
            for slot in 0..self.slot_num() {
                let flow = arc.flow[slot];

                if flow < 0 || flow > arc.bandwidth[slot] {
                    return Err(Error::InvariantViolation(format!(
                        "arc {} ({} -> {}) carries {} bytes in slot {} with bandwidth {}",
                        arc.id, arc.from, arc.to, flow, slot, arc.bandwidth[slot]
                    )));
                }
            }
        }

        Ok(())
    }

    /// No two conflicting arcs are active in one slot, and the interference set of every active arc
    /// is marked non-idle.
    pub fn verify_contention(&self) -> Result<()> {
        for slot in 0..self.slot_num() {
            let active = self.graph.active_arcs(slot);

            for (position, a) in active.iter().enumerate() {
                for b in active.iter().skip(position + 1) {
                    if self.graph.conflicts(*a, *b) {
                        return Err(Error::InvariantViolation(format!("conflicting arcs {} and {} are both active in slot {}", a, b, slot)));
                    }
                }

                if let Some(idle) = self.graph.interference_set(*a).into_iter().find(|blocked| self.graph.arc(*blocked).idle[slot]) {
                    return Err(Error::InvariantViolation(format!("arc {} is idle in slot {} although arc {} is active", idle, slot, a)));
                }
            }
        }

        Ok(())
    }

    /// Committed arc flows match what every path's chosen slots yield, slot occupants agree with the
    /// arcs carrying flow, and relay paths forward exactly what they receive.
    pub fn verify_flow_conservation(&self) -> Result<()> {
        for slot in 0..self.slot_num() {
            let active = self.graph.active_arcs(slot);

            let expected = self.state.occupants[slot].map(|occupant| {
                let path = self.paths.get(occupant.path);
                (path.arcs[occupant.hop], path.downloader)
            });

            match expected {
                None if !active.is_empty() => {
                    return Err(Error::InvariantViolation(format!("slot {} has no occupant but arcs {:?} carry flow", slot, active)));
                }
                Some((arc, downloader)) => {
                    if active != [arc] {
                        return Err(Error::InvariantViolation(format!("slot {} is held by arc {} but arcs {:?} carry flow", slot, arc, active)));
                    }

                    if self.graph.arc(arc).owner[slot] != Some(downloader) {
                        return Err(Error::InvariantViolation(format!("arc {} carries flow in slot {} for the wrong downloader", arc, slot)));
                    }
                }
                None => {}
            }
        }

        for path in self.paths.paths.iter() {
            let flow = self.path_flow(path.id, &self.state.chosen[path.id.index]);

            for (hop, arc) in path.arcs.iter().enumerate() {
                for entry in flow.hop(hop) {
                    let committed = self.graph.arc(*arc).flow[entry.slot];

                    if committed != entry.amount {
                        return Err(Error::InvariantViolation(format!(
                            "arc path {} hop {} should carry {} bytes in slot {} but arc {} carries {}",
                            path.id, hop, entry.amount, entry.slot, arc, committed
                        )));
                    }
                }
            }

            if !path.is_direct() {
                let received: i64 = flow.first_hop.iter().map(|s| s.amount).sum();
                let forwarded: i64 = flow.second_hop.iter().map(|s| s.amount).sum();

                if received != forwarded {
                    return Err(Error::InvariantViolation(format!("relay on arc path {} receives {} bytes but forwards {}", path.id, received, forwarded)));
                }
            }

            if flow.delivered != self.state.delivered[path.id.index] {
                return Err(Error::InvariantViolation(format!(
                    "arc path {} delivers {} bytes but {} are recorded",
                    path.id, flow.delivered, self.state.delivered[path.id.index]
                )));
            }
        }

        Ok(())
    }

    pub fn verify_invariants(&self) -> Result<()> {
        self.verify_capacity()?;
        self.verify_contention()?;
        self.verify_flow_conservation()?;

        log::debug!("Scheme invariants hold.");
        Ok(())
    }
}
