/// Capacity (or flow) of one hop in one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAmount {
    pub slot: usize,
    pub amount: i64,
}

impl SlotAmount {
    pub fn new(slot: usize, amount: i64) -> Self {
        SlotAmount { slot, amount }
    }
}

/// `amount` bytes received by the relay in `hop_one_slot` and forwarded in `hop_two_slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub hop_one_slot: usize,
    pub hop_two_slot: usize,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwoHopReplay {
    /// Flow per hop-one slot, same order as the input.
    pub hop_one: Vec<SlotAmount>,

    /// Flow per hop-two slot, same order as the input.
    pub hop_two: Vec<SlotAmount>,

    /// Matched transfers ordered by hop-two slot, then hop-one slot.
    pub transfers: Vec<Transfer>,

    pub delivered: i64,
}

/// Replays the capacities of both hops of a relay path against each other.
///
/// The relay stores and forwards: bytes received in hop-one slot `m` can leave in a hop-two slot `n`
/// only if `m < n`. Walking both slot lists in order with one cursor each, every hop-two slot pulls
/// from the earliest hop-one slot that still has unforwarded capacity. Hop-one bytes that are never
/// forwarded are not sent at all, so both hops always carry the same total.
///
/// Both slices must be sorted by slot. Negative capacities count as zero.
pub fn replay_two_hop(hop_one: &[SlotAmount], hop_two: &[SlotAmount]) -> TwoHopReplay {
    debug_assert!(hop_one.windows(2).all(|w| w[0].slot < w[1].slot), "hop-one slots must be sorted");
    debug_assert!(hop_two.windows(2).all(|w| w[0].slot < w[1].slot), "hop-two slots must be sorted");

    let mut remaining: Vec<i64> = hop_one.iter().map(|s| s.amount.max(0)).collect();
    let mut flow_one: Vec<i64> = vec![0; hop_one.len()];
    let mut flow_two: Vec<i64> = vec![0; hop_two.len()];
    let mut transfers: Vec<Transfer> = Vec::new();
    let mut cursor: usize = 0;

    for (position, forward) in hop_two.iter().enumerate() {
        let mut room = forward.amount.max(0);

        while room > 0 && cursor < hop_one.len() && hop_one[cursor].slot < forward.slot {
            if remaining[cursor] == 0 {
                cursor += 1;
                continue;
            }

            let amount = room.min(remaining[cursor]);
            remaining[cursor] -= amount;
            room -= amount;
            flow_one[cursor] += amount;
            flow_two[position] += amount;

            transfers.push(Transfer { hop_one_slot: hop_one[cursor].slot, hop_two_slot: forward.slot, amount });
        }
    }

    let delivered = flow_two.iter().sum();

    TwoHopReplay {
        hop_one: hop_one.iter().zip(flow_one).map(|(s, f)| SlotAmount::new(s.slot, f)).collect(),
        hop_two: hop_two.iter().zip(flow_two).map(|(s, f)| SlotAmount::new(s.slot, f)).collect(),
        transfers,
        delivered,
    }
}
