use std::fmt;

use crate::domain::schedule::segment::Segment;
use crate::domain::utils::id::NodeId;

/// One scheduled transmission: in `slot`, send `byte_amount` bytes of `downloader_id`'s content,
/// exactly the bytes in `segment`, to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxScheme {
    /// 1-based slot number.
    pub slot: usize,
    pub destination: NodeId,
    pub downloader_id: NodeId,
    pub byte_amount: i64,
    pub segment: Segment,
}

impl fmt::Display for FluxScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {} {}", self.slot, self.destination, self.downloader_id, self.byte_amount, self.segment)
    }
}

/// The slot-ordered instruction list of one sending node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSchedule {
    pub node: NodeId,
    pub schemes: Vec<FluxScheme>,
}

impl NodeSchedule {
    pub fn total_bytes(&self) -> i64 {
        self.schemes.iter().map(|s| s.byte_amount).sum()
    }
}

