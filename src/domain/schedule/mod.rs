pub mod capacity_replay;
pub mod extractor;
pub mod flux_scheme;
pub mod initial_scheme;
pub mod invariants;
pub mod optimizer;
pub mod scheme;
pub mod segment;
pub mod storage_simulator;
