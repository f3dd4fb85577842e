pub mod flow_graph;
pub mod scenario;
pub mod schedule;
pub mod scheduler;
pub mod utils;
