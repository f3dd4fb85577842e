pub mod arc_path;
pub mod graph;
