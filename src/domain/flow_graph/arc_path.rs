use crate::domain::flow_graph::graph::FlowGraph;
use crate::domain::scenario::SOURCE_NODE;
use crate::domain::utils::id::{ArcId, ArcPathId, NodeId};

/// A route from the source to one downloader: either one direct arc, or source -> relay -> downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcPath {
    pub id: ArcPathId,

    /// One or two arcs, in hop order.
    pub arcs: Vec<ArcId>,

    /// Downloader index served by the path.
    pub downloader: usize,
}

impl ArcPath {
    pub fn is_direct(&self) -> bool {
        self.arcs.len() == 1
    }

    pub fn hop_count(&self) -> usize {
        self.arcs.len()
    }

    /// The arc delivering into the downloader.
    pub fn last_arc(&self) -> ArcId {
        self.arcs[self.arcs.len() - 1]
    }

    /// Intermediate node of a relay path.
    pub fn relay(&self, graph: &FlowGraph) -> Option<NodeId> {
        if self.is_direct() { None } else { Some(graph.arc(self.arcs[0]).to) }
    }
}

/// Contiguous index range `[start, end)` of one downloader's paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArcPathRange {
    pub start: usize,
    pub end: usize,
}

impl ArcPathRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// All enumerated paths, grouped by downloader and sorted by hop count inside each group.
#[derive(Debug, Clone, Default)]
pub struct ArcPaths {
    pub paths: Vec<ArcPath>,

    /// `ranges[downloader]` indexes into `paths`.
    pub ranges: Vec<ArcPathRange>,
}

impl ArcPaths {
    /// Lists every direct arc from the source into a downloader, and every source -> neighbour -> downloader
    /// route where the neighbour itself has a direct arc to that downloader.
    pub fn enumerate(graph: &FlowGraph) -> ArcPaths {
        let mut found: Vec<(usize, Vec<ArcId>)> = Vec::new();

        if graph.nodes.is_empty() {
            return ArcPaths { paths: Vec::new(), ranges: vec![ArcPathRange::default(); graph.downloader_num()] };
        }

        for first_hop in graph.out_arcs(SOURCE_NODE) {
            if let Some(downloader) = graph.downloader_index(first_hop.to) {
                found.push((downloader, vec![first_hop.id]));
            }
        }

        for first_hop in graph.out_arcs(SOURCE_NODE) {
            let relay = first_hop.to;

            for second_hop in graph.out_arcs(relay) {
                if second_hop.to == SOURCE_NODE || second_hop.to == relay {
                    continue;
                }

                if let Some(downloader) = graph.downloader_index(second_hop.to) {
                    found.push((downloader, vec![first_hop.id, second_hop.id]));
                }
            }
        }

        // Stable: tuple order survives inside equal keys, so the direct path leads its group.
        found.sort_by_key(|(downloader, arcs)| (*downloader, arcs.len()));

        let paths: Vec<ArcPath> =
            found.into_iter().enumerate().map(|(index, (downloader, arcs))| ArcPath { id: ArcPathId::new(index), arcs, downloader }).collect();

        let ranges = Self::compute_ranges(&paths, graph.downloader_num());

        log::debug!(
            "Enumerated {} arc paths ({} direct, {} relay) for {} downloaders.",
            paths.len(),
            paths.iter().filter(|p| p.is_direct()).count(),
            paths.iter().filter(|p| !p.is_direct()).count(),
            graph.downloader_num()
        );

        ArcPaths { paths, ranges }
    }

    fn compute_ranges(paths: &[ArcPath], downloader_num: usize) -> Vec<ArcPathRange> {
        let mut ranges = vec![ArcPathRange::default(); downloader_num];
        let mut cursor = 0;

        for (downloader, range) in ranges.iter_mut().enumerate() {
            range.start = cursor;
            while cursor < paths.len() && paths[cursor].downloader == downloader {
                cursor += 1;
            }
            range.end = cursor;
        }

        ranges
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, id: ArcPathId) -> &ArcPath {
        &self.paths[id.index]
    }

    pub fn for_downloader(&self, downloader: usize) -> &[ArcPath] {
        let range = self.ranges[downloader];
        &self.paths[range.start..range.end]
    }

    /// The one-hop path of a downloader. It sits at the start of the downloader's range.
    pub fn direct_path(&self, downloader: usize) -> Option<&ArcPath> {
        self.for_downloader(downloader).first().filter(|p| p.is_direct())
    }

    pub fn relay_paths(&self, downloader: usize) -> impl Iterator<Item = &ArcPath> + '_ {
        self.for_downloader(downloader).iter().filter(|p| !p.is_direct())
    }

    pub fn has_relay_paths(&self) -> bool {
        self.paths.iter().any(|p| !p.is_direct())
    }

    /// Keeps the paths for which `keep` holds, renumbers them and recomputes the ranges.
    ///
    /// # Returns
    /// The former id of every kept path, in its new order.
    pub fn retain<F: FnMut(&ArcPath) -> bool>(&mut self, mut keep: F) -> Vec<ArcPathId> {
        let mut former_ids = Vec::new();

        self.paths.retain(|p| {
            let kept = keep(p);
            if kept {
                former_ids.push(p.id);
            }
            kept
        });

        for (index, path) in self.paths.iter_mut().enumerate() {
            path.id = ArcPathId::new(index);
        }

        self.ranges = Self::compute_ranges(&self.paths, self.ranges.len());
        former_ids
    }
}
