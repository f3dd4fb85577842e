use coop_flux_scheduler::api::scenario_dto::{DownloaderDto, LinkDto, ScenarioDto};
use coop_flux_scheduler::domain::flow_graph::arc_path::ArcPaths;
use coop_flux_scheduler::domain::flow_graph::graph::FlowGraph;
use coop_flux_scheduler::domain::scenario::Scenario;
use coop_flux_scheduler::domain::utils::id::{ArcPathId, NodeId};

fn build(node_num: usize, slot_num: usize, links: Vec<(usize, usize)>, downloaders: Vec<usize>) -> FlowGraph {
    let dto = ScenarioDto {
        node_num,
        link_num: links.len(),
        downloader_num: downloaders.len(),
        slot_num,
        links: links.into_iter().map(|(src, dst)| LinkDto { src, dst, bandwidth: vec![10; slot_num] }).collect(),
        storage: Vec::new(),
        downloaders: downloaders.into_iter().map(|node_id| DownloaderDto { node_id, consuming_rate: 0.0 }).collect(),
    };

    FlowGraph::build(&Scenario::from_dto(dto).unwrap()).unwrap()
}

/// `(from, to)` of every hop of a path.
fn hops(graph: &FlowGraph, paths: &ArcPaths, index: usize) -> Vec<(usize, usize)> {
    paths.paths[index].arcs.iter().map(|arc| (graph.arc(*arc).from.index, graph.arc(*arc).to.index)).collect()
}

#[test]
fn test_direct_path_leads_its_downloader_group() {
    let graph = build(3, 2, vec![(0, 1), (0, 2), (1, 2)], vec![2]);
    let paths = ArcPaths::enumerate(&graph);

    assert_eq!(paths.len(), 2);
    assert_eq!(hops(&graph, &paths, 0), vec![(0, 2)]);
    assert_eq!(hops(&graph, &paths, 1), vec![(0, 1), (1, 2)]);

    let direct = paths.direct_path(0).unwrap();
    assert!(direct.is_direct());
    assert_eq!(direct.relay(&graph), None);

    let relays: Vec<&_> = paths.relay_paths(0).collect();
    assert_eq!(relays.len(), 1);
    assert_eq!(relays[0].relay(&graph), Some(NodeId::new(1)));
    assert_eq!(relays[0].hop_count(), 2);
    assert_eq!(graph.arc(relays[0].last_arc()).to, NodeId::new(2));
}

#[test]
fn test_downloader_without_direct_link() {
    let graph = build(3, 1, vec![(0, 1), (1, 2)], vec![2]);
    let paths = ArcPaths::enumerate(&graph);

    assert!(paths.direct_path(0).is_none());
    assert_eq!(paths.relay_paths(0).count(), 1);
    assert!(paths.has_relay_paths());
}

#[test]
fn test_paths_are_grouped_per_downloader() {
    // Downloaders on nodes 2 and 3, every vehicle pair linked.
    let graph = build(4, 1, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)], vec![2, 3]);
    let paths = ArcPaths::enumerate(&graph);

    assert_eq!(paths.len(), 6);
    assert_eq!((paths.ranges[0].start, paths.ranges[0].end), (0, 3));
    assert_eq!((paths.ranges[1].start, paths.ranges[1].end), (3, 6));

    assert_eq!(hops(&graph, &paths, 0), vec![(0, 2)]);
    assert_eq!(hops(&graph, &paths, 1), vec![(0, 1), (1, 2)]);
    assert_eq!(hops(&graph, &paths, 2), vec![(0, 3), (3, 2)]);

    assert_eq!(hops(&graph, &paths, 3), vec![(0, 3)]);
    assert_eq!(hops(&graph, &paths, 4), vec![(0, 1), (1, 3)]);
    assert_eq!(hops(&graph, &paths, 5), vec![(0, 2), (2, 3)]);

    for (index, path) in paths.paths.iter().enumerate() {
        assert_eq!(path.id, ArcPathId::new(index));
    }

    assert!(paths.for_downloader(0).iter().all(|p| p.downloader == 0));
    assert!(paths.for_downloader(1).iter().all(|p| p.downloader == 1));
}

#[test]
fn test_downloader_without_any_route_gets_an_empty_range() {
    let graph = build(4, 1, vec![(0, 1), (1, 2)], vec![2, 3]);
    let paths = ArcPaths::enumerate(&graph);

    assert!(paths.ranges[1].is_empty());
    assert!(paths.for_downloader(1).is_empty());
    assert!(paths.direct_path(1).is_none());
}

#[test]
fn test_retain_renumbers_and_recomputes_ranges() {
    let graph = build(4, 1, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)], vec![2, 3]);
    let mut paths = ArcPaths::enumerate(&graph);

    let former = paths.retain(|p| !p.is_direct());

    assert_eq!(former, vec![ArcPathId::new(1), ArcPathId::new(2), ArcPathId::new(4), ArcPathId::new(5)]);
    assert_eq!(paths.len(), 4);
    assert_eq!((paths.ranges[0].start, paths.ranges[0].end), (0, 2));
    assert_eq!((paths.ranges[1].start, paths.ranges[1].end), (2, 4));
    assert!(paths.direct_path(0).is_none());
    assert_eq!(paths.paths[3].id, ArcPathId::new(3));
    assert_eq!(hops(&graph, &paths, 3), vec![(0, 2), (2, 3)]);
}
