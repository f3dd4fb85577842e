use coop_flux_scheduler::api::scenario_dto::{DownloaderDto, HoldingDto, LinkDto, NodeStorageDto, ScenarioDto};
use coop_flux_scheduler::domain::flow_graph::graph::{Arc, FlowGraph};
use coop_flux_scheduler::domain::scenario::Scenario;
use coop_flux_scheduler::domain::utils::id::{ArcId, NodeId};
use coop_flux_scheduler::error::Error;

fn link(src: usize, dst: usize, bandwidth: Vec<i64>) -> LinkDto {
    LinkDto { src, dst, bandwidth }
}

fn downloader(node_id: usize) -> DownloaderDto {
    DownloaderDto { node_id, consuming_rate: 1.0 }
}

fn scenario_dto(node_num: usize, slot_num: usize, links: Vec<LinkDto>, downloaders: Vec<DownloaderDto>) -> ScenarioDto {
    ScenarioDto { node_num, link_num: links.len(), downloader_num: downloaders.len(), slot_num, links, storage: Vec::new(), downloaders }
}

fn find_arc(graph: &FlowGraph, from: usize, to: usize) -> &Arc {
    graph
        .arcs
        .iter()
        .find(|a| a.from == NodeId::new(from) && a.to == NodeId::new(to))
        .unwrap_or_else(|| panic!("no arc {} -> {}", from, to))
}

fn chain_scenario() -> Scenario {
    let dto = scenario_dto(
        3,
        2,
        vec![link(0, 1, vec![10, 20]), link(1, 2, vec![30, 40])],
        vec![downloader(2)],
    );
    Scenario::from_dto(dto).unwrap()
}

#[test]
fn test_relay_links_are_mirrored_but_source_links_are_not() {
    let graph = FlowGraph::build(&chain_scenario()).unwrap();

    assert_eq!(graph.arcs.len(), 3);

    let from_source = find_arc(&graph, 0, 1);
    assert!(from_source.reverse.is_none());
    assert!(!from_source.is_mirror);

    let forward = find_arc(&graph, 1, 2);
    let mirror = find_arc(&graph, 2, 1);
    assert!(mirror.is_mirror);
    assert_eq!(mirror.bandwidth, vec![30, 40]);
    assert_eq!(forward.reverse, Some(mirror.id));
    assert_eq!(mirror.reverse, Some(forward.id));

    // Input arcs keep their tuple order, mirrors come after them.
    assert_eq!(graph.arcs[0].id, ArcId::new(0));
    assert_eq!(mirror.id, ArcId::new(2));
}

#[test]
fn test_explicit_reverse_tuple_is_paired_instead_of_mirrored() {
    let dto = scenario_dto(
        3,
        1,
        vec![link(0, 1, vec![10]), link(1, 2, vec![30]), link(2, 1, vec![5])],
        vec![downloader(2)],
    );
    let graph = FlowGraph::build(&Scenario::from_dto(dto).unwrap()).unwrap();

    assert_eq!(graph.arcs.len(), 3);
    assert!(graph.arcs.iter().all(|a| !a.is_mirror));

    let forward = find_arc(&graph, 1, 2);
    let backward = find_arc(&graph, 2, 1);
    assert_eq!(forward.reverse, Some(backward.id));
    assert_eq!(backward.reverse, Some(forward.id));
    assert_eq!(backward.bandwidth, vec![5]);
}

#[test]
fn test_out_arcs_and_neighbors() {
    let graph = FlowGraph::build(&chain_scenario()).unwrap();

    let from_relay: Vec<usize> = graph.out_arcs(NodeId::new(1)).map(|a| a.to.index).collect();
    assert_eq!(from_relay, vec![2]);

    let from_downloader: Vec<usize> = graph.out_arcs(NodeId::new(2)).map(|a| a.to.index).collect();
    assert_eq!(from_downloader, vec![1]);

    assert_eq!(graph.neighbors(NodeId::new(1)), &[NodeId::new(0), NodeId::new(2)]);
    assert_eq!(graph.neighbors(NodeId::new(0)), &[NodeId::new(1)]);
}

#[test]
fn test_initial_storage_is_loaded_into_row_zero() {
    let mut dto = scenario_dto(3, 2, vec![link(0, 1, vec![10, 20]), link(1, 2, vec![30, 40])], vec![downloader(2)]);
    dto.storage = vec![
        NodeStorageDto { node_id: 1, holdings: vec![HoldingDto { downloader_id: 2, size: 40 }] },
        NodeStorageDto { node_id: 2, holdings: vec![HoldingDto { downloader_id: 2, size: 7 }] },
    ];

    let graph = FlowGraph::build(&Scenario::from_dto(dto).unwrap()).unwrap();

    assert_eq!(graph.downloader_index(NodeId::new(2)), Some(0));
    assert_eq!(graph.downloader_index(NodeId::new(1)), None);

    let relay = graph.node(NodeId::new(1));
    assert_eq!(relay.storage.len(), 3);
    assert_eq!(relay.storage[0], vec![40]);
    assert_eq!(relay.storage[2], vec![0]);
    assert_eq!(graph.node(NodeId::new(2)).storage[0], vec![7]);
    assert_eq!(graph.node(NodeId::new(0)).storage[0], vec![0]);
}

#[test]
fn test_conflicts_reach_one_hop_neighbours() {
    let dto = scenario_dto(
        5,
        1,
        vec![link(0, 1, vec![1]), link(1, 2, vec![1]), link(2, 3, vec![1]), link(3, 4, vec![1])],
        vec![downloader(4)],
    );
    let graph = FlowGraph::build(&Scenario::from_dto(dto).unwrap()).unwrap();

    let first = find_arc(&graph, 0, 1).id;
    let second = find_arc(&graph, 1, 2).id;
    let third = find_arc(&graph, 2, 3).id;
    let fourth = find_arc(&graph, 3, 4).id;

    assert!(graph.conflicts(first, second));
    assert!(graph.conflicts(first, third));
    assert!(!graph.conflicts(first, fourth));
    assert!(!graph.conflicts(fourth, first));

    let blocked = graph.interference_set(first);
    assert!(blocked.contains(&first));
    assert!(blocked.contains(&third));
    assert!(!blocked.contains(&fourth));
}

#[test]
fn test_occupying_a_slot_blocks_only_that_slot() {
    let mut graph = FlowGraph::build(&chain_scenario()).unwrap();
    let arc = find_arc(&graph, 0, 1).id;

    graph.occupy_slot(0, arc);
    assert!(graph.arcs.iter().all(|a| !a.idle[0]));
    assert!(graph.arcs.iter().all(|a| a.idle[1]));

    graph.vacate_slot(0);
    assert!(graph.arcs.iter().all(|a| a.idle[0]));
}

#[test]
fn test_assign_flow_rejects_bandwidth_overrun() {
    let mut graph = FlowGraph::build(&chain_scenario()).unwrap();
    let arc = find_arc(&graph, 0, 1).id;

    graph.assign_flow(arc, 1, 20, 0).unwrap();
    assert_eq!(graph.arc(arc).flow, vec![0, 20]);
    assert_eq!(graph.arc(arc).owner[1], Some(0));
    assert_eq!(graph.active_arcs(1), vec![arc]);

    let err = graph.assign_flow(arc, 0, 11, 0).unwrap_err();
    assert!(err.is_invariant_violation());

    graph.clear_flow(arc, 1);
    assert!(graph.active_arcs(1).is_empty());
}

fn expect_invalid(dto: ScenarioDto) {
    match Scenario::from_dto(dto) {
        Err(Error::InvalidInput(_)) => {}
        other => panic!("expected InvalidInput, got {:?}", other),
    }
}

#[test]
fn test_unsorted_link_tuples_are_rejected() {
    expect_invalid(scenario_dto(3, 1, vec![link(1, 2, vec![1]), link(0, 1, vec![1])], vec![downloader(2)]));
}

#[test]
fn test_malformed_links_are_rejected() {
    // Into the source.
    expect_invalid(scenario_dto(3, 1, vec![link(1, 0, vec![1])], vec![downloader(2)]));
    // Self loop.
    expect_invalid(scenario_dto(3, 1, vec![link(1, 1, vec![1])], vec![downloader(2)]));
    // Node out of range.
    expect_invalid(scenario_dto(3, 1, vec![link(0, 3, vec![1])], vec![downloader(2)]));
    // Bandwidth vector of the wrong length.
    expect_invalid(scenario_dto(3, 2, vec![link(0, 1, vec![1])], vec![downloader(2)]));
    // Negative bandwidth.
    expect_invalid(scenario_dto(3, 1, vec![link(0, 1, vec![-1])], vec![downloader(2)]));
    // Duplicate tuple.
    expect_invalid(scenario_dto(3, 1, vec![link(0, 1, vec![1]), link(0, 1, vec![2])], vec![downloader(2)]));
}

#[test]
fn test_malformed_downloaders_and_storage_are_rejected() {
    expect_invalid(scenario_dto(3, 1, vec![link(0, 1, vec![1])], vec![downloader(0)]));
    expect_invalid(scenario_dto(3, 1, vec![link(0, 1, vec![1])], vec![downloader(5)]));
    expect_invalid(scenario_dto(3, 1, vec![link(0, 1, vec![1])], vec![downloader(2), downloader(2)]));

    let mut unknown_holder = scenario_dto(3, 1, vec![link(0, 1, vec![1])], vec![downloader(2)]);
    unknown_holder.storage = vec![NodeStorageDto { node_id: 1, holdings: vec![HoldingDto { downloader_id: 1, size: 3 }] }];
    expect_invalid(unknown_holder);

    let mut negative = scenario_dto(3, 1, vec![link(0, 1, vec![1])], vec![downloader(2)]);
    negative.storage = vec![NodeStorageDto { node_id: 1, holdings: vec![HoldingDto { downloader_id: 2, size: -3 }] }];
    expect_invalid(negative);
}

#[test]
fn test_bandwidth_and_holdings_must_fit_in_the_byte_counters() {
    expect_invalid(scenario_dto(2, 2, vec![link(0, 1, vec![i64::MAX, i64::MAX])], vec![downloader(1)]));
    expect_invalid(scenario_dto(3, 1, vec![link(0, 1, vec![i64::MAX]), link(1, 2, vec![1])], vec![downloader(2)]));

    let mut holdings = scenario_dto(3, 1, vec![link(0, 1, vec![10])], vec![downloader(2)]);
    holdings.storage = vec![NodeStorageDto { node_id: 1, holdings: vec![HoldingDto { downloader_id: 2, size: i64::MAX - 5 }] }];
    expect_invalid(holdings);

    let single = scenario_dto(2, 1, vec![link(0, 1, vec![i64::MAX])], vec![downloader(1)]);
    assert!(Scenario::from_dto(single).is_ok());
}

#[test]
fn test_declared_counts_must_match() {
    let mut dto = scenario_dto(3, 1, vec![link(0, 1, vec![1])], vec![downloader(2)]);
    dto.link_num = 2;

    let err = Scenario::from_dto(dto).unwrap_err();
    assert!(err.is_input_error());
}
