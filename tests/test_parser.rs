use std::fs;
use std::path::PathBuf;

use coop_flux_scheduler::api::scenario_dto::ScenarioDto;
use coop_flux_scheduler::domain::scenario::Scenario;
use coop_flux_scheduler::domain::scheduler::{SchedulerConfig, compute_schedule};
use coop_flux_scheduler::domain::utils::id::NodeId;
use coop_flux_scheduler::error::Error;
use coop_flux_scheduler::generate_schedule;
use coop_flux_scheduler::loader::parser::{load_config, load_scenario, parse_scenario_text};
use coop_flux_scheduler::loader::writer::{ReportFormat, render_text, write_report, write_trace};

const RELAY_SCENARIO: &str = "3 3 1 4
0 1 100 0 100 0
0 2 0 0 0 0
1 2 0 80 0 80

0
1 2 5
2

2 1.5
";

const DIRECT_SCENARIO: &str = "2 1 1 3
0 1 100 100 100

0
1
1 1.5
";

fn temp_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("coop_flux_scheduler_{}_{}", std::process::id(), name));
    fs::write(&path, content).unwrap();
    path
}

fn parse_error_line(input: &str) -> usize {
    match parse_scenario_text(input) {
        Err(Error::ParseError { line, .. }) => line,
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_parse_text_protocol() {
    let dto = parse_scenario_text(RELAY_SCENARIO).unwrap();

    assert_eq!((dto.node_num, dto.link_num, dto.downloader_num, dto.slot_num), (3, 3, 1, 4));
    assert_eq!(dto.links[0].bandwidth, vec![100, 0, 100, 0]);
    assert_eq!((dto.links[2].src, dto.links[2].dst), (1, 2));

    assert_eq!(dto.storage.len(), 3);
    assert!(dto.storage[0].holdings.is_empty());
    assert_eq!(dto.storage[1].holdings[0].downloader_id, 2);
    assert_eq!(dto.storage[1].holdings[0].size, 5);

    assert_eq!(dto.downloaders[0].node_id, 2);
    assert_eq!(dto.downloaders[0].consuming_rate, 1.5);

    let scenario = Scenario::from_dto(dto).unwrap();
    assert_eq!(scenario.downloader_index(NodeId::new(2)), Some(0));
}

#[test]
fn test_blank_lines_are_optional() {
    let compact = RELAY_SCENARIO.lines().filter(|l| !l.trim().is_empty()).collect::<Vec<_>>().join("\n");

    assert_eq!(parse_scenario_text(&compact).unwrap(), parse_scenario_text(RELAY_SCENARIO).unwrap());
}

#[test]
fn test_parse_errors_carry_line_numbers() {
    // Bandwidth vector one value short.
    assert_eq!(parse_error_line("2 1 1 3\n0 1 100 100\n0\n1\n1 1.0\n"), 2);
    // Not a number.
    assert_eq!(parse_error_line("2 1 1 3\n0 1 100 x 100\n0\n1\n1 1.0\n"), 2);
    // Odd storage row.
    assert_eq!(parse_error_line("2 1 1 3\n0 1 100 100 100\n0\n1 1\n1 1.0\n"), 4);
    // Header with three numbers.
    assert_eq!(parse_error_line("2 1 1\n"), 1);
    // Missing downloader section.
    assert!(matches!(parse_scenario_text("2 1 1 3\n0 1 100 100 100\n0\n1\n"), Err(Error::ParseError { .. })));
    // Extra content after the last section.
    assert_eq!(parse_error_line("2 1 1 3\n0 1 100 100 100\n0\n1\n1 1.0\n\n7 7\n"), 7);
}

#[test]
fn test_semantic_errors_surface_as_invalid_input() {
    // Links out of source order.
    let dto = parse_scenario_text("3 2 1 1\n1 2 5\n0 1 5\n0\n1\n2\n2 1.0\n").unwrap();
    let err = Scenario::from_dto(dto).unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(err.is_input_error());
}

#[test]
fn test_json_scenario_matches_text_scenario() {
    let text = parse_scenario_text(RELAY_SCENARIO).unwrap();
    let json = serde_json::to_string(&text).unwrap();

    assert!(json.contains("\"nodeNum\":3"));
    assert!(json.contains("\"consumingRate\":1.5"));

    let parsed: ScenarioDto = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, text);
}

#[test]
fn test_json_storage_section_is_optional() {
    let json = r#"{
        "nodeNum": 2, "linkNum": 1, "downloaderNum": 1, "slotNum": 2,
        "links": [{ "src": 0, "dst": 1, "bandwidth": [5, 7] }],
        "downloaders": [{ "nodeId": 1, "consumingRate": 2.0 }]
    }"#;

    let dto: ScenarioDto = serde_json::from_str(json).unwrap();
    assert!(dto.storage.is_empty());

    let outcome = compute_schedule(&Scenario::from_dto(dto).unwrap(), &SchedulerConfig::default()).unwrap();
    assert_eq!(outcome.total_received, 12);
}

#[test]
fn test_load_scenario_by_extension() {
    let text_path = temp_file("relay.txt", RELAY_SCENARIO);
    let json_path = temp_file("relay.json", &serde_json::to_string(&parse_scenario_text(RELAY_SCENARIO).unwrap()).unwrap());

    let from_text = load_scenario(text_path.to_str().unwrap()).unwrap();
    let from_json = load_scenario(json_path.to_str().unwrap()).unwrap();
    assert_eq!(from_text, from_json);

    let err = load_scenario("/nonexistent/coop_flux_scheduler/scenario.txt").unwrap_err();
    assert!(matches!(err, Error::IoError(_)));
    assert!(!err.is_input_error());

    fs::remove_file(text_path).unwrap();
    fs::remove_file(json_path).unwrap();
}

#[test]
fn test_load_config_fills_defaults() {
    let path = temp_file("config.json", r#"{ "iterationCap": 3 }"#);
    let config = load_config(path.to_str().unwrap()).unwrap();

    assert_eq!(config, SchedulerConfig { iteration_cap: Some(3), verify_invariants: true });

    let broken = temp_file("broken_config.json", "{ iterationCap: ");
    let err = load_config(broken.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::DeserializationError(_)));

    fs::remove_file(path).unwrap();
    fs::remove_file(broken).unwrap();
}

#[test]
fn test_text_report_layout() {
    let path = temp_file("direct.txt", DIRECT_SCENARIO);
    let outcome = generate_schedule(path.to_str().unwrap(), &SchedulerConfig::default()).unwrap();
    fs::remove_file(path).unwrap();

    let report = render_text(&outcome);
    let lines: Vec<&str> = report.lines().collect();

    assert!(lines[0].starts_with("# computationTimeMs "));
    assert_eq!(lines[1], "# iterations 0");
    assert_eq!(lines[2], "# totalReceived 300");
    assert_eq!(lines[3], "downloader 1 received 300 initial 0 rate 1.5");
    assert_eq!(lines[4], "node 0 3");
    assert_eq!(&lines[5..], &["1 1 1 100 [0,100)", "2 1 1 100 [100,200)", "3 1 1 100 [200,300)"]);
}

#[test]
fn test_json_report_and_trace_files() {
    let input = temp_file("relay_report.txt", RELAY_SCENARIO);
    let report_path = temp_file("report.json", "");
    let trace_path = temp_file("trace.csv", "");

    let outcome = generate_schedule(input.to_str().unwrap(), &SchedulerConfig::default()).unwrap();
    write_report(&outcome, report_path.to_str().unwrap(), ReportFormat::Json).unwrap();
    write_trace(&outcome, trace_path.to_str().unwrap()).unwrap();

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["totalReceived"], 160);
    assert_eq!(report["iterations"], 2);
    assert_eq!(report["downloaders"][0]["initialHoldings"], 0);
    assert_eq!(report["nodes"][0]["nodeId"], 0);
    assert_eq!(report["nodes"][0]["schemes"][0]["segment"], serde_json::json!([[0, 100]]));
    assert_eq!(report["nodes"][1]["schemes"][1]["slot"], 4);

    let trace = fs::read_to_string(&trace_path).unwrap();
    let mut rows = trace.lines();
    assert!(rows.next().unwrap().starts_with("Iteration;LogDescription;Downloader"));
    assert_eq!(rows.count(), 3);

    for path in [input, report_path, trace_path] {
        fs::remove_file(path).unwrap();
    }
}
