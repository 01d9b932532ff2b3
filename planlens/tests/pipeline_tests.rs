// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Parse → build pipeline tests: document validation, metadata and totals

#[path = "testutils/mod.rs"]
mod testutils;

use planlens::{analyze, parse_document, FailureKind, PlanAnalyzer, PlanError};
use testutils::plan_fixture::{aggregation_plan, PlanBuilder, PlanFixture};

#[test]
fn test_not_json_reports_parse_error() {
    let analysis = analyze("not json");

    assert!(analysis.graph.nodes.is_empty());
    assert!(analysis.graph.edges.is_empty());
    let error = analysis.meta.error.expect("parse failure recorded");
    assert_eq!(error.kind, FailureKind::Parse);
    assert_eq!(error.message, "Failed to parse EXPLAIN JSON");
    assert!(error.detail.ends_with("Paste valid JSON from EXPLAIN (FORMAT JSON)."));
}

#[test]
fn test_document_without_plan_reports_structural_error() {
    let analysis = analyze(r#"[{"Planning Time": 0.3, "Execution Time": 1.5}]"#);

    assert!(analysis.graph.nodes.is_empty());
    assert!(analysis.graph.edges.is_empty());
    let error = analysis.meta.error.expect("structural failure recorded");
    assert_eq!(error.kind, FailureKind::Structural);
    assert_eq!(error.message, "Invalid EXPLAIN JSON: Plan node not found.");
    assert!(error.detail.starts_with("Provide output from EXPLAIN (FORMAT JSON)"));
}

#[test]
fn test_other_structural_shapes() {
    for text in ["[]", "42", r#""Plan""#, r#"[{"Plan": []}]"#, r#"[[{"Plan": {}}]]"#] {
        let analysis = analyze(text);
        assert_eq!(
            analysis.meta.error.map(|e| e.kind),
            Some(FailureKind::Structural),
            "input {}",
            text
        );
    }
}

#[test]
fn test_parse_document_propagates_errors() {
    assert!(matches!(parse_document("{"), Err(PlanError::Parse { .. })));
    let document = parse_document(r#"{"Execution Time": 2}"#).unwrap();
    assert_eq!(document.root_plan(), Err(PlanError::Structural));
}

#[test]
fn test_bare_object_document_is_accepted() {
    let analysis = analyze(r#"{"Plan": {"Node Type": "Result", "Total Cost": 0.01}}"#);
    assert!(analysis.meta.error.is_none());
    assert_eq!(analysis.graph.len(), 1);
}

#[test]
fn test_metadata_and_totals() {
    let text = r#"[{
        "Plan": {"Node Type": "Limit", "Total Cost": 9.0, "Actual Total Time": 3.0,
                 "Actual Loops": 1, "Actual Rows": 10,
                 "Plans": [{"Node Type": "Seq Scan", "Total Cost": 8.0,
                            "Actual Total Time": 2.5, "Actual Loops": 1,
                            "Actual Rows": 10, "Shared Hit Blocks": 7,
                            "I/O Read Time": 0.4, "I/O Write Time": 0.1}]},
        "Planning Time": 0.2,
        "Execution Time": 3.4,
        "JIT": {"Functions": 2, "Timing": {"Total": 1.25}}
    }]"#;
    let analysis = analyze(text);
    let meta = &analysis.meta;

    assert_eq!(meta.timings.planning_time, Some(0.2));
    assert_eq!(meta.timings.execution_time, Some(3.4));
    assert_eq!(meta.timings.jit_total_time, Some(1.25));
    assert!(meta.subplan_roots.is_empty());

    assert_eq!(meta.totals.total_time, 3.4);
    assert!((meta.totals.total_exclusive_time - 3.0).abs() < 1e-9);
    assert_eq!(meta.totals.total_exclusive_cost, 9.0);
    assert_eq!(meta.totals.max_total_cost, 9.0);
    assert_eq!(meta.totals.max_rows, 10.0);
    assert_eq!(meta.totals.max_buffer_total, 7);
    assert!((meta.totals.max_io_time - 0.5).abs() < 1e-9);
}

#[test]
fn test_meta_serializes_camel_case() {
    let analysis = PlanFixture::from_plan(aggregation_plan(), Some(20.0)).analysis;
    let json = serde_json::to_value(&analysis.meta).unwrap();

    assert_eq!(json["executionTime"], 20.0);
    assert_eq!(json["planningTime"], 0.1);
    assert!(json["subplanRoots"].as_array().unwrap().is_empty());
    assert!(json["error"].is_null());

    let node = serde_json::to_value(&analysis.graph.nodes[0]).unwrap();
    assert_eq!(node["id"], "root-0");
    assert_eq!(node["exclusiveTimeMs"], 8.0);
    assert_eq!(node["neverExecuted"], false);
}

#[test]
fn test_analyzer_rebuilds_only_on_change() {
    let mut analyzer = PlanAnalyzer::default();
    let first_text = aggregation_plan().document(Some(20.0));
    let second_text = PlanBuilder::new("Result").document(None);

    let first = analyzer.analyze(&first_text);
    assert!(std::sync::Arc::ptr_eq(&first, &analyzer.analyze(&first_text)));

    let second = analyzer.analyze(&second_text);
    assert_eq!(second.graph.len(), 1);
    assert!(!std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn test_huge_buffer_counters_saturate() {
    let text = PlanBuilder::new("Append")
        .timing(2.0, 1.0)
        .child(
            PlanBuilder::new("Seq Scan")
                .timing(1.0, 1.0)
                .set("Shared Hit Blocks", 10_000_000_000_000_000_000u64),
        )
        .child(
            PlanBuilder::new("Seq Scan")
                .timing(1.0, 1.0)
                .set("Shared Hit Blocks", u64::MAX)
                .set("Shared Read Blocks", 5u64),
        )
        .document(Some(2.5));

    let analysis = analyze(&text);
    assert!(analysis.meta.error.is_none());
    assert_eq!(analysis.graph.len(), 3);
    assert_eq!(analysis.meta.totals.max_buffer_total, u64::MAX);

    let details = analysis.details("root-1").unwrap();
    assert_eq!(details.buffer_totals.inclusive.shared, u64::MAX);
    assert_eq!(details.buffer_totals.inclusive.total, u64::MAX);
    // Parent reports nothing, so its exclusive counters floor at zero
    assert_eq!(analysis.graph.node("root").unwrap().exclusive_buffers.total(), 0);
}
