// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Plan tree builder tests
//!
//! Aggregation, estimate classification, subplan tracking and parallel
//! worker normalization, driven through the public pipeline.

#[path = "testutils/mod.rs"]
mod testutils;

use planlens::{
    build_graph, AnalyzerConfig, BuildOptions, EstimateDirection, PlanDocument, SubplanRoot,
    WorkerTimePolicy,
};
use testutils::plan_fixture::{aggregation_plan, parallel_plan, PlanBuilder, PlanFixture};

#[test]
fn test_exclusive_aggregation() {
    let fixture = PlanFixture::from_plan(aggregation_plan(), Some(25.0));

    fixture.assert_inclusive_time("root", 20.0);
    fixture.assert_exclusive_time("root", 12.0);
    fixture.assert_exclusive_cost("root", 20.0);
    fixture.assert_exclusive_time("root-0", 8.0);
    fixture.assert_exclusive_cost("root-0", 10.0);

    let root = fixture.node("root");
    assert_eq!(root.exclusive_buffers.shared_hit, 3);
    assert_eq!(root.exclusive_buffers.shared_read, 2);
    assert_eq!(root.exclusive_buffers.local_hit, 1);
    assert_eq!(root.exclusive_buffers.temp_read, 1);
    assert_eq!(root.actual_rows_total, 16.0);

    let child = fixture.node("root-0");
    assert_eq!(child.exclusive_buffers, child.step.buffers);
    assert!(!child.never_executed);
}

#[test]
fn test_never_executed_subplan() {
    let plan = PlanBuilder::new("CTE Scan")
        .set("Subplan Name", "CTE foo")
        .set("Plan Rows", 4)
        .set("Actual Rows", 0)
        .set("Actual Loops", 0)
        .cost(12.0)
        .child(
            PlanBuilder::new("Seq Scan")
                .set("Plan Rows", 4)
                .set("Actual Rows", 0)
                .set("Actual Loops", 0),
        );
    let fixture = PlanFixture::from_plan(plan, Some(3.2));

    let root = fixture.node("root");
    assert_eq!(root.est_factor, Some(0.0));
    assert_eq!(root.est_direction, Some(EstimateDirection::Over));
    assert!(root.never_executed);

    assert_eq!(
        fixture.analysis.meta.subplan_roots,
        vec![SubplanRoot {
            name: "CTE foo".to_string(),
            id: "root".to_string(),
        }]
    );
    assert_eq!(fixture.node("root-0").subplan_name.as_deref(), Some("CTE foo"));
    assert!(fixture.node("root-0").never_executed);
}

#[test]
fn test_subplan_names_are_inherited_until_redeclared() {
    let plan = PlanBuilder::new("Hash Join")
        .child(
            PlanBuilder::new("Subquery Scan")
                .set("Subplan Name", "SubPlan 1")
                .child(
                    PlanBuilder::new("Nested Loop")
                        .child(PlanBuilder::new("Seq Scan"))
                        .child(PlanBuilder::new("CTE Scan").set("Subplan Name", "CTE inner")),
                ),
        )
        .child(PlanBuilder::new("Hash"));
    let fixture = PlanFixture::from_plan(plan, None);

    assert_eq!(fixture.node("root").subplan_name, None);
    assert_eq!(fixture.node("root-1").subplan_name, None);
    assert_eq!(fixture.node("root-0-0").subplan_name.as_deref(), Some("SubPlan 1"));
    assert_eq!(fixture.node("root-0-0-0").subplan_name.as_deref(), Some("SubPlan 1"));
    assert_eq!(fixture.node("root-0-0-1").subplan_name.as_deref(), Some("CTE inner"));

    let names: Vec<(&str, &str)> = fixture
        .analysis
        .meta
        .subplan_roots
        .iter()
        .map(|root| (root.name.as_str(), root.id.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![("SubPlan 1", "root-0"), ("CTE inner", "root-0-0-1")]
    );
}

#[test]
fn test_missing_optional_fields_stay_absent() {
    let fixture = PlanFixture::from_plan(PlanBuilder::new("Result"), None);
    let root = fixture.node("root");

    assert_eq!(root.label, "Result");
    assert_eq!(root.inclusive_time_ms, 0.0);
    assert_eq!(root.inclusive_cost, 0.0);
    assert_eq!(root.est_factor, None);
    assert_eq!(root.est_direction, None);
    assert!(!root.never_executed);
    assert!(root.exclusive_buffers.is_empty());
    assert!(fixture.analysis.graph.edges.is_empty());
}

/// Children of a Gather run in every participant; their per-loop times are
/// averaged over workers + leader, except leader-only InitPlan/SubPlan work.
#[test]
fn test_gather_divides_worker_time_by_participants() {
    let fixture = PlanFixture::from_plan(parallel_plan(), Some(41.0));

    // Parallel Seq Scan: 24 ms × 3 loops / 3 participants
    fixture.assert_inclusive_time("root-0-0-0", 24.0);
    fixture.assert_exclusive_time("root-0-0-0", 24.0);
    // Partial Aggregate: 30 × 3 / 3 − 24
    fixture.assert_inclusive_time("root-0-0", 30.0);
    fixture.assert_exclusive_time("root-0-0", 6.0);
    assert_eq!(fixture.node("root-0-0").time_divisor, 3.0);
    // InitPlan runs once in the leader only
    fixture.assert_inclusive_time("root-0-1", 3.0);
    assert_eq!(fixture.node("root-0-1").time_divisor, 1.0);
    // The Gather itself reports wall-clock time and is not divided
    fixture.assert_inclusive_time("root-0", 39.0);
    fixture.assert_exclusive_time("root-0", 6.0);
    assert_eq!(fixture.node("root-0").time_divisor, 1.0);
    fixture.assert_exclusive_time("root", 1.0);
}

#[test]
fn test_as_reported_policy_keeps_raw_worker_time() {
    let config = AnalyzerConfig {
        worker_time_policy: WorkerTimePolicy::AsReported,
        ..AnalyzerConfig::default()
    };
    let fixture = PlanFixture::analyze_with(&parallel_plan().document(Some(41.0)), &config);

    fixture.assert_inclusive_time("root-0-0-0", 72.0);
    fixture.assert_exclusive_time("root-0-0", 18.0);
    // 39 − (90 + 3) is floored
    fixture.assert_exclusive_time("root-0", 0.0);
    assert!(fixture.analysis.graph.nodes.iter().all(|n| n.time_divisor == 1.0));
}

#[test]
fn test_gather_falls_back_to_launched_workers() {
    let plan = PlanBuilder::new("Gather Merge")
        .timing(10.0, 1.0)
        .set("Workers Planned", 0)
        .set("Workers Launched", 3)
        .child(PlanBuilder::new("Sort").timing(8.0, 4.0));
    let fixture = PlanFixture::from_plan(plan, Some(10.0));

    fixture.assert_inclusive_time("root-0", 8.0);
    fixture.assert_exclusive_time("root", 2.0);
}

#[test]
fn test_builder_is_usable_without_pipeline() {
    let document = PlanDocument::parse(&aggregation_plan().document(None)).unwrap();
    let plan = document.root_plan().unwrap();

    let first = build_graph(plan, &BuildOptions::new(document.timings.execution_time));
    let second = build_graph(plan, &BuildOptions::new(document.timings.execution_time));
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first.edges[0].id, "root->root-0");
}

#[test]
fn test_child_ids_follow_array_positions() {
    let text = r#"[{"Plan": {"Node Type": "Append", "Plans": [
        1,
        {"Node Type": "Seq Scan", "Relation Name": "events"},
        null
    ]}}]"#;
    let fixture = PlanFixture::analyze(text);
    let graph = &fixture.analysis.graph;

    assert_eq!(graph.len(), 4);
    assert_eq!(fixture.node("root-0").label, "Node");
    assert_eq!(fixture.node("root-1").label, "Seq Scan");
    assert_eq!(fixture.node("root-1").step.relation_name.as_deref(), Some("events"));
    assert_eq!(fixture.node("root-2").label, "Node");
}
