// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Plan fixtures built through the public API only

use planlens::{analyze_input, analyze_with, AnalyzerConfig, InputFormat, PlanAnalysis, PlanGraphNode};
use serde_json::{json, Map, Value};

const EPSILON: f64 = 1e-9;

/// Builder for one `EXPLAIN (FORMAT JSON)` plan node
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    fields: Map<String, Value>,
    children: Vec<PlanBuilder>,
}

impl PlanBuilder {
    pub fn new(node_type: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("Node Type".to_string(), json!(node_type));
        Self {
            fields,
            children: Vec::new(),
        }
    }

    /// Set any raw key
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Per-loop actual time and loop count
    pub fn timing(self, total_time: f64, loops: f64) -> Self {
        self.set("Actual Total Time", total_time)
            .set("Actual Loops", loops)
    }

    /// Per-loop actual rows and planned rows
    pub fn rows(self, actual: f64, planned: f64) -> Self {
        self.set("Actual Rows", actual).set("Plan Rows", planned)
    }

    pub fn cost(self, total_cost: f64) -> Self {
        self.set("Total Cost", total_cost)
    }

    pub fn child(mut self, child: PlanBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        if !self.children.is_empty() {
            let plans: Vec<Value> = self.children.into_iter().map(PlanBuilder::into_value).collect();
            fields.insert("Plans".to_string(), Value::Array(plans));
        }
        Value::Object(fields)
    }

    /// Wrap in the single-element document array
    pub fn document(self, execution_time: Option<f64>) -> String {
        let mut root = Map::new();
        root.insert("Plan".to_string(), self.into_value());
        root.insert("Planning Time".to_string(), json!(0.1));
        if let Some(time) = execution_time {
            root.insert("Execution Time".to_string(), json!(time));
        }
        Value::Array(vec![Value::Object(root)]).to_string()
    }
}

/// An analyzed plan with assertion helpers
pub struct PlanFixture {
    pub analysis: PlanAnalysis,
}

impl PlanFixture {
    pub fn analyze(text: &str) -> Self {
        Self::analyze_with(text, &AnalyzerConfig::default())
    }

    pub fn analyze_with(text: &str, config: &AnalyzerConfig) -> Self {
        Self {
            analysis: analyze_with(text, config),
        }
    }

    /// Analyze text-format EXPLAIN output
    pub fn analyze_text(text: &str) -> Self {
        Self {
            analysis: analyze_input(text, InputFormat::Text, &AnalyzerConfig::default()),
        }
    }

    pub fn from_plan(plan: PlanBuilder, execution_time: Option<f64>) -> Self {
        Self::analyze(&plan.document(execution_time))
    }

    /// Node by id; panics with the known ids when missing
    pub fn node(&self, id: &str) -> &PlanGraphNode {
        self.analysis.graph.node(id).unwrap_or_else(|| {
            let ids: Vec<&str> = self.analysis.graph.nodes.iter().map(|n| n.id.as_str()).collect();
            panic!("node {} not found, have {:?}", id, ids)
        })
    }

    pub fn assert_exclusive_time(&self, id: &str, expected: f64) {
        let actual = self.node(id).exclusive_time_ms;
        assert!(
            (actual - expected).abs() < EPSILON,
            "exclusive time of {}: expected {}, got {}",
            id,
            expected,
            actual
        );
    }

    pub fn assert_exclusive_cost(&self, id: &str, expected: f64) {
        let actual = self.node(id).exclusive_cost;
        assert!(
            (actual - expected).abs() < EPSILON,
            "exclusive cost of {}: expected {}, got {}",
            id,
            expected,
            actual
        );
    }

    pub fn assert_inclusive_time(&self, id: &str, expected: f64) {
        let actual = self.node(id).inclusive_time_ms;
        assert!(
            (actual - expected).abs() < EPSILON,
            "inclusive time of {}: expected {}, got {}",
            id,
            expected,
            actual
        );
    }
}

/// Two-level plan with every buffer pool populated
pub fn aggregation_plan() -> PlanBuilder {
    PlanBuilder::new("Seq Scan")
        .timing(10.0, 2.0)
        .set("Actual Rows", 8)
        .cost(30.0)
        .set("Shared Hit Blocks", 5)
        .set("Shared Read Blocks", 3)
        .set("Local Hit Blocks", 2)
        .set("Temp Read Blocks", 2)
        .child(
            PlanBuilder::new("Index Scan")
                .timing(4.0, 2.0)
                .set("Actual Rows", 5)
                .cost(10.0)
                .set("Shared Hit Blocks", 2)
                .set("Shared Read Blocks", 1)
                .set("Local Hit Blocks", 1)
                .set("Temp Read Blocks", 1),
        )
}

/// Parallel aggregate: Finalize Aggregate → Gather (2 workers) → Partial
/// Aggregate → Parallel Seq Scan, with a leader-only InitPlan under the gather
pub fn parallel_plan() -> PlanBuilder {
    PlanBuilder::new("Aggregate")
        .timing(40.0, 1.0)
        .cost(200.0)
        .child(
            PlanBuilder::new("Gather")
                .timing(39.0, 1.0)
                .cost(190.0)
                .set("Workers Planned", 2)
                .set("Workers Launched", 2)
                .child(
                    PlanBuilder::new("Aggregate")
                        .set("Parent Relationship", "Outer")
                        .timing(30.0, 3.0)
                        .cost(150.0)
                        .child(
                            PlanBuilder::new("Seq Scan")
                                .set("Parent Relationship", "Outer")
                                .set("Parallel Aware", true)
                                .timing(24.0, 3.0)
                                .cost(120.0),
                        ),
                )
                .child(
                    PlanBuilder::new("Result")
                        .set("Parent Relationship", "InitPlan")
                        .set("Subplan Name", "InitPlan 1 (returns $0)")
                        .timing(3.0, 1.0)
                        .cost(1.0),
                ),
        )
}
