// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Parse → build pipeline
//!
//! [`analyze`] never fails: malformed input or a missing root `Plan` yields
//! an empty graph with the failure recorded in [`PlanMeta::error`], so a
//! consumer can always render something.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{AnalyzerConfig, InsightThresholds};
use crate::error::{PlanError, PlanFailure};
use crate::insight::NodeDetails;
use crate::plan::{build_graph, BuildOptions, PlanDocument, PlanGraph, PlanTimings, SubplanRoot};

/// How raw input is read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// JSON when the first non-blank character opens an array or object, else text
    #[default]
    Auto,
    Json,
    Text,
}

impl InputFormat {
    /// Resolve `Auto` against the input; `Json` and `Text` are kept
    pub fn resolve(self, text: &str) -> InputFormat {
        match self {
            InputFormat::Auto => match text.trim_start().chars().next() {
                Some('[') | Some('{') => InputFormat::Json,
                _ => InputFormat::Text,
            },
            explicit => explicit,
        }
    }
}

/// Whole-plan aggregates used as denominators and for bar sizing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTotals {
    /// Execution time when reported and positive, else the summed self time
    pub total_time: f64,
    pub total_exclusive_time: f64,
    pub total_exclusive_cost: f64,
    /// Highest planner total cost of any node
    pub max_total_cost: f64,
    pub max_exclusive_cost: f64,
    /// Highest `actual rows × loops`
    pub max_rows: f64,
    /// Highest exclusive buffer total
    pub max_buffer_total: u64,
    /// Highest `I/O read + write time`
    pub max_io_time: f64,
}

impl PlanTotals {
    pub fn from_graph(graph: &PlanGraph, timings: &PlanTimings) -> Self {
        let mut totals = PlanTotals::default();
        for node in &graph.nodes {
            totals.total_exclusive_time += node.exclusive_time_ms;
            totals.total_exclusive_cost += node.exclusive_cost;
            totals.max_total_cost = totals.max_total_cost.max(node.step.total_cost.unwrap_or(0.0));
            totals.max_exclusive_cost = totals.max_exclusive_cost.max(node.exclusive_cost);
            totals.max_rows = totals.max_rows.max(node.actual_rows_total);
            totals.max_buffer_total = totals.max_buffer_total.max(node.exclusive_buffers.total());
            totals.max_io_time = totals.max_io_time.max(node.step.io_time());
        }
        totals.total_time = timings
            .execution_time
            .filter(|t| *t > 0.0)
            .unwrap_or(totals.total_exclusive_time);
        totals
    }
}

/// Whole-plan metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMeta {
    #[serde(flatten)]
    pub timings: PlanTimings,
    pub subplan_roots: Vec<SubplanRoot>,
    pub totals: PlanTotals,
    pub error: Option<PlanFailure>,
}

impl PlanMeta {
    pub fn execution_time(&self) -> Option<f64> {
        self.timings.execution_time
    }
}

/// Graph plus metadata for one EXPLAIN document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanAnalysis {
    pub graph: PlanGraph,
    pub meta: PlanMeta,
    #[serde(skip)]
    insight_thresholds: InsightThresholds,
}

impl PlanAnalysis {
    fn failed(timings: PlanTimings, error: &PlanError, config: &AnalyzerConfig) -> Self {
        log::warn!("Rejected EXPLAIN document: {}", error);
        Self {
            graph: PlanGraph::default(),
            meta: PlanMeta {
                timings,
                error: Some(PlanFailure::from(error)),
                ..PlanMeta::default()
            },
            insight_thresholds: config.insight_thresholds.clone(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.meta.error.is_some()
    }

    /// Derived view-model for one node
    pub fn details(&self, id: &str) -> Option<NodeDetails> {
        self.graph
            .node(id)
            .map(|node| NodeDetails::derive(node, &self.meta, &self.insight_thresholds))
    }
}

/// Analyze raw EXPLAIN text with the default configuration
pub fn analyze(text: &str) -> PlanAnalysis {
    analyze_with(text, &AnalyzerConfig::default())
}

/// Analyze raw EXPLAIN text
pub fn analyze_with(text: &str, config: &AnalyzerConfig) -> PlanAnalysis {
    match parse_document(text) {
        Ok(document) => analyze_document(&document, config),
        Err(error) => PlanAnalysis::failed(PlanTimings::default(), &error, config),
    }
}

/// Parse raw text into a document without building anything
pub fn parse_document(text: &str) -> Result<PlanDocument, PlanError> {
    PlanDocument::parse(text)
}

/// Parse JSON or text-format EXPLAIN output
pub fn parse_input(text: &str, format: InputFormat) -> Result<PlanDocument, PlanError> {
    match format.resolve(text) {
        InputFormat::Text => PlanDocument::parse_text(text),
        _ => PlanDocument::parse(text),
    }
}

/// Analyze text-format EXPLAIN output with the default configuration
pub fn analyze_text(text: &str) -> PlanAnalysis {
    analyze_input(text, InputFormat::Text, &AnalyzerConfig::default())
}

/// Analyze EXPLAIN output in either format
pub fn analyze_input(text: &str, format: InputFormat, config: &AnalyzerConfig) -> PlanAnalysis {
    match parse_input(text, format) {
        Ok(document) => analyze_document(&document, config),
        Err(error) => PlanAnalysis::failed(PlanTimings::default(), &error, config),
    }
}

/// Analyze an already-parsed document
pub fn analyze_document(document: &PlanDocument, config: &AnalyzerConfig) -> PlanAnalysis {
    let plan = match document.root_plan() {
        Ok(plan) => plan,
        Err(error) => return PlanAnalysis::failed(document.timings, &error, config),
    };

    let options = BuildOptions::from_config(config, document.timings.execution_time);
    let graph = build_graph(plan, &options);
    let totals = PlanTotals::from_graph(&graph, &document.timings);

    PlanAnalysis {
        meta: PlanMeta {
            timings: document.timings,
            subplan_roots: graph.subplan_roots.clone(),
            totals,
            error: None,
        },
        graph,
        insight_thresholds: config.insight_thresholds.clone(),
    }
}

/// Re-runs the pipeline only when the input text or configuration changes
#[derive(Debug, Default)]
pub struct PlanAnalyzer {
    config: AnalyzerConfig,
    last: Option<(String, Arc<PlanAnalysis>)>,
}

impl PlanAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config, last: None }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AnalyzerConfig) {
        if config != self.config {
            self.config = config;
            self.last = None;
        }
    }

    pub fn analyze(&mut self, text: &str) -> Arc<PlanAnalysis> {
        if let Some((cached_text, analysis)) = &self.last {
            if cached_text == text {
                return Arc::clone(analysis);
            }
        }
        let analysis = Arc::new(analyze_with(text, &self.config));
        self.last = Some((text.to_string(), Arc::clone(&analysis)));
        analysis
    }
}
