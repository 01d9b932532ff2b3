// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! PlanLens - analysis of PostgreSQL `EXPLAIN (FORMAT JSON)` output
//!
//! PlanLens turns the hierarchical plan produced by `EXPLAIN (ANALYZE,
//! BUFFERS, FORMAT JSON)` into a flat node/edge graph annotated with derived
//! metrics that the raw report only implies.
//!
//! # Features
//!
//! - **Self metrics**: exclusive time, cost and all twelve buffer counters,
//!   computed bottom-up in a single post-order traversal
//! - **Path-encoded ids**: `root`, `root-0`, `root-0-1`, ... so identifiers
//!   alone describe the tree shape
//! - **Estimate accuracy**: planner row-estimate factor and direction, with
//!   severity-classified insights for 10× and 100× misses
//! - **Subplans**: named subplan / CTE regions indexed and inherited by
//!   descendants
//! - **Hotspots**: slow-step and expensive-step hints relative to the plan
//! - **Text input**: default-format `EXPLAIN` output is parsed from its
//!   indentation and analyzed through the same builder
//! - **Graceful degradation**: every optional field stays optional; only
//!   unparseable input or a missing `Plan` object is reported as a failure
//!
//! # Usage
//!
//! ```ignore
//! let analysis = planlens::analyze(explain_json);
//! if let Some(failure) = &analysis.meta.error {
//!     eprintln!("{}: {}", failure.message, failure.detail);
//! }
//! for node in &analysis.graph.nodes {
//!     let details = analysis.details(&node.id);
//! }
//! ```

pub mod config;
pub mod error;
pub mod insight;
pub mod pipeline;
pub mod plan;
pub mod view;

pub use config::{
    AnalyzerConfig, DisplayOptions, HeatmapMode, HintThresholds, InsightThresholds,
    MetricsVisibility, WorkerTimePolicy,
};
pub use error::{FailureKind, PlanError, PlanFailure};
pub use insight::{
    estimation_insight, BufferBreakdown, BufferTotals, ConditionRow, EstimationInsight,
    InsightSeverity, InsightVariant, Metric, NodeDetails,
};
pub use pipeline::{
    analyze, analyze_document, analyze_input, analyze_text, analyze_with, parse_document,
    parse_input, InputFormat, PlanAnalysis, PlanAnalyzer, PlanMeta, PlanTotals,
};
pub use plan::{
    build_graph, BufferCounters, BufferPool, BuildOptions, CostHint, Edge, EstimateDirection, HintSeverity,
    PlanDocument, PlanGraph, PlanGraphNode, PlanStep, PlanTimings, RawPlanNode, SlowHint,
    Span, SubplanRoot, TextPlan, TextPlanNode, TextPlanSummary,
};
pub use view::{outline, render_plan, HeatmapScale, OutlineRow};

/// PlanLens version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// PlanLens crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
