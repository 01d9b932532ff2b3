// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Plan input model and tree builder
//!
//! This module decodes `EXPLAIN (FORMAT JSON)` documents and text-format
//! `EXPLAIN` output, and builds the
//! analysis graph: path-encoded ids, inclusive/exclusive metrics, estimate
//! factors, subplan tracking and hotspot hints.

pub mod buffers;
pub mod graph;
pub mod hints;
pub mod node_id;
pub mod raw;
pub mod text;

pub use buffers::{BufferCounters, BufferPool};
pub use graph::{build_graph, BuildOptions, Edge, EstimateDirection, PlanGraph, PlanGraphNode, SubplanRoot};
pub use hints::{CostHint, HintSeverity, SlowHint};
pub use raw::{PlanDocument, PlanStep, PlanTimings, RawPlanNode};
pub use text::{Span, TextPlan, TextPlanNode, TextPlanSummary};
