// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Metrics and insight derivation
//!
//! Consumes built graph nodes plus plan metadata and produces human-readable
//! metrics, buffer breakdowns and estimate-accuracy insights. Nothing here
//! re-runs the builder, so a consumer can derive details repeatedly.

mod details;
mod estimation;
pub mod format;

pub use details::{BufferBreakdown, BufferTotals, ConditionRow, Metric, NodeDetails};
pub use estimation::{estimation_insight, EstimationInsight, InsightSeverity, InsightVariant};
