// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Per-node view-model
//!
//! [`NodeDetails::derive`] turns one graph node plus the plan metadata into
//! display-ready metrics. Every value is independently optional: a missing
//! raw field suppresses the metrics built from it and nothing else.

use serde::Serialize;

use super::estimation::{estimation_insight, EstimationInsight};
use super::format::{format_fixed, format_ms, format_number, format_percent};
use crate::config::InsightThresholds;
use crate::pipeline::PlanMeta;
use crate::plan::{BufferCounters, BufferPool, EstimateDirection, PlanGraphNode};

const MISSING: &str = "—";

/// One labelled value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: &'static str,
    pub label: &'static str,
    pub value: String,
    pub sub_label: Option<String>,
}

impl Metric {
    fn new(id: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            id,
            label,
            value: value.into(),
            sub_label: None,
        }
    }

    fn with_sub_label(mut self, sub_label: Option<String>) -> Self {
        self.sub_label = sub_label;
        self
    }
}

/// Pool totals of one buffer scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferBreakdown {
    pub shared: u64,
    pub temp: u64,
    pub local: u64,
    pub total: u64,
}

impl From<&BufferCounters> for BufferBreakdown {
    fn from(counters: &BufferCounters) -> Self {
        let shared = counters.pool_total(BufferPool::Shared);
        let temp = counters.pool_total(BufferPool::Temp);
        let local = counters.pool_total(BufferPool::Local);
        Self {
            shared,
            temp,
            local,
            total: shared.saturating_add(temp).saturating_add(local),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferTotals {
    pub exclusive: BufferBreakdown,
    pub inclusive: BufferBreakdown,
}

/// A filter or join condition reported on the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionRow {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

/// Display-ready metrics for one plan node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetails {
    pub overview_metrics: Vec<Metric>,
    pub execution_metrics: Vec<Metric>,
    pub cost_metrics: Vec<Metric>,
    pub estimation_insight: Option<EstimationInsight>,

    pub buffer_totals: BufferTotals,
    pub has_shared_buffers: bool,
    pub has_temp_buffers: bool,
    pub has_local_buffers: bool,
    pub has_buffer_data: bool,
    pub has_io_timing: bool,

    pub condition_rows: Vec<ConditionRow>,
    pub output_columns: Vec<String>,
    /// Rounded percentages of rows discarded per loop
    pub filtered_percent: Option<f64>,
    pub join_filtered_percent: Option<f64>,
    pub recheck_percent: Option<f64>,

    pub loops: f64,
    pub formatted_loops: String,
    pub formatted_self_time: Option<String>,
    pub formatted_self_cost: Option<String>,
    pub formatted_total_time_per_loop: Option<String>,
    pub formatted_total_time_all_loops: Option<String>,
    /// Self time as a share of execution time, e.g. `42.0%`
    pub execution_share: Option<String>,
    pub cost_share_summary: Option<String>,

    pub actual_rows: Option<String>,
    pub rows_across_loops: Option<String>,
    pub planned_rows_per_loop: Option<String>,
    pub planned_rows_across_loops: Option<String>,
    pub est_factor: Option<String>,
    pub estimation_direction_label: Option<&'static str>,
}

/// `round(100 × removed / (removed + kept))`, kept being rows per loop
fn removed_percent(removed: Option<f64>, kept: Option<f64>) -> Option<f64> {
    let removed = removed?;
    let denominator = removed + kept.unwrap_or(0.0);
    (denominator > 0.0).then(|| (removed / denominator * 100.0).round())
}

fn with_ms(value: Option<&String>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{} ms", v))
}

fn cost_text(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format_fixed(v, 2))
}

impl NodeDetails {
    pub fn derive(node: &PlanGraphNode, meta: &PlanMeta, thresholds: &InsightThresholds) -> Self {
        let step = &node.step;
        let loops = node.loops();
        let formatted_loops = format_number(loops);

        // Without ANALYZE there is no time to attribute
        let has_timing = step.actual_total_time.is_some();
        let formatted_self_time = has_timing
            .then(|| format_ms(Some(node.exclusive_time_ms)))
            .flatten();
        let formatted_total_time_per_loop = format_ms(step.actual_total_time);
        let formatted_total_time_all_loops = step
            .actual_total_time
            .filter(|t| loops > 1.0 && *t > 0.0)
            .and_then(|t| format_ms(Some(t * loops)));
        let execution_share = meta
            .execution_time()
            .filter(|t| has_timing && *t > 0.0)
            .and_then(|t| format_percent(node.exclusive_time_ms / t * 100.0));

        let self_cost = step.total_cost.map(|_| node.exclusive_cost);
        let formatted_self_cost = self_cost.map(|c| format_fixed(c, 2));
        let cost_share_summary = self_cost.and_then(|cost| cost_shares(cost, meta));

        let actual_rows = step.actual_rows.map(format_number);
        let rows_across_loops = step.actual_rows.map(|r| format_number(r * loops.max(1.0)));
        let planned_rows_per_loop = step.plan_rows.map(format_number);
        let planned_rows_across_loops = step.plan_rows.map(|r| format_number(r * loops.max(1.0)));

        let overview_metrics = vec![
            Metric::new("self-time", "Self time", with_ms(formatted_self_time.as_ref()))
                .with_sub_label(
                    execution_share
                        .as_ref()
                        .map(|share| format!("{} of total execution", share)),
                ),
            Metric::new(
                "self-cost",
                "Self cost",
                formatted_self_cost.clone().unwrap_or_else(|| MISSING.to_string()),
            )
            .with_sub_label(cost_share_summary.clone()),
            Metric::new("loops", "Loops", formatted_loops.clone()),
            Metric::new(
                "rows-seen",
                "Rows seen",
                actual_rows.clone().unwrap_or_else(|| MISSING.to_string()),
            )
            .with_sub_label(
                rows_across_loops
                    .as_ref()
                    .map(|rows| format!("All loops combined {}", rows)),
            ),
        ];

        let mut execution_metrics = vec![Metric::new(
            "total-time-per-loop",
            "Total time (per loop)",
            with_ms(formatted_total_time_per_loop.as_ref()),
        )];
        if let Some(all_loops) = &formatted_total_time_all_loops {
            execution_metrics.push(Metric::new(
                "total-time-all-loops",
                "All loops combined",
                format!("{} ms", all_loops),
            ));
        }
        execution_metrics.push(
            Metric::new("self-time-detail", "Self time", with_ms(formatted_self_time.as_ref()))
                .with_sub_label(execution_share.as_ref().map(|share| format!("({})", share))),
        );
        execution_metrics.push(Metric::new(
            "loops-observed",
            "Loops observed",
            formatted_loops.clone(),
        ));
        if let Some(rows) = &rows_across_loops {
            execution_metrics.push(Metric::new(
                "rows-across-loops",
                "Rows across loops",
                rows.clone(),
            ));
        }

        let cost_metrics = vec![
            Metric::new("startup-cost", "Startup cost", cost_text(step.startup_cost)),
            Metric::new("total-cost", "Total cost", cost_text(step.total_cost)),
            Metric::new("self-cost-detail", "Self cost", cost_text(self_cost)),
        ];

        let buffer_totals = BufferTotals {
            exclusive: BufferBreakdown::from(&node.exclusive_buffers),
            inclusive: BufferBreakdown::from(node.buffers()),
        };
        let has_shared_buffers = buffer_totals.inclusive.shared > 0;
        let has_temp_buffers = buffer_totals.inclusive.temp > 0;
        let has_local_buffers = buffer_totals.inclusive.local > 0;

        let condition_rows = [
            ("filter", "Filter", &step.filter),
            ("hash-cond", "Hash condition", &step.hash_cond),
            ("index-cond", "Index recheck", &step.recheck_cond),
            ("join-filter", "Join filter", &step.join_filter),
            ("merge-cond", "Merge condition", &step.merge_cond),
            ("index", "Index condition", &step.index_cond),
        ]
        .into_iter()
        .filter_map(|(key, label, value)| {
            value.as_ref().map(|value| ConditionRow {
                key,
                label,
                value: value.clone(),
            })
        })
        .collect();

        let est_factor = node.est_factor.map(|factor| {
            let decimals = if factor >= 10.0 { 0 } else { 2 };
            format!("{:.*}×", decimals, factor)
        });
        let estimation_direction_label = match node.est_direction {
            Some(EstimateDirection::Under) => Some("Planner underestimated"),
            Some(EstimateDirection::Over) => Some("Planner overestimated"),
            _ => None,
        };

        Self {
            overview_metrics,
            execution_metrics,
            cost_metrics,
            estimation_insight: estimation_insight(node, thresholds),
            buffer_totals,
            has_shared_buffers,
            has_temp_buffers,
            has_local_buffers,
            has_buffer_data: has_shared_buffers || has_temp_buffers || has_local_buffers,
            has_io_timing: step.io_time() > 0.0,
            condition_rows,
            output_columns: step.output.clone(),
            filtered_percent: removed_percent(step.rows_removed_by_filter, step.actual_rows),
            join_filtered_percent: removed_percent(
                step.rows_removed_by_join_filter,
                step.actual_rows,
            ),
            recheck_percent: removed_percent(step.rows_removed_by_index_recheck, step.actual_rows),
            loops,
            formatted_loops,
            formatted_self_time,
            formatted_self_cost,
            formatted_total_time_per_loop,
            formatted_total_time_all_loops,
            execution_share,
            cost_share_summary,
            actual_rows,
            rows_across_loops,
            planned_rows_per_loop,
            planned_rows_across_loops,
            est_factor,
            estimation_direction_label,
        }
    }

    pub fn metric(&self, id: &str) -> Option<&Metric> {
        self.overview_metrics
            .iter()
            .chain(&self.execution_metrics)
            .chain(&self.cost_metrics)
            .find(|metric| metric.id == id)
    }
}

/// `~X% of exclusive plan cost; ~Y% of the plan's highest total cost`
fn cost_shares(self_cost: f64, meta: &PlanMeta) -> Option<String> {
    let totals = &meta.totals;
    let mut parts = Vec::new();
    if totals.total_exclusive_cost > 0.0 {
        let share = (self_cost / totals.total_exclusive_cost * 100.0).round();
        parts.push(format!("~{}% of exclusive plan cost", share));
    }
    if totals.max_total_cost > 0.0 {
        let share = (self_cost / totals.max_total_cost * 100.0).round();
        parts.push(format!("~{}% of the plan's highest total cost", share));
    }
    (!parts.is_empty()).then(|| parts.join("; "))
}
