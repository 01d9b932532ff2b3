// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Relative intensity of a node for heatmap tinting

use serde::Serialize;

use crate::config::HeatmapMode;
use crate::plan::PlanGraphNode;

/// Per-plan maxima, each at least 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapScale {
    pub max_time: f64,
    pub max_rows: f64,
    pub max_cost: f64,
}

impl Default for HeatmapScale {
    fn default() -> Self {
        Self {
            max_time: 1.0,
            max_rows: 1.0,
            max_cost: 1.0,
        }
    }
}

fn time_value(node: &PlanGraphNode) -> f64 {
    if node.exclusive_time_ms > 0.0 {
        node.exclusive_time_ms
    } else {
        node.inclusive_time_ms
    }
}

fn rows_value(node: &PlanGraphNode) -> f64 {
    if node.step.actual_rows.is_some() {
        node.actual_rows_total
    } else {
        node.step.plan_rows.unwrap_or(0.0)
    }
}

impl HeatmapScale {
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a PlanGraphNode>) -> Self {
        nodes.into_iter().fold(Self::default(), |scale, node| Self {
            max_time: scale.max_time.max(time_value(node)),
            max_rows: scale.max_rows.max(rows_value(node)),
            max_cost: scale.max_cost.max(node.exclusive_cost),
        })
    }

    /// Node value relative to the plan maximum, in `[0, 1]`
    pub fn intensity(&self, node: &PlanGraphNode, mode: HeatmapMode) -> f64 {
        let ratio = match mode {
            HeatmapMode::None => return 0.0,
            HeatmapMode::Time => time_value(node) / self.max_time,
            HeatmapMode::Rows => rows_value(node) / self.max_rows,
            HeatmapMode::Cost => node.exclusive_cost / self.max_cost,
        };
        if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
