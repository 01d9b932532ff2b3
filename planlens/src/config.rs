// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Analyzer and display configuration
//!
//! All knobs are plain values passed into the builder, the deriver and the
//! renderer. Nothing is read from global state.

use serde::{Deserialize, Serialize};

/// Configuration for building and interpreting a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// How time reported under parallel gather nodes is normalized
    pub worker_time_policy: WorkerTimePolicy,

    /// Multipliers at which an estimate miss becomes an insight
    pub insight_thresholds: InsightThresholds,

    /// Thresholds for slow-step and expensive-step hints
    pub hint_thresholds: HintThresholds,
}

/// Normalization applied to per-loop times below `Gather` / `Gather Merge`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerTimePolicy {
    /// Divide descendant time by the number of participants (workers + leader)
    #[default]
    DivideByParticipants,
    /// Use times exactly as reported
    AsReported,
}

/// Severity boundaries for estimation insights, in "times off"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// Lower bound (inclusive) for a `major` insight
    pub major: f64,
    /// Lower bound (inclusive) for a `critical` insight
    pub critical: f64,
}

/// Thresholds used when flagging hotspots across the whole plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintThresholds {
    /// Self time below this (ms) never produces a slow hint
    pub min_self_time_ms: f64,
    pub time_share_alert: f64,
    pub time_share_warn: f64,
    pub cost_share_alert: f64,
    pub cost_share_warn: f64,
    pub max_cost_share_alert: f64,
    pub max_cost_share_warn: f64,
    /// Percentile (0..=1) that escalates to an alert
    pub alert_percentile: f64,
    /// Percentile (0..=1) that escalates to a warning
    pub warn_percentile: f64,
}

/// Which metric groups a renderer should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsVisibility {
    pub time: bool,
    pub rows: bool,
    pub cost: bool,
    pub buffers: bool,
    pub output: bool,
}

/// Metric used to tint nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatmapMode {
    #[default]
    None,
    Time,
    Rows,
    Cost,
}

/// Presentation options threaded into renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub visibility: MetricsVisibility,
    pub heatmap: HeatmapMode,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            worker_time_policy: WorkerTimePolicy::default(),
            insight_thresholds: InsightThresholds::default(),
            hint_thresholds: HintThresholds::default(),
        }
    }
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            major: 10.0,
            critical: 100.0,
        }
    }
}

impl Default for HintThresholds {
    fn default() -> Self {
        Self {
            min_self_time_ms: 1.0,
            time_share_alert: 0.75,
            time_share_warn: 0.35,
            cost_share_alert: 0.5,
            cost_share_warn: 0.25,
            max_cost_share_alert: 0.9,
            max_cost_share_warn: 0.1,
            alert_percentile: 0.95,
            warn_percentile: 0.9,
        }
    }
}

impl Default for MetricsVisibility {
    fn default() -> Self {
        Self {
            time: true,
            rows: true,
            cost: true,
            buffers: true,
            output: true,
        }
    }
}

impl MetricsVisibility {
    /// Hide a metric group by name (`time`, `rows`, `cost`, `buffers`, `output`)
    pub fn hide(&mut self, name: &str) -> bool {
        let slot = match name {
            "time" => &mut self.time,
            "rows" => &mut self.rows,
            "cost" => &mut self.cost,
            "buffers" => &mut self.buffers,
            "output" => &mut self.output,
            _ => return false,
        };
        *slot = false;
        true
    }
}

impl AnalyzerConfig {
    /// Parse a (possibly partial) JSON configuration; missing keys keep defaults
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
