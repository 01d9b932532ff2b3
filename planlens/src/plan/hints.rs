// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Plan-wide hotspot hints
//!
//! Once every node has its exclusive values, nodes that dominate the plan's
//! time or cost are flagged relative to the whole plan (share of the total)
//! and relative to their peers (percentiles).

use serde::{Deserialize, Serialize};

use super::graph::PlanGraphNode;
use crate::config::HintThresholds;

/// How strongly a hint should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintSeverity {
    Warn,
    Alert,
}

/// A step that accounts for a large part of execution time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowHint {
    pub severity: HintSeverity,
    pub self_time_ms: f64,
    /// Fraction (0..=1) of the total time
    pub self_time_share: f64,
}

/// A step that accounts for a large part of the estimated cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostHint {
    pub severity: HintSeverity,
    pub self_cost: f64,
    /// Fraction of the plan's summed exclusive cost
    pub self_cost_share: Option<f64>,
    /// Fraction of the highest total cost in the plan
    pub max_total_cost_share: Option<f64>,
}

/// Linear-interpolated percentile (`p` in 0..=1); 0 for an empty set
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

fn escalate(current: &mut Option<HintSeverity>, candidate: Option<HintSeverity>) {
    if candidate > *current {
        *current = candidate;
    }
}

/// Attach slow/cost hints to every node that qualifies
pub(crate) fn annotate(
    nodes: &mut [PlanGraphNode],
    execution_time: Option<f64>,
    thresholds: &HintThresholds,
) {
    let fallback_total: f64 = nodes.iter().map(|n| n.exclusive_time_ms).sum();
    let total_time = execution_time
        .filter(|t| *t > 0.0)
        .unwrap_or(fallback_total);

    let self_times: Vec<f64> = nodes
        .iter()
        .map(|n| n.exclusive_time_ms)
        .filter(|t| *t > 0.0)
        .collect();
    let time_alert_pct = percentile(&self_times, thresholds.alert_percentile);
    let time_warn_pct = percentile(&self_times, thresholds.warn_percentile);

    let self_costs: Vec<f64> = nodes
        .iter()
        .map(|n| n.exclusive_cost)
        .filter(|c| *c > 0.0)
        .collect();
    let total_self_cost: f64 = self_costs.iter().sum();
    let cost_alert_pct = percentile(&self_costs, thresholds.alert_percentile);
    let cost_warn_pct = percentile(&self_costs, thresholds.warn_percentile);
    let max_total_cost = nodes
        .iter()
        .map(|n| n.step.total_cost.unwrap_or(0.0))
        .fold(0.0, f64::max);

    let min_time = thresholds.min_self_time_ms;

    for node in nodes.iter_mut() {
        let self_time = node.exclusive_time_ms;
        if self_time >= min_time && total_time > 0.0 {
            let share = self_time / total_time;
            let severity = if share >= thresholds.time_share_alert {
                Some(HintSeverity::Alert)
            } else if share >= thresholds.time_share_warn {
                Some(HintSeverity::Warn)
            } else if time_alert_pct >= min_time && self_time >= time_alert_pct {
                Some(HintSeverity::Alert)
            } else if time_warn_pct >= min_time && self_time >= time_warn_pct {
                Some(HintSeverity::Warn)
            } else {
                None
            };

            node.slow_hint = severity.map(|severity| SlowHint {
                severity,
                self_time_ms: self_time,
                self_time_share: share,
            });
        }

        let self_cost = node.exclusive_cost;
        if self_cost <= 0.0 {
            continue;
        }

        let mut severity = None;
        let mut self_cost_share = None;
        let mut max_total_cost_share = None;

        if total_self_cost > 0.0 {
            let share = self_cost / total_self_cost;
            self_cost_share = Some(share);
            if share >= thresholds.cost_share_alert {
                escalate(&mut severity, Some(HintSeverity::Alert));
            } else if share >= thresholds.cost_share_warn {
                escalate(&mut severity, Some(HintSeverity::Warn));
            }
        }

        if max_total_cost > 0.0 {
            let share = self_cost / max_total_cost;
            max_total_cost_share = Some(share);
            if share >= thresholds.max_cost_share_alert {
                escalate(&mut severity, Some(HintSeverity::Alert));
            } else if share >= thresholds.max_cost_share_warn {
                escalate(&mut severity, Some(HintSeverity::Warn));
            }
        }

        if severity.is_none() {
            if cost_alert_pct > 0.0 && self_cost >= cost_alert_pct {
                severity = Some(HintSeverity::Alert);
            } else if cost_warn_pct > 0.0 && self_cost >= cost_warn_pct {
                severity = Some(HintSeverity::Warn);
            }
        }

        node.cost_hint = severity.map(|severity| CostHint {
            severity,
            self_cost,
            self_cost_share,
            max_total_cost_share,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::graph::{build_graph, BuildOptions};
    use crate::plan::raw::{PlanStep, RawPlanNode};

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(percentile(&[], 0.9), 0.0);
        assert_eq!(percentile(&[4.0], 0.9), 4.0);
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), 3.0);
        let p90 = percentile(&[10.0, 0.0], 0.9);
        assert!((p90 - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_step_gets_alert() {
        let plan = RawPlanNode {
            step: PlanStep {
                node_type: Some("Sort".to_string()),
                actual_total_time: Some(100.0),
                actual_loops: Some(1.0),
                total_cost: Some(100.0),
                ..PlanStep::default()
            },
            plans: vec![RawPlanNode {
                step: PlanStep {
                    node_type: Some("Seq Scan".to_string()),
                    actual_total_time: Some(10.0),
                    actual_loops: Some(1.0),
                    total_cost: Some(95.0),
                    ..PlanStep::default()
                },
                plans: Vec::new(),
            }],
        };

        let graph = build_graph(&plan, &BuildOptions::new(Some(100.0)));

        let root = graph.root().unwrap();
        let slow = root.slow_hint.as_ref().unwrap();
        assert_eq!(slow.severity, HintSeverity::Alert);
        assert!((slow.self_time_share - 0.9).abs() < 1e-9);

        // Seq Scan: 95 of 100 exclusive cost, 95% of the highest total cost
        let scan = graph.node("root-0").unwrap();
        let cost = scan.cost_hint.as_ref().unwrap();
        assert_eq!(cost.severity, HintSeverity::Alert);
        assert_eq!(cost.self_cost_share, Some(0.95));

        // Sort: 5 of 100 -> below share thresholds, but 5% of max total cost is < 10%
        let root_cost = root.cost_hint.as_ref();
        assert!(root_cost.is_none());
    }
}
