// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Row-estimate accuracy insights

use serde::{Deserialize, Serialize};

use super::format::{format_multiplier, format_number};
use crate::config::InsightThresholds;
use crate::plan::{EstimateDirection, PlanGraphNode};

const UNDER_IMPLICATION: &str = "This gap usually means the planner picked a strategy optimized for far fewer rows, which can lead to expensive nested loops or repeat scans.";

const OVER_IMPLICATION: &str = "This gap usually means the planner avoided selective indexes and chose broader scans because it expected many more rows.";

const GUIDANCE: &str = "Make sure table statistics are current (autovacuum or a manual ANALYZE if you have access) and review indexes or predicates so the planner has more reliable estimates.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Major,
    Critical,
}

/// Presentation variant paired with a severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightVariant {
    Warning,
    Destructive,
}

/// An estimate miss large enough to be worth surfacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationInsight {
    /// e.g. `Underestimated ×120`
    pub badge: String,
    pub summary: String,
    pub implication: String,
    pub guidance: String,
    pub severity: InsightSeverity,
    pub variant: InsightVariant,
    /// How many times off, always ≥ 1
    pub magnitude: f64,
}

/// Classify a node's estimate factor; `None` below the major threshold
pub fn estimation_insight(
    node: &PlanGraphNode,
    thresholds: &InsightThresholds,
) -> Option<EstimationInsight> {
    let factor = node.est_factor.filter(|f| *f > 0.0 && f.is_finite())?;
    let direction = node
        .est_direction
        .filter(|d| *d != EstimateDirection::None)?;

    let magnitude = match direction {
        EstimateDirection::Over => 1.0 / factor,
        _ => factor,
    };
    if magnitude < thresholds.major {
        return None;
    }

    let severity = if magnitude >= thresholds.critical {
        InsightSeverity::Critical
    } else {
        InsightSeverity::Major
    };
    let variant = match severity {
        InsightSeverity::Critical => InsightVariant::Destructive,
        InsightSeverity::Major => InsightVariant::Warning,
    };
    let (title, implication) = match direction {
        EstimateDirection::Over => ("Over", OVER_IMPLICATION),
        _ => ("Under", UNDER_IMPLICATION),
    };
    let multiplier = format_multiplier(magnitude);

    let mut summary = vec![format!(
        "Planner {}estimated rows by ~{}×.",
        title.to_lowercase(),
        multiplier
    )];
    let step = &node.step;
    if let (Some(actual), Some(planned)) = (step.actual_rows, step.plan_rows) {
        summary.push(format!(
            "Observed {} vs {} planned per loop.",
            format_number(actual),
            format_number(planned)
        ));
        let loops = node.loops();
        if loops > 1.0 {
            summary.push(format!(
                "Across {} loops (~{} rows vs {} planned).",
                format_number(loops),
                format_number(node.actual_rows_total),
                format_number(planned * loops)
            ));
        }
    }

    Some(EstimationInsight {
        badge: format!("{}estimated ×{}", title, multiplier),
        summary: summary.join(" "),
        implication: implication.to_string(),
        guidance: GUIDANCE.to_string(),
        severity,
        variant,
        magnitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{build_graph, BuildOptions, PlanStep, RawPlanNode};

    fn node_with(plan_rows: f64, actual_rows: f64, loops: f64) -> PlanGraphNode {
        let plan = RawPlanNode {
            step: PlanStep {
                node_type: Some("Index Scan".to_string()),
                plan_rows: Some(plan_rows),
                actual_rows: Some(actual_rows),
                actual_loops: Some(loops),
                ..PlanStep::default()
            },
            plans: Vec::new(),
        };
        build_graph(&plan, &BuildOptions::default()).nodes.remove(0)
    }

    #[test]
    fn test_small_miss_has_no_insight() {
        let node = node_with(10.0, 95.0, 1.0);
        assert!(estimation_insight(&node, &InsightThresholds::default()).is_none());
    }

    #[test]
    fn test_major_underestimate() {
        let node = node_with(1.0, 25.0, 1.0);
        let insight = estimation_insight(&node, &InsightThresholds::default()).unwrap();
        assert_eq!(insight.severity, InsightSeverity::Major);
        assert_eq!(insight.variant, InsightVariant::Warning);
        assert_eq!(insight.badge, "Underestimated ×25");
        assert_eq!(
            insight.summary,
            "Planner underestimated rows by ~25×. Observed 25 vs 1 planned per loop."
        );
        assert!(insight.implication.contains("nested loops"));
    }

    #[test]
    fn test_critical_overestimate_across_loops() {
        // 2 rows per loop over 5 loops = 10 rows against 5,000 planned per loop
        let node = node_with(5000.0, 2.0, 5.0);
        let insight = estimation_insight(&node, &InsightThresholds::default()).unwrap();
        assert_eq!(insight.severity, InsightSeverity::Critical);
        assert_eq!(insight.variant, InsightVariant::Destructive);
        assert_eq!(insight.badge, "Overestimated ×500");
        assert!(insight
            .summary
            .ends_with("Across 5 loops (~10 rows vs 25,000 planned)."));
        assert!(insight.implication.contains("broader scans"));
    }

    #[test]
    fn test_boundaries() {
        let thresholds = InsightThresholds::default();
        let at_major = node_with(1.0, 10.0, 1.0);
        assert_eq!(
            estimation_insight(&at_major, &thresholds).map(|i| i.severity),
            Some(InsightSeverity::Major)
        );
        let at_critical = node_with(1.0, 100.0, 1.0);
        assert_eq!(
            estimation_insight(&at_critical, &thresholds).map(|i| i.severity),
            Some(InsightSeverity::Critical)
        );
    }

    #[test]
    fn test_zero_rows_produce_no_insight() {
        let node = node_with(4.0, 0.0, 0.0);
        assert_eq!(node.est_factor, Some(0.0));
        assert!(estimation_insight(&node, &InsightThresholds::default()).is_none());
    }
}
