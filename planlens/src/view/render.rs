// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Plain-text plan rendering

use super::heatmap::HeatmapScale;
use super::outline::outline;
use crate::config::{DisplayOptions, HeatmapMode};
use crate::insight::format::format_ms;
use crate::insight::NodeDetails;
use crate::pipeline::PlanAnalysis;
use crate::plan::{HintSeverity, PlanGraphNode};

const HEAT_CELLS: usize = 10;

/// Render a summary header and an annotated tree
pub fn render_plan(analysis: &PlanAnalysis, options: &DisplayOptions) -> String {
    let mut output = String::new();

    output.push_str("Query Plan Summary\n");
    output.push_str(&"=".repeat(50));
    output.push('\n');

    if let Some(failure) = &analysis.meta.error {
        output.push_str(&format!("{}\n{}\n", failure.message, failure.detail));
        return output;
    }

    let timings = &analysis.meta.timings;
    let mut summary = Vec::new();
    for (label, value) in [
        ("Planning Time", timings.planning_time),
        ("Execution Time", timings.execution_time),
        ("JIT", timings.jit_total_time),
    ] {
        if let Some(ms) = format_ms(value) {
            summary.push(format!("{}: {} ms", label, ms));
        }
    }
    summary.push(format!("Nodes: {}", analysis.graph.len()));
    summary.push(format!("Subplans: {}", analysis.meta.subplan_roots.len()));
    output.push_str(&summary.join(" | "));
    output.push_str("\n\n");

    output.push_str("Execution Plan\n");
    output.push_str(&"=".repeat(50));
    output.push('\n');

    let scale = HeatmapScale::from_nodes(&analysis.graph.nodes);
    let mut insights = Vec::new();

    for row in outline(&analysis.graph) {
        let (Some(node), Some(details)) = (analysis.graph.node(&row.id), analysis.details(&row.id))
        else {
            continue;
        };
        let guide = row.guide();
        output.push_str(&format!("{}{}\n", guide, headline(node, &details)));

        let indent = " ".repeat(guide.chars().count() + 4);
        for line in metric_lines(node, &details, options, &scale) {
            output.push_str(&format!("{}{}\n", indent, line));
        }

        if let Some(insight) = details.estimation_insight {
            insights.push(format!(
                "{} {}: {}. {}",
                node.id, node.label, insight.badge, insight.summary
            ));
        }
    }

    if !analysis.meta.subplan_roots.is_empty() {
        output.push_str("\nSubplans\n");
        output.push_str(&"-".repeat(30));
        output.push('\n');
        for root in &analysis.meta.subplan_roots {
            output.push_str(&format!("{} → {}\n", root.name, root.id));
        }
    }

    if !insights.is_empty() {
        output.push_str("\nInsights\n");
        output.push_str(&"-".repeat(30));
        output.push('\n');
        for (i, insight) in insights.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, insight));
        }
    }

    output
}

/// `Index Scan using idx on users u [root-1]` plus badges
fn headline(node: &PlanGraphNode, details: &NodeDetails) -> String {
    let step = &node.step;
    let mut line = node.label.clone();
    if let Some(index) = &step.index_name {
        line.push_str(&format!(" using {}", index));
    }
    if let Some(relation) = &step.relation_name {
        line.push_str(&format!(" on {}", relation));
        if let Some(alias) = step.alias.as_ref().filter(|a| *a != relation) {
            line.push_str(&format!(" {}", alias));
        }
    }
    if let Some(name) = &step.subplan_name {
        line.push_str(&format!(" ({})", name));
    }
    line.push_str(&format!(" [{}]", node.id));

    if node.never_executed {
        line.push_str(" [never executed]");
    }
    if let Some(hint) = &node.slow_hint {
        line.push_str(&format!(
            " [slow: {} {:.0}%]",
            severity_text(hint.severity),
            hint.self_time_share * 100.0
        ));
    }
    if let Some(hint) = &node.cost_hint {
        line.push_str(&format!(" [costly: {}]", severity_text(hint.severity)));
    }
    if let Some(insight) = &details.estimation_insight {
        line.push_str(&format!(" [{}]", insight.badge));
    }
    line
}

fn severity_text(severity: HintSeverity) -> &'static str {
    match severity {
        HintSeverity::Warn => "warn",
        HintSeverity::Alert => "alert",
    }
}

fn metric_lines(
    node: &PlanGraphNode,
    details: &NodeDetails,
    options: &DisplayOptions,
    scale: &HeatmapScale,
) -> Vec<String> {
    let visibility = &options.visibility;
    let mut lines = Vec::new();

    if visibility.time {
        if let (Some(self_time), Some(per_loop)) = (
            &details.formatted_self_time,
            &details.formatted_total_time_per_loop,
        ) {
            let share = details
                .execution_share
                .as_ref()
                .map(|s| format!(" ({})", s))
                .unwrap_or_default();
            lines.push(format!(
                "time: self {} ms{} | total {} ms × {} loops",
                self_time, share, per_loop, details.formatted_loops
            ));
        }
    }

    if visibility.rows {
        let mut parts = Vec::new();
        if let Some(actual) = &details.actual_rows {
            parts.push(format!("{} actual", actual));
        }
        if let Some(planned) = &details.planned_rows_per_loop {
            parts.push(format!("{} planned", planned));
        }
        if !parts.is_empty() {
            let mut line = format!("rows: {} per loop", parts.join(" / "));
            if let (Some(factor), Some(direction)) =
                (&details.est_factor, details.estimation_direction_label)
            {
                line.push_str(&format!(" ({}, {})", factor, direction.to_lowercase()));
            }
            lines.push(line);
        }
        for (label, percent) in [
            ("filter", details.filtered_percent),
            ("join filter", details.join_filtered_percent),
            ("index recheck", details.recheck_percent),
        ] {
            if let Some(percent) = percent {
                lines.push(format!("removed by {}: {}%", label, percent));
            }
        }
    }

    if visibility.cost {
        if let (Some(self_cost), Some(total)) = (&details.formatted_self_cost, node.step.total_cost)
        {
            lines.push(format!("cost: self {} | total {:.2}", self_cost, total));
        }
    }

    for condition in &details.condition_rows {
        lines.push(format!("{}: {}", condition.label, condition.value));
    }

    if visibility.buffers && details.has_buffer_data {
        let exclusive = &details.buffer_totals.exclusive;
        let inclusive = &details.buffer_totals.inclusive;
        lines.push(format!(
            "buffers: shared {} | temp {} | local {} (self {} of {})",
            inclusive.shared, inclusive.temp, inclusive.local, exclusive.total, inclusive.total
        ));
    }

    if visibility.output && !details.output_columns.is_empty() {
        lines.push(format!("output: {}", details.output_columns.join(", ")));
    }

    if options.heatmap != HeatmapMode::None {
        let intensity = scale.intensity(node, options.heatmap);
        let filled = (intensity * HEAT_CELLS as f64).round() as usize;
        lines.push(format!(
            "heat: {}{} {:.0}%",
            "█".repeat(filled),
            "░".repeat(HEAT_CELLS - filled.min(HEAT_CELLS)),
            intensity * 100.0
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsVisibility;
    use crate::pipeline::analyze;

    const PLAN: &str = r#"[{
        "Plan": {
            "Node Type": "Hash Join", "Total Cost": 50.0, "Startup Cost": 1.0,
            "Actual Total Time": 6.0, "Actual Loops": 1, "Actual Rows": 20, "Plan Rows": 1,
            "Hash Cond": "(o.user_id = u.id)",
            "Plans": [
                {"Node Type": "Seq Scan", "Relation Name": "orders", "Alias": "o",
                 "Total Cost": 30.0, "Actual Total Time": 4.0, "Actual Loops": 1,
                 "Actual Rows": 20, "Plan Rows": 20, "Shared Read Blocks": 9},
                {"Node Type": "Seq Scan", "Relation Name": "users", "Alias": "users",
                 "Subplan Name": "CTE active", "Total Cost": 5.0,
                 "Actual Loops": 0, "Plan Rows": 3}
            ]
        },
        "Planning Time": 0.25,
        "Execution Time": 6.5
    }]"#;

    #[test]
    fn test_render_tree_and_sections() {
        let text = render_plan(&analyze(PLAN), &DisplayOptions::default());

        assert!(text.starts_with("Query Plan Summary\n"));
        assert!(text.contains("Planning Time: 0.250 ms | Execution Time: 6.50 ms | Nodes: 3 | Subplans: 1"));
        assert!(text.contains("Hash Join [root]"));
        assert!(text.contains("├─ Seq Scan on orders o [root-0]"));
        assert!(text.contains("└─ Seq Scan on users (CTE active) [root-1] [never executed]"));
        assert!(text.contains("Hash condition: (o.user_id = u.id)"));
        assert!(text.contains("buffers: shared 9 | temp 0 | local 0 (self 9 of 9)"));
        assert!(text.contains("\nSubplans\n"));
        assert!(text.contains("CTE active → root-1"));
        assert!(text.contains("[Underestimated ×20]"));
        assert!(text.contains("1. root Hash Join: Underestimated ×20."));
    }

    #[test]
    fn test_visibility_and_heatmap() {
        let mut visibility = MetricsVisibility::default();
        visibility.hide("time");
        visibility.hide("buffers");
        let options = DisplayOptions {
            visibility,
            heatmap: HeatmapMode::Cost,
        };
        let text = render_plan(&analyze(PLAN), &options);

        assert!(!text.contains("time: self"));
        assert!(!text.contains("buffers:"));
        assert!(text.contains("cost: self 30.00 | total 30.00"));
        assert!(text.contains("heat: ██████████ 100%"));
    }

    #[test]
    fn test_failure_renders_message() {
        let text = render_plan(&analyze("not json"), &DisplayOptions::default());
        assert!(text.contains("Failed to parse EXPLAIN JSON\n"));
        assert!(!text.contains("Execution Plan"));
    }
}
