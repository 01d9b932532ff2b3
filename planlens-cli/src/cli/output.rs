// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Analysis formatting for CLI output

use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use planlens::insight::format::{format_fixed, format_number};
use planlens::{
    outline, render_plan, DisplayOptions, HintSeverity, InsightSeverity, NodeDetails,
    PlanAnalysis, PlanGraphNode,
};

use crate::cli::commands::OutputFormat;

/// Analysis formatter for the supported output formats
pub struct AnalysisFormatter;

impl AnalysisFormatter {
    /// Format a whole plan
    pub fn format(analysis: &PlanAnalysis, format: OutputFormat, options: &DisplayOptions) -> String {
        match format {
            OutputFormat::Tree => render_plan(analysis, options),
            OutputFormat::Table => Self::format_table(analysis, options),
            OutputFormat::Json => Self::to_json(analysis),
        }
    }

    /// Format the derived details of one node
    pub fn format_node(details: &NodeDetails, node: &PlanGraphNode, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => Self::to_json(details),
            OutputFormat::Tree | OutputFormat::Table => Self::format_details(details, node),
        }
    }

    /// One row per node, in tree order, using comfy-table
    fn format_table(analysis: &PlanAnalysis, options: &DisplayOptions) -> String {
        let visibility = &options.visibility;
        let mut output = String::new();

        output.push_str(&format!("{}\n", "Plan Analysis".bold().green()));
        if let Some(ms) = analysis.meta.timings.execution_time {
            output.push_str(&format!("Execution time: {} ms\n", format_fixed(ms, 2)));
        }
        output.push_str(&format!("Nodes: {}\n\n", analysis.graph.len()));

        let mut header = vec!["Node", "Id"];
        if visibility.time {
            header.extend(["Self time (ms)", "Share"]);
        }
        if visibility.rows {
            header.extend(["Rows", "Planned", "Estimate"]);
        }
        if visibility.cost {
            header.push("Self cost");
        }
        if visibility.buffers {
            header.push("Buffers");
        }
        header.push("Flags");

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(
            header
                .into_iter()
                .map(|col| Cell::new(col).fg(Color::Green))
                .collect::<Vec<_>>(),
        );

        let mut insights = Vec::new();
        for row in outline(&analysis.graph) {
            let (Some(node), Some(details)) = (analysis.graph.node(&row.id), analysis.details(&row.id))
            else {
                continue;
            };

            let mut cells = vec![
                Cell::new(format!("{}{}", row.guide(), node.label)),
                Cell::new(&node.id),
            ];
            if visibility.time {
                let mut time = Cell::new(details.formatted_self_time.clone().unwrap_or_default());
                if let Some(hint) = &node.slow_hint {
                    time = time.fg(Self::hint_color(hint.severity));
                }
                cells.push(time);
                cells.push(Cell::new(details.execution_share.clone().unwrap_or_default()));
            }
            if visibility.rows {
                cells.push(Cell::new(details.actual_rows.clone().unwrap_or_default()));
                cells.push(Cell::new(details.planned_rows_per_loop.clone().unwrap_or_default()));
                let mut estimate = Cell::new(details.est_factor.clone().unwrap_or_default());
                if let Some(insight) = &details.estimation_insight {
                    estimate = estimate.fg(match insight.severity {
                        InsightSeverity::Critical => Color::Red,
                        InsightSeverity::Major => Color::Yellow,
                    });
                }
                cells.push(estimate);
            }
            if visibility.cost {
                let mut cost = Cell::new(details.formatted_self_cost.clone().unwrap_or_default());
                if let Some(hint) = &node.cost_hint {
                    cost = cost.fg(Self::hint_color(hint.severity));
                }
                cells.push(cost);
            }
            if visibility.buffers {
                let total = details.buffer_totals.exclusive.total;
                cells.push(Cell::new(if total > 0 {
                    format_number(total as f64)
                } else {
                    String::new()
                }));
            }
            cells.push(Cell::new(Self::flags(node)));
            table.add_row(cells);

            if let Some(insight) = details.estimation_insight {
                insights.push(format!("{} ({}): {}", insight.badge, node.id, insight.summary));
            }
        }

        output.push_str(&table.to_string());
        output.push('\n');

        if !insights.is_empty() {
            output.push_str(&format!("\n{}\n", "Estimate warnings:".bold().yellow()));
            for (i, insight) in insights.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, insight.yellow()));
            }
        }

        output
    }

    fn format_details(details: &NodeDetails, node: &PlanGraphNode) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} [{}]\n", node.label.bold().green(), node.id));
        if let Some(name) = &node.subplan_name {
            output.push_str(&format!("Subplan: {}\n", name));
        }
        if node.never_executed {
            output.push_str(&format!("{}\n", "Never executed".yellow()));
        }

        for (title, metrics) in [
            ("Overview", &details.overview_metrics),
            ("Execution", &details.execution_metrics),
            ("Cost", &details.cost_metrics),
        ] {
            output.push_str(&format!("\n{}\n", title.bold()));
            for metric in metrics.iter() {
                match &metric.sub_label {
                    Some(sub) => output.push_str(&format!("  {}: {} {}\n", metric.label, metric.value, sub.dimmed())),
                    None => output.push_str(&format!("  {}: {}\n", metric.label, metric.value)),
                }
            }
        }

        if details.has_buffer_data {
            let ex = &details.buffer_totals.exclusive;
            let inc = &details.buffer_totals.inclusive;
            output.push_str(&format!("\n{}\n", "Buffers".bold()));
            output.push_str(&format!(
                "  Self: shared {} | temp {} | local {} | total {}\n",
                ex.shared, ex.temp, ex.local, ex.total
            ));
            output.push_str(&format!(
                "  Including children: shared {} | temp {} | local {} | total {}\n",
                inc.shared, inc.temp, inc.local, inc.total
            ));
        }

        if !details.condition_rows.is_empty() {
            output.push_str(&format!("\n{}\n", "Conditions".bold()));
            for row in &details.condition_rows {
                output.push_str(&format!("  {}: {}\n", row.label, row.value));
            }
        }
        for (label, percent) in [
            ("Filter", details.filtered_percent),
            ("Join filter", details.join_filtered_percent),
            ("Index recheck", details.recheck_percent),
        ] {
            if let Some(percent) = percent {
                output.push_str(&format!("  {} removed {}% of rows\n", label, percent));
            }
        }

        if !details.output_columns.is_empty() {
            output.push_str(&format!("\n{}\n", "Output".bold()));
            output.push_str(&format!("  {}\n", details.output_columns.join(", ")));
        }

        if let Some(insight) = &details.estimation_insight {
            let badge = match insight.severity {
                InsightSeverity::Critical => insight.badge.red().bold(),
                InsightSeverity::Major => insight.badge.yellow().bold(),
            };
            output.push_str(&format!("\n{}\n", badge));
            output.push_str(&format!("  {}\n", insight.summary));
            output.push_str(&format!("  {}\n", insight.implication));
            output.push_str(&format!("  {}\n", insight.guidance.dimmed()));
        }

        output
    }

    fn flags(node: &PlanGraphNode) -> String {
        let mut flags = Vec::new();
        if node.never_executed {
            flags.push("never executed".to_string());
        }
        if let Some(hint) = &node.slow_hint {
            flags.push(format!("slow ({:.0}%)", hint.self_time_share * 100.0));
        }
        if node.cost_hint.is_some() {
            flags.push("costly".to_string());
        }
        if let Some(name) = node.step.subplan_name.as_deref() {
            flags.push(name.to_string());
        }
        flags.join(", ")
    }

    fn hint_color(severity: HintSeverity) -> Color {
        match severity {
            HintSeverity::Alert => Color::Red,
            HintSeverity::Warn => Color::Yellow,
        }
    }

    fn to_json<T: serde::Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize analysis to JSON\"}".to_string()
        })
    }
}
