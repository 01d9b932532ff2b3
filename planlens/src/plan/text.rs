// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Input model for text-format `EXPLAIN` output
//!
//! The default `EXPLAIN` format is an indented tree: one line per step,
//! children introduced by `->`, and `Key: value` detail lines below each
//! step. [`TextPlan::parse`] rebuilds the tree from indentation alone and
//! [`TextPlanNode::to_raw`] maps it onto the same [`RawPlanNode`] the JSON
//! path produces, so both inputs share the graph builder.
//!
//! Parsing never fails. Lines that cannot be placed are skipped, and metrics
//! that do not parse as numbers are left absent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::buffers::BufferCounters;
use super::raw::{PlanDocument, PlanStep, PlanTimings, RawPlanNode};
use crate::error::PlanError;

/// `Operation on target  (cost=...) (actual ...)`; the metric groups are optional
static NODE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<op>.+?)(?P<metrics>(?:\s*\((?:cost=|actual |never executed)[^)]*\))*)\s*$")
        .expect("valid node line regex")
});

static METRIC_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]*)\)").expect("valid metric group regex"));

/// `actual time=0.015..0.123`, `rows=85`, ...
static METRIC_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<key>[a-z][a-z ]*?)=(?P<value>\S+)").expect("valid metric field regex")
});

static TARGET_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+on\s+(.+)$").expect("valid target regex"));

static USING_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+using\s+(.+)$").expect("valid using regex"));

static INDEX_SCAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<kind>.+?)(?: (?P<dir>Backward))? using (?P<index>\S+)$")
        .expect("valid index scan regex")
});

static JOIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<kind>Hash|Merge|Nested Loop)(?: (?P<join>Left|Right|Full|Semi|Anti|Right Semi|Right Anti))? Join$")
        .expect("valid join regex")
});

static SORT_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<method>.+?)\s+(?P<space>Memory|Disk):\s*(?P<kb>\d+)kB")
        .expect("valid sort method regex")
});

static SUBPLAN_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:InitPlan|SubPlan)\b|^CTE \S+$").expect("valid subplan regex"));

static JIT_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total (\d+(?:\.\d+)?) ms").expect("valid jit regex"));

static ROW_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\d+ rows?\)$").expect("valid row count regex"));

/// Plan-wide lines printed after the tree, at root indentation
const FOOTERS: [&str; 7] = [
    "Planning Time:",
    "Execution Time:",
    "Total runtime:",
    "Trigger ",
    "Query Identifier:",
    "Settings:",
    "Serialization:",
];

/// Headers whose indented lines describe the statement rather than a step
const SECTIONS: [&str; 3] = ["Planning:", "Execution:", "JIT:"];

/// A `start..end` pair from the metric groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    fn parse(value: &str) -> Option<Self> {
        let (start, end) = value.split_once("..")?;
        Some(Self {
            start: number(start)?,
            end: number(end)?,
        })
    }
}

/// One step of a text plan, as printed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPlanNode {
    /// Step name, keeping `using <index>` when the line also names a target
    pub operation: String,
    /// `on users`, `on orders o` or `using idx`
    pub target: Option<String>,
    /// Detail lines in input order, trimmed
    pub details: Vec<String>,
    pub cost: Option<Span>,
    pub rows: Option<f64>,
    pub width: Option<f64>,
    pub actual_time: Option<Span>,
    pub actual_rows: Option<f64>,
    pub loops: Option<f64>,
    pub never_executed: bool,
    pub rows_removed_by_filter: Option<f64>,
    /// `InitPlan 1 (returns $0)`, `SubPlan 2` or `CTE name` introducing this step
    pub subplan_name: Option<String>,
    pub children: Vec<TextPlanNode>,
}

impl TextPlanNode {
    /// Build a step from the content of a node line (arrow already removed)
    fn from_line(content: &str) -> Option<Self> {
        let caps = NODE_LINE.captures(content)?;
        let head = caps.name("op")?.as_str().trim();
        if head.is_empty() {
            return None;
        }

        let (operation, target) = match TARGET_SPLIT.captures(head) {
            Some(on) => (on[1].trim().to_string(), Some(format!("on {}", on[2].trim()))),
            None => match USING_SPLIT.captures(head) {
                Some(using) => (
                    using[1].trim().to_string(),
                    Some(format!("using {}", using[2].trim())),
                ),
                None => (head.to_string(), None),
            },
        };

        let mut node = Self {
            operation,
            target,
            ..Self::default()
        };
        if let Some(metrics) = caps.name("metrics") {
            node.read_metrics(metrics.as_str());
        }
        Some(node)
    }

    fn read_metrics(&mut self, metrics: &str) {
        for group in METRIC_GROUP.captures_iter(metrics) {
            let inner = group[1].trim();
            if inner.starts_with("never executed") {
                self.never_executed = true;
                continue;
            }
            let actual = inner.starts_with("actual");
            for field in METRIC_FIELD.captures_iter(inner) {
                let value = &field["value"];
                match (actual, field["key"].trim()) {
                    (false, "cost") => self.cost = Span::parse(value),
                    (false, "rows") => self.rows = number(value),
                    (false, "width") => self.width = number(value),
                    (true, "actual time") => self.actual_time = Span::parse(value),
                    (true, "rows") | (true, "actual rows") => self.actual_rows = number(value),
                    (true, "loops") => self.loops = number(value),
                    _ => {}
                }
            }
        }
    }

    fn push_detail(&mut self, line: &str) {
        if let Some(("Rows Removed by Filter", value)) = split_detail(line) {
            self.rows_removed_by_filter = number(value);
        }
        self.details.push(line.to_string());
    }

    /// Map onto the JSON input model
    pub fn to_raw(&self) -> RawPlanNode {
        let mut step = PlanStep::default();
        self.describe(&mut step);

        if let Some(cost) = self.cost {
            step.startup_cost = Some(cost.start);
            step.total_cost = Some(cost.end);
        }
        step.plan_rows = self.rows;
        step.plan_width = self.width;
        if self.never_executed {
            step.actual_startup_time = Some(0.0);
            step.actual_total_time = Some(0.0);
            step.actual_rows = Some(0.0);
            step.actual_loops = Some(0.0);
        } else {
            step.actual_startup_time = self.actual_time.map(|t| t.start);
            step.actual_total_time = self.actual_time.map(|t| t.end);
            step.actual_rows = self.actual_rows;
            step.actual_loops = self.loops;
        }

        if let Some(name) = &self.subplan_name {
            step.subplan_name = Some(name.clone());
            step.parent_relationship = Some(
                if name.starts_with("SubPlan") { "SubPlan" } else { "InitPlan" }.to_string(),
            );
        }
        for line in &self.details {
            apply_detail(&mut step, line);
        }

        RawPlanNode {
            step,
            plans: self.children.iter().map(TextPlanNode::to_raw).collect(),
        }
    }

    /// Node type and naming fields from the operation and its target
    fn describe(&self, step: &mut PlanStep) {
        let mut kind = self.operation.as_str();
        if let Some(rest) = kind.strip_prefix("Parallel ") {
            step.parallel_aware = Some(true);
            kind = rest;
        }
        if let Some(rest) = kind.strip_prefix("Async ") {
            step.async_capable = Some(true);
            kind = rest;
        }

        let kind = if let Some(scan) = INDEX_SCAN.captures(kind) {
            step.index_name = Some(scan["index"].to_string());
            step.scan_direction = Some(
                if scan.name("dir").is_some() { "Backward" } else { "Forward" }.to_string(),
            );
            scan["kind"].to_string()
        } else if let Some(join) = JOIN.captures(kind) {
            step.join_type = Some(join.name("join").map_or("Inner", |j| j.as_str()).to_string());
            match &join["kind"] {
                "Nested Loop" => "Nested Loop".to_string(),
                other => format!("{} Join", other),
            }
        } else {
            if kind == "Nested Loop" {
                step.join_type = Some("Inner".to_string());
            }
            kind.to_string()
        };

        match self.target.as_deref() {
            Some(target) if target.starts_with("using ") => {
                step.index_name = target
                    .trim_start_matches("using ")
                    .split_whitespace()
                    .next()
                    .map(str::to_string);
            }
            Some(target) => {
                let mut words = target.trim_start_matches("on ").split_whitespace();
                let name = words.next().map(unqualified);
                let alias = words.next().map(str::to_string);
                match kind.as_str() {
                    "Bitmap Index Scan" => step.index_name = name,
                    "CTE Scan" => {
                        step.alias = alias.or_else(|| name.clone());
                        step.cte_name = name;
                    }
                    _ => {
                        step.alias = alias.or_else(|| name.clone());
                        step.relation_name = name;
                    }
                }
            }
            None => {}
        }

        step.node_type = Some(kind);
    }
}

/// A text plan: one tree per statement plus the plan-wide timings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPlan {
    pub roots: Vec<TextPlanNode>,
    pub timings: PlanTimings,
}

/// Whole-plan facts read straight off a text plan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPlanSummary {
    /// Highest `actual time` end of any step, or 0
    pub total_time: f64,
    /// Highest total cost of any step, or 0
    pub total_cost: f64,
    pub has_seq_scan: bool,
    /// Tables read by sequential scans, in plan order, without repeats
    pub seq_scan_tables: Vec<String>,
    pub has_index_scan: bool,
}

impl TextPlan {
    pub fn parse(text: &str) -> Self {
        let mut tree = TreeBuilder::default();
        let mut timings = PlanTimings::default();
        let mut section: Option<(&str, usize)> = None;

        for line in text.lines() {
            let line = line.trim_end();
            let content = line.trim_start();
            if content.is_empty() || is_decoration(content) {
                continue;
            }
            let leading = line.len() - content.len();

            if let Some((name, indent)) = section {
                if leading > indent {
                    if name == "JIT:" && content.starts_with("Timing:") {
                        timings.jit_total_time = JIT_TOTAL
                            .captures(content)
                            .and_then(|caps| number(&caps[1]));
                    }
                    continue;
                }
                section = None;
            }
            if let Some(name) = SECTIONS.iter().find(|s| content == **s) {
                section = Some((*name, leading));
                continue;
            }
            if FOOTERS.iter().any(|f| content.starts_with(f)) {
                read_footer(content, &mut timings);
                continue;
            }

            match content.strip_prefix("->") {
                Some(rest) => {
                    if let Some(node) = TextPlanNode::from_line(rest.trim()) {
                        tree.open(leading, node);
                    }
                }
                None if tree.is_empty() => {
                    if let Some(node) = TextPlanNode::from_line(content) {
                        tree.open(leading, node);
                    }
                }
                None => {
                    if tree.detail(leading, content) {
                        continue;
                    }
                    // A second statement's plan starts back at root indentation
                    match TextPlanNode::from_line(content).filter(|n| n.cost.is_some()) {
                        Some(node) => tree.open(leading, node),
                        None => log::debug!("Skipping unplaced EXPLAIN line: {}", content),
                    }
                }
            }
        }

        let roots = tree.finish();
        log::debug!("Parsed text plan with {} root step(s)", roots.len());
        Self { roots, timings }
    }

    /// Every step in pre-order
    pub fn nodes(&self) -> Vec<&TextPlanNode> {
        fn walk<'a>(nodes: &'a [TextPlanNode], out: &mut Vec<&'a TextPlanNode>) {
            for node in nodes {
                out.push(node);
                walk(&node.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, &mut out);
        out
    }

    /// Highest total cost of any step; a step without a cost counts its
    /// actual end time instead. 0 for an empty plan.
    pub fn max_cost(&self) -> f64 {
        self.nodes()
            .into_iter()
            .filter_map(|n| n.cost.or(n.actual_time).map(|span| span.end))
            .fold(0.0, f64::max)
    }

    pub fn summary(&self) -> TextPlanSummary {
        let mut summary = TextPlanSummary::default();
        for node in self.nodes() {
            if let Some(time) = node.actual_time {
                summary.total_time = summary.total_time.max(time.end);
            }
            if let Some(cost) = node.cost {
                summary.total_cost = summary.total_cost.max(cost.end);
            }

            let operation = node.operation.to_lowercase();
            if operation.contains("seq scan") {
                summary.has_seq_scan = true;
                let table = node
                    .target
                    .as_deref()
                    .and_then(|t| t.strip_prefix("on "))
                    .and_then(|t| t.split_whitespace().next())
                    .map(unqualified);
                if let Some(table) = table {
                    if !summary.seq_scan_tables.contains(&table) {
                        summary.seq_scan_tables.push(table);
                    }
                }
            }
            if operation.contains("index") {
                summary.has_index_scan = true;
            }
        }
        summary
    }

    /// Document over the first tree, for the graph builder
    pub fn into_document(self) -> PlanDocument {
        PlanDocument {
            timings: self.timings,
            plan: self.roots.first().map(TextPlanNode::to_raw),
        }
    }
}

impl PlanDocument {
    /// Parse text-format `EXPLAIN` output. Text without any plan line is an
    /// error; everything else parses.
    pub fn parse_text(text: &str) -> Result<Self, PlanError> {
        let plan = TextPlan::parse(text);
        if plan.roots.is_empty() {
            return Err(PlanError::EmptyText);
        }
        Ok(plan.into_document())
    }
}

struct Frame {
    indent: usize,
    node: TextPlanNode,
    pending_subplan: Option<String>,
}

/// Indentation stack; a frame is attached to its parent when it is closed
#[derive(Default)]
struct TreeBuilder {
    roots: Vec<TextPlanNode>,
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.stack.is_empty()
    }

    /// Close every frame at or deeper than `indent`
    fn unwind(&mut self, indent: usize) {
        while self.stack.last().is_some_and(|f| f.indent >= indent) {
            self.close();
        }
    }

    fn close(&mut self) {
        if let Some(frame) = self.stack.pop() {
            match self.stack.last_mut() {
                Some(parent) => parent.node.children.push(frame.node),
                None => self.roots.push(frame.node),
            }
        }
    }

    fn open(&mut self, indent: usize, mut node: TextPlanNode) {
        self.unwind(indent);
        if let Some(parent) = self.stack.last_mut() {
            node.subplan_name = parent.pending_subplan.take();
        }
        self.stack.push(Frame {
            indent,
            node,
            pending_subplan: None,
        });
    }

    /// Attach a detail line to the innermost step it is indented under.
    /// Returns false when no open step encloses it.
    fn detail(&mut self, indent: usize, content: &str) -> bool {
        if !self.stack.iter().any(|f| f.indent < indent) {
            return false;
        }
        self.unwind(indent);
        let Some(frame) = self.stack.last_mut() else {
            return false;
        };
        if SUBPLAN_LINE.is_match(content) {
            frame.pending_subplan = Some(content.to_string());
        }
        frame.node.push_detail(content);
        true
    }

    fn finish(mut self) -> Vec<TextPlanNode> {
        while !self.stack.is_empty() {
            self.close();
        }
        self.roots
    }
}

/// psql framing: the `QUERY PLAN` header, dash rules and `(N rows)`
fn is_decoration(content: &str) -> bool {
    content == "QUERY PLAN"
        || content.chars().all(|c| c == '-' || c == '+')
        || ROW_COUNT.is_match(content)
}

fn read_footer(content: &str, timings: &mut PlanTimings) {
    let Some((key, value)) = split_detail(content) else {
        return;
    };
    let ms = number(value.trim_end_matches("ms").trim());
    match key {
        "Planning Time" => timings.planning_time = ms,
        "Execution Time" | "Total runtime" => timings.execution_time = ms,
        _ => {}
    }
}

fn split_detail(line: &str) -> Option<(&str, &str)> {
    line.split_once(':').map(|(key, value)| (key.trim(), value.trim()))
}

fn number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `public.users` → `users`; quoted names are kept whole
fn unqualified(name: &str) -> String {
    if name.starts_with('"') {
        return name.to_string();
    }
    name.rsplit('.').next().unwrap_or(name).to_string()
}

/// Split on commas outside parentheses and quotes
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '\'' | '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                items.push(value[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(value[start..].trim().to_string());
    items.retain(|item| !item.is_empty());
    items
}

fn apply_detail(step: &mut PlanStep, line: &str) {
    let Some((key, value)) = split_detail(line) else {
        return;
    };
    let text = Some(value.to_string());
    match key {
        "Filter" => step.filter = text,
        "Join Filter" => step.join_filter = text,
        "Hash Cond" => step.hash_cond = text,
        "Merge Cond" => step.merge_cond = text,
        "Index Cond" => step.index_cond = text,
        "Recheck Cond" => step.recheck_cond = text,
        "Order By" => step.order_by = text,
        "Rows Removed by Filter" => step.rows_removed_by_filter = number(value),
        "Rows Removed by Join Filter" => step.rows_removed_by_join_filter = number(value),
        "Rows Removed by Index Recheck" => step.rows_removed_by_index_recheck = number(value),
        "Heap Fetches" => step.heap_fetches = number(value),
        "Sort Key" => step.sort_key = split_list(value),
        "Group Key" => step.group_key.extend(split_list(value)),
        "Presorted Key" => step.presorted_key = split_list(value),
        "Output" => step.output = split_list(value),
        "Workers Planned" => step.workers_planned = number(value),
        "Workers Launched" => step.workers_launched = number(value),
        "Sort Method" => match SORT_METHOD.captures(value) {
            Some(caps) => {
                step.sort_method = Some(caps["method"].to_string());
                step.sort_space_type = Some(caps["space"].to_string());
                step.sort_space_used = number(&caps["kb"]);
            }
            None => step.sort_method = text,
        },
        "Buffers" => read_buffers(value, &mut step.buffers),
        "I/O Timings" => {
            for (_, field, amount) in pool_fields(value) {
                let Some(ms) = number(amount) else { continue };
                match field {
                    "read" => step.io_read_time = Some(step.io_read_time.unwrap_or(0.0) + ms),
                    "write" => step.io_write_time = Some(step.io_write_time.unwrap_or(0.0) + ms),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

/// `shared hit=5 read=2, temp written=3` → `(pool, field, value)` triples
fn pool_fields(value: &str) -> Vec<(&str, &str, &str)> {
    let mut pool = "";
    let mut fields = Vec::new();
    for token in value.split_whitespace() {
        let token = token.trim_end_matches(',');
        match token.split_once('=') {
            Some((field, amount)) => fields.push((pool, field, amount)),
            None => pool = token,
        }
    }
    fields
}

fn read_buffers(value: &str, buffers: &mut BufferCounters) {
    for (pool, field, amount) in pool_fields(value) {
        let Ok(count) = amount.parse::<u64>() else {
            continue;
        };
        let slot = match (pool, field) {
            ("shared", "hit") => &mut buffers.shared_hit,
            ("shared", "read") => &mut buffers.shared_read,
            ("shared", "dirtied") => &mut buffers.shared_dirtied,
            ("shared", "written") => &mut buffers.shared_written,
            ("local", "hit") => &mut buffers.local_hit,
            ("local", "read") => &mut buffers.local_read,
            ("local", "dirtied") => &mut buffers.local_dirtied,
            ("local", "written") => &mut buffers.local_written,
            ("temp", "hit") => &mut buffers.temp_hit,
            ("temp", "read") => &mut buffers.temp_read,
            ("temp", "dirtied") => &mut buffers.temp_dirtied,
            ("temp", "written") => &mut buffers.temp_written,
            _ => continue,
        };
        *slot = count;
    }
}
