// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Plan tree builder
//!
//! A single post-order traversal turns a [`RawPlanNode`] tree into a flat
//! node/edge graph. Children are visited first so their inclusive totals are
//! known; each node's exclusive ("self") values are its inclusive values
//! minus the sum of its children's, floored at zero.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::iter::Sum;
use std::ops::AddAssign;

use super::buffers::BufferCounters;
use super::hints::{self, CostHint, SlowHint};
use super::node_id::{self, ROOT_ID};
use super::raw::{PlanStep, RawPlanNode};
use crate::config::{AnalyzerConfig, HintThresholds, WorkerTimePolicy};

/// Whether the planner expected fewer or more rows than were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateDirection {
    /// More rows than planned (factor > 1)
    Under,
    /// Fewer rows than planned (factor < 1)
    Over,
    /// Exactly as planned
    None,
}

/// One output node with raw fields and derived metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanGraphNode {
    pub id: String,
    pub label: String,
    /// Descriptive and measured fields as reported (children stripped)
    pub step: PlanStep,

    /// `actual total time × loops`, normalized for parallel workers
    pub inclusive_time_ms: f64,
    /// Planner total cost, already inclusive
    pub inclusive_cost: f64,
    /// `actual rows × loops`
    pub actual_rows_total: f64,
    /// Divisor applied to this node's time (1 outside parallel regions)
    pub time_divisor: f64,

    pub exclusive_time_ms: f64,
    pub exclusive_cost: f64,
    pub exclusive_buffers: BufferCounters,

    pub est_factor: Option<f64>,
    pub est_direction: Option<EstimateDirection>,

    pub never_executed: bool,
    /// Own or nearest ancestor's subplan name
    pub subplan_name: Option<String>,

    pub slow_hint: Option<SlowHint>,
    pub cost_hint: Option<CostHint>,
}

impl PlanGraphNode {
    /// Inclusive buffer counters as reported
    pub fn buffers(&self) -> &BufferCounters {
        &self.step.buffers
    }

    pub fn loops(&self) -> f64 {
        self.step.actual_loops.unwrap_or(1.0)
    }

    pub fn depth(&self) -> usize {
        node_id::depth(&self.id)
    }
}

/// Parent-to-child link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    fn new(source: &str, target: &str) -> Self {
        Self {
            id: format!("{}->{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// First node declaring a named subplan / CTE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubplanRoot {
    pub name: String,
    pub id: String,
}

/// Builder output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanGraph {
    /// Nodes in traversal (post-) order
    pub nodes: Vec<PlanGraphNode>,
    pub edges: Vec<Edge>,
    pub subplan_roots: Vec<SubplanRoot>,
    /// Position of each node id in `nodes`
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PlanGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Node by id. Uses the id index, falling back to a scan when `nodes`
    /// was modified after the build.
    pub fn node(&self, id: &str) -> Option<&PlanGraphNode> {
        self.index
            .get(id)
            .and_then(|&pos| self.nodes.get(pos))
            .filter(|node| node.id == id)
            .or_else(|| self.nodes.iter().find(|node| node.id == id))
    }

    /// Rebuild the id index after changing `nodes`
    pub fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.id.clone(), pos))
            .collect();
    }

    pub fn root(&self) -> Option<&PlanGraphNode> {
        self.node(ROOT_ID)
    }

    /// Direct children of `id` in sibling order
    pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a PlanGraphNode> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.source == id)
            .filter_map(move |edge| self.node(&edge.target))
    }
}

/// Inputs to a single build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOptions {
    /// Execution time from the document; only gates `never_executed`
    pub execution_time: Option<f64>,
    pub worker_time_policy: WorkerTimePolicy,
    pub hint_thresholds: HintThresholds,
}

impl BuildOptions {
    pub fn new(execution_time: Option<f64>) -> Self {
        Self {
            execution_time,
            ..Self::default()
        }
    }

    pub fn from_config(config: &AnalyzerConfig, execution_time: Option<f64>) -> Self {
        Self {
            execution_time,
            worker_time_policy: config.worker_time_policy,
            hint_thresholds: config.hint_thresholds.clone(),
        }
    }
}

/// Inclusive totals of one subtree, handed to the parent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Agg {
    time: f64,
    cost: f64,
    buffers: BufferCounters,
}

impl AddAssign for Agg {
    fn add_assign(&mut self, rhs: Agg) {
        self.time += rhs.time;
        self.cost += rhs.cost;
        self.buffers += rhs.buffers;
    }
}

impl Sum for Agg {
    fn sum<I: Iterator<Item = Agg>>(iter: I) -> Agg {
        iter.fold(Agg::default(), |mut acc, agg| {
            acc += agg;
            acc
        })
    }
}

/// Build the analysis graph for a root plan
pub fn build_graph(plan: &RawPlanNode, options: &BuildOptions) -> PlanGraph {
    let mut builder = GraphBuilder {
        options,
        graph: PlanGraph::default(),
    };
    builder.visit(plan, ROOT_ID.to_string(), None, None);

    let mut graph = builder.graph;
    hints::annotate(
        &mut graph.nodes,
        options.execution_time,
        &options.hint_thresholds,
    );
    graph.reindex();

    log::debug!(
        "Built plan graph: {} nodes, {} edges, {} subplans",
        graph.nodes.len(),
        graph.edges.len(),
        graph.subplan_roots.len()
    );
    graph
}

struct GraphBuilder<'o> {
    options: &'o BuildOptions,
    graph: PlanGraph,
}

impl GraphBuilder<'_> {
    /// Visit `plan` and its subtree; returns the subtree's inclusive totals.
    ///
    /// `gather_workers` is the worker count of the nearest enclosing gather
    /// whose parallel region this node belongs to.
    fn visit(
        &mut self,
        plan: &RawPlanNode,
        id: String,
        inherited_subplan: Option<&str>,
        gather_workers: Option<f64>,
    ) -> Agg {
        let step = &plan.step;

        if let Some(name) = &step.subplan_name {
            self.graph.subplan_roots.push(SubplanRoot {
                name: name.clone(),
                id: id.clone(),
            });
        }
        let subplan_name = step.subplan_name.as_deref().or(inherited_subplan);

        let mut workers_for_children = gather_workers;
        if self.options.worker_time_policy == WorkerTimePolicy::DivideByParticipants
            && step.is_gather()
        {
            if let Some(workers) = step.gather_workers() {
                workers_for_children = Some(workers);
            }
        }

        let children: Agg = plan
            .plans
            .iter()
            .enumerate()
            .map(|(index, child)| {
                let child_id = node_id::child_id(&id, index);
                let child_workers = workers_for_children.filter(|_| !child.step.is_leader_only());
                let agg = self.visit(child, child_id.clone(), subplan_name, child_workers);
                self.graph.edges.push(Edge::new(&id, &child_id));
                agg
            })
            .sum();

        let time_divisor = gather_workers.map_or(1.0, |workers| workers + 1.0);
        let loops = step.actual_loops.unwrap_or(1.0);
        let inclusive = Agg {
            time: step.actual_total_time.unwrap_or(0.0) * loops / time_divisor,
            cost: step.total_cost.unwrap_or(0.0),
            buffers: step.buffers,
        };
        let actual_rows_total = step.actual_rows.unwrap_or(0.0) * loops;
        let (est_factor, est_direction) = estimate(step.plan_rows, actual_rows_total);

        let never_executed =
            self.options.execution_time.is_some() && step.actual_loops == Some(0.0);

        self.graph.nodes.push(PlanGraphNode {
            label: step.label().to_string(),
            step: step.clone(),
            inclusive_time_ms: inclusive.time,
            inclusive_cost: inclusive.cost,
            actual_rows_total,
            time_divisor,
            exclusive_time_ms: (inclusive.time - children.time).max(0.0),
            exclusive_cost: (inclusive.cost - children.cost).max(0.0),
            exclusive_buffers: inclusive.buffers.saturating_sub(&children.buffers),
            est_factor,
            est_direction,
            never_executed,
            subplan_name: subplan_name.map(str::to_string),
            slow_hint: None,
            cost_hint: None,
            id,
        });

        inclusive
    }
}

/// `actual rows total / planned rows`, undefined without a positive plan
fn estimate(plan_rows: Option<f64>, actual_rows_total: f64) -> (Option<f64>, Option<EstimateDirection>) {
    let planned = match plan_rows {
        Some(rows) if rows > 0.0 => rows,
        _ => return (None, None),
    };
    let factor = actual_rows_total / planned;
    let direction = if factor > 1.0 {
        EstimateDirection::Under
    } else if factor < 1.0 {
        EstimateDirection::Over
    } else {
        EstimateDirection::None
    };
    (Some(factor), Some(direction))
}
