// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Input model for `EXPLAIN (FORMAT JSON)` documents
//!
//! Which keys appear depends on the options the plan was produced with
//! (`ANALYZE`, `BUFFERS`, `VERBOSE`, parallelism, ...). Every field is an
//! explicit optional and is decoded leniently: a value of the wrong JSON type
//! is treated as absent instead of rejecting the document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::buffers::BufferCounters;
use crate::error::PlanError;

const DEFAULT_LABEL: &str = "Node";

/// One execution step as reported by the server, with its children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlanNode {
    #[serde(flatten)]
    pub step: PlanStep,

    #[serde(rename = "Plans", default, deserialize_with = "lenient::children")]
    pub plans: Vec<RawPlanNode>,
}

/// Descriptive and measured fields of a single step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(rename = "Node Type", default, deserialize_with = "lenient::string")]
    pub node_type: Option<String>,
    #[serde(rename = "Parent Relationship", default, deserialize_with = "lenient::string")]
    pub parent_relationship: Option<String>,
    #[serde(rename = "Subplan Name", default, deserialize_with = "lenient::string")]
    pub subplan_name: Option<String>,
    #[serde(rename = "CTE Name", default, deserialize_with = "lenient::string")]
    pub cte_name: Option<String>,
    #[serde(rename = "Relation Name", default, deserialize_with = "lenient::string")]
    pub relation_name: Option<String>,
    #[serde(rename = "Alias", default, deserialize_with = "lenient::string")]
    pub alias: Option<String>,
    #[serde(rename = "Index Name", default, deserialize_with = "lenient::string")]
    pub index_name: Option<String>,
    #[serde(rename = "Join Type", default, deserialize_with = "lenient::string")]
    pub join_type: Option<String>,
    #[serde(rename = "Scan Direction", default, deserialize_with = "lenient::string")]
    pub scan_direction: Option<String>,
    #[serde(rename = "Parallel Aware", default, deserialize_with = "lenient::boolean")]
    pub parallel_aware: Option<bool>,
    #[serde(rename = "Async Capable", default, deserialize_with = "lenient::boolean")]
    pub async_capable: Option<bool>,

    // Planner estimates
    #[serde(rename = "Startup Cost", default, deserialize_with = "lenient::number")]
    pub startup_cost: Option<f64>,
    #[serde(rename = "Total Cost", default, deserialize_with = "lenient::number")]
    pub total_cost: Option<f64>,
    #[serde(rename = "Plan Rows", default, deserialize_with = "lenient::number")]
    pub plan_rows: Option<f64>,
    #[serde(rename = "Plan Width", default, deserialize_with = "lenient::number")]
    pub plan_width: Option<f64>,

    // ANALYZE
    #[serde(rename = "Actual Startup Time", default, deserialize_with = "lenient::number")]
    pub actual_startup_time: Option<f64>,
    #[serde(rename = "Actual Total Time", default, deserialize_with = "lenient::number")]
    pub actual_total_time: Option<f64>,
    #[serde(rename = "Actual Rows", default, deserialize_with = "lenient::number")]
    pub actual_rows: Option<f64>,
    #[serde(rename = "Actual Loops", default, deserialize_with = "lenient::number")]
    pub actual_loops: Option<f64>,

    // Conditions
    #[serde(rename = "Filter", default, deserialize_with = "lenient::string")]
    pub filter: Option<String>,
    #[serde(rename = "Join Filter", default, deserialize_with = "lenient::string")]
    pub join_filter: Option<String>,
    #[serde(rename = "Hash Cond", default, deserialize_with = "lenient::string")]
    pub hash_cond: Option<String>,
    #[serde(rename = "Merge Cond", default, deserialize_with = "lenient::string")]
    pub merge_cond: Option<String>,
    #[serde(rename = "Index Cond", default, deserialize_with = "lenient::string")]
    pub index_cond: Option<String>,
    #[serde(rename = "Recheck Cond", default, deserialize_with = "lenient::string")]
    pub recheck_cond: Option<String>,
    #[serde(rename = "Order By", default, deserialize_with = "lenient::string")]
    pub order_by: Option<String>,
    #[serde(rename = "Rows Removed by Filter", default, deserialize_with = "lenient::number")]
    pub rows_removed_by_filter: Option<f64>,
    #[serde(rename = "Rows Removed by Join Filter", default, deserialize_with = "lenient::number")]
    pub rows_removed_by_join_filter: Option<f64>,
    #[serde(rename = "Rows Removed by Index Recheck", default, deserialize_with = "lenient::number")]
    pub rows_removed_by_index_recheck: Option<f64>,
    #[serde(rename = "Heap Fetches", default, deserialize_with = "lenient::number")]
    pub heap_fetches: Option<f64>,

    // Keys and output
    #[serde(rename = "Group Key", default, deserialize_with = "lenient::keys")]
    pub group_key: Vec<String>,
    #[serde(rename = "Sort Key", default, deserialize_with = "lenient::keys")]
    pub sort_key: Vec<String>,
    #[serde(rename = "Presorted Key", default, deserialize_with = "lenient::keys")]
    pub presorted_key: Vec<String>,
    #[serde(rename = "Output", default, deserialize_with = "lenient::keys")]
    pub output: Vec<String>,

    // Sort details
    #[serde(rename = "Sort Method", default, deserialize_with = "lenient::string")]
    pub sort_method: Option<String>,
    #[serde(rename = "Sort Space Used", default, deserialize_with = "lenient::number")]
    pub sort_space_used: Option<f64>,
    #[serde(rename = "Sort Space Type", default, deserialize_with = "lenient::string")]
    pub sort_space_type: Option<String>,

    // BUFFERS
    #[serde(flatten)]
    pub buffers: BufferCounters,
    #[serde(rename = "I/O Read Time", default, deserialize_with = "lenient::number")]
    pub io_read_time: Option<f64>,
    #[serde(rename = "I/O Write Time", default, deserialize_with = "lenient::number")]
    pub io_write_time: Option<f64>,

    // Parallelism
    #[serde(rename = "Workers Planned", default, deserialize_with = "lenient::number")]
    pub workers_planned: Option<f64>,
    #[serde(rename = "Workers Launched", default, deserialize_with = "lenient::number")]
    pub workers_launched: Option<f64>,
}

impl PlanStep {
    /// Display label; falls back to a generic name when the type is missing
    pub fn label(&self) -> &str {
        self.node_type.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    /// Whether this step is a parallel gather point
    pub fn is_gather(&self) -> bool {
        matches!(self.node_type.as_deref(), Some("Gather") | Some("Gather Merge"))
    }

    /// Worker count of a gather step: planned when positive, else launched
    pub fn gather_workers(&self) -> Option<f64> {
        self.workers_planned
            .filter(|w| *w > 0.0)
            .or_else(|| self.workers_launched.filter(|w| *w > 0.0))
    }

    /// Whether this step runs in the leader only (init plans and subplans)
    pub fn is_leader_only(&self) -> bool {
        matches!(
            self.parent_relationship.as_deref(),
            Some("InitPlan") | Some("SubPlan")
        )
    }

    pub fn io_time(&self) -> f64 {
        self.io_read_time.unwrap_or(0.0) + self.io_write_time.unwrap_or(0.0)
    }
}

/// Whole-plan timings reported next to the root `Plan`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTimings {
    pub planning_time: Option<f64>,
    pub execution_time: Option<f64>,
    pub jit_total_time: Option<f64>,
}

impl PlanTimings {
    fn from_root(root: &Value) -> Self {
        let jit = root.get("JIT");
        let jit_total_time = jit
            .and_then(|j| j.get("Timing"))
            .and_then(|t| t.get("Total"))
            .and_then(Value::as_f64)
            .or_else(|| jit.and_then(|j| j.get("Total Time")).and_then(Value::as_f64));

        Self {
            planning_time: root.get("Planning Time").and_then(Value::as_f64),
            execution_time: root.get("Execution Time").and_then(Value::as_f64),
            jit_total_time,
        }
    }
}

/// A parsed EXPLAIN document: plan-wide timings plus the root plan, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDocument {
    pub timings: PlanTimings,
    pub plan: Option<RawPlanNode>,
}

impl PlanDocument {
    /// Parse raw text. Only malformed JSON is an error here; a document
    /// without a `Plan` object parses to `plan: None`.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// Interpret an already-parsed JSON value. The root is either an array
    /// (first element used) or the object itself.
    pub fn from_value(value: &Value) -> Self {
        let root = match value {
            Value::Array(items) => items.first(),
            other => Some(other),
        };
        let Some(root) = root.filter(|r| r.is_object()) else {
            return Self::default();
        };

        let plan = root
            .get("Plan")
            .filter(|p| p.is_object())
            .and_then(|p| RawPlanNode::deserialize(p).ok());

        Self {
            timings: PlanTimings::from_root(root),
            plan,
        }
    }

    /// The root plan, or the structural error callers should surface
    pub fn root_plan(&self) -> Result<&RawPlanNode, PlanError> {
        self.plan.as_ref().ok_or(PlanError::Structural)
    }
}

/// Field decoders that map unexpected JSON types to "absent"
mod lenient {
    use super::RawPlanNode;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
        Option::<Value>::deserialize(deserializer)
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(value(deserializer)?
            .and_then(|v| v.as_f64())
            .filter(|n| n.is_finite()))
    }

    pub fn counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Ok(value(deserializer)?
            .and_then(|v| {
                v.as_u64().or_else(|| {
                    v.as_f64()
                        .filter(|n| n.is_finite() && *n >= 0.0)
                        .map(|n| n.round() as u64)
                })
            })
            .unwrap_or(0))
    }

    pub fn string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match value(deserializer)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(value(deserializer)?.and_then(|v| v.as_bool()))
    }

    /// A single string or an array of strings
    pub fn keys<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match value(deserializer)? {
            Some(Value::String(s)) => vec![s],
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Child steps, one per array entry. An entry that is not a step object
    /// becomes an empty step so sibling ids keep their array positions.
    pub fn children<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<RawPlanNode>, D::Error> {
        Ok(match value(deserializer)? {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Object(_) => RawPlanNode::deserialize(item).unwrap_or_default(),
                    _ => RawPlanNode::default(),
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}

pub(crate) use lenient::counter as lenient_counter;
