// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Depth-first outline derived from node identifiers

use serde::Serialize;
use std::collections::HashSet;

use crate::plan::node_id::{self, ROOT_ID};
use crate::plan::PlanGraph;

/// One row of a tree outline, in pre-order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineRow {
    pub id: String,
    pub depth: usize,
    /// 1-based position in pre-order
    pub index: usize,
    /// Last child of its parent (the root counts as last)
    pub is_last: bool,
    /// For each ancestor below the root, whether it still has siblings below
    pub branch_trail: Vec<bool>,
}

impl OutlineRow {
    /// Tree guide such as `│  └─ `; empty for the root
    pub fn guide(&self) -> String {
        if self.depth == 0 {
            return String::new();
        }
        let mut guide: String = self
            .branch_trail
            .iter()
            .map(|more| if *more { "│  " } else { "   " })
            .collect();
        guide.push_str(if self.is_last { "└─ " } else { "├─ " });
        guide
    }
}

/// Outline rows for every node, ordered root first
pub fn outline(graph: &PlanGraph) -> Vec<OutlineRow> {
    let ids: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    let is_last = |id: &str| next_sibling(id).map_or(true, |sibling| !ids.contains(sibling.as_str()));

    let mut ordered: Vec<&str> = ids.iter().copied().collect();
    ordered.sort_by(|a, b| node_id::compare_path(a, b));

    ordered
        .into_iter()
        .enumerate()
        .map(|(position, id)| {
            let mut branch_trail = Vec::new();
            let mut ancestor = node_id::parent_id(id);
            while let Some(current) = ancestor.filter(|a| *a != ROOT_ID) {
                branch_trail.push(!is_last(current));
                ancestor = node_id::parent_id(current);
            }
            branch_trail.reverse();

            OutlineRow {
                id: id.to_string(),
                depth: node_id::depth(id),
                index: position + 1,
                is_last: is_last(id),
                branch_trail,
            }
        })
        .collect()
}

fn next_sibling(id: &str) -> Option<String> {
    let parent = node_id::parent_id(id)?;
    let index = node_id::node_path(id).last().copied()?;
    Some(node_id::child_id(parent, index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{build_graph, BuildOptions, PlanStep, RawPlanNode};

    fn node(children: Vec<RawPlanNode>) -> RawPlanNode {
        RawPlanNode {
            step: PlanStep::default(),
            plans: children,
        }
    }

    #[test]
    fn test_outline_order_and_guides() {
        // root
        // ├─ root-0
        // │  └─ root-0-0
        // └─ root-1
        //    ├─ root-1-0
        //    └─ root-1-1
        let plan = node(vec![
            node(vec![node(Vec::new())]),
            node(vec![node(Vec::new()), node(Vec::new())]),
        ]);
        let graph = build_graph(&plan, &BuildOptions::default());
        let rows = outline(&graph);

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["root", "root-0", "root-0-0", "root-1", "root-1-0", "root-1-1"]
        );
        let guides: Vec<String> = rows.iter().map(OutlineRow::guide).collect();
        assert_eq!(
            guides,
            vec!["", "├─ ", "│  └─ ", "└─ ", "   ├─ ", "   └─ "]
        );
        assert_eq!(rows[2].index, 3);
        assert_eq!(rows[2].depth, 2);
        assert!(rows[0].is_last);
    }

    #[test]
    fn test_empty_graph_has_no_rows() {
        assert!(outline(&PlanGraph::default()).is_empty());
    }
}
