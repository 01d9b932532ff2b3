// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Path-encoded node identifiers
//!
//! The root is `root`; child `k` of node `p` is `p-k`. The identifier alone
//! gives a node's depth and its position among siblings.

use std::cmp::Ordering;

/// Identifier of the root node
pub const ROOT_ID: &str = "root";

/// Identifier of child `index` of `parent`
pub fn child_id(parent: &str, index: usize) -> String {
    format!("{}-{}", parent, index)
}

/// Child indices from the root down to `id`; empty for the root
pub fn node_path(id: &str) -> Vec<usize> {
    if id == ROOT_ID {
        return Vec::new();
    }
    id.split('-')
        .skip(1)
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Depth below the root (root = 0)
pub fn depth(id: &str) -> usize {
    id.matches('-').count()
}

/// Identifier of the parent, `None` for the root
pub fn parent_id(id: &str) -> Option<&str> {
    id.rfind('-').map(|pos| &id[..pos])
}

/// Pre-order comparison of two identifiers
pub fn compare_path(a: &str, b: &str) -> Ordering {
    node_path(a).cmp(&node_path(b))
}
