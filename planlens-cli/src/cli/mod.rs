// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for PlanLens
//!
//! Reads an EXPLAIN (FORMAT JSON) document from a file or stdin and prints
//! the analyzed plan as a tree, a table, JSON, or the details of one node.

pub mod analyze;
pub mod commands;
pub mod logging;
pub mod output;

pub use analyze::handle_analyze;
pub use commands::{Cli, Commands};
pub use logging::{default_env, logger};
