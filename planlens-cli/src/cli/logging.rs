// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Logger setup

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Logger driven by `env`, with `-v` or `--log-level` taking precedence.
///
/// Without either flag the environment decides, so `RUST_LOG` still works.
pub fn logger(verbose: bool, log_level: Option<log::Level>, env: Env) -> Builder {
    let explicit = if verbose {
        Some(LevelFilter::Debug)
    } else {
        log_level.map(|level| level.to_level_filter())
    };

    let mut builder = Builder::from_env(env);
    if let Some(level) = explicit {
        builder.filter_level(level);
    }
    builder
}

/// `RUST_LOG`, defaulting to `warn`
pub fn default_env() -> Env<'static> {
    Env::default().default_filter_or("warn")
}
