// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use planlens::{HeatmapMode, InputFormat};
use std::path::PathBuf;

/// Metric groups that `--hide` accepts
pub const METRIC_GROUPS: [&str; 5] = ["time", "rows", "cost", "buffers", "output"];

#[derive(Parser, Debug)]
#[command(name = "planlens")]
#[command(version, about = "Self-time, buffer and estimate analysis for PostgreSQL EXPLAIN plans")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze EXPLAIN output (JSON or text format)
    Analyze(AnalyzeArgs),

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Plan file; reads stdin when omitted or `-`
    pub file: Option<PathBuf>,

    /// Input format; `auto` reads JSON when the input starts with `[` or `{`
    #[arg(short, long, value_enum, default_value_t = InputArg::Auto)]
    pub input: InputArg,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
    pub format: OutputFormat,

    /// Show derived details for a single node id (e.g. `root-0-1`)
    #[arg(short, long)]
    pub node: Option<String>,

    /// Analyzer configuration as JSON
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Metric used for the heatmap bar
    #[arg(long, value_enum, default_value_t = HeatmapArg::None)]
    pub heatmap: HeatmapArg,

    /// Metric groups to hide
    #[arg(long, value_delimiter = ',', value_parser = METRIC_GROUPS)]
    pub hide: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Tree,
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputArg {
    Auto,
    Json,
    Text,
}

impl From<InputArg> for InputFormat {
    fn from(arg: InputArg) -> Self {
        match arg {
            InputArg::Auto => InputFormat::Auto,
            InputArg::Json => InputFormat::Json,
            InputArg::Text => InputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HeatmapArg {
    None,
    Time,
    Rows,
    Cost,
}

impl From<HeatmapArg> for HeatmapMode {
    fn from(arg: HeatmapArg) -> Self {
        match arg {
            HeatmapArg::None => HeatmapMode::None,
            HeatmapArg::Time => HeatmapMode::Time,
            HeatmapArg::Rows => HeatmapMode::Rows,
            HeatmapArg::Cost => HeatmapMode::Cost,
        }
    }
}
