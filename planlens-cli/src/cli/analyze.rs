// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Analyze command: read a plan, run the pipeline, format the result

use colored::Colorize;
use planlens::{analyze_input, AnalyzerConfig, DisplayOptions, HeatmapMode, PlanAnalysis};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::commands::AnalyzeArgs;
use super::output::AnalysisFormatter;

/// Read the plan text from a file, or from stdin for `None` and `-`
pub fn read_input(file: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    match file {
        Some(path) if path != Path::new("-") => {
            log::debug!("Reading plan from {:?}", path);
            std::fs::read_to_string(path)
                .map_err(|e| format!("Could not read plan file {:?}: {}", path, e).into())
        }
        _ => {
            log::debug!("Reading plan from stdin");
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Load analyzer settings, falling back to defaults when no file is given
pub fn load_config(path: Option<&PathBuf>) -> Result<AnalyzerConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(AnalyzerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Could not read config file {:?}: {}", path, e))?;
    let config = AnalyzerConfig::from_json(&text)
        .map_err(|e| format!("Invalid config file {:?}: {}", path, e))?;
    log::info!("Loaded analyzer config from {:?}", path);
    Ok(config)
}

fn display_options(args: &AnalyzeArgs) -> DisplayOptions {
    let mut options = DisplayOptions {
        heatmap: HeatmapMode::from(args.heatmap),
        ..DisplayOptions::default()
    };
    for group in &args.hide {
        if !options.visibility.hide(group) {
            log::warn!("Ignoring unknown metric group '{}'", group);
        }
    }
    options
}

fn failure_message(analysis: &PlanAnalysis) -> Option<String> {
    analysis
        .meta
        .error
        .as_ref()
        .map(|failure| format!("{}: {}", failure.message, failure.detail))
}

/// Analyze plan text and produce the formatted output
pub fn run_analysis(args: &AnalyzeArgs, text: &str) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_ref())?;
    let analysis = analyze_input(text, args.input.into(), &config);

    if let Some(message) = failure_message(&analysis) {
        return Err(message.into());
    }
    log::info!(
        "Analyzed plan: {} nodes, {} subplans",
        analysis.graph.len(),
        analysis.meta.subplan_roots.len()
    );

    match &args.node {
        Some(id) => {
            let node = analysis
                .graph
                .node(id)
                .ok_or_else(|| format!("No plan node with id '{}'", id))?;
            let details = analysis
                .details(id)
                .ok_or_else(|| format!("No details for plan node '{}'", id))?;
            Ok(AnalysisFormatter::format_node(&details, node, args.format))
        }
        None => Ok(AnalysisFormatter::format(
            &analysis,
            args.format,
            &display_options(args),
        )),
    }
}

/// Handle the analyze command
pub fn handle_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let result = read_input(args.file.as_deref()).and_then(|text| run_analysis(&args, &text));
    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            Err(e)
        }
    }
}
