// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! PlanLens CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // -v wins over --log-level; without either, RUST_LOG applies with a Warn default
    cli::logger(cli.verbose, cli.log_level, cli::default_env()).init();

    match cli.command {
        Commands::Version => {
            println!("{} {}", "PlanLens".bold().green(), planlens::VERSION);
            println!("PostgreSQL EXPLAIN plan analyzer");
            Ok(())
        }

        Commands::Analyze(args) => cli::handle_analyze(args),
    }
}
