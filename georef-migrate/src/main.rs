//! Geolocation reference table migration.
//!
//! Reads location names from a fact table, resolves them against the master
//! geolocation table and writes the matches into the reference table.
//!
//! # Security Guarantees
//! - Passwords come from `PGPASSWORD` or a no-echo prompt, never argv
//! - No credentials are logged
//! - The master database is only ever read

use clap::Parser;
use georef_core::error::GeoRefError;
use georef_core::migration::describe_mapping;
use georef_core::{MigrationSummary, Result, init_logging, run_migration};
use georef_migrate::{Cli, error_report, prompt_password};
use std::process::ExitCode;
use tracing::info;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", error_report(&e));
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<MigrationSummary> {
    init_logging(cli.verbose, cli.quiet)?;

    let request = cli.to_request(prompt_password)?;
    info!("Fact table: {}", request.fact_table);
    info!("Mapping: {}", describe_mapping(&request.mapping));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| GeoRefError::configuration(format!("Failed to start runtime: {}", e)))?;

    runtime.block_on(run_migration(&request))
}

fn print_summary(summary: &MigrationSummary) {
    println!("Migration completed successfully");
    println!("Target table: {}", summary.target_table);
    println!("Distinct locations: {}", summary.candidates);
    println!("Matched: {}", summary.matched);
    println!("Unmatched: {}", summary.unmatched);
    println!("Rows inserted: {}", summary.inserted);
}
