//! sta - field-service report importer
//!
//! Imports job/invoice report pairs and keeps profitability metrics current.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sta::cli::{Cli, Command};
use sta::config::Config;
use sta::db::{self, queries};
use sta::services::Importer;
use sta::types::{ImportBatch, ImportResult};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = Config::from_env()?;

    // Logs directory - LOGS_DIR env var or ./logs
    std::fs::create_dir_all(&config.logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.logs_dir, "sta.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Console logs go to stderr so stdout carries only command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sta=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    info!("Connected to PostgreSQL");

    db::run_migrations(&pool).await?;

    match command {
        Command::Migrate => {}
        Command::Import { jobs, invoices, json } => {
            info!("Importing {} and {}", jobs.display(), invoices.display());
            let result = Importer::new(pool).import_files(&jobs, &invoices).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_import_result(&result);
            }
        }
        Command::List { limit } => {
            let batches = queries::import::list_batches(&pool, limit).await?;
            print_batches(&batches);
        }
    }

    Ok(())
}

fn print_import_result(result: &ImportResult) {
    if result.already_imported {
        println!(
            "Files already imported in batch {} (checked in {:?})",
            result.batch_id, result.duration
        );
        return;
    }

    println!("Import complete: batch {}", result.batch_id);
    println!("  Jobs imported:          {}", result.jobs_imported);
    println!("  Invoices imported:      {}", result.invoices_imported);
    println!("  Invoices skipped:       {}", result.invoices_skipped);
    println!("  Invoices existing:      {}", result.invoices_already_stored);
    println!("  Customers upserted:     {}", result.customers_upserted);
    println!("  Technicians:            {}", result.technicians_imported);
    println!("  Job metrics:            {}", result.job_metrics_calculated);
    println!("  Technician metrics:     {}", result.technician_metrics_calculated);
    println!("  Duration:               {:?}", result.duration);

    if !result.validation.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &result.validation.warnings {
            println!("  - {}", warning);
        }
    }
}

fn print_batches(batches: &[ImportBatch]) {
    if batches.is_empty() {
        println!("No imports yet");
        return;
    }

    println!(
        "{:>6}  {:<20}  {:<8}  {:>6}  {:>8}  {}",
        "ID", "IMPORTED AT", "STATUS", "JOBS", "INVOICES", "FILES"
    );
    for batch in batches {
        println!(
            "{:>6}  {:<20}  {:<8}  {:>6}  {:>8}  {} / {}",
            batch.id,
            batch.imported_at.format("%Y-%m-%d %H:%M:%S"),
            batch.status,
            batch.row_count_jobs,
            batch.row_count_invoices,
            batch.job_report_filename,
            batch.invoice_report_filename,
        );
        if let Some(message) = &batch.error_message {
            println!("        {}", message);
        }
    }
}
