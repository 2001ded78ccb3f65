//! Field-service profitability importer
//!
//! Loads job and invoice report exports into PostgreSQL as atomic batches
//! and derives per-job and per-technician profitability metrics.

pub mod cli;
pub mod config;
pub mod db;
pub mod services;
pub mod types;
