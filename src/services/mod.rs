//! Business logic services

pub mod attribution;
pub mod csv_parser;
pub mod hash;
pub mod importer;
pub mod job_metrics;
pub mod technician_metrics;
pub mod validator;

pub use importer::{ImportError, ImportStep, Importer};
