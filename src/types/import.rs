//! Import batch types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

/// Lifecycle of an import batch row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Success,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Success => "success",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BatchStatus::Pending),
            "success" => Some(BatchStatus::Success),
            "failed" => Some(BatchStatus::Failed),
            _ => None,
        }
    }
}

/// Import batch entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: i64,
    pub job_report_filename: String,
    pub invoice_report_filename: String,
    pub job_report_hash: String,
    pub invoice_report_hash: String,
    pub row_count_jobs: i32,
    pub row_count_invoices: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub imported_at: DateTime<Utc>,
}

impl ImportBatch {
    pub fn batch_status(&self) -> Option<BatchStatus> {
        BatchStatus::parse(&self.status)
    }
}

/// Content digests identifying a jobs/invoices file pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHashes {
    pub jobs_hash: String,
    pub invoices_hash: String,
}

/// Parameters for registering a new batch
#[derive(Debug, Clone)]
pub struct NewImportBatch<'a> {
    pub job_report_filename: &'a str,
    pub invoice_report_filename: &'a str,
    pub hashes: &'a FileHashes,
    pub row_count_jobs: i32,
    pub row_count_invoices: i32,
}

/// Post-import data-quality findings. Never fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub jobs_without_invoices: Vec<String>,
    pub warnings: Vec<String>,
}

/// Outcome of a single `import_files` call
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub batch_id: i64,
    pub already_imported: bool,
    pub jobs_imported: u32,
    pub invoices_imported: u32,
    pub invoices_skipped: u32,
    /// Invoices whose id an earlier batch already stored
    pub invoices_already_stored: u32,
    pub customers_upserted: u32,
    pub technicians_imported: u32,
    pub job_metrics_calculated: u32,
    pub technician_metrics_calculated: u32,
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub validation: ValidationResult,
}

impl ImportResult {
    /// Result for a file pair that a previous batch already imported.
    pub fn already_imported(batch_id: i64, duration: Duration) -> Self {
        Self {
            batch_id,
            already_imported: true,
            duration,
            ..Default::default()
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_round_trips_through_str() {
        for status in [BatchStatus::Pending, BatchStatus::Success, BatchStatus::Failed] {
            assert_eq!(BatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BatchStatus::parse("done"), None);
    }

    #[test]
    fn test_import_result_serializes_to_camel_case() {
        let result = ImportResult {
            batch_id: 7,
            invoices_skipped: 2,
            duration: Duration::from_millis(1500),
            ..Default::default()
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"batchId\":7"));
        assert!(json.contains("\"invoicesSkipped\":2"));
        assert!(json.contains("\"durationMs\":1500"));
        assert!(!json.contains("batch_id"));
    }

    #[test]
    fn test_already_imported_result_has_no_counts() {
        let result = ImportResult::already_imported(42, Duration::from_millis(3));
        assert!(result.already_imported);
        assert_eq!(result.batch_id, 42);
        assert_eq!(result.jobs_imported, 0);
        assert!(result.validation.warnings.is_empty());
    }
}
