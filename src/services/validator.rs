//! Post-import data-quality checks. Findings are advisory only.

use anyhow::Result;
use sqlx::PgConnection;

use crate::db::queries;
use crate::types::ValidationResult;

/// Check the batch's jobs inside the import transaction
pub async fn validate_import(conn: &mut PgConnection, batch_id: i64) -> Result<ValidationResult> {
    let jobs_without_invoices = queries::job::jobs_without_invoices(conn, batch_id).await?;
    Ok(build_result(jobs_without_invoices))
}

fn build_result(jobs_without_invoices: Vec<String>) -> ValidationResult {
    let mut warnings = Vec::new();
    if !jobs_without_invoices.is_empty() {
        warnings.push(format!(
            "Found {} jobs without invoices",
            jobs_without_invoices.len()
        ));
    }

    ValidationResult {
        jobs_without_invoices,
        warnings,
    }
}

pub fn skipped_invoices_warning(skipped: usize, distinct_jobs: usize) -> String {
    format!(
        "Skipped {} invoices referencing {} jobs not in jobs report",
        skipped, distinct_jobs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_batch_has_no_warnings() {
        let result = build_result(vec![]);
        assert!(result.jobs_without_invoices.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_jobs_without_invoices_are_reported() {
        let result = build_result(vec!["10".to_string(), "11".to_string()]);
        assert_eq!(result.jobs_without_invoices, vec!["10", "11"]);
        assert_eq!(result.warnings, vec!["Found 2 jobs without invoices"]);
    }

    #[test]
    fn test_skipped_invoices_warning_text() {
        assert_eq!(
            skipped_invoices_warning(3, 2),
            "Skipped 3 invoices referencing 2 jobs not in jobs report"
        );
    }
}
