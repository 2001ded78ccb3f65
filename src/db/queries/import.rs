//! Import batch queries

use anyhow::Result;
use sqlx::{PgConnection, PgPool};

use crate::types::{BatchStatus, FileHashes, ImportBatch, NewImportBatch};

const BATCH_COLUMNS: &str = r#"
    id, job_report_filename, invoice_report_filename,
    job_report_hash, invoice_report_hash,
    row_count_jobs, row_count_invoices,
    status, error_message, imported_at
"#;

/// Find the batch registered for a file pair, whatever its status
pub async fn find_batch_by_hashes(pool: &PgPool, hashes: &FileHashes) -> Result<Option<ImportBatch>> {
    let batch = sqlx::query_as::<_, ImportBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM import_batches WHERE job_report_hash = $1 AND invoice_report_hash = $2"
    ))
    .bind(&hashes.jobs_hash)
    .bind(&hashes.invoices_hash)
    .fetch_optional(pool)
    .await?;

    Ok(batch)
}

/// Id of a successful batch for the file pair, if one exists
pub async fn find_successful_batch(pool: &PgPool, hashes: &FileHashes) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id FROM import_batches
        WHERE job_report_hash = $1 AND invoice_report_hash = $2 AND status = $3
        "#,
    )
    .bind(&hashes.jobs_hash)
    .bind(&hashes.invoices_hash)
    .bind(BatchStatus::Success.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Register a pending batch for the file pair.
///
/// A previously failed batch for the same pair is reopened and keeps its id.
/// Returns `None` when the pair belongs to a pending or successful batch;
/// a concurrent import of the same pair blocks here until the other
/// transaction finishes.
pub async fn register_batch(conn: &mut PgConnection, batch: &NewImportBatch<'_>) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO import_batches (
            job_report_filename, invoice_report_filename,
            job_report_hash, invoice_report_hash,
            row_count_jobs, row_count_invoices, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT ON CONSTRAINT import_batches_hash_pair_key DO UPDATE SET
            job_report_filename = EXCLUDED.job_report_filename,
            invoice_report_filename = EXCLUDED.invoice_report_filename,
            row_count_jobs = EXCLUDED.row_count_jobs,
            row_count_invoices = EXCLUDED.row_count_invoices,
            status = EXCLUDED.status,
            error_message = NULL,
            imported_at = NOW()
        WHERE import_batches.status = 'failed'
        RETURNING id
        "#,
    )
    .bind(batch.job_report_filename)
    .bind(batch.invoice_report_filename)
    .bind(&batch.hashes.jobs_hash)
    .bind(&batch.hashes.invoices_hash)
    .bind(batch.row_count_jobs)
    .bind(batch.row_count_invoices)
    .bind(BatchStatus::Pending.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}

/// Set the status of a batch inside the import transaction
pub async fn set_batch_status(conn: &mut PgConnection, batch_id: i64, status: BatchStatus) -> Result<()> {
    sqlx::query("UPDATE import_batches SET status = $2 WHERE id = $1")
        .bind(batch_id)
        .bind(status.as_str())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Persist a failed batch after its transaction was rolled back.
///
/// Never overwrites a successful batch. Returns the batch id.
pub async fn record_failed_batch(
    pool: &PgPool,
    batch: &NewImportBatch<'_>,
    error_message: &str,
) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO import_batches (
            job_report_filename, invoice_report_filename,
            job_report_hash, invoice_report_hash,
            row_count_jobs, row_count_invoices, status, error_message
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT ON CONSTRAINT import_batches_hash_pair_key DO UPDATE SET
            status = EXCLUDED.status,
            error_message = EXCLUDED.error_message,
            imported_at = NOW()
        WHERE import_batches.status <> 'success'
        RETURNING id
        "#,
    )
    .bind(batch.job_report_filename)
    .bind(batch.invoice_report_filename)
    .bind(&batch.hashes.jobs_hash)
    .bind(&batch.hashes.invoices_hash)
    .bind(batch.row_count_jobs)
    .bind(batch.row_count_invoices)
    .bind(BatchStatus::Failed.as_str())
    .bind(error_message)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Get a batch by id
pub async fn get_batch(pool: &PgPool, batch_id: i64) -> Result<Option<ImportBatch>> {
    let batch = sqlx::query_as::<_, ImportBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM import_batches WHERE id = $1"
    ))
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;

    Ok(batch)
}

/// Import history, newest first
pub async fn list_batches(pool: &PgPool, limit: i64) -> Result<Vec<ImportBatch>> {
    let batches = sqlx::query_as::<_, ImportBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM import_batches ORDER BY imported_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(batches)
}
