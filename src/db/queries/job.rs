//! Job database queries

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::types::{JobRevenue, JobRow, TechnicianJob};

/// Insert a job unless it already exists. Returns whether a row was written.
pub async fn insert_job(conn: &mut PgConnection, batch_id: i64, job: &JobRow) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO jobs (
            id, customer_id, import_batch_id,
            job_type, business_unit, status,
            job_creation_date, job_schedule_date, job_completion_date,
            assigned_technicians, sold_by_technician, primary_technician, booked_by,
            campaign_id, call_campaign_id, campaign_category,
            jobs_subtotal, job_total, estimate_sales_subtotal, invoice_id,
            total_hours_worked, priority, survey_score, estimate_count,
            is_opportunity, is_converted, is_warranty, is_recall, is_zero_dollar
        )
        VALUES (
            $1, $2, $3,
            $4, $5, $6,
            $7, $8, $9,
            $10, $11, $12, $13,
            $14, $15, $16,
            $17, $18, $19, $20,
            $21, $22, $23, $24,
            $25, $26, $27, $28, $29
        )
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&job.job_id)
    .bind(job.customer_id)
    .bind(batch_id)
    .bind(&job.job_type)
    .bind(&job.business_unit)
    .bind(&job.status)
    .bind(job.job_creation_date)
    .bind(job.job_schedule_date)
    .bind(job.job_completion_date)
    .bind(&job.assigned_technicians)
    .bind(&job.sold_by)
    .bind(&job.primary_technician)
    .bind(&job.booked_by)
    .bind(job.job_campaign_id)
    .bind(job.call_campaign_id)
    .bind(&job.campaign_category)
    .bind(job.jobs_subtotal)
    .bind(job.job_total)
    .bind(job.estimate_sales_subtotal.unwrap_or(Decimal::ZERO))
    .bind(&job.invoice_id)
    .bind(job.total_hours_worked.unwrap_or(Decimal::ZERO))
    .bind(&job.priority)
    .bind(job.survey_result)
    .bind(job.estimate_count.unwrap_or(0) as i32)
    .bind(job.opportunity)
    .bind(job.converted)
    .bind(job.warranty)
    .bind(job.recall)
    .bind(job.zero_dollar_job)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Jobs created by the batch that have no invoice at all
pub async fn jobs_without_invoices(conn: &mut PgConnection, batch_id: i64) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT j.id
        FROM jobs j
        WHERE j.import_batch_id = $1
          AND NOT EXISTS (SELECT 1 FROM invoices i WHERE i.job_id = j.id)
        ORDER BY j.id
        "#,
    )
    .bind(batch_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

/// Revenue inputs for the given jobs
pub async fn load_job_revenue(conn: &mut PgConnection, job_ids: &[String]) -> Result<Vec<JobRevenue>> {
    let jobs = sqlx::query_as::<_, JobRevenue>(
        r#"
        SELECT id AS job_id, status, jobs_subtotal
        FROM jobs
        WHERE id = ANY($1)
        ORDER BY id
        "#,
    )
    .bind(job_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(jobs)
}

/// Every job that has at least one technician association
pub async fn load_technician_jobs(conn: &mut PgConnection) -> Result<Vec<TechnicianJob>> {
    let jobs = sqlx::query_as::<_, TechnicianJob>(
        r#"
        SELECT
            j.id AS job_id, j.status, j.jobs_subtotal,
            j.estimate_sales_subtotal, j.total_hours_worked, j.estimate_count
        FROM jobs j
        WHERE EXISTS (SELECT 1 FROM job_technicians jt WHERE jt.job_id = j.id)
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(jobs)
}

/// Number of stored jobs
pub async fn count_jobs(pool: &PgPool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
