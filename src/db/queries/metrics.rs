//! Metric persistence

use anyhow::Result;
use sqlx::{PgConnection, PgPool};

use crate::types::{JobMetric, TechnicianMetric};

/// Insert or replace a job's metric
pub async fn upsert_job_metric(conn: &mut PgConnection, metric: &JobMetric) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO job_metrics (
            job_id, revenue, total_costs, gross_profit, gross_margin_pct,
            invoice_count, has_adjustment, calculated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (job_id) DO UPDATE SET
            revenue = EXCLUDED.revenue,
            total_costs = EXCLUDED.total_costs,
            gross_profit = EXCLUDED.gross_profit,
            gross_margin_pct = EXCLUDED.gross_margin_pct,
            invoice_count = EXCLUDED.invoice_count,
            has_adjustment = EXCLUDED.has_adjustment,
            calculated_at = NOW()
        "#,
    )
    .bind(&metric.job_id)
    .bind(metric.revenue)
    .bind(metric.total_costs)
    .bind(metric.gross_profit)
    .bind(metric.gross_margin_pct)
    .bind(metric.invoice_count)
    .bind(metric.has_adjustment)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Every stored job metric
pub async fn load_job_metrics(conn: &mut PgConnection) -> Result<Vec<JobMetric>> {
    let metrics = sqlx::query_as::<_, JobMetric>(
        r#"
        SELECT job_id, revenue, total_costs, gross_profit, gross_margin_pct,
               invoice_count, has_adjustment
        FROM job_metrics
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(metrics)
}

/// Insert or replace a technician's metric
pub async fn upsert_technician_metric(conn: &mut PgConnection, metric: &TechnicianMetric) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO technician_metrics (
            technician_id,
            jobs_sold, total_sales, avg_sale,
            opportunities, conversions, conversion_rate,
            jobs_serviced, total_hours_worked, avg_hours_per_job,
            total_estimates, jobs_with_estimates, avg_estimates_per_job,
            total_gross_profit, avg_gross_profit, avg_margin_pct,
            calculated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, NOW())
        ON CONFLICT (technician_id) DO UPDATE SET
            jobs_sold = EXCLUDED.jobs_sold,
            total_sales = EXCLUDED.total_sales,
            avg_sale = EXCLUDED.avg_sale,
            opportunities = EXCLUDED.opportunities,
            conversions = EXCLUDED.conversions,
            conversion_rate = EXCLUDED.conversion_rate,
            jobs_serviced = EXCLUDED.jobs_serviced,
            total_hours_worked = EXCLUDED.total_hours_worked,
            avg_hours_per_job = EXCLUDED.avg_hours_per_job,
            total_estimates = EXCLUDED.total_estimates,
            jobs_with_estimates = EXCLUDED.jobs_with_estimates,
            avg_estimates_per_job = EXCLUDED.avg_estimates_per_job,
            total_gross_profit = EXCLUDED.total_gross_profit,
            avg_gross_profit = EXCLUDED.avg_gross_profit,
            avg_margin_pct = EXCLUDED.avg_margin_pct,
            calculated_at = NOW()
        "#,
    )
    .bind(metric.technician_id)
    .bind(metric.jobs_sold)
    .bind(metric.total_sales)
    .bind(metric.avg_sale)
    .bind(metric.opportunities)
    .bind(metric.conversions())
    .bind(metric.conversion_rate)
    .bind(metric.jobs_serviced())
    .bind(metric.total_hours_worked)
    .bind(metric.avg_hours_per_job)
    .bind(metric.total_estimates)
    .bind(metric.jobs_with_estimates)
    .bind(metric.avg_estimates_per_job)
    .bind(metric.total_gross_profit)
    .bind(metric.avg_gross_profit)
    .bind(metric.avg_margin_pct)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Stored metric of one job
pub async fn get_job_metric(pool: &PgPool, job_id: &str) -> Result<Option<JobMetric>> {
    let metric = sqlx::query_as::<_, JobMetric>(
        r#"
        SELECT job_id, revenue, total_costs, gross_profit, gross_margin_pct,
               invoice_count, has_adjustment
        FROM job_metrics
        WHERE job_id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(metric)
}
