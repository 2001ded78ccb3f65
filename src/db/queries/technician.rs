//! Technician database queries

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use crate::types::{JobTechnician, Technician, TechnicianRole};

/// Insert a technician by name, widening the sighting range. Returns its id.
pub async fn upsert_technician(
    conn: &mut PgConnection,
    name: &str,
    first_seen: Option<NaiveDate>,
    last_seen: Option<NaiveDate>,
) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO technicians (name, first_seen_date, last_seen_date)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE SET
            first_seen_date = LEAST(technicians.first_seen_date, EXCLUDED.first_seen_date),
            last_seen_date = GREATEST(technicians.last_seen_date, EXCLUDED.last_seen_date)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(first_seen)
    .bind(last_seen)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Associate a technician with a job. Returns whether the triple was new.
pub async fn insert_job_technician(conn: &mut PgConnection, link: &JobTechnician) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO job_technicians (job_id, technician_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (job_id, technician_id, role) DO NOTHING
        "#,
    )
    .bind(&link.job_id)
    .bind(link.technician_id)
    .bind(link.role.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// All technician ids
pub async fn list_technician_ids(conn: &mut PgConnection) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM technicians ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids)
}

/// All job/technician associations
pub async fn list_job_technicians(conn: &mut PgConnection) -> Result<Vec<JobTechnician>> {
    let rows: Vec<(String, i64, String)> =
        sqlx::query_as("SELECT job_id, technician_id, role FROM job_technicians")
            .fetch_all(&mut *conn)
            .await?;

    let links = rows
        .into_iter()
        .filter_map(|(job_id, technician_id, role)| {
            TechnicianRole::parse(&role).map(|role| JobTechnician {
                job_id,
                technician_id,
                role,
            })
        })
        .collect();

    Ok(links)
}

/// Get technician by name
pub async fn get_technician_by_name(pool: &PgPool, name: &str) -> Result<Option<Technician>> {
    let technician = sqlx::query_as::<_, Technician>(
        "SELECT id, name, first_seen_date, last_seen_date FROM technicians WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(technician)
}
