//! Customer database queries

use anyhow::Result;
use sqlx::{PgConnection, PgPool};

use crate::types::customer::{Customer, CustomerUpsert};

/// Insert or refresh a customer.
///
/// Descriptive fields are overwritten only by non-empty values; the job date
/// range only ever widens.
pub async fn upsert_customer(conn: &mut PgConnection, customer: &CustomerUpsert) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO customers (
            id, customer_name, customer_type,
            customer_city, customer_state, customer_zip,
            location_city, location_state, location_zip,
            first_job_date, last_job_date, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
        ON CONFLICT (id) DO UPDATE SET
            customer_name = COALESCE(NULLIF(EXCLUDED.customer_name, ''), customers.customer_name),
            customer_type = COALESCE(EXCLUDED.customer_type, customers.customer_type),
            customer_city = COALESCE(EXCLUDED.customer_city, customers.customer_city),
            customer_state = COALESCE(EXCLUDED.customer_state, customers.customer_state),
            customer_zip = COALESCE(EXCLUDED.customer_zip, customers.customer_zip),
            location_city = COALESCE(EXCLUDED.location_city, customers.location_city),
            location_state = COALESCE(EXCLUDED.location_state, customers.location_state),
            location_zip = COALESCE(EXCLUDED.location_zip, customers.location_zip),
            first_job_date = LEAST(customers.first_job_date, EXCLUDED.first_job_date),
            last_job_date = GREATEST(customers.last_job_date, EXCLUDED.last_job_date),
            updated_at = NOW()
        "#,
    )
    .bind(customer.id)
    .bind(&customer.customer_name)
    .bind(&customer.customer_type)
    .bind(&customer.customer_city)
    .bind(&customer.customer_state)
    .bind(&customer.customer_zip)
    .bind(&customer.location_city)
    .bind(&customer.location_state)
    .bind(&customer.location_zip)
    .bind(customer.first_job_date)
    .bind(customer.last_job_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Get customer by ID
pub async fn get_customer(pool: &PgPool, customer_id: i64) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT
            id, customer_name, customer_type,
            customer_city, customer_state, customer_zip,
            location_city, location_state, location_zip,
            first_job_date, last_job_date, created_at, updated_at
        FROM customers
        WHERE id = $1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}
