//! Invoice database queries

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::types::{InvoiceCost, InvoiceRow};

/// Insert an invoice; returns false if an earlier batch already stored its id.
///
/// Stored invoices are immutable, like jobs.
pub async fn insert_invoice(conn: &mut PgConnection, batch_id: i64, invoice: &InvoiceRow) -> Result<bool> {
    let amount = |value: Option<Decimal>| value.unwrap_or(Decimal::ZERO);

    let result = sqlx::query(
        r#"
        INSERT INTO invoices (
            id, job_id, import_batch_id, source_row,
            invoice_date, invoice_status, invoice_type, invoice_summary,
            total, balance, payments,
            material_costs, equipment_costs, purchase_order_costs, return_costs, costs_total,
            material_retail, equipment_retail, labor, labor_pay, labor_burden,
            total_labor_costs, income, discount_total, is_adjustment
        )
        VALUES (
            $1, $2, $3, $4,
            $5, $6, $7, $8,
            $9, $10, $11,
            $12, $13, $14, $15, $16,
            $17, $18, $19, $20, $21,
            $22, $23, $24, $25
        )
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&invoice.invoice_id)
    .bind(&invoice.job_id)
    .bind(batch_id)
    .bind(invoice.source_row as i32)
    .bind(invoice.invoice_date)
    .bind(&invoice.invoice_status)
    .bind(&invoice.invoice_type)
    .bind(&invoice.invoice_summary)
    .bind(amount(invoice.total))
    .bind(amount(invoice.balance))
    .bind(amount(invoice.payments))
    .bind(amount(invoice.material_costs))
    .bind(amount(invoice.equipment_costs))
    .bind(amount(invoice.purchase_order_costs))
    .bind(amount(invoice.return_costs))
    .bind(amount(invoice.costs_total))
    .bind(amount(invoice.material_retail))
    .bind(amount(invoice.equipment_retail))
    .bind(amount(invoice.labor))
    .bind(amount(invoice.labor_pay))
    .bind(amount(invoice.labor_burden))
    .bind(amount(invoice.total_labor_costs))
    .bind(amount(invoice.income))
    .bind(amount(invoice.discount_total))
    .bind(invoice.is_adjustment)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Cost inputs of every invoice of the given jobs, in file order
pub async fn load_invoice_costs(conn: &mut PgConnection, job_ids: &[String]) -> Result<Vec<InvoiceCost>> {
    let invoices = sqlx::query_as::<_, InvoiceCost>(
        r#"
        SELECT job_id, costs_total, is_adjustment
        FROM invoices
        WHERE job_id = ANY($1)
        ORDER BY import_batch_id, source_row, id
        "#,
    )
    .bind(job_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(invoices)
}

/// Number of stored invoices
pub async fn count_invoices(pool: &PgPool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
