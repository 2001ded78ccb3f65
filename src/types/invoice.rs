//! Invoice rows as decoded from the invoices report

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One data row of the invoices report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRow {
    /// 1-based data row; preserved in the store as the invoice's file order.
    pub source_row: usize,

    pub invoice_id: String,
    pub job_id: String,
    pub customer_id: Option<i64>,

    pub invoice_date: NaiveDate,
    pub invoice_status: Option<String>,
    pub invoice_type: Option<String>,
    pub invoice_summary: Option<String>,

    pub total: Option<Decimal>,
    pub balance: Option<Decimal>,
    pub payments: Option<Decimal>,

    // Costs
    pub material_costs: Option<Decimal>,
    pub equipment_costs: Option<Decimal>,
    pub purchase_order_costs: Option<Decimal>,
    pub return_costs: Option<Decimal>,
    pub costs_total: Option<Decimal>,

    // Retail / labor
    pub material_retail: Option<Decimal>,
    pub equipment_retail: Option<Decimal>,
    pub labor: Option<Decimal>,
    pub labor_pay: Option<Decimal>,
    pub labor_burden: Option<Decimal>,
    pub total_labor_costs: Option<Decimal>,
    pub income: Option<Decimal>,
    pub discount_total: Option<Decimal>,

    /// An adjustment invoice replaces the cost picture of its job.
    pub is_adjustment: bool,
}
