//! Derived profitability metrics

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Revenue inputs of one job, as stored
#[derive(Debug, Clone, FromRow)]
pub struct JobRevenue {
    pub job_id: String,
    pub status: String,
    pub jobs_subtotal: Option<Decimal>,
}

/// Cost inputs of one stored invoice. Loaded in file order.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceCost {
    pub job_id: String,
    pub costs_total: Decimal,
    pub is_adjustment: bool,
}

/// Job fields the technician calculator reads
#[derive(Debug, Clone, FromRow)]
pub struct TechnicianJob {
    pub job_id: String,
    pub status: String,
    pub jobs_subtotal: Option<Decimal>,
    pub estimate_sales_subtotal: Decimal,
    pub total_hours_worked: Decimal,
    pub estimate_count: i32,
}

/// Profitability of a single completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobMetric {
    pub job_id: String,
    pub revenue: Decimal,
    pub total_costs: Decimal,
    pub gross_profit: Decimal,
    /// Absent when revenue is not positive
    pub gross_margin_pct: Option<Decimal>,
    pub invoice_count: i32,
    pub has_adjustment: bool,
}

/// Performance of a single technician across all completed jobs.
///
/// Every `Option` is absent when its denominator is zero; downstream
/// reports rely on absent-vs-zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianMetric {
    pub technician_id: i64,

    /// Jobs where the technician was primary
    pub opportunities: i32,
    /// Jobs where the technician was sold_by
    pub jobs_sold: i32,
    pub total_sales: Decimal,
    pub avg_sale: Option<Decimal>,
    pub conversion_rate: Option<Decimal>,

    pub total_hours_worked: Decimal,
    pub avg_hours_per_job: Option<Decimal>,
    pub total_estimates: i32,
    pub jobs_with_estimates: i32,
    pub avg_estimates_per_job: Option<Decimal>,

    pub total_gross_profit: Option<Decimal>,
    pub avg_gross_profit: Option<Decimal>,
    pub avg_margin_pct: Option<Decimal>,
}

impl TechnicianMetric {
    pub fn new(technician_id: i64) -> Self {
        Self {
            technician_id,
            ..Default::default()
        }
    }

    /// Conversions are the same count as jobs sold.
    pub fn conversions(&self) -> i32 {
        self.jobs_sold
    }

    /// Jobs serviced are the jobs run as primary.
    pub fn jobs_serviced(&self) -> i32 {
        self.opportunities
    }
}
