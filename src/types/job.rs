//! Job rows as decoded from the jobs report

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status value of a job that participates in profitability math.
pub const JOB_STATUS_COMPLETED: &str = "Completed";

/// One data row of the jobs report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    /// 1-based data row (the header is row 1, so the first job is row 2).
    pub source_row: usize,

    // Identifiers
    pub job_id: String,
    pub customer_id: i64,
    pub location_id: Option<i64>,
    pub invoice_id: Option<String>,

    // Customer (denormalized on every job row)
    pub customer_name: Option<String>,
    pub customer_type: Option<String>,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub customer_zip: Option<String>,

    // Service location
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_zip: Option<String>,

    pub job_type: String,
    pub status: String,
    pub business_unit: Option<String>,

    pub job_creation_date: Option<NaiveDate>,
    pub job_schedule_date: Option<NaiveDate>,
    pub job_completion_date: Option<NaiveDate>,

    // People, as raw strings from the export
    pub assigned_technicians: Option<String>,
    pub sold_by: Option<String>,
    pub booked_by: Option<String>,
    pub primary_technician: Option<String>,

    pub job_campaign_id: Option<i64>,
    pub call_campaign_id: Option<i64>,
    pub campaign_category: Option<String>,

    // Revenue
    pub jobs_subtotal: Option<Decimal>,
    pub job_total: Option<Decimal>,
    pub estimate_sales_subtotal: Option<Decimal>,

    pub priority: Option<String>,
    pub total_hours_worked: Option<Decimal>,
    pub survey_result: Option<Decimal>,
    pub estimate_count: Option<i64>,

    pub opportunity: bool,
    pub warranty: bool,
    pub recall: bool,
    pub converted: bool,
    pub zero_dollar_job: bool,
}
