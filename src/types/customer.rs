//! Customer types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Customer entity, keyed by the platform's customer id
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub customer_name: String,
    pub customer_type: Option<String>,

    // Billing address
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub customer_zip: Option<String>,

    // Service location
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_zip: Option<String>,

    pub first_job_date: Option<NaiveDate>,
    pub last_job_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer values derived from one batch's job rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerUpsert {
    pub id: i64,
    pub customer_name: String,
    pub customer_type: Option<String>,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub customer_zip: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_zip: Option<String>,
    pub first_job_date: Option<NaiveDate>,
    pub last_job_date: Option<NaiveDate>,
}
