//! Technician types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role a technician holds on a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicianRole {
    /// Listed among the job's assigned technicians
    Assigned,
    /// Credited with selling the job
    SoldBy,
    /// Ran the job; an opportunity to sell
    Primary,
}

impl TechnicianRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TechnicianRole::Assigned => "assigned",
            TechnicianRole::SoldBy => "sold_by",
            TechnicianRole::Primary => "primary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(TechnicianRole::Assigned),
            "sold_by" => Some(TechnicianRole::SoldBy),
            "primary" => Some(TechnicianRole::Primary),
            _ => None,
        }
    }
}

/// Technician entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
    pub id: i64,
    pub name: String,
    pub first_seen_date: Option<NaiveDate>,
    pub last_seen_date: Option<NaiveDate>,
}

/// One (job, technician, role) association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTechnician {
    pub job_id: String,
    pub technician_id: i64,
    pub role: TechnicianRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_strings_match_schema_check_constraint() {
        assert_eq!(TechnicianRole::Assigned.as_str(), "assigned");
        assert_eq!(TechnicianRole::SoldBy.as_str(), "sold_by");
        assert_eq!(TechnicianRole::Primary.as_str(), "primary");
        assert_eq!(TechnicianRole::parse("sold_by"), Some(TechnicianRole::SoldBy));
        assert_eq!(TechnicianRole::parse("lead"), None);
    }
}
