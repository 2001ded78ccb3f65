//! Technician attribution
//!
//! Turns the raw people columns of job rows into technician records and
//! (job, technician, role) associations. Identity resolution sits behind
//! [`TechnicianResolver`]; the metric math only ever sees technician ids.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::debug;

use crate::db::queries;
use crate::types::{JobRow, JobTechnician, TechnicianRole};

/// Date range over which a technician appeared on completed jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sighting {
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

impl Sighting {
    fn widen(&mut self, date: Option<NaiveDate>) {
        let Some(date) = date else { return };
        self.first = Some(self.first.map_or(date, |first| first.min(date)));
        self.last = Some(self.last.map_or(date, |last| last.max(date)));
    }
}

/// Maps a technician name to a stable technician id
#[async_trait]
pub trait TechnicianResolver: Send {
    /// Resolve (creating if needed) the technician for a normalized name
    async fn resolve(&mut self, conn: &mut PgConnection, name: &str, seen: Sighting) -> Result<i64>;
}

/// Resolver keyed on the normalized display name.
///
/// Each name is upserted once per resolver; later lookups hit the cache.
#[derive(Debug, Default)]
pub struct NameKeyedResolver {
    cache: HashMap<String, i64>,
}

impl NameKeyedResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TechnicianResolver for NameKeyedResolver {
    async fn resolve(&mut self, conn: &mut PgConnection, name: &str, seen: Sighting) -> Result<i64> {
        if let Some(&id) = self.cache.get(name) {
            return Ok(id);
        }

        let id = queries::technician::upsert_technician(conn, name, seen.first, seen.last).await?;
        debug!("Resolved technician '{}' to id {}", name, id);
        self.cache.insert(name.to_string(), id);
        Ok(id)
    }
}

/// Trim and collapse inner whitespace.
pub fn normalize_technician_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The comma-separated assigned-technicians column
pub fn split_technician_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(normalize_technician_name)
        .filter(|name| !name.is_empty())
        .collect()
}

/// One association before technician ids are known
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlannedLink {
    pub job_id: String,
    pub name: String,
    pub role: TechnicianRole,
}

/// Everything the batch needs resolved, derived from its job rows alone
#[derive(Debug, Default)]
pub struct AttributionPlan {
    /// Distinct (job, name, role) triples
    pub links: BTreeSet<PlannedLink>,
    /// Every referenced name with the completion dates it was seen on
    pub sightings: BTreeMap<String, Sighting>,
}

impl AttributionPlan {
    pub fn from_jobs(jobs: &[JobRow]) -> Self {
        let mut plan = AttributionPlan::default();

        for job in jobs {
            let sold_by = job.sold_by.as_deref().map(normalize_technician_name);
            let primary = job.primary_technician.as_deref().map(normalize_technician_name);
            let assigned = job
                .assigned_technicians
                .as_deref()
                .map(split_technician_names)
                .unwrap_or_default();

            let named = sold_by
                .into_iter()
                .map(|name| (name, TechnicianRole::SoldBy))
                .chain(primary.into_iter().map(|name| (name, TechnicianRole::Primary)))
                .chain(assigned.into_iter().map(|name| (name, TechnicianRole::Assigned)))
                .filter(|(name, _)| !name.is_empty());

            for (name, role) in named {
                plan.sightings
                    .entry(name.clone())
                    .or_default()
                    .widen(job.job_completion_date);
                plan.links.insert(PlannedLink {
                    job_id: job.job_id.clone(),
                    name,
                    role,
                });
            }
        }

        plan
    }
}

/// Resolve every technician named by the batch and store its associations.
///
/// Returns the number of distinct technicians referenced.
pub async fn import_technicians(
    conn: &mut PgConnection,
    jobs: &[JobRow],
    resolver: &mut dyn TechnicianResolver,
) -> Result<usize> {
    let plan = AttributionPlan::from_jobs(jobs);

    let mut ids: HashMap<&str, i64> = HashMap::with_capacity(plan.sightings.len());
    for (name, seen) in &plan.sightings {
        let id = resolver.resolve(&mut *conn, name, *seen).await?;
        ids.insert(name.as_str(), id);
    }

    let mut inserted = 0usize;
    for link in &plan.links {
        let Some(&technician_id) = ids.get(link.name.as_str()) else {
            continue;
        };
        let association = JobTechnician {
            job_id: link.job_id.clone(),
            technician_id,
            role: link.role,
        };
        if queries::technician::insert_job_technician(&mut *conn, &association).await? {
            inserted += 1;
        }
    }

    debug!(
        "Technicians: {} names, {} new associations of {} planned",
        ids.len(),
        inserted,
        plan.links.len()
    );

    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn job(id: &str, completed: Option<NaiveDate>) -> JobRow {
        JobRow {
            job_id: id.to_string(),
            status: "Completed".to_string(),
            job_completion_date: completed,
            ..Default::default()
        }
    }

    fn roles_for(plan: &AttributionPlan, job_id: &str, name: &str) -> Vec<TechnicianRole> {
        plan.links
            .iter()
            .filter(|link| link.job_id == job_id && link.name == name)
            .map(|link| link.role)
            .collect()
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_technician_name("  Ann   Smith "), "Ann Smith");
        assert_eq!(normalize_technician_name("Ann\tSmith"), "Ann Smith");
        assert_eq!(normalize_technician_name("   "), "");
    }

    #[test]
    fn test_split_assigned_names() {
        assert_eq!(
            split_technician_names("Ann Smith, Bob  Jones,, "),
            vec!["Ann Smith".to_string(), "Bob Jones".to_string()]
        );
        assert!(split_technician_names("").is_empty());
    }

    #[test]
    fn test_plan_collects_every_role() {
        let mut row = job("1", Some(ymd(2024, 3, 1)));
        row.sold_by = Some("Ann Smith".to_string());
        row.primary_technician = Some("Ann  Smith".to_string());
        row.assigned_technicians = Some("Ann Smith, Bob Jones".to_string());

        let plan = AttributionPlan::from_jobs(&[row]);

        assert_eq!(
            roles_for(&plan, "1", "Ann Smith"),
            vec![TechnicianRole::Assigned, TechnicianRole::SoldBy, TechnicianRole::Primary]
        );
        assert_eq!(roles_for(&plan, "1", "Bob Jones"), vec![TechnicianRole::Assigned]);
        assert_eq!(plan.sightings.len(), 2);
    }

    #[test]
    fn test_duplicate_names_in_one_column_collapse() {
        let mut row = job("1", None);
        row.assigned_technicians = Some("Bob Jones, Bob Jones".to_string());

        let plan = AttributionPlan::from_jobs(&[row]);
        assert_eq!(plan.links.len(), 1);
    }

    #[test]
    fn test_sighting_covers_the_batch() {
        let mut early = job("1", Some(ymd(2024, 1, 5)));
        early.primary_technician = Some("Ann Smith".to_string());
        let mut undated = job("2", None);
        undated.primary_technician = Some("Ann Smith".to_string());
        let mut late = job("3", Some(ymd(2024, 6, 30)));
        late.sold_by = Some("Ann Smith".to_string());

        let plan = AttributionPlan::from_jobs(&[late, undated, early]);
        assert_eq!(
            plan.sightings["Ann Smith"],
            Sighting {
                first: Some(ymd(2024, 1, 5)),
                last: Some(ymd(2024, 6, 30)),
            }
        );
    }

    #[test]
    fn test_blank_people_columns_are_ignored() {
        let mut row = job("1", None);
        row.sold_by = Some("  ".to_string());
        row.assigned_technicians = Some(" , ".to_string());

        let plan = AttributionPlan::from_jobs(&[row]);
        assert!(plan.links.is_empty());
        assert!(plan.sightings.is_empty());
    }
}
