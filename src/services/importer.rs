//! Batch importer
//!
//! Imports one jobs report and one invoices report as a single atomic batch:
//! dedup by content hash, parse everything up front, then write customers,
//! jobs, technicians and invoices and refresh metrics inside one transaction.
//! A failed batch is rolled back and then recorded as `failed` on its own so
//! the attempt stays visible in the import history.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use sqlx::{Connection, PgConnection, PgPool};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::db::queries;
use crate::services::attribution::{import_technicians, NameKeyedResolver, TechnicianResolver};
use crate::services::csv_parser::{parse_invoices_file, parse_jobs_file, ParseError};
use crate::services::hash::{calculate_file_hashes, HashError};
use crate::services::job_metrics::calculate_job_metrics;
use crate::services::technician_metrics::calculate_technician_metrics;
use crate::services::validator::{skipped_invoices_warning, validate_import};
use crate::types::{
    BatchStatus, CustomerUpsert, ImportResult, InvoiceRow, JobRow, NewImportBatch, ValidationResult,
};

/// Transactional step of an import, named in errors and batch records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStep {
    RegisterBatch,
    ImportCustomers,
    InsertJobs,
    ImportTechnicians,
    InsertInvoices,
    Validate,
    CalculateJobMetrics,
    FinalizeBatch,
    Commit,
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportStep::RegisterBatch => "register import batch",
            ImportStep::ImportCustomers => "import customers",
            ImportStep::InsertJobs => "insert jobs",
            ImportStep::ImportTechnicians => "import technicians",
            ImportStep::InsertInvoices => "insert invoices",
            ImportStep::Validate => "validate",
            ImportStep::CalculateJobMetrics => "calculate job metrics",
            ImportStep::FinalizeBatch => "finalize batch",
            ImportStep::Commit => "commit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to calculate file hashes")]
    Hash(#[from] HashError),

    #[error("failed to check for an existing import")]
    Lookup(#[source] anyhow::Error),

    #[error("failed to parse {}", file.display())]
    Parse {
        file: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("failed to start transaction")]
    Begin(#[source] sqlx::Error),

    /// A transactional step failed; `batch_id` is the recorded failed batch
    #[error("failed to {step}")]
    Step {
        step: ImportStep,
        batch_id: Option<i64>,
        #[source]
        source: anyhow::Error,
    },
}

impl ImportError {
    fn step(step: ImportStep) -> impl FnOnce(anyhow::Error) -> ImportError {
        move |source| ImportError::Step {
            step,
            batch_id: None,
            source,
        }
    }
}

/// Counts produced by a batch that ran to completion
#[derive(Debug, Default)]
struct BatchCounts {
    batch_id: i64,
    jobs_imported: usize,
    invoices_imported: usize,
    invoices_skipped: usize,
    invoices_already_stored: usize,
    customers_upserted: usize,
    technicians_imported: usize,
    job_metrics_calculated: usize,
    technician_metrics_calculated: usize,
    validation: ValidationResult,
}

enum BatchOutcome {
    Imported(BatchCounts),
    /// The hash pair belongs to a batch that is not `failed`
    Claimed,
}

#[derive(Debug, Default)]
struct InvoiceCounts {
    imported: usize,
    skipped: usize,
    already_stored: usize,
    missing_jobs: usize,
}

/// Imports report pairs into the store
pub struct Importer {
    pool: PgPool,
}

impl Importer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Import a jobs report and an invoices report as one batch.
    pub async fn import_files(&self, jobs_path: &Path, invoices_path: &Path) -> Result<ImportResult, ImportError> {
        let started = Instant::now();

        let hashes = calculate_file_hashes(jobs_path, invoices_path)?;
        debug!("Report hashes: jobs={} invoices={}", hashes.jobs_hash, hashes.invoices_hash);

        if let Some(batch_id) = queries::import::find_successful_batch(&self.pool, &hashes)
            .await
            .map_err(ImportError::Lookup)?
        {
            info!("Reports already imported in batch {}", batch_id);
            return Ok(ImportResult::already_imported(batch_id, started.elapsed()));
        }

        let jobs = parse_jobs_file(jobs_path).map_err(|source| ImportError::Parse {
            file: jobs_path.to_path_buf(),
            source,
        })?;
        let invoices = parse_invoices_file(invoices_path).map_err(|source| ImportError::Parse {
            file: invoices_path.to_path_buf(),
            source,
        })?;
        info!("Parsed {} jobs and {} invoices", jobs.len(), invoices.len());

        let job_report_filename = file_name(jobs_path);
        let invoice_report_filename = file_name(invoices_path);
        let batch = NewImportBatch {
            job_report_filename: &job_report_filename,
            invoice_report_filename: &invoice_report_filename,
            hashes: &hashes,
            row_count_jobs: jobs.len() as i32,
            row_count_invoices: invoices.len() as i32,
        };

        let mut tx = self.pool.begin().await.map_err(ImportError::Begin)?;
        let mut resolver = NameKeyedResolver::new();

        let outcome = run_batch(&mut tx, &batch, &jobs, &invoices, &mut resolver).await;
        let counts = match outcome {
            Ok(BatchOutcome::Imported(counts)) => counts,
            Ok(BatchOutcome::Claimed) => {
                if let Err(e) = tx.rollback().await {
                    warn!("Failed to roll back unused transaction: {}", e);
                }
                return self.claimed_result(&batch, started).await;
            }
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    warn!("Failed to roll back import transaction: {}", e);
                }
                return Err(self.record_failure(&batch, err).await);
            }
        };

        if let Err(e) = tx.commit().await {
            let err = ImportError::step(ImportStep::Commit)(e.into());
            return Err(self.record_failure(&batch, err).await);
        }

        let duration = started.elapsed();
        info!(
            "Import batch {} complete in {:?}: {} jobs, {} invoices ({} skipped)",
            counts.batch_id, duration, counts.jobs_imported, counts.invoices_imported, counts.invoices_skipped
        );

        Ok(ImportResult {
            batch_id: counts.batch_id,
            already_imported: false,
            jobs_imported: counts.jobs_imported as u32,
            invoices_imported: counts.invoices_imported as u32,
            invoices_skipped: counts.invoices_skipped as u32,
            invoices_already_stored: counts.invoices_already_stored as u32,
            customers_upserted: counts.customers_upserted as u32,
            technicians_imported: counts.technicians_imported as u32,
            job_metrics_calculated: counts.job_metrics_calculated as u32,
            technician_metrics_calculated: counts.technician_metrics_calculated as u32,
            duration,
            validation: counts.validation,
        })
    }

    /// Another import owns the file pair; report its batch.
    async fn claimed_result(&self, batch: &NewImportBatch<'_>, started: Instant) -> Result<ImportResult, ImportError> {
        let existing = queries::import::find_batch_by_hashes(&self.pool, batch.hashes)
            .await
            .map_err(ImportError::Lookup)?;

        match existing {
            Some(existing) => {
                info!(
                    "Reports claimed by batch {} ({}), not importing again",
                    existing.id, existing.status
                );
                Ok(ImportResult::already_imported(existing.id, started.elapsed()))
            }
            None => Err(ImportError::step(ImportStep::RegisterBatch)(anyhow!(
                "file pair is claimed by a batch that no longer exists"
            ))),
        }
    }

    /// Record the batch as failed outside the rolled-back transaction.
    async fn record_failure(&self, batch: &NewImportBatch<'_>, err: ImportError) -> ImportError {
        let (step, source) = match err {
            ImportError::Step { step, source, .. } => (step, source),
            other => return other,
        };

        let message = format!("failed to {}: {:#}", step, source);
        error!("Import failed: {}", message);

        let batch_id = match queries::import::record_failed_batch(&self.pool, batch, &message).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to record failed import batch: {:#}", e);
                None
            }
        };

        ImportError::Step {
            step,
            batch_id,
            source,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn run_batch(
    conn: &mut PgConnection,
    batch: &NewImportBatch<'_>,
    jobs: &[JobRow],
    invoices: &[InvoiceRow],
    resolver: &mut dyn TechnicianResolver,
) -> Result<BatchOutcome, ImportError> {
    let Some(batch_id) = queries::import::register_batch(&mut *conn, batch)
        .await
        .map_err(ImportError::step(ImportStep::RegisterBatch))?
    else {
        return Ok(BatchOutcome::Claimed);
    };
    info!("Registered import batch {}", batch_id);

    let customers = collect_customers(jobs);
    for customer in &customers {
        queries::customer::upsert_customer(&mut *conn, customer)
            .await
            .map_err(ImportError::step(ImportStep::ImportCustomers))?;
    }
    info!("Upserted {} customers", customers.len());

    let mut jobs_imported = 0usize;
    for job in jobs {
        let inserted = queries::job::insert_job(&mut *conn, batch_id, job)
            .await
            .map_err(ImportError::step(ImportStep::InsertJobs))?;
        if inserted {
            jobs_imported += 1;
        } else {
            debug!("Job {} already stored, keeping existing row", job.job_id);
        }
    }
    info!("Inserted {} of {} jobs", jobs_imported, jobs.len());

    let technicians_imported = import_technicians(&mut *conn, jobs, resolver)
        .await
        .map_err(ImportError::step(ImportStep::ImportTechnicians))?;
    info!("Resolved {} technicians", technicians_imported);

    let valid_job_ids: BTreeSet<&str> = jobs.iter().map(|job| job.job_id.as_str()).collect();
    let invoice_counts = import_invoices(&mut *conn, batch_id, invoices, &valid_job_ids)
        .await
        .map_err(ImportError::step(ImportStep::InsertInvoices))?;

    let mut validation = validate_import(&mut *conn, batch_id)
        .await
        .map_err(ImportError::step(ImportStep::Validate))?;
    if invoice_counts.skipped > 0 {
        validation.warnings.push(skipped_invoices_warning(
            invoice_counts.skipped,
            invoice_counts.missing_jobs,
        ));
    }
    for warning in &validation.warnings {
        warn!("{}", warning);
    }

    let job_ids: Vec<String> = valid_job_ids.iter().map(|id| id.to_string()).collect();
    let job_metrics_calculated = refresh_job_metrics(&mut *conn, &job_ids)
        .await
        .map_err(ImportError::step(ImportStep::CalculateJobMetrics))?;
    info!("Calculated {} job metrics", job_metrics_calculated);

    let technician_metrics_calculated = match refresh_technician_metrics(&mut *conn).await {
        Ok(count) => {
            info!("Calculated {} technician metrics", count);
            count
        }
        Err(e) => {
            warn!("Failed to calculate technician metrics: {:#}", e);
            0
        }
    };

    queries::import::set_batch_status(&mut *conn, batch_id, BatchStatus::Success)
        .await
        .map_err(ImportError::step(ImportStep::FinalizeBatch))?;

    Ok(BatchOutcome::Imported(BatchCounts {
        batch_id,
        jobs_imported,
        invoices_imported: invoice_counts.imported,
        invoices_skipped: invoice_counts.skipped,
        invoices_already_stored: invoice_counts.already_stored,
        customers_upserted: customers.len(),
        technicians_imported,
        job_metrics_calculated,
        technician_metrics_calculated,
        validation,
    }))
}

async fn import_invoices(
    conn: &mut PgConnection,
    batch_id: i64,
    invoices: &[InvoiceRow],
    valid_job_ids: &BTreeSet<&str>,
) -> anyhow::Result<InvoiceCounts> {
    let mut counts = InvoiceCounts::default();
    let mut missing_jobs: HashSet<&str> = HashSet::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(invoices.len());

    for invoice in invoices {
        if !valid_job_ids.contains(invoice.job_id.as_str()) {
            debug!(
                "Skipping invoice {} for unknown job {}",
                invoice.invoice_id, invoice.job_id
            );
            counts.skipped += 1;
            missing_jobs.insert(invoice.job_id.as_str());
            continue;
        }

        if !seen.insert(invoice.invoice_id.as_str()) {
            bail!(
                "duplicate invoice {} at row {} of the invoices report",
                invoice.invoice_id,
                invoice.source_row
            );
        }

        if queries::invoice::insert_invoice(&mut *conn, batch_id, invoice).await? {
            counts.imported += 1;
        } else {
            debug!("Invoice {} already stored, keeping existing row", invoice.invoice_id);
            counts.already_stored += 1;
        }
    }

    counts.missing_jobs = missing_jobs.len();
    info!(
        "Inserted {} invoices, skipped {}, {} already stored",
        counts.imported, counts.skipped, counts.already_stored
    );
    Ok(counts)
}

/// Recompute metrics of the batch's jobs from every stored invoice.
async fn refresh_job_metrics(conn: &mut PgConnection, job_ids: &[String]) -> anyhow::Result<usize> {
    let jobs = queries::job::load_job_revenue(&mut *conn, job_ids).await?;
    let invoices = queries::invoice::load_invoice_costs(&mut *conn, job_ids).await?;

    let metrics = calculate_job_metrics(&jobs, &invoices);
    for metric in &metrics {
        queries::metrics::upsert_job_metric(&mut *conn, metric).await?;
    }

    Ok(metrics.len())
}

/// Rebuild every technician's metrics inside a savepoint.
///
/// A failure rolls back to the savepoint so the batch can still commit.
async fn refresh_technician_metrics(conn: &mut PgConnection) -> anyhow::Result<usize> {
    let mut savepoint = conn.begin().await?;

    match rebuild_technician_metrics(&mut savepoint).await {
        Ok(count) => {
            savepoint.commit().await?;
            Ok(count)
        }
        Err(e) => {
            savepoint.rollback().await?;
            Err(e)
        }
    }
}

async fn rebuild_technician_metrics(conn: &mut PgConnection) -> anyhow::Result<usize> {
    let technician_ids = queries::technician::list_technician_ids(&mut *conn).await?;
    if technician_ids.is_empty() {
        return Ok(0);
    }

    let associations = queries::technician::list_job_technicians(&mut *conn).await?;
    let jobs = queries::job::load_technician_jobs(&mut *conn).await?;
    let job_metrics = queries::metrics::load_job_metrics(&mut *conn).await?;

    let metrics = calculate_technician_metrics(&technician_ids, &associations, &jobs, &job_metrics);
    for metric in &metrics {
        queries::metrics::upsert_technician_metric(&mut *conn, metric).await?;
    }

    Ok(metrics.len())
}

struct CustomerCandidate<'a> {
    source: &'a JobRow,
    first_job_date: Option<NaiveDate>,
    last_job_date: Option<NaiveDate>,
}

/// One upsert per customer id in the batch.
///
/// Descriptive fields come from the customer's most recently completed job
/// (undated jobs count as oldest, ties keep the earlier row); the job date
/// range spans every completion date seen.
pub fn collect_customers(jobs: &[JobRow]) -> Vec<CustomerUpsert> {
    let mut candidates: BTreeMap<i64, CustomerCandidate<'_>> = BTreeMap::new();

    for job in jobs {
        let date = job.job_completion_date;
        let candidate = candidates
            .entry(job.customer_id)
            .or_insert_with(|| CustomerCandidate {
                source: job,
                first_job_date: date,
                last_job_date: date,
            });

        if date > candidate.source.job_completion_date {
            candidate.source = job;
        }
        if let Some(date) = date {
            candidate.first_job_date = Some(candidate.first_job_date.map_or(date, |d| d.min(date)));
            candidate.last_job_date = Some(candidate.last_job_date.map_or(date, |d| d.max(date)));
        }
    }

    candidates
        .into_iter()
        .map(|(id, candidate)| {
            let job = candidate.source;
            CustomerUpsert {
                id,
                customer_name: job.customer_name.clone().unwrap_or_default(),
                customer_type: job.customer_type.clone(),
                customer_city: job.customer_city.clone(),
                customer_state: job.customer_state.clone(),
                customer_zip: job.customer_zip.clone(),
                location_city: job.location_city.clone(),
                location_state: job.location_state.clone(),
                location_zip: job.location_zip.clone(),
                first_job_date: candidate.first_job_date,
                last_job_date: candidate.last_job_date,
            }
        })
        .collect()
}
