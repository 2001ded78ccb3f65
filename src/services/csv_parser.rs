//! CSV decoding for the jobs and invoices reports
//!
//! Headers are matched case-insensitively after trimming. Identifiers, the
//! required descriptive columns, and every money column the metrics read
//! reject bad values for the whole file; the remaining optional columns
//! degrade to `None`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{InvoiceRow, JobRow};

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%m/%d/%y"];

const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to open file")]
    Io(#[from] io::Error),
    #[error("failed to read CSV")]
    Csv(#[from] csv::Error),
    #[error("CSV file is empty")]
    Empty,
    #[error("row {row}, column {column}: failed to parse '{value}': {reason}")]
    Validation {
        row: usize,
        column: &'static str,
        value: String,
        reason: String,
    },
}

// =============================================================================
// FIELD PARSERS
// =============================================================================

/// Strip `$`, thousands separators and whitespace; `(12.50)` becomes `-12.50`.
pub fn clean_currency(s: &str) -> String {
    let mut s = s.trim();
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        negative = true;
        s = inner;
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();

    if negative && !cleaned.is_empty() && !cleaned.starts_with('-') {
        format!("-{}", cleaned)
    } else {
        cleaned
    }
}

pub fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    clean_currency(s).parse::<Decimal>()
}

/// Accepts the export's `M/D/YYYY` family, ISO dates, and date-times.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .chain(
            DATETIME_FORMATS
                .iter()
                .filter_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .map(|dt| dt.date()),
        )
        // "%m/%d/%Y" happily reads "1/2/24" as year 24
        .find(|date| date.year() >= 1000)
}

pub fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_uppercase().as_str(), "TRUE" | "YES" | "1")
}

/// Integer identifiers; thousands separators are dropped and a `-N` suffix
/// (split records such as `1234-2`) is ignored.
fn parse_id(s: &str) -> Result<i64, std::num::ParseIntError> {
    let s = s.replace(',', "");
    let s = s.trim();
    let base = s.split('-').next().unwrap_or(s);
    base.trim().parse::<i64>()
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.replace(',', "");
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<Decimal>().ok().and_then(|d| d.trunc().to_string().parse().ok()))
}

// =============================================================================
// ROW ACCESS
// =============================================================================

struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let map = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (normalize_header(header), idx))
            .collect();
        Columns(map)
    }
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

struct Row<'a> {
    record: &'a StringRecord,
    columns: &'a Columns,
    number: usize,
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> &'a str {
        self.columns
            .0
            .get(&column.to_lowercase())
            .and_then(|&idx| self.record.get(idx))
            .map(str::trim)
            .unwrap_or("")
    }

    fn invalid(&self, column: &'static str, value: &str, reason: impl ToString) -> ParseError {
        ParseError::Validation {
            row: self.number,
            column,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn text(&self, column: &str) -> Option<String> {
        let value = self.get(column);
        (!value.is_empty()).then(|| value.to_string())
    }

    fn required_text(&self, column: &'static str) -> Result<String, ParseError> {
        self.text(column)
            .ok_or_else(|| self.invalid(column, "", "required field is empty"))
    }

    fn required_id(&self, column: &'static str) -> Result<i64, ParseError> {
        let value = self.get(column);
        if value.is_empty() {
            return Err(self.invalid(column, value, "required field is empty"));
        }
        parse_id(value).map_err(|e| self.invalid(column, value, e))
    }

    fn optional_int(&self, column: &str) -> Option<i64> {
        let value = self.get(column);
        if value.is_empty() {
            None
        } else {
            parse_int(value)
        }
    }

    /// Optional, but a present value must be a number.
    fn decimal(&self, column: &'static str) -> Result<Option<Decimal>, ParseError> {
        let value = self.get(column);
        if value.is_empty() {
            return Ok(None);
        }
        parse_decimal(value)
            .map(Some)
            .map_err(|e| self.invalid(column, value, e))
    }

    fn lenient_decimal(&self, column: &str) -> Option<Decimal> {
        let value = self.get(column);
        if value.is_empty() {
            None
        } else {
            parse_decimal(value).ok()
        }
    }

    fn date(&self, column: &str) -> Option<NaiveDate> {
        parse_date(self.get(column))
    }

    fn required_date(&self, column: &'static str) -> Result<NaiveDate, ParseError> {
        let value = self.get(column);
        if value.is_empty() {
            return Err(self.invalid(column, value, "required field is empty"));
        }
        parse_date(value).ok_or_else(|| self.invalid(column, value, "invalid date format"))
    }

    fn flag(&self, column: &str) -> bool {
        parse_bool(self.get(column))
    }
}

fn read_rows<R, T, F>(reader: R, parse_row: F) -> Result<Vec<T>, ParseError>
where
    R: Read,
    F: Fn(&Row<'_>) -> Result<T, ParseError>,
{
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.iter().all(|header| normalize_header(header).is_empty()) {
        return Err(ParseError::Empty);
    }
    let columns = Columns::from_headers(&headers);

    let mut rows = Vec::new();
    for (idx, result) in csv_reader.records().enumerate() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let number = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(idx + 2);

        rows.push(parse_row(&Row {
            record: &record,
            columns: &columns,
            number,
        })?);
    }

    Ok(rows)
}

// =============================================================================
// REPORTS
// =============================================================================

pub fn parse_jobs<R: Read>(reader: R) -> Result<Vec<JobRow>, ParseError> {
    read_rows(reader, parse_job_row)
}

pub fn parse_invoices<R: Read>(reader: R) -> Result<Vec<InvoiceRow>, ParseError> {
    read_rows(reader, parse_invoice_row)
}

pub fn parse_jobs_file(path: &Path) -> Result<Vec<JobRow>, ParseError> {
    parse_jobs(BufReader::new(File::open(path)?))
}

pub fn parse_invoices_file(path: &Path) -> Result<Vec<InvoiceRow>, ParseError> {
    parse_invoices(BufReader::new(File::open(path)?))
}

fn parse_job_row(row: &Row<'_>) -> Result<JobRow, ParseError> {
    Ok(JobRow {
        source_row: row.number,
        job_id: row.required_id("Job ID")?.to_string(),
        customer_id: row.required_id("Customer ID")?,
        location_id: row.optional_int("Location ID"),
        invoice_id: row.optional_int("Invoice ID").map(|id| id.to_string()),

        customer_name: row.text("Customer Name"),
        customer_type: row.text("Customer Type"),
        customer_city: row.text("Customer City"),
        customer_state: row.text("Customer State"),
        customer_zip: row.text("Customer Zip"),

        location_city: row.text("Location City"),
        location_state: row.text("Location State"),
        location_zip: row.text("Location Zip"),

        job_type: row.required_text("Job Type")?,
        status: row.required_text("Status")?,
        business_unit: row.text("Business Unit"),

        job_creation_date: row.date("Created Date"),
        job_schedule_date: row.date("Scheduled Date"),
        job_completion_date: row.date("Completion Date"),

        assigned_technicians: row.text("Assigned Technicians"),
        sold_by: row.text("Sold By"),
        booked_by: row.text("Booked By"),
        primary_technician: row.text("Primary Technician"),

        job_campaign_id: row.optional_int("Job Campaign ID"),
        call_campaign_id: row.optional_int("Call Campaign ID"),
        campaign_category: row.text("Campaign Category"),

        jobs_subtotal: row.decimal("Jobs Subtotal")?,
        job_total: row.decimal("Jobs Total")?,
        estimate_sales_subtotal: row.decimal("Estimate Sales Subtotal")?,

        priority: row.text("Priority"),
        total_hours_worked: row.decimal("Total Hours Worked")?,
        survey_result: row.lenient_decimal("Survey Result"),
        estimate_count: row.optional_int("Estimate Count"),

        opportunity: row.flag("Opportunity"),
        warranty: row.flag("Warranty"),
        recall: row.flag("Recall"),
        converted: row.flag("Converted"),
        zero_dollar_job: row.flag("Zero Dollar Job"),
    })
}

fn parse_invoice_row(row: &Row<'_>) -> Result<InvoiceRow, ParseError> {
    Ok(InvoiceRow {
        source_row: row.number,
        invoice_id: row.required_id("Invoice #")?.to_string(),
        job_id: row.required_id("Job #")?.to_string(),
        customer_id: row.optional_int("Customer ID"),

        invoice_date: row.required_date("Invoice Date")?,
        invoice_status: row.text("Invoice Status"),
        invoice_type: row.text("Invoice Type"),
        invoice_summary: row.text("Invoice Summary"),

        total: row.decimal("Total")?,
        balance: row.lenient_decimal("Balance"),
        payments: row.lenient_decimal("Payments"),

        material_costs: row.lenient_decimal("Material Costs"),
        equipment_costs: row.lenient_decimal("Equipment Costs"),
        purchase_order_costs: row.lenient_decimal("Purchase Order Costs"),
        return_costs: row.lenient_decimal("Return Costs"),
        costs_total: row.decimal("Costs Total")?,

        material_retail: row.lenient_decimal("Material Retail"),
        equipment_retail: row.lenient_decimal("Equipment Retail"),
        labor: row.lenient_decimal("Labor"),
        labor_pay: row.lenient_decimal("Labor Pay"),
        labor_burden: row.lenient_decimal("Labor Burden"),
        total_labor_costs: row.lenient_decimal("Total Labor Costs"),
        income: row.lenient_decimal("Income"),
        discount_total: row.lenient_decimal("Discount Total"),

        is_adjustment: row.flag("Is Adjustment"),
    })
}
