//! Per-job profitability
//!
//! Revenue is the job's `jobs_subtotal`; cost comes from its invoices. An
//! adjustment invoice replaces the cost picture instead of adding to it.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::types::{InvoiceCost, JobMetric, JobRevenue, JOB_STATUS_COMPLETED};

/// Metrics for every qualifying job, in input order.
///
/// `invoices` must be in file order; the first adjustment invoice of a job
/// is the one that sets its cost.
pub fn calculate_job_metrics(jobs: &[JobRevenue], invoices: &[InvoiceCost]) -> Vec<JobMetric> {
    let mut invoices_by_job: HashMap<&str, Vec<&InvoiceCost>> = HashMap::new();
    for invoice in invoices {
        invoices_by_job
            .entry(invoice.job_id.as_str())
            .or_default()
            .push(invoice);
    }

    jobs.iter()
        .filter(|job| job.status == JOB_STATUS_COMPLETED)
        .filter_map(|job| {
            let revenue = job.jobs_subtotal?;
            let job_invoices = invoices_by_job.get(job.job_id.as_str())?;
            Some(job_metric(&job.job_id, revenue, job_invoices))
        })
        .collect()
}

fn job_metric(job_id: &str, revenue: Decimal, invoices: &[&InvoiceCost]) -> JobMetric {
    let adjustment = invoices.iter().find(|invoice| invoice.is_adjustment);

    let total_costs = match adjustment {
        Some(adjustment) => adjustment.costs_total,
        None => invoices.iter().map(|invoice| invoice.costs_total).sum(),
    };

    let gross_profit = revenue - total_costs;
    let gross_margin_pct = (revenue > Decimal::ZERO)
        .then(|| (gross_profit / revenue * Decimal::ONE_HUNDRED).round_dp(2));

    JobMetric {
        job_id: job_id.to_string(),
        revenue,
        total_costs,
        gross_profit,
        gross_margin_pct,
        invoice_count: invoices.len() as i32,
        has_adjustment: adjustment.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn job(id: &str, status: &str, subtotal: Option<&str>) -> JobRevenue {
        JobRevenue {
            job_id: id.to_string(),
            status: status.to_string(),
            jobs_subtotal: subtotal.map(dec),
        }
    }

    fn invoice(job_id: &str, cost: &str, is_adjustment: bool) -> InvoiceCost {
        InvoiceCost {
            job_id: job_id.to_string(),
            costs_total: dec(cost),
            is_adjustment,
        }
    }

    #[test]
    fn test_costs_sum_across_regular_invoices() {
        let jobs = vec![job("1", "Completed", Some("1000"))];
        let invoices = vec![invoice("1", "300", false), invoice("1", "200", false)];

        let metrics = calculate_job_metrics(&jobs, &invoices);
        assert_eq!(metrics.len(), 1);

        let m = &metrics[0];
        assert_eq!(m.total_costs, dec("500"));
        assert_eq!(m.gross_profit, dec("500"));
        assert_eq!(m.gross_margin_pct, Some(dec("50.00")));
        assert_eq!(m.invoice_count, 2);
        assert!(!m.has_adjustment);
    }

    #[test]
    fn test_adjustment_replaces_other_costs() {
        let jobs = vec![job("1", "Completed", Some("1000"))];
        let invoices = vec![
            invoice("1", "300", false),
            invoice("1", "200", false),
            invoice("1", "100", true),
        ];

        let m = &calculate_job_metrics(&jobs, &invoices)[0];
        assert_eq!(m.total_costs, dec("100"));
        assert_eq!(m.gross_profit, dec("900"));
        assert_eq!(m.gross_margin_pct, Some(dec("90.00")));
        assert_eq!(m.invoice_count, 3);
        assert!(m.has_adjustment);
    }

    #[test]
    fn test_first_adjustment_in_file_order_wins() {
        let jobs = vec![job("1", "Completed", Some("1000"))];
        let invoices = vec![
            invoice("1", "400", false),
            invoice("1", "250", true),
            invoice("1", "700", true),
        ];

        let m = &calculate_job_metrics(&jobs, &invoices)[0];
        assert_eq!(m.total_costs, dec("250"));
        assert_eq!(m.gross_profit, dec("750"));
    }

    #[test]
    fn test_zero_revenue_has_no_margin() {
        let jobs = vec![job("1", "Completed", Some("0"))];
        let invoices = vec![invoice("1", "80", false)];

        let m = &calculate_job_metrics(&jobs, &invoices)[0];
        assert_eq!(m.gross_profit, dec("-80"));
        assert_eq!(m.gross_margin_pct, None);
    }

    #[test]
    fn test_loss_making_job_has_negative_margin() {
        let jobs = vec![job("1", "Completed", Some("200"))];
        let invoices = vec![invoice("1", "300", false)];

        let m = &calculate_job_metrics(&jobs, &invoices)[0];
        assert_eq!(m.gross_profit, dec("-100"));
        assert_eq!(m.gross_margin_pct, Some(dec("-50.00")));
    }

    #[test]
    fn test_non_qualifying_jobs_are_skipped() {
        let jobs = vec![
            job("canceled", "Canceled", Some("500")),
            job("no-revenue", "Completed", None),
            job("no-invoices", "Completed", Some("500")),
            job("ok", "Completed", Some("500")),
        ];
        let invoices = vec![
            invoice("canceled", "10", false),
            invoice("no-revenue", "10", false),
            invoice("ok", "10", false),
        ];

        let metrics = calculate_job_metrics(&jobs, &invoices);
        let ids: Vec<&str> = metrics.iter().map(|m| m.job_id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn test_margin_is_rounded_to_cents() {
        let jobs = vec![job("1", "Completed", Some("300"))];
        let invoices = vec![invoice("1", "100", false)];

        let m = &calculate_job_metrics(&jobs, &invoices)[0];
        assert_eq!(m.gross_margin_pct, Some(dec("66.67")));
    }
}
