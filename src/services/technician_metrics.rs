//! Per-technician performance over completed jobs
//!
//! Primary jobs are opportunities and carry the service numbers (hours,
//! estimates, sales). Sold-by jobs are conversions and carry profitability.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::types::{
    JobMetric, JobTechnician, TechnicianJob, TechnicianMetric, TechnicianRole, JOB_STATUS_COMPLETED,
};

#[derive(Debug, Default, Clone, Copy)]
struct RoleFlags {
    primary: bool,
    sold_by: bool,
}

/// One metric row per technician id, sorted by id.
///
/// Associations pointing at unknown technicians or missing jobs are ignored.
pub fn calculate_technician_metrics(
    technician_ids: &[i64],
    associations: &[JobTechnician],
    jobs: &[TechnicianJob],
    job_metrics: &[JobMetric],
) -> Vec<TechnicianMetric> {
    let jobs_by_id: HashMap<&str, &TechnicianJob> =
        jobs.iter().map(|job| (job.job_id.as_str(), job)).collect();
    let metrics_by_job: HashMap<&str, &JobMetric> = job_metrics
        .iter()
        .map(|metric| (metric.job_id.as_str(), metric))
        .collect();

    let mut roles: HashMap<(i64, &str), RoleFlags> = HashMap::new();
    for association in associations {
        let flags = roles
            .entry((association.technician_id, association.job_id.as_str()))
            .or_default();
        match association.role {
            TechnicianRole::Primary => flags.primary = true,
            TechnicianRole::SoldBy => flags.sold_by = true,
            TechnicianRole::Assigned => {}
        }
    }

    let mut metrics: BTreeMap<i64, TechnicianMetric> = technician_ids
        .iter()
        .map(|&id| (id, TechnicianMetric::new(id)))
        .collect();

    for (&(technician_id, job_id), flags) in &roles {
        let Some(metric) = metrics.get_mut(&technician_id) else {
            continue;
        };
        let Some(job) = jobs_by_id.get(job_id) else {
            continue;
        };
        if job.status != JOB_STATUS_COMPLETED {
            continue;
        }

        if flags.sold_by {
            metric.jobs_sold += 1;
            if let Some(job_metric) = metrics_by_job.get(job_id) {
                let total = metric.total_gross_profit.unwrap_or(Decimal::ZERO);
                metric.total_gross_profit = Some(total + job_metric.gross_profit);
            }
        }

        if flags.primary {
            metric.opportunities += 1;
            metric.total_hours_worked += job.total_hours_worked;
            metric.total_estimates += job.estimate_count;
            if job.estimate_count > 0 {
                metric.jobs_with_estimates += 1;
            }
            metric.total_sales += primary_sale(job, flags);
        }
    }

    metrics
        .into_values()
        .map(|mut metric| {
            apply_averages(&mut metric);
            metric
        })
        .collect()
}

/// Sale credited to the primary technician of a completed job.
///
/// An estimate sale counts first. Without one, a technician who both ran and
/// sold the job is credited its subtotal.
fn primary_sale(job: &TechnicianJob, flags: &RoleFlags) -> Decimal {
    if job.estimate_sales_subtotal > Decimal::ZERO {
        return job.estimate_sales_subtotal;
    }
    match job.jobs_subtotal {
        Some(subtotal) if flags.sold_by && subtotal > Decimal::ZERO => subtotal,
        _ => Decimal::ZERO,
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    (numerator / denominator).round_dp(2)
}

fn percentage(numerator: Decimal, denominator: Decimal) -> Decimal {
    (numerator / denominator * Decimal::ONE_HUNDRED).round_dp(2)
}

fn apply_averages(m: &mut TechnicianMetric) {
    let opportunities = Decimal::from(m.opportunities);
    let jobs_sold = Decimal::from(m.jobs_sold);

    if m.opportunities > 0 {
        m.conversion_rate = Some(percentage(jobs_sold, opportunities));
        m.avg_estimates_per_job = Some(ratio(Decimal::from(m.total_estimates), opportunities));
        if !m.total_hours_worked.is_zero() {
            m.avg_hours_per_job = Some(ratio(m.total_hours_worked, opportunities));
        }
    }

    if m.jobs_sold > 0 && m.total_sales > Decimal::ZERO {
        m.avg_sale = Some(ratio(m.total_sales, jobs_sold));
    }

    if let Some(profit) = m.total_gross_profit {
        if m.jobs_sold > 0 {
            m.avg_gross_profit = Some(ratio(profit, jobs_sold));
        }
        if m.total_sales > Decimal::ZERO {
            m.avg_margin_pct = Some(percentage(profit, m.total_sales));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn job(id: &str, subtotal: &str, estimate_sales: &str) -> TechnicianJob {
        TechnicianJob {
            job_id: id.to_string(),
            status: "Completed".to_string(),
            jobs_subtotal: Some(dec(subtotal)),
            estimate_sales_subtotal: dec(estimate_sales),
            total_hours_worked: Decimal::ZERO,
            estimate_count: 0,
        }
    }

    fn link(job_id: &str, technician_id: i64, role: TechnicianRole) -> JobTechnician {
        JobTechnician {
            job_id: job_id.to_string(),
            technician_id,
            role,
        }
    }

    fn job_metric(job_id: &str, revenue: &str, profit: &str) -> JobMetric {
        JobMetric {
            job_id: job_id.to_string(),
            revenue: dec(revenue),
            total_costs: dec(revenue) - dec(profit),
            gross_profit: dec(profit),
            gross_margin_pct: None,
            invoice_count: 1,
            has_adjustment: false,
        }
    }

    #[test]
    fn test_same_visit_sell_and_install_credits_subtotal() {
        let jobs = vec![job("j1", "500", "0")];
        let links = vec![
            link("j1", 1, TechnicianRole::Primary),
            link("j1", 1, TechnicianRole::SoldBy),
        ];

        let metrics = calculate_technician_metrics(&[1], &links, &jobs, &[]);
        let m = &metrics[0];
        assert_eq!(m.total_sales, dec("500"));
        assert_eq!(m.opportunities, 1);
        assert_eq!(m.conversions(), 1);
        assert_eq!(m.conversion_rate, Some(dec("100")));
        assert_eq!(m.avg_sale, Some(dec("500")));
    }

    #[test]
    fn test_primary_without_sale_earns_nothing() {
        let jobs = vec![job("j1", "500", "0")];
        let links = vec![
            link("j1", 1, TechnicianRole::Primary),
            link("j1", 2, TechnicianRole::SoldBy),
        ];

        let metrics = calculate_technician_metrics(&[1, 2], &links, &jobs, &[]);
        assert_eq!(metrics[0].total_sales, Decimal::ZERO);
        assert_eq!(metrics[0].conversion_rate, Some(Decimal::ZERO));
        assert_eq!(metrics[0].avg_sale, None);
        assert_eq!(metrics[1].jobs_sold, 1);
        assert_eq!(metrics[1].total_sales, Decimal::ZERO);
    }

    #[test]
    fn test_estimate_sales_take_precedence_over_subtotal() {
        let jobs = vec![job("j1", "500", "320")];
        let links = vec![
            link("j1", 1, TechnicianRole::Primary),
            link("j1", 1, TechnicianRole::SoldBy),
        ];

        let m = &calculate_technician_metrics(&[1], &links, &jobs, &[])[0];
        assert_eq!(m.total_sales, dec("320"));
    }

    #[test]
    fn test_no_primary_jobs_means_no_conversion_rate() {
        let jobs = vec![job("j1", "500", "0"), job("j2", "300", "0")];
        let links = vec![
            link("j1", 7, TechnicianRole::SoldBy),
            link("j2", 7, TechnicianRole::SoldBy),
        ];

        let m = &calculate_technician_metrics(&[7], &links, &jobs, &[])[0];
        assert_eq!(m.jobs_sold, 2);
        assert_eq!(m.opportunities, 0);
        assert_eq!(m.conversion_rate, None);
        assert_eq!(m.avg_hours_per_job, None);
        assert_eq!(m.avg_estimates_per_job, None);
    }

    #[test]
    fn test_non_completed_jobs_are_excluded() {
        let mut canceled = job("j1", "500", "200");
        canceled.status = "Canceled".to_string();
        let links = vec![
            link("j1", 1, TechnicianRole::Primary),
            link("j1", 1, TechnicianRole::SoldBy),
        ];

        let m = &calculate_technician_metrics(&[1], &links, &[canceled], &[])[0];
        assert_eq!(m.opportunities, 0);
        assert_eq!(m.jobs_sold, 0);
        assert_eq!(m.total_sales, Decimal::ZERO);
    }

    #[test]
    fn test_service_numbers_accumulate_from_primary_jobs() {
        let mut first = job("j1", "100", "0");
        first.total_hours_worked = dec("2.5");
        first.estimate_count = 3;
        let mut second = job("j2", "100", "0");
        second.total_hours_worked = dec("1.5");
        let jobs = vec![first, second];
        let links = vec![
            link("j1", 1, TechnicianRole::Primary),
            link("j2", 1, TechnicianRole::Primary),
            link("j2", 1, TechnicianRole::Assigned),
        ];

        let m = &calculate_technician_metrics(&[1], &links, &jobs, &[])[0];
        assert_eq!(m.opportunities, 2);
        assert_eq!(m.jobs_serviced(), 2);
        assert_eq!(m.total_hours_worked, dec("4.0"));
        assert_eq!(m.avg_hours_per_job, Some(dec("2")));
        assert_eq!(m.total_estimates, 3);
        assert_eq!(m.jobs_with_estimates, 1);
        assert_eq!(m.avg_estimates_per_job, Some(dec("1.5")));
    }

    #[test]
    fn test_profitability_comes_from_sold_jobs() {
        let jobs = vec![job("j1", "1000", "1000"), job("j2", "500", "0")];
        let links = vec![
            link("j1", 1, TechnicianRole::Primary),
            link("j1", 1, TechnicianRole::SoldBy),
            link("j2", 1, TechnicianRole::SoldBy),
        ];
        let job_metrics = vec![job_metric("j1", "1000", "400"), job_metric("j2", "500", "100")];

        let m = &calculate_technician_metrics(&[1], &links, &jobs, &job_metrics)[0];
        assert_eq!(m.jobs_sold, 2);
        assert_eq!(m.total_sales, dec("1000"));
        assert_eq!(m.total_gross_profit, Some(dec("500")));
        assert_eq!(m.avg_gross_profit, Some(dec("250")));
        assert_eq!(m.avg_margin_pct, Some(dec("50")));
        assert_eq!(m.avg_sale, Some(dec("500")));
    }

    #[test]
    fn test_sold_jobs_without_metrics_leave_profit_absent() {
        let jobs = vec![job("j1", "500", "0")];
        let links = vec![link("j1", 1, TechnicianRole::SoldBy)];

        let m = &calculate_technician_metrics(&[1], &links, &jobs, &[])[0];
        assert_eq!(m.total_gross_profit, None);
        assert_eq!(m.avg_gross_profit, None);
        assert_eq!(m.avg_margin_pct, None);
    }

    #[test]
    fn test_every_technician_gets_a_row() {
        let metrics = calculate_technician_metrics(&[3, 1, 2], &[], &[], &[]);
        let ids: Vec<i64> = metrics.iter().map(|m| m.technician_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(metrics.iter().all(|m| *m == TechnicianMetric::new(m.technician_id)));
    }

    #[test]
    fn test_unknown_technicians_and_jobs_are_ignored() {
        let jobs = vec![job("j1", "500", "0")];
        let links = vec![
            link("j1", 99, TechnicianRole::Primary),
            link("missing", 1, TechnicianRole::Primary),
        ];

        let metrics = calculate_technician_metrics(&[1], &links, &jobs, &[]);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].opportunities, 0);
    }
}
