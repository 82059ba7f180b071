// commission.rs
// Deterministic commission figures derived from a project. The fallback
// backfills legacy projects recorded before commission capture; derived
// values are returned, never written back.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::{TrendBucket, TrendFrame};
use crate::models::Project;

/// Per-kW valuation applied when a legacy project carries no total amount.
pub const AMOUNT_PER_KW: f64 = 50_000.0;
/// Commission share applied when no commission was recorded.
pub const COMMISSION_RATE: f64 = 0.05;

/// Stage values that mean the commission run has already completed even when
/// the free-text status still reads otherwise.
const COMPLETED_STAGES: [&str; 2] = ["commission", "subsidydis"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommissionView {
    pub amount: f64,
    pub commission: f64,
    pub status: &'static str,
}

/// Resolve the commission figures for one project.
pub fn view(project: &Project) -> CommissionView {
    let amount = if project.total_amount > 0.0 {
        project.total_amount
    } else {
        project.total_kw * AMOUNT_PER_KW
    };
    let commission = project
        .commission
        .unwrap_or(amount * COMMISSION_RATE)
        .max(0.0);

    // "Project Signed" and every other free-text value stays Pending unless
    // the machine stage says the payout already ran.
    let completed = project.status == "Completed"
        || COMPLETED_STAGES.contains(&project.status_stage.as_str());
    let status = if completed { "Completed" } else { "Pending" };

    CommissionView {
        amount,
        commission,
        status,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommissionSummary {
    pub total_commission: f64,
    pub completed_commission: f64,
    pub pending_commission: f64,
    pub highest_commission: f64,
    pub average_commission: f64,
    pub trend: Vec<TrendBucket>,
}

/// Aggregate commission over a set of projects with a month-bucketed trend
/// of the trailing `months` window.
pub fn summarize(projects: &[Project], now: DateTime<Utc>, months: usize) -> CommissionSummary {
    let mut total = 0.0;
    let mut completed = 0.0;
    let mut pending = 0.0;
    let mut highest = 0.0_f64;
    let mut frame = TrendFrame::months(now, months);

    for project in projects {
        let v = view(project);
        total += v.commission;
        if v.status == "Completed" {
            completed += v.commission;
        } else {
            pending += v.commission;
        }
        highest = highest.max(v.commission);
        frame.add(
            &TrendFrame::month_key(project.created_at.to_chrono()),
            v.commission,
        );
    }

    let average = if projects.is_empty() {
        0.0
    } else {
        total / projects.len() as f64
    };

    CommissionSummary {
        total_commission: total,
        completed_commission: completed,
        pending_commission: pending,
        highest_commission: highest,
        average_commission: average,
        trend: frame.into_buckets(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::oid::ObjectId;

    use crate::models::{CommissionStatus, EmbeddedLocation};

    fn project(
        total_amount: f64,
        total_kw: f64,
        commission: Option<f64>,
        status: &str,
        stage: &str,
    ) -> Project {
        Project {
            id: Some(ObjectId::new()),
            category: "residential".into(),
            total_kw,
            total_amount,
            commission,
            commission_status: CommissionStatus::Pending,
            status: status.into(),
            status_stage: stage.into(),
            dealer: ObjectId::new(),
            location: EmbeddedLocation::default(),
            deleted: false,
            created_at: mongodb::bson::DateTime::from_chrono(
                Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            ),
        }
    }

    #[test]
    fn fallback_derives_amount_from_kw() {
        let v = view(&project(0.0, 5.0, None, "Project Signed", "quote"));
        assert_eq!(v.amount, 250_000.0);
        assert_eq!(v.commission, 12_500.0);
        assert_eq!(v.status, "Pending");
    }

    #[test]
    fn recorded_values_win_over_fallback() {
        let v = view(&project(300_000.0, 5.0, Some(9_000.0), "Completed", "done"));
        assert_eq!(v.amount, 300_000.0);
        assert_eq!(v.commission, 9_000.0);
        assert_eq!(v.status, "Completed");
    }

    #[test]
    fn commission_stage_counts_as_completed() {
        for stage in ["commission", "subsidydis"] {
            let v = view(&project(100_000.0, 2.0, None, "Project Signed", stage));
            assert_eq!(v.status, "Completed");
        }
    }

    #[test]
    fn derived_commission_is_never_negative() {
        let v = view(&project(100_000.0, 2.0, Some(-500.0), "Completed", "done"));
        assert_eq!(v.commission, 0.0);
    }

    #[test]
    fn summary_splits_completed_and_pending() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let projects = vec![
            project(200_000.0, 4.0, None, "Completed", "done"),
            project(100_000.0, 2.0, None, "Project Signed", "quote"),
        ];
        let summary = summarize(&projects, now, 6);
        assert_eq!(summary.total_commission, 15_000.0);
        assert_eq!(summary.completed_commission, 10_000.0);
        assert_eq!(summary.pending_commission, 5_000.0);
        assert_eq!(summary.highest_commission, 10_000.0);
        assert_eq!(summary.average_commission, 7_500.0);
        assert_eq!(summary.trend.len(), 6);
        // Both projects sit in May of the six-month window.
        assert_eq!(summary.trend[4].label, "May");
        assert_eq!(summary.trend[4].value, 15_000.0);
    }

    #[test]
    fn empty_summary_is_all_zero() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let summary = summarize(&[], now, 3);
        assert_eq!(summary.total_commission, 0.0);
        assert_eq!(summary.average_commission, 0.0);
        assert_eq!(summary.trend.len(), 3);
    }
}
