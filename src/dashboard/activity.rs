// activity.rs
// Activity report over the precomputed per-user statistics counters, with a
// task-completion trend whose granularity follows the `period` parameter.

use chrono::{Datelike, Utc};
use mongodb::bson::doc;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::filters::{DashboardQuery, Scope, merge};
use crate::metrics::{TrendBucket, TrendFrame, ratio2};
use crate::models::TaskStatus;
use crate::principal::Principal;
use crate::state::{self, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    /// Unknown periods are rejected, not silently defaulted: the parameter
    /// changes the whole shape of the series.
    pub fn parse(value: Option<&str>) -> AppResult<Self> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("daily") => Ok(Period::Daily),
            Some("weekly") => Ok(Period::Weekly),
            Some("monthly") => Ok(Period::Monthly),
            Some(other) => Err(AppError::InvalidInput(format!(
                "invalid period: {other} (expected daily, weekly or monthly)"
            ))),
        }
    }

    /// daily = the last 7 days, weekly = the last 28 days, monthly = the
    /// last 12 calendar months.
    fn frame(&self, now: chrono::DateTime<Utc>) -> TrendFrame {
        match self {
            Period::Daily => TrendFrame::days(now, 7),
            Period::Weekly => TrendFrame::days(now, 28),
            Period::Monthly => TrendFrame::months(now, 12),
        }
    }

    fn key(&self, at: chrono::DateTime<Utc>) -> String {
        match self {
            Period::Daily | Period::Weekly => TrendFrame::day_key(at),
            Period::Monthly => TrendFrame::month_key(at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityReport {
    pub assigned: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub overdue: i64,
    pub average_rating: f64,
    pub completion_rate: f64,
    pub completed_trend: Vec<TrendBucket>,
}

pub async fn assemble(
    state: &AppState,
    principal: &Principal,
    query: &DashboardQuery,
) -> AppResult<ActivityReport> {
    let period = Period::parse(query.period.as_deref())?;
    let scope = Scope::build(state, principal, query).await?;
    let now = Utc::now();

    // Counters for the current month come from the precomputed statistics,
    // not from re-walking raw events.
    let mut stats_filter = merge(
        scope.owner_filter("user"),
        doc! { "month": now.month() as i32, "year": now.year() },
    );
    if let Some(district) = scope.location.district {
        stats_filter.insert("district", district);
    }

    let completed_tasks = merge(
        scope.owner_filter("assignee"),
        doc! { "status": "Completed" },
    );

    let (stats, tasks) = tokio::try_join!(
        state::find_all(&state.statistics, stats_filter),
        state::find_all(&state.tasks, completed_tasks),
    )?;

    let mut assigned = 0;
    let mut in_progress = 0;
    let mut completed = 0;
    let mut overdue = 0;
    let mut rating_sum = 0.0;
    for row in &stats {
        assigned += row.assigned;
        in_progress += row.in_progress;
        completed += row.completed;
        overdue += row.overdue;
        rating_sum += row.rating;
    }
    let average_rating = if stats.is_empty() {
        0.0
    } else {
        (rating_sum / stats.len() as f64 * 100.0).round() / 100.0
    };

    let mut frame = period.frame(now);
    for task in &tasks {
        if task.status == TaskStatus::Completed {
            frame.add(&period.key(task.deadline.to_chrono()), 1.0);
        }
    }

    Ok(ActivityReport {
        assigned,
        in_progress,
        completed,
        overdue,
        average_rating,
        completion_rate: ratio2(completed as f64, assigned as f64),
        completed_trend: frame.into_buckets(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parsing_accepts_the_three_names() {
        assert_eq!(Period::parse(Some("daily")).unwrap(), Period::Daily);
        assert_eq!(Period::parse(Some("weekly")).unwrap(), Period::Weekly);
        assert_eq!(Period::parse(Some("Monthly")).unwrap(), Period::Monthly);
        assert_eq!(Period::parse(None).unwrap(), Period::Daily);
        assert!(Period::parse(Some("hourly")).is_err());
    }
}
