// partner.rs
// Work-queue dashboards for the delivery and installation partners:
// pending/urgent/overdue buckets over the scheduled dates, plus the
// per-audience extras (cost efficiency, category mix, completion rate).

use chrono::Utc;
use mongodb::bson::{Document, doc};
use serde::Serialize;

use crate::error::AppResult;
use crate::filters::{DashboardQuery, Scope, merge};
use crate::metrics::{
    ScheduleBuckets, TrendBucket, TrendFrame, average, count_by, per_unit, ratio,
    schedule_buckets,
};
use crate::models::{DeliveryStatus, InstallationStatus};
use crate::principal::Principal;
use crate::state::{self, AppState};

const TREND_MONTHS: usize = 6;

#[derive(Debug, Serialize)]
pub struct DeliveryDashboard {
    pub total: usize,
    pub schedule: ScheduleBuckets,
    pub in_transit: i64,
    pub delivered: i64,
    /// Cost per km across delivered runs, two decimals, zero when no
    /// distance was recorded.
    pub cost_per_km: f64,
    /// Mean cost of a delivered run, rounded to whole currency units.
    pub average_cost: i64,
    pub delivered_trend: Vec<TrendBucket>,
}

#[derive(Debug, Serialize)]
pub struct InstallerDashboard {
    pub total: usize,
    pub schedule: ScheduleBuckets,
    pub in_progress: i64,
    pub completed: i64,
    /// Completed over total, integer percentage.
    pub completion_rate: i64,
    pub categories: Vec<super::NamedCount>,
}

/// Non-admin partners only see their own assignments.
fn partner_filter(scope: &Scope, principal: &Principal) -> Document {
    let base = scope.schedule_filter();
    if principal.role.is_admin() {
        base
    } else {
        merge(base, doc! { "partner": principal.id })
    }
}

pub async fn assemble_delivery(
    state: &AppState,
    principal: &Principal,
    query: &DashboardQuery,
) -> AppResult<DeliveryDashboard> {
    let scope = Scope::build(state, principal, query).await?;
    let now = Utc::now();

    let deliveries = state::find_all(&state.deliveries, partner_filter(&scope, principal)).await?;

    let schedule = schedule_buckets(
        &deliveries,
        |d| d.status == DeliveryStatus::Pending,
        |d| d.scheduled_date.to_chrono(),
        now,
    );

    let status_counts = count_by(&deliveries, |d| d.status);
    let in_transit = status_counts
        .get(&DeliveryStatus::InTransit)
        .copied()
        .unwrap_or(0);
    let delivered = status_counts
        .get(&DeliveryStatus::Delivered)
        .copied()
        .unwrap_or(0);

    let mut cost = 0.0;
    let mut distance = 0.0;
    let mut frame = TrendFrame::months(now, TREND_MONTHS);
    for delivery in &deliveries {
        if delivery.status != DeliveryStatus::Delivered {
            continue;
        }
        cost += delivery.cost;
        distance += delivery.distance_km;
        if let Some(at) = delivery.delivered_at {
            frame.add(&TrendFrame::month_key(at.to_chrono()), 1.0);
        }
    }

    Ok(DeliveryDashboard {
        total: deliveries.len(),
        schedule,
        in_transit,
        delivered,
        cost_per_km: per_unit(cost, distance),
        average_cost: average(cost, delivered),
        delivered_trend: frame.into_buckets(),
    })
}

pub async fn assemble_installer(
    state: &AppState,
    principal: &Principal,
    query: &DashboardQuery,
) -> AppResult<InstallerDashboard> {
    let scope = Scope::build(state, principal, query).await?;
    let now = Utc::now();

    let installations =
        state::find_all(&state.installations, partner_filter(&scope, principal)).await?;

    let schedule = schedule_buckets(
        &installations,
        |i| i.status == InstallationStatus::Pending,
        |i| i.scheduled_date.to_chrono(),
        now,
    );

    let status_counts = count_by(&installations, |i| i.status);
    let in_progress = status_counts
        .get(&InstallationStatus::InProgress)
        .copied()
        .unwrap_or(0);
    let completed = status_counts
        .get(&InstallationStatus::Completed)
        .copied()
        .unwrap_or(0);

    let category_counts = count_by(&installations, |i| i.category.clone());
    let mut categories: Vec<super::NamedCount> = category_counts
        .into_iter()
        .map(|(label, count)| super::NamedCount::new(label, count))
        .collect();
    categories.sort_by(|a, b| a.label.cmp(&b.label));

    Ok(InstallerDashboard {
        total: installations.len(),
        schedule,
        in_progress,
        completed,
        completion_rate: ratio(completed, installations.len() as i64),
        categories,
    })
}
