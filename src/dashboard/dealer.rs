// dealer.rs
// A dealer's own view: lead funnel and trend, order counts across every
// status, commission summary, open work.

use chrono::Utc;
use mongodb::bson::doc;
use serde::Serialize;

use crate::commission::{self, CommissionSummary};
use crate::error::AppResult;
use crate::filters::{DashboardQuery, Scope, merge};
use crate::metrics::{TrendBucket, TrendFrame, count_by, ratio2};
use crate::models::{LeadStatus, TaskStatus};
use crate::principal::Principal;
use crate::state::{self, AppState};

const LEAD_TREND_DAYS: usize = 14;
const COMMISSION_MONTHS: usize = 6;

#[derive(Debug, Serialize)]
pub struct DealerDashboard {
    pub leads: usize,
    /// Every order counts here regardless of status; the admin revenue
    /// aggregate stays delivered-only.
    pub orders: usize,
    pub projects: usize,
    pub conversion_rate: f64,
    pub lead_funnel: Vec<super::NamedCount>,
    pub lead_trend: Vec<TrendBucket>,
    pub order_status: Vec<super::NamedCount>,
    pub commission: CommissionSummary,
    pub open_tasks: i64,
    pub overdue_tasks: i64,
    pub open_tickets: u64,
}

pub async fn assemble(
    state: &AppState,
    principal: &Principal,
    query: &DashboardQuery,
) -> AppResult<DealerDashboard> {
    let scope = Scope::build(state, principal, query).await?;
    let now = Utc::now();

    let (leads, orders, projects, tasks, open_tickets) = tokio::try_join!(
        state::find_all(&state.leads, scope.leads_filter()),
        state::find_all(&state.orders, scope.orders_filter()),
        state::find_all(&state.projects, scope.projects_filter()),
        state::find_all(&state.tasks, scope.tasks_filter()),
        state::count(
            &state.tickets,
            merge(
                scope.owner_filter("requester"),
                doc! { "status": { "$in": ["Open", "InProgress"] } },
            ),
        ),
    )?;

    let signed = leads
        .iter()
        .filter(|l| l.status >= LeadStatus::ProjectSigned)
        .count();
    let conversion_rate = ratio2(signed as f64, leads.len() as f64);

    let funnel_counts = count_by(&leads, |l| l.status);
    let lead_funnel = LeadStatus::ALL
        .iter()
        .map(|status| {
            super::NamedCount::new(
                status.as_str(),
                funnel_counts.get(status).copied().unwrap_or(0),
            )
        })
        .collect();

    let mut frame = TrendFrame::days(now, LEAD_TREND_DAYS);
    for lead in &leads {
        frame.add(&TrendFrame::day_key(lead.created_at.to_chrono()), 1.0);
    }

    let status_counts = count_by(&orders, |o| o.status.as_str());
    let order_status = ["Placed", "Confirmed", "Dispatched", "Delivered", "Cancelled"]
        .iter()
        .map(|s| super::NamedCount::new(*s, status_counts.get(s).copied().unwrap_or(0)))
        .collect();

    let commission = commission::summarize(&projects, now, COMMISSION_MONTHS);

    let mut open_tasks = 0;
    let mut overdue_tasks = 0;
    let now_bson = mongodb::bson::DateTime::from_chrono(now);
    for task in &tasks {
        if task.status != TaskStatus::Completed {
            open_tasks += 1;
            if task.deadline < now_bson {
                overdue_tasks += 1;
            }
        }
    }

    Ok(DealerDashboard {
        leads: leads.len(),
        orders: orders.len(),
        projects: projects.len(),
        conversion_rate,
        lead_funnel,
        lead_trend: frame.into_buckets(),
        order_status,
        commission,
        open_tasks,
        overdue_tasks,
        open_tickets,
    })
}
