// admin.rs
// Platform-admin dashboard: global counts, delivered revenue, recent orders
// and the dealer leaderboard.

use chrono::Utc;
use mongodb::bson::{Bson, doc, oid::ObjectId};
use serde::Serialize;

use crate::error::AppResult;
use crate::filters::{DashboardQuery, Scope, merge};
use crate::metrics::{TrendBucket, TrendFrame, top_n};
use crate::models::{Order, OrderStatus};
use crate::principal::Principal;
use crate::state::{self, AppState, user_names};

const RECENT_ORDERS: i64 = 10;
const TOP_DEALERS: usize = 5;
const TREND_MONTHS: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: String,
    pub order_no: String,
    pub dealer: String,
    pub amount: f64,
    pub status: &'static str,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DealerRevenue {
    pub dealer: String,
    pub name: String,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub users: u64,
    pub orders: u64,
    pub deliveries: u64,
    pub installations: u64,
    pub open_tickets: u64,
    /// Delivered-order revenue only; the dealer dashboard counts every
    /// order status on purpose.
    pub revenue: f64,
    pub recent_orders: Vec<OrderSummary>,
    pub top_dealers: Vec<DealerRevenue>,
    pub order_status: Vec<super::NamedCount>,
    pub revenue_trend: Vec<TrendBucket>,
}

pub async fn assemble(
    state: &AppState,
    principal: &Principal,
    query: &DashboardQuery,
) -> AppResult<AdminDashboard> {
    let scope = Scope::build(state, principal, query).await?;
    let now = Utc::now();

    let delivered = merge(
        scope.orders_filter(),
        doc! { "status": OrderStatus::Delivered.as_str() },
    );

    let (
        users,
        orders,
        deliveries,
        installations,
        open_tickets,
        revenue,
        recent,
        dealer_rows,
        status_rows,
        month_rows,
    ) = tokio::try_join!(
        state::count(&state.users, scope.location_filter()),
        state::count(&state.orders, scope.orders_filter()),
        state::count(&state.deliveries, scope.schedule_filter()),
        state::count(&state.installations, scope.schedule_filter()),
        state::count(
            &state.tickets,
            doc! { "status": { "$in": ["Open", "InProgress"] } },
        ),
        state::sum_field(&state.orders, delivered.clone(), "amount"),
        state::find_sorted(
            &state.orders,
            scope.orders_filter(),
            doc! { "created_at": -1 },
            RECENT_ORDERS,
        ),
        state::sum_by_key(&state.orders, delivered.clone(), "dealer", "amount"),
        state::count_by_key(&state.orders, scope.orders_filter(), "status"),
        state::sum_by_month(&state.orders, delivered, "created_at", "amount"),
    )?;

    let top_dealers = rank_dealers(state, dealer_rows).await?;

    let order_status = status_rows
        .into_iter()
        .filter_map(|(key, count)| match key {
            Bson::String(status) => Some(super::NamedCount::new(status, count)),
            _ => None,
        })
        .collect();

    let revenue_trend = TrendFrame::months(now, TREND_MONTHS)
        .add_all(month_rows.iter().map(|(key, total)| (key.as_str(), *total)))
        .into_buckets();

    Ok(AdminDashboard {
        users,
        orders,
        deliveries,
        installations,
        open_tickets,
        revenue,
        recent_orders: recent.iter().map(order_summary).collect(),
        top_dealers,
        order_status,
        revenue_trend,
    })
}

async fn rank_dealers(
    state: &AppState,
    rows: Vec<(Bson, f64)>,
) -> AppResult<Vec<DealerRevenue>> {
    let ranked: Vec<(ObjectId, f64)> = top_n(
        rows.into_iter()
            .filter_map(|(key, total)| match key {
                Bson::ObjectId(id) => Some((id, total)),
                _ => None,
            })
            .collect(),
        TOP_DEALERS,
        |(_, total)| *total,
    );

    let ids: Vec<ObjectId> = ranked.iter().map(|(id, _)| *id).collect();
    let names = user_names(state, &ids).await?;

    Ok(ranked
        .into_iter()
        .map(|(id, revenue)| DealerRevenue {
            dealer: id.to_hex(),
            name: names.get(&id).cloned().unwrap_or_default(),
            revenue,
        })
        .collect())
}

fn order_summary(order: &Order) -> OrderSummary {
    OrderSummary {
        id: order.id.map(|id| id.to_hex()).unwrap_or_default(),
        order_no: order.order_no.clone(),
        dealer: order.dealer.to_hex(),
        amount: order.amount,
        status: order.status.as_str(),
        created_at: order
            .created_at
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| order.created_at.to_string()),
    }
}
