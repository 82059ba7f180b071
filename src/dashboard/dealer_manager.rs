// dealer_manager.rs
// Regional/dealer-manager dashboard across the managed-dealer set: funnel,
// conversion, per-dealer commission table, brand histogram and map markers.

use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::commission;
use crate::error::AppResult;
use crate::filters::{DashboardQuery, Scope};
use crate::metrics::{count_by, ratio2, top_n};
use crate::models::{LeadStatus, UserRole};
use crate::principal::Principal;
use crate::state::{self, AppState, location_names};

const COMMISSION_TABLE_ROWS: usize = 7;

#[derive(Debug, Clone, Serialize)]
pub struct DealerCommissionRow {
    pub dealer: String,
    pub name: String,
    pub orders: i64,
    pub total_commission: f64,
    pub pending_commission: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BrandKwBucket {
    pub brand: String,
    pub kw: f64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistrictMarker {
    pub district: String,
    pub name: String,
    pub dealers: i64,
}

#[derive(Debug, Serialize)]
pub struct ManagerDashboard {
    pub dealers: usize,
    pub leads: usize,
    pub projects: usize,
    pub tasks: u64,
    /// ProjectSigned leads over all leads, two decimals.
    pub conversion_rate: f64,
    pub lead_funnel: Vec<super::NamedCount>,
    pub commission_table: Vec<DealerCommissionRow>,
    pub brand_distribution: Vec<BrandKwBucket>,
    pub district_markers: Vec<DistrictMarker>,
}

pub async fn assemble(
    state: &AppState,
    principal: &Principal,
    query: &DashboardQuery,
) -> AppResult<ManagerDashboard> {
    let scope = Scope::build(state, principal, query).await?;
    // Managed dealer docs ride along on the scope; no second edge query.
    let dealers = &scope.dealers;

    let (leads, projects, orders, tasks) = tokio::try_join!(
        state::find_all(&state.leads, scope.leads_filter()),
        state::find_all(&state.projects, scope.projects_filter()),
        state::find_all(&state.orders, scope.orders_filter()),
        state::count(&state.tasks, scope.tasks_filter()),
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

    // Per-dealer commission and order volume from the already-fetched sets;
    // the table ranks by order count and keeps the top rows.
    let orders_per_dealer = count_by(&orders, |o| o.dealer);
    let mut commission_per_dealer: HashMap<ObjectId, (f64, f64)> = HashMap::new();
    for project in &projects {
        let v = commission::view(project);
        let entry = commission_per_dealer.entry(project.dealer).or_insert((0.0, 0.0));
        entry.0 += v.commission;
        if v.status == "Pending" {
            entry.1 += v.commission;
        }
    }

    let name_of: HashMap<ObjectId, &str> = dealers
        .iter()
        .filter_map(|d| d.id.map(|id| (id, d.name.as_str())))
        .collect();

    let mut rows: Vec<DealerCommissionRow> = Vec::new();
    for dealer in dealers {
        let Some(id) = dealer.id else { continue };
        let (total, pending) = commission_per_dealer.get(&id).copied().unwrap_or((0.0, 0.0));
        rows.push(DealerCommissionRow {
            dealer: id.to_hex(),
            name: name_of.get(&id).unwrap_or(&"").to_string(),
            orders: orders_per_dealer.get(&id).copied().unwrap_or(0),
            total_commission: total,
            pending_commission: pending,
        });
    }
    let commission_table = top_n(rows, COMMISSION_TABLE_ROWS, |r| r.orders as f64);

    let brand_distribution = brand_histogram(&orders);

    let district_markers = markers(state, dealers).await?;

    Ok(ManagerDashboard {
        dealers: dealers.len(),
        leads: leads.len(),
        projects: projects.len(),
        tasks,
        conversion_rate,
        lead_funnel,
        commission_table,
        brand_distribution,
        district_markers,
    })
}

fn brand_histogram(orders: &[crate::models::Order]) -> Vec<BrandKwBucket> {
    let counts = count_by(orders, |o| {
        (
            o.brand.clone().unwrap_or_else(|| "unknown".to_string()),
            // f64 is not hashable; kW ratings come in tenth-of-a-kW steps.
            (o.kw.unwrap_or(0.0) * 10.0).round() as i64,
        )
    });
    let mut buckets: Vec<BrandKwBucket> = counts
        .into_iter()
        .map(|((brand, kw10), count)| BrandKwBucket {
            brand,
            kw: kw10 as f64 / 10.0,
            count,
        })
        .collect();
    buckets.sort_by(|a, b| a.brand.cmp(&b.brand).then(a.kw.total_cmp(&b.kw)));
    buckets
}

async fn markers(
    state: &AppState,
    dealers: &[crate::models::User],
) -> AppResult<Vec<DistrictMarker>> {
    let per_district = count_by(dealers, |d| d.district);
    let ids: Vec<ObjectId> = per_district.keys().filter_map(|d| *d).collect();
    let names = location_names(state, &ids).await?;

    let mut out: Vec<DistrictMarker> = per_district
        .into_iter()
        .filter_map(|(district, count)| {
            district.map(|id| DistrictMarker {
                district: id.to_hex(),
                name: names.get(&id).cloned().unwrap_or_default(),
                dealers: count,
            })
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// Roles allowed to request this dashboard; admins pass regardless.
pub const MANAGER_ROLES: [UserRole; 2] = [UserRole::DealerManager, UserRole::Franchisee];
