// inventory.rs
// Stock dashboard: item valuation, threshold classification, and the
// allocation picture against open (non-terminal) orders.

use std::collections::HashMap;

use mongodb::bson::{doc, oid::ObjectId};
use serde::Serialize;

use crate::error::AppResult;
use crate::filters::DashboardQuery;
use crate::metrics::{StockLevel, available, stock_level, sum_by};
use crate::principal::Principal;
use crate::state::{self, AppState};

#[derive(Debug, Clone, Serialize)]
pub struct InventoryRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub value: f64,
    pub level: StockLevel,
    pub allocated: i64,
    /// `max(0, quantity − allocated)`; over-allocation clamps to zero
    /// instead of going negative.
    pub available: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryValue {
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct InventoryDashboard {
    pub items: Vec<InventoryRow>,
    pub total_value: f64,
    pub category_value: Vec<CategoryValue>,
    pub low_stock: i64,
    pub critical: i64,
    pub allocated_units: i64,
}

pub async fn assemble(
    state: &AppState,
    _principal: &Principal,
    query: &DashboardQuery,
) -> AppResult<InventoryDashboard> {
    let mut item_filter = doc! {};
    if let Some(category) = query.category.as_deref().map(str::trim) {
        if !category.is_empty() {
            item_filter.insert("category", category);
        }
    }

    // Allocations come from every order that still holds stock, regardless
    // of the category filter on the item list.
    let open_orders = doc! { "status": { "$in": ["Placed", "Confirmed", "Dispatched"] } };

    let (items, orders) = tokio::try_join!(
        state::find_all(&state.inventory, item_filter),
        state::find_all(&state.orders, open_orders),
    )?;

    let mut allocated: HashMap<ObjectId, i64> = HashMap::new();
    for order in &orders {
        for line in &order.items {
            *allocated.entry(line.item).or_insert(0) += line.quantity;
        }
    }

    let mut rows = Vec::with_capacity(items.len());
    let mut total_value = 0.0;
    let mut low_stock = 0;
    let mut critical = 0;

    for item in &items {
        let value = item.quantity as f64 * item.unit_price;
        total_value += value;

        let level = stock_level(item.quantity, item.low_stock_threshold, item.critical_threshold);
        match level {
            StockLevel::Low => low_stock += 1,
            StockLevel::Critical => critical += 1,
            StockLevel::Ok => {}
        }

        let item_allocated = item
            .id
            .and_then(|id| allocated.get(&id).copied())
            .unwrap_or(0);

        rows.push(InventoryRow {
            id: item.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: item.name.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
            value,
            level,
            allocated: item_allocated,
            available: available(item.quantity, item_allocated),
        });
    }

    let mut category_value: Vec<CategoryValue> = sum_by(
        &items,
        |i| i.category.clone(),
        |i| i.quantity as f64 * i.unit_price,
    )
    .into_iter()
    .map(|(category, value)| CategoryValue { category, value })
    .collect();
    category_value.sort_by(|a, b| a.category.cmp(&b.category));

    Ok(InventoryDashboard {
        allocated_units: rows.iter().map(|r| r.allocated).sum(),
        items: rows,
        total_value,
        category_value,
        low_stock,
        critical,
    })
}
