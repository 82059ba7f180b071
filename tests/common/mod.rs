use std::{
    env,
    sync::{Mutex, MutexGuard, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use mongodb::Client;
use mongodb::bson::{DateTime, oid::ObjectId};

use solarops::models::{
    Delivery, DeliveryStatus, EmbeddedLocation, InventoryItem, Lead, LeadStatus, Location,
    LocationKind, Order, OrderItem, OrderStatus, Project, Statistics, User, UserRole,
};
use solarops::state::{AppState, init_state};

/// Global lock so integration tests that seed the DB run one-at-a-time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestContext {
    pub state: AppState,
    pub db_name: String,
    _guard: MutexGuard<'static, ()>,
}

pub async fn setup_state() -> Option<TestContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("failed to lock test db mutex");

    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!(
        "solaropstest_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    );
    unsafe {
        env::set_var("MONGODB_DB", &db_name);
    }

    let client = match Client::with_uri_str(&uri).await {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; cannot connect to MongoDB: {err:?}");
            drop(guard);
            return None;
        }
    };
    if let Err(err) = client.database(&db_name).drop().await {
        eprintln!("Skipping test; cannot drop test DB: {err:?}");
        drop(guard);
        return None;
    }

    match init_state().await {
        Ok(state) => Some(TestContext {
            state,
            db_name,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; init_state failed: {err:?}");
            drop(guard);
            None
        }
    }
}

pub async fn teardown(ctx: Option<TestContext>) {
    if let Some(ctx) = ctx {
        if let Ok(uri) = env::var("MONGODB_URI") {
            if let Ok(client) = Client::with_uri_str(&uri).await {
                let _ = client.database(&ctx.db_name).drop().await;
            }
        }
        drop(ctx);
    }
}

pub fn now() -> DateTime {
    DateTime::from_system_time(SystemTime::now())
}

pub async fn seed_user(
    state: &AppState,
    name: &str,
    role: UserRole,
    created_by: Option<ObjectId>,
    district: Option<ObjectId>,
) -> ObjectId {
    let res = state
        .users
        .insert_one(User {
            id: None,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: None,
            role,
            state: None,
            cluster: None,
            district,
            created_by,
            status: "active".to_string(),
            created_at: now(),
        })
        .await
        .expect("user insert failed");
    res.inserted_id.as_object_id().unwrap()
}

pub async fn seed_location(
    state: &AppState,
    name: &str,
    kind: LocationKind,
    parent: Option<ObjectId>,
) -> ObjectId {
    let res = state
        .locations
        .insert_one(Location {
            id: None,
            name: name.to_string(),
            kind,
            parent,
        })
        .await
        .expect("location insert failed");
    res.inserted_id.as_object_id().unwrap()
}

pub async fn seed_lead(state: &AppState, dealer: ObjectId, status: LeadStatus) -> ObjectId {
    let res = state
        .leads
        .insert_one(Lead {
            id: None,
            name: "Prospect".to_string(),
            phone: None,
            email: None,
            status,
            dealer,
            state: None,
            cluster: None,
            district: None,
            channel: Some("referral".to_string()),
            history: Vec::new(),
            deleted: false,
            created_at: now(),
        })
        .await
        .expect("lead insert failed");
    res.inserted_id.as_object_id().unwrap()
}

pub async fn seed_order(
    state: &AppState,
    dealer: ObjectId,
    amount: f64,
    status: OrderStatus,
) -> ObjectId {
    let res = state
        .orders
        .insert_one(Order {
            id: None,
            order_no: format!("SO-{}", ObjectId::new().to_hex()),
            dealer,
            amount,
            status,
            items: Vec::new(),
            brand: Some("Helio".to_string()),
            kw: Some(3.0),
            state: None,
            cluster: None,
            district: None,
            created_at: now(),
        })
        .await
        .expect("order insert failed");
    res.inserted_id.as_object_id().unwrap()
}

pub async fn seed_order_with_items(
    state: &AppState,
    dealer: ObjectId,
    status: OrderStatus,
    items: Vec<(ObjectId, i64)>,
) -> ObjectId {
    let res = state
        .orders
        .insert_one(Order {
            id: None,
            order_no: format!("SO-{}", ObjectId::new().to_hex()),
            dealer,
            amount: 0.0,
            status,
            items: items
                .into_iter()
                .map(|(item, quantity)| OrderItem { item, quantity })
                .collect(),
            brand: None,
            kw: None,
            state: None,
            cluster: None,
            district: None,
            created_at: now(),
        })
        .await
        .expect("order insert failed");
    res.inserted_id.as_object_id().unwrap()
}

pub async fn seed_inventory_item(
    state: &AppState,
    name: &str,
    quantity: i64,
    unit_price: f64,
    low: i64,
    critical: i64,
) -> ObjectId {
    let res = state
        .inventory
        .insert_one(InventoryItem {
            id: None,
            name: name.to_string(),
            category: "panels".to_string(),
            quantity,
            unit_price,
            low_stock_threshold: low,
            critical_threshold: critical,
        })
        .await
        .expect("inventory insert failed");
    res.inserted_id.as_object_id().unwrap()
}

pub async fn seed_delivery(
    state: &AppState,
    partner: Option<ObjectId>,
    status: DeliveryStatus,
    scheduled_date: DateTime,
    cost: f64,
    distance_km: f64,
) -> ObjectId {
    let res = state
        .deliveries
        .insert_one(Delivery {
            id: None,
            order: ObjectId::new(),
            partner,
            status,
            scheduled_date,
            delivered_at: if status == DeliveryStatus::Delivered {
                Some(now())
            } else {
                None
            },
            cost,
            distance_km,
            state: None,
            district: None,
            created_at: now(),
        })
        .await
        .expect("delivery insert failed");
    res.inserted_id.as_object_id().unwrap()
}

pub async fn seed_statistics(
    state: &AppState,
    user: ObjectId,
    month: u32,
    year: i32,
    assigned: i64,
    completed: i64,
    rating: f64,
) -> ObjectId {
    let res = state
        .statistics
        .insert_one(Statistics {
            id: None,
            user,
            month,
            year,
            district: None,
            assigned,
            in_progress: 0,
            completed,
            overdue: 0,
            rating,
            completion_rate: 0.0,
        })
        .await
        .expect("statistics insert failed");
    res.inserted_id.as_object_id().unwrap()
}

pub async fn seed_project(
    state: &AppState,
    dealer: ObjectId,
    total_amount: f64,
    total_kw: f64,
    commission: Option<f64>,
    status: &str,
    stage: &str,
) -> ObjectId {
    let res = state
        .projects
        .insert_one(Project {
            id: None,
            category: "residential".to_string(),
            total_kw,
            total_amount,
            commission,
            commission_status: solarops::models::CommissionStatus::Pending,
            status: status.to_string(),
            status_stage: stage.to_string(),
            dealer,
            location: EmbeddedLocation::default(),
            deleted: false,
            created_at: now(),
        })
        .await
        .expect("project insert failed");
    res.inserted_id.as_object_id().unwrap()
}
