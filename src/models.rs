// models.rs
// Domain documents for the MongoDB collections and their status enums.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// User roles attached to every request by the upstream auth layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Dealer,
    Franchisee,
    DealerManager,
    Installer,
    DeliveryManager,
    Employee,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Dealer => "dealer",
            UserRole::Franchisee => "franchisee",
            UserRole::DealerManager => "dealer_manager",
            UserRole::Installer => "installer",
            UserRole::DeliveryManager => "delivery_manager",
            UserRole::Employee => "employee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(UserRole::Admin),
            "dealer" => Some(UserRole::Dealer),
            "franchisee" => Some(UserRole::Franchisee),
            "dealer_manager" => Some(UserRole::DealerManager),
            "installer" => Some(UserRole::Installer),
            "delivery_manager" => Some(UserRole::DeliveryManager),
            "employee" => Some(UserRole::Employee),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Manager-type roles see themselves plus their directly-created dealers.
    pub fn is_manager(&self) -> bool {
        matches!(self, UserRole::DealerManager | UserRole::Franchisee)
    }
}

/// Geographic hierarchy level: state → cluster → district.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    State,
    Cluster,
    District,
}

/// Location document. `parent` points one level up the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub kind: LocationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<ObjectId>,
    /// Back-reference to the user who created this account; the ownership
    /// edge used for manager scoping, one level only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ObjectId>,
    pub status: String,
    pub created_at: DateTime,
}

/// Lead lifecycle, ordered. Converted is terminal and reachable from
/// several stages; everything else only moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeadStatus {
    New,
    SurveyPending,
    SurveyCompleted,
    QuoteGenerated,
    ProjectStart,
    ProjectSigned,
    Converted,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::SurveyPending => "SurveyPending",
            LeadStatus::SurveyCompleted => "SurveyCompleted",
            LeadStatus::QuoteGenerated => "QuoteGenerated",
            LeadStatus::ProjectStart => "ProjectStart",
            LeadStatus::ProjectSigned => "ProjectSigned",
            LeadStatus::Converted => "Converted",
        }
    }

    pub const ALL: [LeadStatus; 7] = [
        LeadStatus::New,
        LeadStatus::SurveyPending,
        LeadStatus::SurveyCompleted,
        LeadStatus::QuoteGenerated,
        LeadStatus::ProjectStart,
        LeadStatus::ProjectSigned,
        LeadStatus::Converted,
    ];
}

/// One append-only history entry; status changes never overwrite these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: String,
    pub actor: ObjectId,
    pub at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: LeadStatus,
    /// Owning dealer.
    pub dealer: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommissionStatus {
    Pending,
    Paid,
    Completed,
}

/// Location triple embedded as a sub-document, unlike the top-level refs on
/// leads/orders. The filter builder translates to nested paths for this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub category: String,
    pub total_kw: f64,
    pub total_amount: f64,
    /// Absent on legacy projects that predate commission capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<f64>,
    pub commission_status: CommissionStatus,
    /// Free-text progress status plus the machine stage behind it.
    pub status: String,
    pub status_stage: String,
    pub dealer: ObjectId,
    #[serde(default)]
    pub location: EmbeddedLocation,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Dispatched,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Dispatched => "Dispatched",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Terminal orders no longer hold inventory allocations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub item: ObjectId,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub order_no: String,
    pub dealer: ObjectId,
    pub amount: f64,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<ObjectId>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    Pending,
    InTransit,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub order: ObjectId,
    /// Assigned delivery manager.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<ObjectId>,
    pub status: DeliveryStatus,
    pub scheduled_date: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime>,
    pub cost: f64,
    pub distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<ObjectId>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InstallationStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub project: ObjectId,
    /// Assigned installer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<ObjectId>,
    pub status: InstallationStatus,
    pub scheduled_date: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<ObjectId>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub subject: String,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ObjectId>,
    pub requester: ObjectId,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub assignee: ObjectId,
    pub status: TaskStatus,
    pub deadline: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead: Option<ObjectId>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub low_stock_threshold: i64,
    pub critical_threshold: i64,
}

/// Precomputed per-user monthly counters, maintained outside this engine.
/// Read where recomputing from raw events would be too costly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    pub month: u32,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<ObjectId>,
    pub assigned: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub overdue: i64,
    pub rating: f64,
    pub completion_rate: f64,
}
