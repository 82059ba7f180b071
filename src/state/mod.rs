// state module: AppState, initialization, and re-exports of submodules.

use anyhow::Result;
use mongodb::{Client, Collection};
use std::env;

use crate::models::{
    Delivery, Installation, InventoryItem, Lead, Location, Order, Project, Statistics, Task,
    Ticket, User,
};

mod locations;
mod scope;
mod store;

pub use locations::*;
pub use scope::*;
pub use store::*;

#[derive(Clone)]
pub struct AppState {
    pub users: Collection<User>,
    pub locations: Collection<Location>,
    pub leads: Collection<Lead>,
    pub projects: Collection<Project>,
    pub orders: Collection<Order>,
    pub deliveries: Collection<Delivery>,
    pub installations: Collection<Installation>,
    pub tickets: Collection<Ticket>,
    pub tasks: Collection<Task>,
    pub inventory: Collection<InventoryItem>,
    pub statistics: Collection<Statistics>,
}

pub async fn init_state() -> Result<AppState> {
    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = env::var("MONGODB_DB").unwrap_or_else(|_| "solarops".to_string());

    let client = Client::with_uri_str(uri).await?;
    let db = client.database(&db_name);

    Ok(AppState {
        users: db.collection::<User>("users"),
        locations: db.collection::<Location>("locations"),
        leads: db.collection::<Lead>("leads"),
        projects: db.collection::<Project>("projects"),
        orders: db.collection::<Order>("orders"),
        deliveries: db.collection::<Delivery>("deliveries"),
        installations: db.collection::<Installation>("installations"),
        tickets: db.collection::<Ticket>("tickets"),
        tasks: db.collection::<Task>("tasks"),
        inventory: db.collection::<InventoryItem>("inventory"),
        statistics: db.collection::<Statistics>("statistics"),
    })
}
