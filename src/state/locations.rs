// locations.rs
// Geographic hierarchy resolver: id validation, descendant expansion and
// human-readable labels for map/chart outputs.

use std::collections::HashMap;

use anyhow::Result;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};

use crate::models::{Location, User};

use super::AppState;

pub async fn find_location(state: &AppState, id: ObjectId) -> Result<Option<Location>> {
    state
        .locations
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn find_one_user(state: &AppState, id: ObjectId) -> Result<Option<User>> {
    state
        .users
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

/// Whether a geographic id resolves at all. The filter builder drops clauses
/// for ids that do not.
pub async fn location_exists(state: &AppState, id: ObjectId) -> Result<bool> {
    Ok(find_location(state, id).await?.is_some())
}

/// Direct children of a location, one level down the hierarchy.
pub async fn child_locations(state: &AppState, parent: ObjectId) -> Result<Vec<Location>> {
    let mut cursor = state.locations.find(doc! { "parent": parent }).await?;
    let mut items = Vec::new();
    while let Some(loc) = cursor.try_next().await? {
        items.push(loc);
    }
    Ok(items)
}

/// All descendant ids of a location, the location itself included. Used to
/// translate a cluster filter for entities that only carry districts.
pub async fn descendant_ids(state: &AppState, root: ObjectId) -> Result<Vec<ObjectId>> {
    let mut out = vec![root];
    let mut frontier = vec![root];
    // Hierarchy is three levels deep at most; two hops cover it.
    for _ in 0..2 {
        let mut next = Vec::new();
        for parent in frontier {
            for child in child_locations(state, parent).await? {
                if let Some(id) = child.id {
                    out.push(id);
                    next.push(id);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    Ok(out)
}

/// Name lookup for a set of location ids, one query.
pub async fn location_names(
    state: &AppState,
    ids: &[ObjectId],
) -> Result<HashMap<ObjectId, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut cursor = state
        .locations
        .find(doc! { "_id": { "$in": ids.to_vec() } })
        .await?;
    let mut names = HashMap::new();
    while let Some(loc) = cursor.try_next().await? {
        if let Some(id) = loc.id {
            names.insert(id, loc.name);
        }
    }
    Ok(names)
}
