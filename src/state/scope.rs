// scope.rs
// Ownership-edge index: who a requester is allowed to see. Managers expand
// to themselves plus the dealers they created, exactly one level deep.

use mongodb::bson::{Document, doc, oid::ObjectId};

use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole};

use super::{AppState, find_all, find_one_user};

/// Resolved visibility for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeSet {
    /// Admin: no owner restriction.
    All,
    /// Everyone else: an explicit member list.
    Members(Vec<ObjectId>),
}

impl ScopeSet {
    /// Owner clause against `field`, or an empty document for admins.
    pub fn filter(&self, field: &str) -> Document {
        let mut filter = doc! {};
        match self {
            ScopeSet::All => {}
            ScopeSet::Members(ids) if ids.len() == 1 => {
                filter.insert(field, ids[0]);
            }
            ScopeSet::Members(ids) => {
                filter.insert(field, doc! { "$in": ids.clone() });
            }
        }
        filter
    }

    pub fn members(&self) -> &[ObjectId] {
        match self {
            ScopeSet::All => &[],
            ScopeSet::Members(ids) => ids,
        }
    }
}

/// Owner set plus the managed dealer documents behind it. The ownership
/// edge is walked once here; assemblers that need the dealer docs (tables,
/// map markers) reuse them instead of re-querying.
#[derive(Debug, Clone)]
pub struct OwnerScope {
    pub set: ScopeSet,
    /// Empty for non-manager requesters.
    pub dealers: Vec<User>,
}

/// Expand "mine" for the requester. Managers see self plus directly-created
/// dealers; the expansion is deliberately not recursive.
pub async fn resolve_scope(state: &AppState, id: ObjectId, role: UserRole) -> AppResult<OwnerScope> {
    if role.is_admin() {
        return Ok(OwnerScope {
            set: ScopeSet::All,
            dealers: Vec::new(),
        });
    }
    if !role.is_manager() {
        return Ok(OwnerScope {
            set: ScopeSet::Members(vec![id]),
            dealers: Vec::new(),
        });
    }

    // The manager itself must exist before its edge set means anything.
    find_one_user(state, id)
        .await?
        .ok_or_else(|| AppError::NotFound("manager".to_string()))?;

    let dealers: Vec<User> = find_all(
        &state.users,
        doc! { "created_by": id, "role": UserRole::Dealer.as_str() },
    )
    .await?;

    let mut members = vec![id];
    members.extend(dealers.iter().filter_map(|d| d.id));
    Ok(OwnerScope {
        set: ScopeSet::Members(members),
        dealers,
    })
}

/// Name lookup for a set of user ids, one query.
pub async fn user_names(
    state: &AppState,
    ids: &[ObjectId],
) -> anyhow::Result<std::collections::HashMap<ObjectId, String>> {
    if ids.is_empty() {
        return Ok(std::collections::HashMap::new());
    }
    let users: Vec<User> = find_all(&state.users, doc! { "_id": { "$in": ids.to_vec() } }).await?;
    Ok(users
        .into_iter()
        .filter_map(|u| u.id.map(|id| (id, u.name)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_member_scopes_to_equality() {
        let id = ObjectId::new();
        let filter = ScopeSet::Members(vec![id]).filter("dealer");
        assert_eq!(filter, doc! { "dealer": id });
    }

    #[test]
    fn multi_member_scopes_to_in() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let filter = ScopeSet::Members(vec![a, b]).filter("dealer");
        assert_eq!(filter, doc! { "dealer": { "$in": [a, b] } });
    }

    #[test]
    fn admin_scope_is_unrestricted() {
        assert_eq!(ScopeSet::All.filter("dealer"), doc! {});
    }
}
