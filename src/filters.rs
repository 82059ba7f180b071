// filters.rs
// Scope & time-window filter builder. Normalizes the request's geography,
// requester scope and time window once, then hands each entity the clause
// shape it actually stores.

use std::str::FromStr;

use chrono::{Duration, Utc};
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};
use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::principal::Principal;
use crate::models::{LocationKind, User};
use crate::state::{AppState, ScopeSet, descendant_ids, find_location, location_exists, resolve_scope};

/// Query parameters shared by every dashboard endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
}

/// Canonical location triple after best-effort resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationSelector {
    pub state: Option<ObjectId>,
    pub cluster: Option<ObjectId>,
    pub district: Option<ObjectId>,
}

/// Resolved time window: closed start, optional end (named buckets leave the
/// upper bound open).
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime,
    pub end: Option<DateTime>,
}

/// Everything the assemblers need to filter reads, resolved once per request.
#[derive(Debug, Clone)]
pub struct Scope {
    pub location: LocationSelector,
    /// Districts under the requested cluster, for entities that only store
    /// a district ref.
    pub cluster_districts: Vec<ObjectId>,
    pub owners: ScopeSet,
    /// Managed dealer documents resolved alongside the owner set; empty for
    /// non-manager requesters.
    pub dealers: Vec<User>,
    pub window: Option<TimeWindow>,
    pub category: Option<String>,
}

impl Scope {
    pub async fn build(
        state: &AppState,
        principal: &Principal,
        query: &DashboardQuery,
    ) -> AppResult<Scope> {
        let location = LocationSelector {
            state: resolve_geo_id(state, query.state.as_deref(), "state").await?,
            cluster: resolve_geo_id(state, query.cluster.as_deref(), "cluster").await?,
            district: resolve_geo_id(state, query.district.as_deref(), "district").await?,
        };
        let cluster_districts = match location.cluster {
            Some(cluster) => cluster_district_ids(state, cluster).await?,
            None => Vec::new(),
        };
        let owner_scope = resolve_scope(state, principal.id, principal.role).await?;
        let window = parse_window(query)?;
        Ok(Scope {
            location,
            cluster_districts,
            owners: owner_scope.set,
            dealers: owner_scope.dealers,
            window,
            category: query.category.clone(),
        })
    }

    /// Location clauses for entities with top-level `state`/`cluster`/
    /// `district` refs.
    pub fn location_filter(&self) -> Document {
        self.nested_location_filter("")
    }

    /// Location clauses translated to nested paths for entities that embed
    /// the triple in a sub-document.
    pub fn nested_location_filter(&self, prefix: &str) -> Document {
        let path = |field: &str| {
            if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{prefix}.{field}")
            }
        };
        let mut filter = doc! {};
        if let Some(id) = self.location.state {
            filter.insert(path("state"), id);
        }
        if let Some(id) = self.location.cluster {
            filter.insert(path("cluster"), id);
        }
        if let Some(id) = self.location.district {
            filter.insert(path("district"), id);
        }
        filter
    }

    /// Time clause against the entity's own date field.
    pub fn time_filter(&self, field: &str) -> Document {
        match &self.window {
            None => doc! {},
            Some(window) => {
                let mut range = doc! { "$gte": window.start };
                if let Some(end) = window.end {
                    range.insert("$lte", end);
                }
                let mut filter = doc! {};
                filter.insert(field, range);
                filter
            }
        }
    }

    pub fn owner_filter(&self, field: &str) -> Document {
        self.owners.filter(field)
    }

    /// Leads: top-level location refs, dealer ownership, soft-delete flag.
    pub fn leads_filter(&self) -> Document {
        let mut filter = merge(self.location_filter(), self.owner_filter("dealer"));
        filter = merge(filter, self.time_filter("created_at"));
        filter.insert("deleted", false);
        filter
    }

    /// Projects embed their location as a sub-document.
    pub fn projects_filter(&self) -> Document {
        let mut filter = merge(
            self.nested_location_filter("location"),
            self.owner_filter("dealer"),
        );
        filter = merge(filter, self.time_filter("created_at"));
        filter.insert("deleted", false);
        if let Some(category) = &self.category {
            filter.insert("category", category.clone());
        }
        filter
    }

    pub fn orders_filter(&self) -> Document {
        merge(
            merge(self.location_filter(), self.owner_filter("dealer")),
            self.time_filter("created_at"),
        )
    }

    /// Tasks carry no location; they scope by assignee only.
    pub fn tasks_filter(&self) -> Document {
        merge(self.owner_filter("assignee"), self.time_filter("created_at"))
    }

    /// Deliveries and installations store only `state` and `district`; a
    /// cluster request translates to its descendant districts.
    pub fn schedule_filter(&self) -> Document {
        let mut filter = doc! {};
        if let Some(id) = self.location.state {
            filter.insert("state", id);
        }
        if let Some(id) = self.location.district {
            filter.insert("district", id);
        } else if self.location.cluster.is_some() {
            // A resolved cluster always narrows. With no district children
            // the $in stays empty and matches nothing; only unresolvable ids
            // drop their clause.
            filter.insert("district", doc! { "$in": self.cluster_districts.clone() });
        }
        merge(filter, self.time_filter("created_at"))
    }
}

/// District ids under a cluster, for the nested-to-flat translation above.
async fn cluster_district_ids(state: &AppState, cluster: ObjectId) -> AppResult<Vec<ObjectId>> {
    let mut out = Vec::new();
    for id in descendant_ids(state, cluster).await.map_err(AppError::from)? {
        if id == cluster {
            continue;
        }
        if let Some(loc) = find_location(state, id).await.map_err(AppError::from)? {
            if loc.kind == LocationKind::District {
                out.push(id);
            }
        }
    }
    Ok(out)
}

/// Best-effort geographic id resolution: malformed or unknown ids drop the
/// clause rather than failing the request.
async fn resolve_geo_id(
    state: &AppState,
    raw: Option<&str>,
    field: &str,
) -> AppResult<Option<ObjectId>> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let Ok(id) = ObjectId::from_str(raw) else {
        warn!(field, value = raw, "ignoring malformed location id");
        return Ok(None);
    };
    if !location_exists(state, id).await.map_err(AppError::from)? {
        warn!(field, value = raw, "ignoring unknown location id");
        return Ok(None);
    }
    Ok(Some(id))
}

/// Explicit [startDate, endDate] wins over a named timeline. Unlike the
/// tolerated geography noise, a date that fails to parse is reported.
pub fn parse_window(query: &DashboardQuery) -> AppResult<Option<TimeWindow>> {
    match (query.start_date.as_deref(), query.end_date.as_deref()) {
        (Some(start), Some(end)) => {
            let start = parse_date(start)?;
            let end = parse_date(end)?;
            Ok(Some(TimeWindow {
                start,
                end: Some(end),
            }))
        }
        (Some(_), None) | (None, Some(_)) => Err(AppError::InvalidInput(
            "startDate and endDate must be supplied together".to_string(),
        )),
        (None, None) => Ok(named_window(query.timeline.as_deref())),
    }
}

fn parse_date(value: &str) -> AppResult<DateTime> {
    DateTime::parse_rfc3339_str(value.trim())
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {value} (expected RFC3339)")))
}

/// Named buckets map to `created_at ≥ now − N` with an open upper bound.
/// Unknown names are ignored, same policy as unresolvable geography.
fn named_window(timeline: Option<&str>) -> Option<TimeWindow> {
    let days = match timeline?.to_lowercase().as_str() {
        "today" | "daily" => 1,
        "weekly" => 7,
        "monthly" => 30,
        "quarterly" => 90,
        "yearly" => 365,
        other => {
            warn!(timeline = other, "ignoring unknown timeline bucket");
            return None;
        }
    };
    let start = Utc::now() - Duration::days(days);
    Some(TimeWindow {
        start: DateTime::from_chrono(start),
        end: None,
    })
}

/// Merge clause documents; later keys win, though builders never overlap.
pub fn merge(mut base: Document, extra: Document) -> Document {
    for (key, value) in extra {
        base.insert(key, value);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope_with(location: LocationSelector, owners: ScopeSet) -> Scope {
        Scope {
            location,
            cluster_districts: Vec::new(),
            owners,
            dealers: Vec::new(),
            window: None,
            category: None,
        }
    }

    #[test]
    fn nested_paths_follow_the_prefix() {
        let district = ObjectId::new();
        let scope = scope_with(
            LocationSelector {
                district: Some(district),
                ..Default::default()
            },
            ScopeSet::All,
        );
        assert_eq!(
            scope.nested_location_filter("location"),
            doc! { "location.district": district }
        );
        assert_eq!(scope.location_filter(), doc! { "district": district });
    }

    #[test]
    fn leads_filter_always_excludes_deleted() {
        let dealer = ObjectId::new();
        let scope = scope_with(
            LocationSelector::default(),
            ScopeSet::Members(vec![dealer]),
        );
        assert_eq!(
            scope.leads_filter(),
            doc! { "dealer": dealer, "deleted": false }
        );
    }

    #[test]
    fn cluster_translates_to_its_districts_for_schedules() {
        let cluster = ObjectId::new();
        let d1 = ObjectId::new();
        let d2 = ObjectId::new();
        let scope = Scope {
            location: LocationSelector {
                cluster: Some(cluster),
                ..Default::default()
            },
            cluster_districts: vec![d1, d2],
            owners: ScopeSet::All,
            dealers: Vec::new(),
            window: None,
            category: None,
        };
        assert_eq!(
            scope.schedule_filter(),
            doc! { "district": { "$in": [d1, d2] } }
        );
    }

    #[test]
    fn childless_cluster_matches_nothing_for_schedules() {
        let scope = scope_with(
            LocationSelector {
                cluster: Some(ObjectId::new()),
                ..Default::default()
            },
            ScopeSet::All,
        );
        // An empty $in rather than no clause: the filter must not widen to
        // everything just because the cluster holds no districts yet.
        assert_eq!(
            scope.schedule_filter(),
            doc! { "district": { "$in": [] } }
        );
    }

    #[test]
    fn explicit_range_beats_timeline() {
        let query = DashboardQuery {
            timeline: Some("weekly".into()),
            start_date: Some("2024-01-01T00:00:00Z".into()),
            end_date: Some("2024-02-01T00:00:00Z".into()),
            ..Default::default()
        };
        let window = parse_window(&query).unwrap().unwrap();
        assert!(window.end.is_some());
        assert_eq!(
            window.start,
            DateTime::parse_rfc3339_str("2024-01-01T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn half_open_explicit_range_is_invalid_input() {
        let query = DashboardQuery {
            start_date: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        };
        assert!(matches!(
            parse_window(&query),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn malformed_dates_are_reported_not_ignored() {
        let query = DashboardQuery {
            start_date: Some("last tuesday".into()),
            end_date: Some("2024-02-01T00:00:00Z".into()),
            ..Default::default()
        };
        assert!(matches!(
            parse_window(&query),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn named_buckets_have_open_upper_bounds() {
        let query = DashboardQuery {
            timeline: Some("monthly".into()),
            ..Default::default()
        };
        let window = parse_window(&query).unwrap().unwrap();
        assert!(window.end.is_none());
    }

    #[test]
    fn unknown_timeline_is_ignored() {
        let query = DashboardQuery {
            timeline: Some("fortnightly".into()),
            ..Default::default()
        };
        assert!(parse_window(&query).unwrap().is_none());
    }
}
