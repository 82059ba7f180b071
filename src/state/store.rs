// store.rs
// Read-only adapter primitives over the collections. No business logic and
// no mutation; everything here is safe to issue concurrently.

use anyhow::{Context, Result};
use futures::stream::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{Bson, Document, doc};
use serde::de::DeserializeOwned;

pub async fn count<T>(coll: &Collection<T>, filter: Document) -> Result<u64>
where
    T: Send + Sync,
{
    coll.count_documents(filter).await.map_err(Into::into)
}

pub async fn find_all<T>(coll: &Collection<T>, filter: Document) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    let mut cursor = coll.find(filter).await?;
    let mut items = Vec::new();
    while let Some(item) = cursor.try_next().await? {
        items.push(item);
    }
    Ok(items)
}

pub async fn find_sorted<T>(
    coll: &Collection<T>,
    filter: Document,
    sort: Document,
    limit: i64,
) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    let mut cursor = coll.find(filter).sort(sort).limit(limit).await?;
    let mut items = Vec::new();
    while let Some(item) = cursor.try_next().await? {
        items.push(item);
    }
    Ok(items)
}

/// Sum `sum_field` over every document matching `filter`.
pub async fn sum_field<T>(coll: &Collection<T>, filter: Document, sum_field: &str) -> Result<f64>
where
    T: Send + Sync,
{
    let pipeline = vec![
        doc! { "$match": filter },
        doc! { "$group": { "_id": null, "total": { "$sum": format!("${sum_field}") } } },
    ];
    let mut cursor = coll.aggregate(pipeline).await?;
    if let Some(row) = cursor.try_next().await? {
        return numeric(row.get("total")).context("aggregate returned a non-numeric total");
    }
    Ok(0.0)
}

/// Sum `sum_field` per distinct value of `group_field`.
pub async fn sum_by_key<T>(
    coll: &Collection<T>,
    filter: Document,
    group_field: &str,
    sum_field: &str,
) -> Result<Vec<(Bson, f64)>>
where
    T: Send + Sync,
{
    let pipeline = vec![
        doc! { "$match": filter },
        doc! { "$group": {
            "_id": format!("${group_field}"),
            "total": { "$sum": format!("${sum_field}") },
        } },
    ];
    let mut cursor = coll.aggregate(pipeline).await?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.try_next().await? {
        let key = row.get("_id").cloned().unwrap_or(Bson::Null);
        let total = numeric(row.get("total")).context("aggregate returned a non-numeric total")?;
        rows.push((key, total));
    }
    Ok(rows)
}

/// Count documents per distinct value of `group_field`.
pub async fn count_by_key<T>(
    coll: &Collection<T>,
    filter: Document,
    group_field: &str,
) -> Result<Vec<(Bson, i64)>>
where
    T: Send + Sync,
{
    let pipeline = vec![
        doc! { "$match": filter },
        doc! { "$group": {
            "_id": format!("${group_field}"),
            "total": { "$sum": 1 },
        } },
    ];
    let mut cursor = coll.aggregate(pipeline).await?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.try_next().await? {
        let key = row.get("_id").cloned().unwrap_or(Bson::Null);
        let total = numeric(row.get("total")).context("aggregate returned a non-numeric total")?
            as i64;
        rows.push((key, total));
    }
    Ok(rows)
}

/// Sum `sum_field` per calendar month of `date_field`, keyed "YYYY-MM".
pub async fn sum_by_month<T>(
    coll: &Collection<T>,
    filter: Document,
    date_field: &str,
    sum_field: &str,
) -> Result<Vec<(String, f64)>>
where
    T: Send + Sync,
{
    let pipeline = vec![
        doc! { "$match": filter },
        doc! { "$group": {
            "_id": { "$dateToString": { "format": "%Y-%m", "date": format!("${date_field}") } },
            "total": { "$sum": format!("${sum_field}") },
        } },
    ];
    let mut cursor = coll.aggregate(pipeline).await?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.try_next().await? {
        let key = match row.get("_id") {
            Some(Bson::String(s)) => s.clone(),
            _ => continue,
        };
        let total = numeric(row.get("total")).context("aggregate returned a non-numeric total")?;
        rows.push((key, total));
    }
    Ok(rows)
}

fn numeric(value: Option<&Bson>) -> Option<f64> {
    match value {
        Some(Bson::Double(v)) => Some(*v),
        Some(Bson::Int32(v)) => Some(*v as f64),
        Some(Bson::Int64(v)) => Some(*v as f64),
        None => Some(0.0),
        _ => None,
    }
}
