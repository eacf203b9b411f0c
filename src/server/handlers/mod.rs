//! Route handlers grouped by resource.

pub mod accounts;
pub mod batches;
pub mod breeds;
pub mod dashboard;
pub mod farms;
pub mod knowledge;
pub mod sensors;
pub mod subscriptions;

use axum::Json;
use serde_json::{json, Value};

use super::crud::{param_id, Params};
use crate::store::Record;

/// Liveness probe; no authentication.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "service": "smart-kuku",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) fn row_id<T: Record>(current: Option<&T>) -> i64 {
    current.map_or(0, |c| c.id())
}

/// True unless `row` is the row being updated.
pub(crate) fn is_other<T: Record>(row: &T, current: Option<&T>) -> bool {
    Some(row.id()) != current.map(|c| c.id())
}

/// Add the keys of `extra` to a rendered object.
pub(crate) fn extend(mut value: Value, extra: Value) -> Value {
    if let (Value::Object(map), Value::Object(extra)) = (&mut value, extra) {
        map.extend(extra);
    }
    value
}

/// `?key=<id>` filter; an absent parameter matches every row.
pub(crate) fn filter_by(params: &Params, key: &str, id: i64) -> bool {
    match param_id(params, key) {
        None => true,
        Some(wanted) => wanted == Some(id),
    }
}

/// Like [`filter_by`] for nullable references.
pub(crate) fn optional_filter(params: &Params, key: &str, id: Option<i64>) -> bool {
    id.map_or(!params.contains_key(key), |id| filter_by(params, key, id))
}
