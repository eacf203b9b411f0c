//! Generic list/retrieve/create/update/delete handlers.
//!
//! A record type opts in by implementing [`Crud`]; [`routes`] then mounts the
//! collection at `/{name}/` and the item at `/{name}/{id}/`. Partial updates
//! overlay the request body on the record's current input, so `build` always
//! sees a complete input.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use super::errors::ApiError;
use super::extract::{Caller, Payload};
use super::AppState;
use crate::store::{Deletable, Tables};

/// Everything `Crud` callbacks may look at.
pub struct Ctx<'a> {
    pub tables: &'a Tables,
    pub caller: &'a Caller,
    pub now: DateTime<Utc>,
}

pub type Params = HashMap<String, String>;

pub trait Crud: Deletable + Serialize {
    type Input: DeserializeOwned + Serialize + Validate + Send + 'static;

    /// Only administrators may create, update or delete.
    const ADMIN_WRITE: bool = false;

    fn to_input(&self) -> Self::Input;

    /// Check `input` against the rest of the store and produce the row to save.
    /// `current` is the stored row when updating.
    fn build(input: Self::Input, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError>;

    fn render(&self, _ctx: &Ctx) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Rows outside the caller's scope are neither listed nor found.
    fn visible(&self, _ctx: &Ctx) -> bool {
        true
    }

    /// Query-string filtering for the list endpoint.
    fn matches(&self, _params: &Params, _ctx: &Ctx) -> bool {
        true
    }

    /// Listing order; id order unless overridden.
    fn sort(_rows: &mut Vec<&Self>) {}

    fn after_create(_row: &Self, _tables: &mut Tables, _caller: &Caller, _now: DateTime<Utc>) {}
}

fn ensure_can_write<T: Crud>(caller: &Caller) -> Result<(), ApiError> {
    if T::ADMIN_WRITE {
        caller.require_admin()?;
    }
    Ok(())
}

fn parse_input<I: DeserializeOwned>(body: Value) -> Result<I, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::non_field(e.to_string()))
}

/// Overlay the keys of `patch` on `base`.
pub fn merge(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            base.extend(patch);
            Value::Object(base)
        }
        (_, patch) => patch,
    }
}

/// Parse a numeric query parameter; anything else never matches.
pub fn param_id(params: &Params, key: &str) -> Option<Option<i64>> {
    params.get(key).map(|v| v.parse().ok())
}

pub fn routes<T: Crud>(router: Router<Arc<AppState>>, name: &str) -> Router<Arc<AppState>> {
    router
        .route(
            &format!("/{}/", name),
            get(list::<T>).post(create::<T>),
        )
        .route(
            &format!("/{}/{{id}}/", name),
            get(retrieve::<T>)
                .put(update::<T>)
                .patch(partial_update::<T>)
                .delete(destroy::<T>),
        )
}

pub async fn list<T: Crud>(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(params): Query<Params>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let now = Utc::now();
    let rows = state
        .store
        .read(|t| {
            let ctx = Ctx { tables: t, caller: &caller, now };
            let mut rows: Vec<&T> = t
                .of::<T>()
                .iter()
                .filter(|row| row.visible(&ctx) && row.matches(&params, &ctx))
                .collect();
            T::sort(&mut rows);
            rows.into_iter().map(|row| row.render(&ctx)).collect::<Vec<_>>()
        })
        .await;
    log::debug!("Listed {} {} rows", rows.len(), T::KIND);
    Ok(Json(rows))
}

pub async fn retrieve<T: Crud>(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    state
        .store
        .read(|t| {
            let ctx = Ctx { tables: t, caller: &caller, now };
            t.get::<T>(id)
                .filter(|row| row.visible(&ctx))
                .map(|row| Json(row.render(&ctx)))
                .ok_or(ApiError::NotFound)
        })
        .await
}

pub async fn create<T: Crud>(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Payload(body): Payload<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    ensure_can_write::<T>(&caller)?;
    let input: T::Input = parse_input(body)?;
    input.validate()?;

    let now = Utc::now();
    let rendered = state
        .store
        .write(|t| {
            let row = T::build(input, None, &Ctx { tables: t, caller: &caller, now })?;
            let row = t.insert(row);
            T::after_create(&row, t, &caller, now);
            log::info!("Created {} {}", T::KIND, row.id());
            Ok::<_, ApiError>(row.render(&Ctx { tables: t, caller: &caller, now }))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(rendered)))
}

async fn save<T: Crud>(
    state: &AppState,
    caller: Caller,
    id: i64,
    body: Value,
    partial: bool,
) -> Result<Json<Value>, ApiError> {
    ensure_can_write::<T>(&caller)?;
    let now = Utc::now();
    let rendered = state
        .store
        .write(|t| {
            let current = t.require::<T>(id)?.clone();
            let ctx = Ctx { tables: t, caller: &caller, now };
            if !current.visible(&ctx) {
                return Err(ApiError::NotFound);
            }
            let body = if partial {
                let base = serde_json::to_value(current.to_input())
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                merge(base, body)
            } else {
                body
            };
            let input: T::Input = parse_input(body)?;
            input.validate()?;
            let row = T::build(input, Some(&current), &ctx)?;

            let row = t.of_mut::<T>().replace(id, row)?;
            log::info!("Updated {} {}", T::KIND, id);
            Ok(row.render(&Ctx { tables: t, caller: &caller, now }))
        })
        .await?;
    Ok(Json(rendered))
}

pub async fn update<T: Crud>(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Payload(body): Payload<Value>,
) -> Result<Json<Value>, ApiError> {
    save::<T>(&state, caller, id, body, false).await
}

pub async fn partial_update<T: Crud>(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Payload(body): Payload<Value>,
) -> Result<Json<Value>, ApiError> {
    save::<T>(&state, caller, id, body, true).await
}

pub async fn destroy<T: Crud>(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ensure_can_write::<T>(&caller)?;
    let now = Utc::now();
    state
        .store
        .write(|t| {
            let row = t.require::<T>(id)?;
            if !row.visible(&Ctx { tables: t, caller: &caller, now }) {
                return Err(ApiError::NotFound);
            }
            t.delete::<T>(id)?;
            log::info!("Deleted {} {}", T::KIND, id);
            Ok(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overlays_keys() {
        let merged = merge(
            json!({"farmName": "Old", "location": "Moshi"}),
            json!({"farmName": "New"}),
        );
        assert_eq!(merged, json!({"farmName": "New", "location": "Moshi"}));
    }

    #[test]
    fn param_id_distinguishes_missing_and_garbage() {
        let mut params = Params::new();
        assert_eq!(param_id(&params, "device"), None);
        params.insert("device".into(), "abc".into());
        assert_eq!(param_id(&params, "device"), Some(None));
        params.insert("device".into(), "4".into());
        assert_eq!(param_id(&params, "device"), Some(Some(4)));
    }
}
