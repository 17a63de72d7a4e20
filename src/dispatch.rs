//! Request-time dispatch: the five handlers behind one registered resource.
//!
//! Each handler binds request data against the effective schema for its
//! action, invokes the matching view operation and pairs the result with
//! its status code. Everything else (URL matching, body extraction, JSON
//! encoding) belongs to axum.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::store::EntityId;
use crate::view::{Action, CrudView, ResolvedSchemas};

/// Shared state for one registered resource.
pub(crate) struct RouteState {
    pub view: CrudView,
    pub schemas: ResolvedSchemas,
    pub prefix: String,
}

pub(crate) async fn list(
    State(state): State<Arc<RouteState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let mut queryset = state.view.list();
    // Filters narrow the still-lazy collection, before materialization.
    if let Some(filter) = state.view.filter_set() {
        queryset = filter.apply(queryset, &params).inspect_err(|err| {
            tracing::debug!(
                prefix = %state.prefix,
                action = Action::List.as_str(),
                issues = err.issues().len(),
                "filter parameters rejected"
            );
        })?;
    }
    let entities = queryset.fetch().await?;
    let items = entities
        .iter()
        .map(|entity| state.schemas.list.project(entity))
        .collect();
    Ok(Json(Value::Array(items)))
}

pub(crate) async fn retrieve(
    State(state): State<Arc<RouteState>>,
    Path(id): Path<EntityId>,
) -> Result<Json<Value>> {
    let entity = state.view.retrieve(id).await?;
    Ok(Json(state.schemas.retrieve.project(&entity)))
}

pub(crate) async fn create(
    State(state): State<Arc<RouteState>>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let data = state.schemas.create.parse(&payload).inspect_err(|err| {
        tracing::debug!(
            prefix = %state.prefix,
            action = Action::Create.as_str(),
            issues = err.issues().len(),
            "payload rejected"
        );
    })?;
    let entity = state.view.create(data).await?;
    Ok((StatusCode::CREATED, Json(state.schemas.retrieve.project(&entity))))
}

pub(crate) async fn update(
    State(state): State<Arc<RouteState>>,
    Path(id): Path<EntityId>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>> {
    let data = state.schemas.update.parse_partial(&payload).inspect_err(|err| {
        tracing::debug!(
            prefix = %state.prefix,
            action = Action::Update.as_str(),
            issues = err.issues().len(),
            "payload rejected"
        );
    })?;
    let entity = state.view.update(id, data).await?;
    Ok(Json(state.schemas.retrieve.project(&entity)))
}

pub(crate) async fn delete(
    State(state): State<Arc<RouteState>>,
    Path(id): Path<EntityId>,
) -> Result<StatusCode> {
    state.view.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
