//! Route registration for declarative CRUD resources.

use axum::Json;
use axum::routing::get;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dispatch::{self, RouteState};
use crate::error::RegistrationError;
use crate::openapi;
use crate::view::{CrudView, ResolvedSchemas};

/// Explicit router object accumulating CRUD resources.
///
/// Registration is deterministic and validated eagerly: a view missing its
/// collection or schemas, or a prefix registered twice, fails the
/// `register` call instead of a later request. `into_router` hands the
/// result to the host application as a plain `axum::Router`.
///
/// ```no_run
/// use crudkit::{CrudRouter, CrudView, FieldDef, FieldType, MemoryStore, Schema};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), crudkit::RegistrationError> {
/// let schema = Schema::new(vec![FieldDef::required("sku", FieldType::String)]);
/// let store = Arc::new(MemoryStore::new(schema.clone()));
///
/// let router = CrudRouter::new()
///     .register("/products", CrudView::for_model(store).schema(schema))?
///     .into_router();
/// # let _ = router;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CrudRouter {
    router: axum::Router,
    resources: BTreeMap<String, ResolvedSchemas>,
}

impl CrudRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the five CRUD routes for `view` under `prefix`:
    ///
    /// - `GET    {prefix}`: list
    /// - `POST   {prefix}`: create (201)
    /// - `GET    {prefix}/{id}`: retrieve
    /// - `PUT    {prefix}/{id}`: update
    /// - `DELETE {prefix}/{id}`: delete (204, 404 on absent)
    pub fn register(
        mut self,
        prefix: &str,
        view: CrudView,
    ) -> Result<Self, RegistrationError> {
        let prefix = normalize_prefix(prefix)?;
        if self.resources.contains_key(&prefix) {
            return Err(RegistrationError::DuplicatePrefix(prefix));
        }

        let schemas = view.resolve()?;
        let state = Arc::new(RouteState {
            view,
            schemas: schemas.clone(),
            prefix: prefix.clone(),
        });

        let collection_routes = get(dispatch::list)
            .post(dispatch::create)
            .with_state(Arc::clone(&state));
        let member_routes = get(dispatch::retrieve)
            .put(dispatch::update)
            .delete(dispatch::delete)
            .with_state(state);

        self.router = self
            .router
            .route(&prefix, collection_routes)
            .route(&format!("{prefix}/:id"), member_routes);
        tracing::info!(prefix = %prefix, "mounted CRUD resource");
        self.resources.insert(prefix, schemas);
        Ok(self)
    }

    /// Finishes registration, mounting `GET /_openapi.json` alongside the
    /// accumulated resource routes.
    pub fn into_router(self) -> axum::Router {
        let document = openapi::build_document(&self.resources);
        self.router.route(
            "/_openapi.json",
            get(move || {
                let document = document.clone();
                async move { Json(document) }
            }),
        )
    }
}

/// Prefixes are mounted without trailing slashes and always start with `/`.
fn normalize_prefix(raw: &str) -> Result<String, RegistrationError> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(RegistrationError::EmptyPrefix);
    }
    Ok(format!("/{trimmed}"))
}
