//! Declarative view configuration and the CRUD data operations.
//!
//! A [`CrudView`] bundles the effective collection (a model store or a
//! pre-scoped queryset), the request/response schemas per action and an
//! optional filter set. Validation happens once, at registration; the
//! operations themselves assume a validated view.

use std::fmt;
use std::sync::Arc;

use crate::error::{CrudError, RegistrationError, Result};
use crate::filters::FilterSet;
use crate::schema::Schema;
use crate::store::{Entity, EntityId, EntityStore, QuerySet};

/// The five generated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::List,
        Action::Retrieve,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative description of one CRUD resource.
#[derive(Clone, Default)]
pub struct CrudView {
    model: Option<Arc<dyn EntityStore>>,
    queryset: Option<QuerySet>,
    schema: Option<Schema>,
    list_schema: Option<Schema>,
    retrieve_schema: Option<Schema>,
    create_schema: Option<Schema>,
    update_schema: Option<Schema>,
    filter: Option<FilterSet>,
}

impl CrudView {
    /// A view over a model's full collection.
    pub fn for_model(store: Arc<dyn EntityStore>) -> Self {
        Self {
            model: Some(store),
            ..Self::default()
        }
    }

    /// A view over a pre-scoped collection.
    pub fn for_queryset(queryset: QuerySet) -> Self {
        Self {
            queryset: Some(queryset),
            ..Self::default()
        }
    }

    /// Default request/response shape for every action.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn list_schema(mut self, schema: Schema) -> Self {
        self.list_schema = Some(schema);
        self
    }

    pub fn retrieve_schema(mut self, schema: Schema) -> Self {
        self.retrieve_schema = Some(schema);
        self
    }

    pub fn create_schema(mut self, schema: Schema) -> Self {
        self.create_schema = Some(schema);
        self
    }

    pub fn update_schema(mut self, schema: Schema) -> Self {
        self.update_schema = Some(schema);
        self
    }

    pub fn filter(mut self, filter: FilterSet) -> Self {
        self.filter = Some(filter);
        self
    }

    pub(crate) fn filter_set(&self) -> Option<&FilterSet> {
        self.filter.as_ref()
    }

    /// Request schema for an action, after the fallback chain.
    fn request_schema(&self, action: Action) -> Option<&Schema> {
        match action {
            Action::List => self.list_schema.as_ref().or(self.schema.as_ref()),
            Action::Retrieve => self.retrieve_schema.as_ref().or(self.schema.as_ref()),
            Action::Create => self.create_schema.as_ref().or(self.schema.as_ref()),
            Action::Update => self
                .update_schema
                .as_ref()
                .or(self.create_schema.as_ref())
                .or(self.schema.as_ref()),
            Action::Delete => None,
        }
    }

    /// Validates the configuration and resolves every effective schema.
    ///
    /// Called by the router at registration time; all misconfiguration
    /// surfaces here, never during a request.
    pub(crate) fn resolve(&self) -> std::result::Result<ResolvedSchemas, RegistrationError> {
        if self.model.is_none() && self.queryset.is_none() {
            return Err(RegistrationError::MissingCollection);
        }

        let resolve = |action: Action| {
            self.request_schema(action)
                .cloned()
                .ok_or(RegistrationError::MissingSchema(action))
        };
        let schemas = ResolvedSchemas {
            list: resolve(Action::List)?,
            retrieve: resolve(Action::Retrieve)?,
            create: resolve(Action::Create)?,
            update: resolve(Action::Update)?,
        };

        if let Some(filter) = &self.filter {
            for name in filter.plain_field_names() {
                if !schemas.retrieve.has_field(name) {
                    return Err(RegistrationError::UnknownFilterField(name.to_string()));
                }
            }
        }

        Ok(schemas)
    }

    /// The effective model: the store behind `queryset`, else `model`.
    fn store(&self) -> Arc<dyn EntityStore> {
        match (&self.model, &self.queryset) {
            (Some(store), _) => Arc::clone(store),
            (None, Some(queryset)) => queryset.store(),
            (None, None) => unreachable!("validated at registration"),
        }
    }

    /// The effective collection, re-derived fresh for this call.
    fn collection(&self) -> QuerySet {
        match &self.queryset {
            Some(queryset) => queryset.all(),
            None => QuerySet::new(self.store()),
        }
    }

    /// Returns the effective collection, unfiltered and unevaluated.
    pub fn list(&self) -> QuerySet {
        self.collection()
    }

    /// Returns the entity with `id` from the effective collection.
    pub async fn retrieve(&self, id: EntityId) -> Result<Entity> {
        self.collection()
            .get(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Persists a new entity from a bound create payload.
    pub async fn create(&self, data: Entity) -> Result<Entity> {
        Ok(self.store().insert(data).await?)
    }

    /// Merges the supplied fields onto the stored entity and persists it.
    ///
    /// Fields absent from `data` keep their prior value; fields present are
    /// overwritten even when equal.
    pub async fn update(&self, id: EntityId, data: Entity) -> Result<Entity> {
        let mut entity = self.retrieve(id).await?;
        for (field, value) in data {
            entity.insert(field, value);
        }
        let replaced = self.store().replace(id, entity.clone()).await?;
        if !replaced {
            return Err(not_found(id));
        }
        Ok(entity)
    }

    /// Deletes the entity with `id`. Deleting twice is an error the second
    /// time: the store's removed count decides.
    pub async fn delete(&self, id: EntityId) -> Result<()> {
        let removed = self.store().delete(id).await?;
        if removed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

impl fmt::Debug for CrudView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudView")
            .field("model", &self.model.is_some())
            .field("queryset", &self.queryset.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

fn not_found(id: EntityId) -> CrudError {
    CrudError::NotFound(format!("entity '{id}' not found"))
}

/// Effective schemas computed once at registration.
///
/// The response schema for create/update/retrieve is always the retrieve
/// schema: the API returns the canonical representation of the entity, not
/// the input shape. List responses use the list schema.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedSchemas {
    pub list: Schema,
    pub retrieve: Schema,
    pub create: Schema,
    pub update: Schema,
}
