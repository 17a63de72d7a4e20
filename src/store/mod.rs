//! Storage collaborator contract and the lazy effective collection.
//!
//! The CRUD layer never talks to a backend directly: view operations go
//! through a [`QuerySet`], which re-derives its rows from the store on every
//! evaluation. Nothing in this module caches materialized results.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::StoreError;

mod memory;

pub use memory::MemoryStore;

/// Primary key of a persisted entity.
pub type EntityId = i64;

/// A persisted entity: a JSON object keyed by field name.
pub type Entity = serde_json::Map<String, Value>;

/// Field every persisted entity carries; assigned by the store on insert.
pub const ID_FIELD: &str = "id";

/// Narrow contract a storage backend must satisfy.
///
/// `delete` must report the removed count atomically with the removal
/// itself; a backend that counts in a separate step races the
/// 404-on-second-delete guarantee of the generated surface.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fresh snapshot of the collection in insertion order, with every
    /// exact-match constraint applied in one combined operation (AND).
    async fn scan(&self, constraints: &[(String, Value)]) -> Result<Vec<Entity>, StoreError>;

    /// Looks up a single entity by id.
    async fn get(&self, id: EntityId) -> Result<Option<Entity>, StoreError>;

    /// Persists a new entity from bound field values, assigning its id and
    /// applying model defaults. Field names map 1:1 onto entity fields.
    async fn insert(&self, fields: Entity) -> Result<Entity, StoreError>;

    /// Persists a fully mutated entity. Returns `false` when no entity with
    /// that id exists.
    async fn replace(&self, id: EntityId, entity: Entity) -> Result<bool, StoreError>;

    /// Removes the entity with the given id, returning the removed count.
    async fn delete(&self, id: EntityId) -> Result<u64, StoreError>;
}

type Predicate = Arc<dyn Fn(&Entity) -> bool + Send + Sync>;

/// Lazy, re-filterable view over a store.
///
/// Cloning or calling [`QuerySet::all`] yields an unevaluated copy; rows are
/// only read from the backend inside [`QuerySet::fetch`] and
/// [`QuerySet::get`], so a queryset held across mutations never goes stale.
#[derive(Clone)]
pub struct QuerySet {
    store: Arc<dyn EntityStore>,
    constraints: Vec<(String, Value)>,
    predicates: Vec<Predicate>,
}

impl QuerySet {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            constraints: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// The backend this queryset evaluates against.
    pub fn store(&self) -> Arc<dyn EntityStore> {
        Arc::clone(&self.store)
    }

    /// Re-derives the collection: same scoping, nothing materialized.
    pub fn all(&self) -> QuerySet {
        self.clone()
    }

    /// Adds one exact-match constraint.
    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.constraints.push((field.into(), value));
        self
    }

    /// Adds a batch of exact-match constraints (combined as AND).
    pub fn filter_all(mut self, constraints: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Adds an arbitrary narrowing predicate, evaluated after the store's
    /// exact-match constraints. Custom filter hooks build on this.
    pub fn narrow<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Entity) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Evaluates the collection against the store now.
    pub async fn fetch(&self) -> Result<Vec<Entity>, StoreError> {
        let mut rows = self.store.scan(&self.constraints).await?;
        if !self.predicates.is_empty() {
            rows.retain(|entity| self.predicates.iter().all(|keep| keep(entity)));
        }
        Ok(rows)
    }

    /// Finds one entity by id within this (possibly constrained) collection.
    pub async fn get(&self, id: EntityId) -> Result<Option<Entity>, StoreError> {
        let rows = self.fetch().await?;
        Ok(rows
            .into_iter()
            .find(|entity| entity.get(ID_FIELD).and_then(Value::as_i64) == Some(id)))
    }
}

impl fmt::Debug for QuerySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("constraints", &self.constraints)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, Schema};
    use serde_json::json;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(Schema::new(vec![
            FieldDef::required("sku", FieldType::String),
            FieldDef::optional("stock", FieldType::Integer),
        ])))
    }

    fn fields(sku: &str, stock: i64) -> Entity {
        let mut entity = Entity::new();
        entity.insert("sku".to_string(), json!(sku));
        entity.insert("stock".to_string(), json!(stock));
        entity
    }

    #[tokio::test]
    async fn queryset_is_reevaluated_per_access() {
        let store = store();
        let queryset = QuerySet::new(store.clone());
        assert!(queryset.fetch().await.unwrap().is_empty());

        store.insert(fields("SHIRT001", 10)).await.unwrap();
        // Same queryset instance sees rows inserted after it was built.
        assert_eq!(queryset.fetch().await.unwrap().len(), 1);
        assert_eq!(queryset.all().fetch().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn constraints_and_predicates_compose() {
        let store = store();
        store.insert(fields("SHIRT001", 10)).await.unwrap();
        store.insert(fields("SHIRT002", 0)).await.unwrap();
        store.insert(fields("CAPPIE01", 50)).await.unwrap();

        let shirts = QuerySet::new(store.clone())
            .narrow(|entity| {
                entity
                    .get("sku")
                    .and_then(Value::as_str)
                    .is_some_and(|sku| sku.starts_with("SHIRT"))
            })
            .filter("stock", json!(10));
        let rows = shirts.fetch().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("sku"), Some(&json!("SHIRT001")));
    }

    #[tokio::test]
    async fn get_respects_collection_scoping() {
        let store = store();
        let created = store.insert(fields("SHIRT001", 10)).await.unwrap();
        let id = created.get(ID_FIELD).and_then(Value::as_i64).unwrap();

        let scoped = QuerySet::new(store.clone()).filter("sku", json!("CAPPIE01"));
        assert!(scoped.get(id).await.unwrap().is_none());
        assert!(QuerySet::new(store).get(id).await.unwrap().is_some());
    }
}
