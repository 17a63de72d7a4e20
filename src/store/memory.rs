//! Reference in-memory backend.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::schema::Schema;
use crate::store::{Entity, EntityId, EntityStore, ID_FIELD};

/// In-memory entity table driven by a model schema.
///
/// The schema supplies field defaults on insert and rejects fields the model
/// does not declare. All mutations run under one write lock, so the count
/// reported by `delete` is atomic with the removal.
pub struct MemoryStore {
    schema: Schema,
    table: RwLock<MemoryTable>,
}

struct MemoryTable {
    next_id: EntityId,
    rows: Vec<Entity>,
}

impl MemoryStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            table: RwLock::new(MemoryTable {
                next_id: 1,
                rows: Vec::new(),
            }),
        }
    }

    /// The model schema this table was created from.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn scan(&self, constraints: &[(String, Value)]) -> Result<Vec<Entity>, StoreError> {
        let table = self.table.read()?;
        Ok(table
            .rows
            .iter()
            .filter(|row| {
                constraints
                    .iter()
                    .all(|(field, value)| row.get(field) == Some(value))
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: EntityId) -> Result<Option<Entity>, StoreError> {
        let table = self.table.read()?;
        Ok(table.rows.iter().find(|row| row_id(row) == Some(id)).cloned())
    }

    async fn insert(&self, mut fields: Entity) -> Result<Entity, StoreError> {
        for name in fields.keys() {
            if !self.schema.has_field(name) {
                return Err(StoreError::Backend(format!(
                    "unknown field '{name}' for this model"
                )));
            }
        }
        self.schema.apply_defaults(&mut fields);
        for field in self.schema.fields() {
            if field.required && !fields.contains_key(&field.name) {
                return Err(StoreError::Backend(format!(
                    "missing required field '{}'",
                    field.name
                )));
            }
        }

        let mut table = self.table.write()?;
        let id = table.next_id;
        table.next_id += 1;
        fields.insert(ID_FIELD.to_string(), Value::from(id));
        table.rows.push(fields.clone());
        Ok(fields)
    }

    async fn replace(&self, id: EntityId, mut entity: Entity) -> Result<bool, StoreError> {
        entity.insert(ID_FIELD.to_string(), Value::from(id));
        let mut table = self.table.write()?;
        match table.rows.iter_mut().find(|row| row_id(row) == Some(id)) {
            Some(slot) => {
                *slot = entity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: EntityId) -> Result<u64, StoreError> {
        let mut table = self.table.write()?;
        let before = table.rows.len();
        table.rows.retain(|row| row_id(row) != Some(id));
        Ok((before - table.rows.len()) as u64)
    }
}

fn row_id(row: &Entity) -> Option<EntityId> {
    row.get(ID_FIELD).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldDefault, FieldType};
    use serde_json::json;

    fn product_store() -> MemoryStore {
        MemoryStore::new(Schema::new(vec![
            FieldDef::required("sku", FieldType::String),
            FieldDef::required("price", FieldType::Decimal),
            FieldDef::with_default("stock", FieldType::Integer, FieldDefault::Value(json!(0))),
            FieldDef::with_default("created", FieldType::Timestamp, FieldDefault::Now),
        ]))
    }

    fn product(sku: &str, price: &str) -> Entity {
        let mut entity = Entity::new();
        entity.insert("sku".to_string(), json!(sku));
        entity.insert("price".to_string(), json!(price));
        entity
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_applies_defaults() {
        let store = product_store();
        let first = store.insert(product("PROD001", "12.34")).await.unwrap();
        let second = store.insert(product("PROD002", "23.45")).await.unwrap();

        assert_eq!(first.get("id"), Some(&json!(1)));
        assert_eq!(second.get("id"), Some(&json!(2)));
        assert_eq!(first.get("stock"), Some(&json!(0)));
        let stamp = first.get("created").and_then(Value::as_str).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[tokio::test]
    async fn insert_rejects_undeclared_and_missing_fields() {
        let store = product_store();

        let mut extra = product("PROD001", "12.34");
        extra.insert("color".to_string(), json!("red"));
        assert!(matches!(
            store.insert(extra).await,
            Err(StoreError::Backend(_))
        ));

        let mut incomplete = Entity::new();
        incomplete.insert("sku".to_string(), json!("PROD001"));
        assert!(matches!(
            store.insert(incomplete).await,
            Err(StoreError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn delete_reports_exact_count_and_is_not_idempotent() {
        let store = product_store();
        let created = store.insert(product("PROD001", "12.34")).await.unwrap();
        let id = created.get("id").and_then(Value::as_i64).unwrap();

        assert_eq!(store.delete(id).await.unwrap(), 1);
        assert_eq!(store.delete(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_overwrites_whole_entity_and_keeps_id() {
        let store = product_store();
        let mut created = store.insert(product("PROD001", "12.34")).await.unwrap();
        let id = created.get("id").and_then(Value::as_i64).unwrap();

        created.insert("stock".to_string(), json!(99));
        assert!(store.replace(id, created).await.unwrap());
        let reread = store.get(id).await.unwrap().unwrap();
        assert_eq!(reread.get("stock"), Some(&json!(99)));
        assert_eq!(reread.get("id"), Some(&json!(id)));

        assert!(!store.replace(12345, product("GHOST", "0.0")).await.unwrap());
    }

    #[tokio::test]
    async fn scan_combines_constraints_with_logical_and() {
        let store = product_store();
        let mut a = product("SHIRT001", "12.5");
        a.insert("stock".to_string(), json!(10));
        let mut b = product("SHIRT001", "13.5");
        b.insert("stock".to_string(), json!(15));
        store.insert(a).await.unwrap();
        store.insert(b).await.unwrap();

        let rows = store
            .scan(&[
                ("sku".to_string(), json!("SHIRT001")),
                ("stock".to_string(), json!(15)),
            ])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("price"), Some(&json!("13.5")));
    }
}
