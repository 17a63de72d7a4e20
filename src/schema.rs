//! Declarative field sets used for payload binding and response shaping.
//!
//! A `Schema` plays two roles: it parses inbound JSON objects into typed
//! entities (rejecting unknown fields and type mismatches), and it projects
//! stored entities into responses containing exactly the declared fields.

use chrono::Utc;
use serde_json::Value;

use crate::error::{FieldIssue, ValidationError};
use crate::store::{Entity, ID_FIELD};

/// Wire type of one schema field.
///
/// `Decimal` is string-encoded (`"12.34"`) so fixed-point values survive
/// round-trips without float drift. `Timestamp` is an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Decimal,
    Timestamp,
}

impl FieldType {
    pub(crate) fn expects(self) -> &'static str {
        match self {
            FieldType::String => "string value",
            FieldType::Integer => "integer value",
            FieldType::Float => "number value",
            FieldType::Boolean => "boolean value",
            FieldType::Decimal => "decimal string value",
            FieldType::Timestamp => "RFC 3339 timestamp string",
        }
    }

    /// Type-checks a JSON value, returning the canonical stored form.
    pub(crate) fn check(self, field: &str, value: &Value) -> Result<Value, FieldIssue> {
        let ok = match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.as_i64().is_some(),
            FieldType::Float => value.as_f64().is_some(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Decimal => value.as_str().is_some_and(is_decimal_literal),
            FieldType::Timestamp => value
                .as_str()
                .is_some_and(|raw| chrono::DateTime::parse_from_rfc3339(raw).is_ok()),
        };
        if ok {
            Ok(value.clone())
        } else {
            Err(FieldIssue::new(
                field,
                format!("expects {}", self.expects()),
            ))
        }
    }

    /// Binds a raw query-string parameter to a typed JSON value.
    ///
    /// Returns `None` when the raw text cannot represent the type at all
    /// (for example `?stock=abc` for an integer field).
    pub(crate) fn bind_param(self, raw: &str) -> Option<Value> {
        match self {
            FieldType::String | FieldType::Decimal | FieldType::Timestamp => {
                Some(Value::String(raw.to_string()))
            }
            FieldType::Integer => raw.parse::<i64>().ok().map(Value::from),
            FieldType::Float => raw.parse::<f64>().ok().map(Value::from),
            FieldType::Boolean => raw.parse::<bool>().ok().map(Value::Bool),
        }
    }
}

fn is_decimal_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() {
        return false;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    for ch in digits.chars() {
        match ch {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

/// Default applied by a store when a create payload omits the field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Value(Value),
    /// Current UTC time as an RFC 3339 string.
    Now,
}

impl FieldDefault {
    pub(crate) fn materialize(&self) -> Value {
        match self {
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::Now => Value::String(Utc::now().to_rfc3339()),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<FieldDefault>,
}

impl FieldDef {
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
        }
    }

    pub fn with_default(
        name: impl Into<String>,
        field_type: FieldType,
        default: FieldDefault,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: Some(default),
        }
    }
}

/// Ordered declarative field set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Binds a full payload: unknown fields, missing required fields and
    /// type mismatches are all collected into one `ValidationError`.
    pub fn parse(&self, payload: &Value) -> Result<Entity, ValidationError> {
        self.bind(payload, true)
    }

    /// Binds a partial payload for merge updates: absent fields are simply
    /// left out, everything present is still fully checked.
    pub fn parse_partial(&self, payload: &Value) -> Result<Entity, ValidationError> {
        self.bind(payload, false)
    }

    fn bind(&self, payload: &Value, require_missing: bool) -> Result<Entity, ValidationError> {
        let object = payload.as_object().ok_or_else(|| {
            ValidationError::single("", "request body must be a JSON object")
        })?;

        let mut issues = Vec::new();
        for name in object.keys() {
            if !self.has_field(name) {
                issues.push(FieldIssue::new(name, "unknown field"));
            }
        }

        let mut bound = Entity::new();
        for field in &self.fields {
            match object.get(&field.name) {
                Some(raw) => match field.field_type.check(&field.name, raw) {
                    Ok(value) => {
                        bound.insert(field.name.clone(), value);
                    }
                    Err(issue) => issues.push(issue),
                },
                None if field.required && require_missing => {
                    issues.push(FieldIssue::new(&field.name, "missing required field"));
                }
                None => {}
            }
        }

        if issues.is_empty() {
            Ok(bound)
        } else {
            Err(ValidationError::new(issues))
        }
    }

    /// Serializes an entity as `id` plus exactly the declared fields.
    pub fn project(&self, entity: &Entity) -> Value {
        let mut object = serde_json::Map::new();
        object.insert(
            ID_FIELD.to_string(),
            entity.get(ID_FIELD).cloned().unwrap_or(Value::Null),
        );
        for field in &self.fields {
            object.insert(
                field.name.clone(),
                entity.get(&field.name).cloned().unwrap_or(Value::Null),
            );
        }
        Value::Object(object)
    }

    /// Fills declared defaults for fields absent from `entity`.
    pub fn apply_defaults(&self, entity: &mut Entity) {
        for field in &self.fields {
            if let Some(default) = &field.default {
                if !entity.contains_key(&field.name) {
                    entity.insert(field.name.clone(), default.materialize());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_schema() -> Schema {
        Schema::new(vec![
            FieldDef::required("sku", FieldType::String),
            FieldDef::required("price", FieldType::Decimal),
            FieldDef::with_default("stock", FieldType::Integer, FieldDefault::Value(json!(0))),
        ])
    }

    #[test]
    fn parse_binds_declared_fields_and_rejects_unknown_ones() {
        let schema = product_schema();
        let bound = schema
            .parse(&json!({"sku": "PROD001", "price": "12.34", "stock": 3}))
            .expect("valid payload");
        assert_eq!(bound.get("sku"), Some(&json!("PROD001")));
        assert_eq!(bound.get("stock"), Some(&json!(3)));

        let err = schema
            .parse(&json!({"sku": "PROD001", "price": "12.34", "color": "red"}))
            .unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].field, "color");
    }

    #[test]
    fn parse_collects_every_issue_in_one_pass() {
        let schema = product_schema();
        let err = schema
            .parse(&json!({"price": 12.34, "stock": "many"}))
            .unwrap_err();
        let fields: Vec<&str> = err.issues().iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"sku"));
        assert!(fields.contains(&"price"));
        assert!(fields.contains(&"stock"));
    }

    #[test]
    fn parse_partial_skips_missing_required_fields() {
        let schema = product_schema();
        let bound = schema.parse_partial(&json!({"stock": 99})).expect("subset");
        assert_eq!(bound.len(), 1);
        assert_eq!(bound.get("stock"), Some(&json!(99)));

        let err = schema.parse_partial(&json!({"stock": "many"})).unwrap_err();
        assert_eq!(err.issues()[0].field, "stock");
    }

    #[test]
    fn decimal_fields_accept_decimal_strings_only() {
        let schema = Schema::new(vec![FieldDef::required("price", FieldType::Decimal)]);
        assert!(schema.parse(&json!({"price": "12.34"})).is_ok());
        assert!(schema.parse(&json!({"price": "-0.5"})).is_ok());
        assert!(schema.parse(&json!({"price": 12.34})).is_err());
        assert!(schema.parse(&json!({"price": "12.3.4"})).is_err());
        assert!(schema.parse(&json!({"price": ""})).is_err());
    }

    #[test]
    fn project_emits_id_plus_declared_fields_exactly() {
        let schema = product_schema();
        let mut entity = Entity::new();
        entity.insert("id".to_string(), json!(1));
        entity.insert("sku".to_string(), json!("PROD001"));
        entity.insert("price".to_string(), json!("12.34"));
        entity.insert("stock".to_string(), json!(0));
        entity.insert("created".to_string(), json!("2026-01-01T00:00:00Z"));

        let projected = schema.project(&entity);
        let object = projected.as_object().expect("object");
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["id", "price", "sku", "stock"]);
    }

    #[test]
    fn apply_defaults_fills_absent_fields_only() {
        let schema = product_schema();
        let mut entity = Entity::new();
        entity.insert("sku".to_string(), json!("PROD001"));
        schema.apply_defaults(&mut entity);
        assert_eq!(entity.get("stock"), Some(&json!(0)));

        let mut entity = Entity::new();
        entity.insert("stock".to_string(), json!(7));
        schema.apply_defaults(&mut entity);
        assert_eq!(entity.get("stock"), Some(&json!(7)));
    }

    #[test]
    fn timestamp_default_materializes_rfc3339() {
        let schema = Schema::new(vec![FieldDef::with_default(
            "created",
            FieldType::Timestamp,
            FieldDefault::Now,
        )]);
        let mut entity = Entity::new();
        schema.apply_defaults(&mut entity);
        let stamp = entity.get("created").and_then(Value::as_str).expect("stamp");
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
