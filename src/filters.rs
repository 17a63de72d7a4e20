//! Query filtering for generated list endpoints.
//!
//! A [`FilterSet`] declares which request parameters may narrow a
//! collection. Plain fields become exact-match constraints; a field may
//! instead carry an explicit hook that owns its narrowing logic entirely,
//! including the decision of what to do with an empty value.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{FieldIssue, ValidationError};
use crate::schema::FieldType;
use crate::store::QuerySet;

/// Custom narrowing function: receives the collection-so-far, the field
/// name and the bound parameter value (absent when the parameter was
/// missing or unparseable).
pub type FilterHook = Arc<dyn Fn(QuerySet, &str, Option<&Value>) -> QuerySet + Send + Sync>;

#[derive(Clone)]
struct FilterField {
    name: String,
    field_type: FieldType,
    hook: Option<FilterHook>,
}

impl FilterField {
    fn bound(&self, params: &HashMap<String, String>) -> Option<Value> {
        params
            .get(&self.name)
            .and_then(|raw| self.field_type.bind_param(raw))
    }
}

/// Ordered, declarative set of filterable fields.
#[derive(Clone, Default)]
pub struct FilterSet {
    fields: Vec<FilterField>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a plain exact-match field.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FilterField {
            name: name.into(),
            field_type,
            hook: None,
        });
        self
    }

    /// Declares a field with an explicit custom hook.
    pub fn custom<F>(mut self, name: impl Into<String>, field_type: FieldType, hook: F) -> Self
    where
        F: Fn(QuerySet, &str, Option<&Value>) -> QuerySet + Send + Sync + 'static,
    {
        self.fields.push(FilterField {
            name: name.into(),
            field_type,
            hook: Some(Arc::new(hook)),
        });
        self
    }

    /// Names of fields that drive exact-match constraints (no hook).
    pub(crate) fn plain_field_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.hook.is_none())
            .map(|field| field.name.as_str())
    }

    /// Narrows `queryset` from the bound request parameters.
    ///
    /// Plain fields with non-empty values are applied as one combined
    /// exact-match constraint set; a plain parameter whose raw text cannot
    /// represent the field's type fails the whole request. Hooks then run
    /// unconditionally in declaration order. The input queryset is
    /// consumed, never mutated in place.
    pub fn apply(
        &self,
        queryset: QuerySet,
        params: &HashMap<String, String>,
    ) -> Result<QuerySet, ValidationError> {
        let mut constraints = Vec::new();
        let mut issues = Vec::new();
        for field in self.fields.iter().filter(|field| field.hook.is_none()) {
            let Some(raw) = params.get(&field.name) else {
                continue;
            };
            match field.field_type.bind_param(raw) {
                Some(value) if !is_empty_value(&value) => {
                    constraints.push((field.name.clone(), value));
                }
                Some(_) => {}
                None => issues.push(FieldIssue::new(
                    &field.name,
                    format!("expects {}", field.field_type.expects()),
                )),
            }
        }
        if !issues.is_empty() {
            return Err(ValidationError::new(issues));
        }

        let mut queryset = if constraints.is_empty() {
            queryset
        } else {
            queryset.filter_all(constraints)
        };

        for field in self.fields.iter().filter(|field| field.hook.is_some()) {
            let value = field.bound(params);
            if let Some(hook) = &field.hook {
                queryset = hook(queryset, &field.name, value.as_ref());
            }
        }

        Ok(queryset)
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|field| field.name.as_str()).collect();
        f.debug_struct("FilterSet").field("fields", &names).finish()
    }
}

/// Empty values never become exact-match constraints (`?sku=` must not
/// filter on `sku = ""`). Mirrors the falsiness rules of the declarative
/// sources this layer is modeled after: null, empty string, zero and false.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.is_empty(),
        Value::Number(number) => {
            number.as_i64() == Some(0) || number.as_f64() == Some(0.0)
        }
        Value::Array(items) => items.is_empty(),
        Value::Object(object) => object.is_empty(),
    }
}
