//! OpenAPI 3.1 description of the generated routes.
//!
//! Built once per router from the resolved schemas, so the document always
//! matches what the handlers actually accept and return.

use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::collections::BTreeMap;

use crate::schema::{FieldDef, FieldType, Schema};
use crate::view::ResolvedSchemas;

pub(crate) fn build_document(resources: &BTreeMap<String, ResolvedSchemas>) -> JsonValue {
    let mut paths = JsonMap::new();
    let mut components = JsonMap::new();

    for (prefix, schemas) in resources {
        let model_name = to_pascal_case(prefix);
        let document_name = format!("{model_name}Document");
        let list_name = format!("{model_name}ListItem");
        let create_name = format!("{model_name}CreateRequest");
        let update_name = format!("{model_name}UpdateRequest");

        components.insert(document_name.clone(), document_schema(&schemas.retrieve));
        components.insert(list_name.clone(), document_schema(&schemas.list));
        components.insert(create_name.clone(), request_schema(&schemas.create, true));
        components.insert(update_name.clone(), request_schema(&schemas.update, false));

        paths.insert(
            prefix.clone(),
            json!({
                "get": {
                    "operationId": format!("list{model_name}"),
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": component_ref(&list_name) }
                                    }
                                }
                            }
                        }
                    }
                },
                "post": {
                    "operationId": format!("create{model_name}"),
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": component_ref(&create_name) }
                            }
                        }
                    },
                    "responses": {
                        "201": {
                            "description": "Created",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": component_ref(&document_name) }
                                }
                            }
                        },
                        "422": { "description": "Validation error" }
                    }
                }
            }),
        );

        paths.insert(
            format!("{prefix}/{{id}}"),
            json!({
                "get": {
                    "operationId": format!("retrieve{model_name}"),
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": component_ref(&document_name) }
                                }
                            }
                        },
                        "404": { "description": "Not found" }
                    }
                },
                "put": {
                    "operationId": format!("update{model_name}"),
                    "parameters": [id_parameter()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": component_ref(&update_name) }
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": component_ref(&document_name) }
                                }
                            }
                        },
                        "404": { "description": "Not found" },
                        "422": { "description": "Validation error" }
                    }
                },
                "delete": {
                    "operationId": format!("delete{model_name}"),
                    "parameters": [id_parameter()],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": { "description": "Not found" }
                    }
                }
            }),
        );
    }

    json!({
        "openapi": "3.1.0",
        "info": {
            "title": "CrudKit API",
            "version": "1.0.0"
        },
        "paths": JsonValue::Object(paths),
        "components": {
            "schemas": JsonValue::Object(components)
        }
    })
}

/// Response shape: `id` plus exactly the schema's declared fields.
fn document_schema(schema: &Schema) -> JsonValue {
    let mut properties = JsonMap::new();
    properties.insert(
        "id".to_string(),
        json!({ "type": "integer", "format": "int64" }),
    );
    let mut required = vec!["id".to_string()];
    for field in schema.fields() {
        properties.insert(field.name.clone(), field_schema(field));
        if field.required {
            required.push(field.name.clone());
        }
    }

    json!({
        "type": "object",
        "properties": JsonValue::Object(properties),
        "required": required,
        "additionalProperties": false
    })
}

fn request_schema(schema: &Schema, with_required: bool) -> JsonValue {
    let mut properties = JsonMap::new();
    let mut required = Vec::new();
    for field in schema.fields() {
        properties.insert(field.name.clone(), field_schema(field));
        if with_required && field.required {
            required.push(field.name.clone());
        }
    }

    let mut object = JsonMap::new();
    object.insert("type".to_string(), json!("object"));
    object.insert("properties".to_string(), JsonValue::Object(properties));
    if with_required {
        object.insert("required".to_string(), json!(required));
    }
    object.insert("additionalProperties".to_string(), json!(false));
    JsonValue::Object(object)
}

fn field_schema(field: &FieldDef) -> JsonValue {
    match field.field_type {
        FieldType::String => json!({ "type": "string" }),
        FieldType::Integer => json!({ "type": "integer", "format": "int64" }),
        FieldType::Float => json!({ "type": "number" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::Decimal => json!({ "type": "string", "pattern": "^-?[0-9]+(\\.[0-9]+)?$" }),
        FieldType::Timestamp => json!({ "type": "string", "format": "date-time" }),
    }
}

fn id_parameter() -> JsonValue {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn component_ref(name: &str) -> String {
    format!("#/components/schemas/{name}")
}

fn to_pascal_case(prefix: &str) -> String {
    let mut result = String::new();
    for part in prefix.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.push(first.to_ascii_uppercase());
            for ch in chars {
                result.push(ch.to_ascii_lowercase());
            }
        }
    }

    if result.is_empty() {
        "Resource".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    #[test]
    fn pascal_case_joins_path_segments() {
        assert_eq!(to_pascal_case("/products"), "Products");
        assert_eq!(to_pascal_case("/api/by-sku"), "ApiBySku");
        assert_eq!(to_pascal_case("///"), "Resource");
    }

    #[test]
    fn document_schema_includes_id_and_declared_fields() {
        let schema = Schema::new(vec![
            FieldDef::required("sku", FieldType::String),
            FieldDef::optional("stock", FieldType::Integer),
        ]);
        let document = document_schema(&schema);
        let properties = document["properties"].as_object().unwrap();
        assert!(properties.contains_key("id"));
        assert!(properties.contains_key("sku"));
        assert!(properties.contains_key("stock"));
        assert_eq!(document["required"], json!(["id", "sku"]));
    }
}
