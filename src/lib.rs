// ============================================================================
// CrudKit Library
// ============================================================================

//! Declarative CRUD endpoint generation for axum.
//!
//! Describe a resource once (its store, its request/response schemas per
//! action, optionally a filter set) and [`CrudRouter`] derives the five
//! standard endpoints (list, retrieve, create, update, delete) with
//! validation, status codes and error mapping wired in.

pub mod error;
pub mod filters;
pub mod schema;
pub mod store;
pub mod view;

mod dispatch;
mod openapi;
mod router;

// Re-export main types for convenience
pub use error::{
    CrudError, ErrorResponse, FieldIssue, RegistrationError, Result, StoreError, ValidationError,
};
pub use filters::{FilterHook, FilterSet};
pub use router::CrudRouter;
pub use schema::{FieldDef, FieldDefault, FieldType, Schema};
pub use store::{Entity, EntityId, EntityStore, ID_FIELD, MemoryStore, QuerySet};
pub use view::{Action, CrudView};
