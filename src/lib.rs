//! Rolewarden - declarative reconciliation of RBAC roles
//!
//! This library converges a desired role (a named bundle of access rules
//! plus metadata) against the version persisted in a remote store, computing
//! the minimal create/update needed and retrying safely when another actor
//! races it. Roles can opt out of reconciliation entirely, and extra
//! permissions can either be left in place (union policy) or removed
//! (strict policy).

pub mod coverage;
pub mod diff;
pub mod engine;
pub mod errors;
pub mod merge;
pub mod store;
pub mod types;

pub use engine::{ReconcileOptions, MAX_ATTEMPTS};
pub use errors::ReconcileError;
pub use store::{MemoryRoleStore, RoleStore, StoreError};
pub use types::{
    PolicyRule, ReconcileOperation, ReconcileResult, Role, AUTOUPDATE_ANNOTATION,
};
