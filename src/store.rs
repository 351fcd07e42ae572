use async_trait::async_trait;
use miette::Diagnostic;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::types::Role;

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("role `{0}` not found")]
    #[diagnostic(code(rolewarden::store::not_found))]
    NotFound(String),

    #[error("role `{0}` already exists")]
    #[diagnostic(code(rolewarden::store::already_exists))]
    AlreadyExists(String),

    #[error("conflicting concurrent write to role `{0}`")]
    #[diagnostic(
        code(rolewarden::store::conflict),
        help("Re-run the reconciliation; version conflicts are not retried internally")
    )]
    Conflict(String),

    #[error("store backend error: {0}")]
    #[diagnostic(code(rolewarden::store::backend))]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// The remote object store holding persisted roles, keyed by name.
///
/// `update` replaces the whole object; backends with optimistic locking
/// report a lost version race as [`StoreError::Conflict`], which the engine
/// propagates rather than retries.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Role, StoreError>;
    async fn create(&self, role: &Role) -> Result<Role, StoreError>;
    async fn update(&self, role: &Role) -> Result<Role, StoreError>;
}

#[async_trait]
impl<T: RoleStore + ?Sized> RoleStore for &T {
    async fn get(&self, name: &str) -> Result<Role, StoreError> {
        (**self).get(name).await
    }

    async fn create(&self, role: &Role) -> Result<Role, StoreError> {
        (**self).create(role).await
    }

    async fn update(&self, role: &Role) -> Result<Role, StoreError> {
        (**self).update(role).await
    }
}

/// In-memory [`RoleStore`] for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    roles: Mutex<HashMap<String, Role>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing role, replacing any previous entry.
    pub fn insert(&self, role: Role) {
        self.lock().insert(role.name.clone(), role);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Role>> {
        // Recover the map from a panicked writer rather than poisoning all
        // subsequent reconciles.
        self.roles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn get(&self, name: &str) -> Result<Role, StoreError> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn create(&self, role: &Role) -> Result<Role, StoreError> {
        let mut roles = self.lock();
        if roles.contains_key(&role.name) {
            return Err(StoreError::AlreadyExists(role.name.clone()));
        }
        roles.insert(role.name.clone(), role.clone());
        Ok(role.clone())
    }

    async fn update(&self, role: &Role) -> Result<Role, StoreError> {
        let mut roles = self.lock();
        if !roles.contains_key(&role.name) {
            return Err(StoreError::NotFound(role.name.clone()));
        }
        roles.insert(role.name.clone(), role.clone());
        Ok(role.clone())
    }
}
