//! Permission evaluation
//!
//! Resolution order per user:
//! 1. a `UserPermission` override row, when present, is authoritative
//! 2. otherwise the stored `RolePermission` row for the user's role
//! 3. otherwise deny
//!
//! Resolved maps are memoized per user id; [`PermissionEvaluator::refresh`]
//! must be called after any role change or override edit so the next
//! evaluation re-reads storage.

use dashmap::DashMap;
use shared::models::{Booking, BookingStatus, PermissionSet, Role, RolePermission, User};
use shared::util::snowflake_id;

use crate::workflow::storage::{StorageResult, WorkflowStorage};

use super::permissions::default_role_permissions;

#[derive(Clone)]
pub struct PermissionEvaluator {
    storage: WorkflowStorage,
    cache: std::sync::Arc<DashMap<i64, PermissionSet>>,
}

impl PermissionEvaluator {
    pub fn new(storage: WorkflowStorage) -> Self {
        Self {
            storage,
            cache: std::sync::Arc::new(DashMap::new()),
        }
    }

    /// Whether `action` on `module` is granted. Deactivated users are
    /// denied everything regardless of their maps.
    pub fn has(&self, user: &User, module: &str, action: &str) -> bool {
        if !user.is_active {
            return false;
        }
        self.resolve(user).allows(module, action)
    }

    /// Whether the named sidebar menu is visible to the user.
    pub fn has_sidebar_menu(&self, user: &User, menu: &str) -> bool {
        if !user.is_active {
            return false;
        }
        self.resolve(user).has_sidebar_menu(menu)
    }

    /// Booking mutation check with "own" semantics: `edit_all` covers
    /// every booking; `edit_own` covers only bookings the user created
    /// that have not progressed past `confirmed`.
    pub fn can_edit_booking(&self, user: &User, booking: &Booking) -> bool {
        if !user.is_active {
            return false;
        }
        let perms = self.resolve(user);
        if perms.allows("bookings", "edit_all") {
            return true;
        }
        perms.allows("bookings", "edit_own")
            && booking.created_by_user_id == Some(user.id)
            && matches!(
                booking.status,
                BookingStatus::Draft | BookingStatus::Confirmed
            )
    }

    /// Drop the memoized map for a user; the next evaluation re-reads the
    /// role row and override.
    pub fn refresh(&self, user_id: i64) {
        self.cache.remove(&user_id);
    }

    fn resolve(&self, user: &User) -> PermissionSet {
        if let Some(cached) = self.cache.get(&user.id) {
            return cached.clone();
        }
        let resolved = self.load(user);
        self.cache.insert(user.id, resolved.clone());
        resolved
    }

    fn load(&self, user: &User) -> PermissionSet {
        match self.storage.get_user_permission(user.id) {
            Ok(Some(override_row)) => return override_row.permissions,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(user_id = user.id, error = %e, "permission override lookup failed");
                return PermissionSet::new();
            }
        }
        match self.storage.get_role_permission(user.role) {
            Ok(Some(role_row)) => role_row.permissions,
            Ok(None) => PermissionSet::new(),
            Err(e) => {
                tracing::error!(role = %user.role, error = %e, "role permission lookup failed");
                PermissionSet::new()
            }
        }
    }
}

impl std::fmt::Debug for PermissionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEvaluator").finish_non_exhaustive()
    }
}

/// Write the built-in default map for every role. Run once at install;
/// skips roles that already have a stored row.
pub fn seed_default_role_permissions(storage: &WorkflowStorage) -> StorageResult<()> {
    for role in [
        Role::Administrator,
        Role::Operation,
        Role::Manager,
        Role::Staff,
        Role::Internship,
        Role::Freelance,
    ] {
        if storage.get_role_permission(role)?.is_some() {
            continue;
        }
        let now = shared::util::now_millis();
        storage.put_role_permission(&RolePermission {
            id: snowflake_id(),
            role,
            permissions: default_role_permissions(role),
            description: None,
            created_at: now,
            updated_at: now,
        })?;
    }
    Ok(())
}
