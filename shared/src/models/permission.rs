//! Permission maps
//!
//! A permission set maps a module name ("bookings", "quotes", "financial",
//! "sidebar_menus", ...) to either a set of granted actions or a list of
//! menu names. Role permissions provide the default; a user permission row,
//! when present, fully replaces the role's map for that user.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Role;

/// Grant for one module.
///
/// Stored as JSON; persisted data mixes three shapes, so this is an
/// untagged enum:
/// - `{"view_all": true, "edit_own": true}`: action map
/// - `["dashboard", "bookings"]`: menu list (used by `sidebar_menus`)
/// - `true` / `false`: blanket grant or denial for the whole module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleGrant {
    Actions(BTreeMap<String, bool>),
    Menus(Vec<String>),
    All(bool),
}

/// Full permission map for a role or user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(pub BTreeMap<String, ModuleGrant>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `action` is granted on `module`.
    pub fn allows(&self, module: &str, action: &str) -> bool {
        match self.0.get(module) {
            None => false,
            Some(ModuleGrant::All(flag)) => *flag,
            Some(ModuleGrant::Actions(map)) => map.get(action).copied().unwrap_or(false),
            // A menu list grants visibility, not actions
            Some(ModuleGrant::Menus(_)) => false,
        }
    }

    /// Whether the named sidebar menu is visible.
    pub fn has_sidebar_menu(&self, menu: &str) -> bool {
        match self.0.get("sidebar_menus") {
            Some(ModuleGrant::Menus(menus)) => menus.iter().any(|m| m == menu),
            Some(ModuleGrant::All(flag)) => *flag,
            _ => false,
        }
    }

    /// Builder helper: grant a list of actions on a module.
    pub fn grant(mut self, module: &str, actions: &[&str]) -> Self {
        let map = actions.iter().map(|a| (a.to_string(), true)).collect();
        self.0.insert(module.to_string(), ModuleGrant::Actions(map));
        self
    }

    /// Builder helper: set the sidebar menu list.
    pub fn menus(mut self, menus: &[&str]) -> Self {
        self.0.insert(
            "sidebar_menus".to_string(),
            ModuleGrant::Menus(menus.iter().map(|m| m.to_string()).collect()),
        );
        self
    }

    /// Builder helper: blanket grant for a module.
    pub fn grant_all(mut self, module: &str) -> Self {
        self.0.insert(module.to_string(), ModuleGrant::All(true));
        self
    }
}

/// Default permissions for one role; one row per role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePermission {
    pub id: i64,
    pub role: Role,
    pub permissions: PermissionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-user override. When present it fully replaces the role's map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPermission {
    pub id: i64,
    pub user_id: i64,
    pub permissions: PermissionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_reads_action_maps_and_flags() {
        let perms = PermissionSet::new()
            .grant("bookings", &["view_all", "edit_own"])
            .grant_all("quotes")
            .menus(&["dashboard", "bookings"]);

        assert!(perms.allows("bookings", "view_all"));
        assert!(!perms.allows("bookings", "delete"));
        assert!(perms.allows("quotes", "create"));
        assert!(!perms.allows("financial", "edit"));
        assert!(perms.has_sidebar_menu("dashboard"));
        assert!(!perms.has_sidebar_menu("financial"));
        // A menu list never grants module actions
        assert!(!perms.allows("sidebar_menus", "view_all"));
    }

    #[test]
    fn permission_set_round_trips_mixed_shapes() {
        let json = r#"{
            "bookings": {"view_all": true, "edit_all": false},
            "sidebar_menus": ["dashboard"],
            "admin_notes": true
        }"#;
        let perms: PermissionSet = serde_json::from_str(json).unwrap();
        assert!(perms.allows("bookings", "view_all"));
        assert!(!perms.allows("bookings", "edit_all"));
        assert!(perms.allows("admin_notes", "view_all"));
        assert!(perms.has_sidebar_menu("dashboard"));

        let back = serde_json::to_string(&perms).unwrap();
        let again: PermissionSet = serde_json::from_str(&back).unwrap();
        assert_eq!(perms, again);
    }
}
