//! Default role permission maps
//!
//! Seeded once at install; administrators edit them afterwards through
//! the back office. A per-user override row, when present, replaces the
//! role map wholesale rather than merging with it.

use shared::models::{PermissionSet, Role};

/// Default permission map for a role.
pub fn default_role_permissions(role: Role) -> PermissionSet {
    match role {
        Role::Administrator => PermissionSet::new()
            .grant_all("bookings")
            .grant_all("quotes")
            .grant_all("financial")
            .grant_all("vouchers")
            .grant_all("customers")
            .grant_all("users")
            .menus(&[
                "dashboard",
                "bookings",
                "quotes",
                "financial",
                "vouchers",
                "customers",
                "reports",
                "settings",
            ]),
        Role::Manager => PermissionSet::new()
            .grant(
                "bookings",
                &["view_all", "create", "edit_all", "edit_own", "delete", "export"],
            )
            .grant("quotes", &["view_all", "create", "edit_all", "edit_own"])
            .grant("financial", &["view_all", "edit"])
            .grant("vouchers", &["view_all", "create"])
            .grant("customers", &["view_all", "create", "edit_all"])
            .menus(&[
                "dashboard",
                "bookings",
                "quotes",
                "financial",
                "vouchers",
                "customers",
                "reports",
            ]),
        Role::Operation => PermissionSet::new()
            .grant("bookings", &["view_all", "create", "edit_all", "edit_own"])
            .grant("quotes", &["view_all", "create", "edit_own"])
            .grant("financial", &["view_all", "edit"])
            .grant("vouchers", &["view_all", "create"])
            .grant("customers", &["view_all", "create"])
            .menus(&["dashboard", "bookings", "quotes", "financial", "vouchers", "customers"]),
        Role::Staff => PermissionSet::new()
            .grant("bookings", &["view_all", "create", "edit_own"])
            .grant("quotes", &["view_all", "create", "edit_own"])
            .grant("vouchers", &["view_all"])
            .grant("customers", &["view_all", "create"])
            .menus(&["dashboard", "bookings", "quotes", "customers"]),
        Role::Internship => PermissionSet::new()
            .grant("bookings", &["view_own", "create", "edit_own"])
            .grant("quotes", &["view_own"])
            .grant("customers", &["view_all"])
            .menus(&["dashboard", "bookings"]),
        Role::Freelance => PermissionSet::new()
            .grant("bookings", &["view_own", "create", "edit_own"])
            .grant("quotes", &["view_own", "create"])
            .menus(&["dashboard", "bookings", "quotes"]),
    }
}
