//! Authorization
//!
//! Role-based permission maps with per-user overrides. The evaluator is
//! the single gate in front of every workflow operation.

pub mod evaluator;
pub mod permissions;

pub use evaluator::{seed_default_role_permissions, PermissionEvaluator};
pub use permissions::default_role_permissions;
