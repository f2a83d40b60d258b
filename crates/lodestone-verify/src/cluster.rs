//! The cluster API capability interface.
//!
//! Verification reads live RBAC state through this trait; the concrete
//! client (and everything else about provisioning) lives outside this
//! crate. Implementations take `&self` and use interior mutability
//! where they need state, so a verifier can hold one by value.

use lodestone_types::{Binding, GeneratedBinding, GeneratedRole, RoleTemplate, Scope, Subject};
use thiserror::Error;

/// Error type for cluster API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The referenced object does not (yet) exist. Transient during
    /// polling; terminal outside a poll loop.
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    /// The backend failed in a way that is not an expected condition.
    #[error("cluster API error: {0}")]
    Backend(String),
}

impl ApiError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether a poll loop should keep retrying through this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Query and command operations the verifier consumes from the system
/// under test.
pub trait ClusterApi {
    fn get_role(&self, scope: &Scope, name: &str) -> Result<GeneratedRole, ApiError>;

    /// Roles whose name starts with any of the given prefixes.
    fn list_roles(&self, scope: &Scope, name_prefixes: &[&str])
    -> Result<Vec<GeneratedRole>, ApiError>;

    fn list_role_bindings(
        &self,
        scope: &Scope,
        namespace: &str,
    ) -> Result<Vec<GeneratedBinding>, ApiError>;

    fn list_cluster_role_bindings(&self, scope: &Scope) -> Result<Vec<GeneratedBinding>, ApiError>;

    fn get_role_template(&self, name: &str) -> Result<RoleTemplate, ApiError>;

    fn create_role_template(&self, template: &RoleTemplate) -> Result<(), ApiError>;

    fn delete_role_template(&self, name: &str) -> Result<(), ApiError>;

    /// Replaces the template's inherited list wholesale.
    fn update_inheritance(&self, name: &str, new_children: &[String]) -> Result<(), ApiError>;

    fn create_binding(&self, binding: &Binding) -> Result<Binding, ApiError>;

    fn delete_binding(&self, id: &str) -> Result<(), ApiError>;

    /// Whether `subject` may perform `verb` on the named resource.
    fn check_access(
        &self,
        subject: &Subject,
        verb: &str,
        resource: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<bool, ApiError>;

    fn get_feature_flag(&self, name: &str) -> Result<bool, ApiError>;

    fn set_feature_flag(&self, name: &str, enabled: bool) -> Result<(), ApiError>;
}
