use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identity of the caller on whose behalf an admin operation runs.
/// Roles drive both the security gate and field visibility in resolved metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl UserContext {
    /// Create a new UserContext with just a user ID
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: BTreeSet::new(),
        }
    }

    /// Create a UserContext holding the given roles
    pub fn with_roles<I, R>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            user_id: user_id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a system user context for internal operations
    pub fn system() -> Self {
        Self::with_roles("system", ["ROLE_ADMIN"])
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Stable key describing what this caller may see. Two callers with the same
    /// role set always resolve identical metadata, so they share cache entries.
    pub fn visibility_key(&self) -> String {
        self.roles.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::system()
    }
}
