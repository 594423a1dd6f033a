use crate::model::UserContext;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecuredOperation {
    /// Disclose structural metadata of a type
    Inspect,
    Fetch,
    Add,
    Update,
    Remove,
}

impl fmt::Display for SecuredOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecuredOperation::Inspect => "inspect",
            SecuredOperation::Fetch => "fetch",
            SecuredOperation::Add => "add",
            SecuredOperation::Update => "update",
            SecuredOperation::Remove => "remove",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} on '{type_name}' is not permitted")]
pub struct SecurityDenied {
    pub operation: SecuredOperation,
    pub type_name: String,
}

impl SecurityDenied {
    pub fn new(operation: SecuredOperation, type_name: impl Into<String>) -> Self {
        Self {
            operation,
            type_name: type_name.into(),
        }
    }
}

/// Security collaborator consulted before every mutating or
/// type-disclosing operation.
#[async_trait::async_trait]
pub trait SecurityGate: Send + Sync {
    async fn authorize(
        &self,
        operation: SecuredOperation,
        type_name: &str,
        ctx: &UserContext,
    ) -> Result<(), SecurityDenied>;
}

/// Gate that approves every operation
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

#[async_trait::async_trait]
impl SecurityGate for PermitAll {
    async fn authorize(
        &self,
        _operation: SecuredOperation,
        _type_name: &str,
        _ctx: &UserContext,
    ) -> Result<(), SecurityDenied> {
        Ok(())
    }
}

/// Grants `(type, operation)` pairs to roles. The type `*` matches every
/// type. Anything not granted is denied.
#[derive(Debug, Clone, Default)]
pub struct RoleSecurityGate {
    grants: HashMap<(String, SecuredOperation), HashSet<String>>,
}

impl RoleSecurityGate {
    pub const ANY_TYPE: &'static str = "*";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(
        mut self,
        role: impl Into<String>,
        type_name: impl Into<String>,
        operations: &[SecuredOperation],
    ) -> Self {
        let role = role.into();
        let type_name = type_name.into();
        for op in operations {
            self.grants
                .entry((type_name.clone(), *op))
                .or_default()
                .insert(role.clone());
        }
        self
    }

    fn is_granted(&self, operation: SecuredOperation, type_name: &str, ctx: &UserContext) -> bool {
        [type_name, Self::ANY_TYPE].iter().any(|t| {
            self.grants
                .get(&(t.to_string(), operation))
                .is_some_and(|roles| roles.iter().any(|r| ctx.has_role(r)))
        })
    }
}

#[async_trait::async_trait]
impl SecurityGate for RoleSecurityGate {
    async fn authorize(
        &self,
        operation: SecuredOperation,
        type_name: &str,
        ctx: &UserContext,
    ) -> Result<(), SecurityDenied> {
        if self.is_granted(operation, type_name, ctx) {
            Ok(())
        } else {
            log::warn!(
                "Denied {} on '{}' for user '{}'",
                operation,
                type_name,
                ctx.user_id
            );
            Err(SecurityDenied::new(operation, type_name))
        }
    }
}
