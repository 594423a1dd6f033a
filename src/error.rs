use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::security::SecurityDenied;

pub type AdminResult<T> = Result<T, AdminError>;

/// Failures surfaced by every admin operation.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No matching type, record or collection item
    #[error("not found: {0}")]
    NotFound(String),

    /// Entity state violates domain constraints; keyed by field name
    #[error("validation failed: {}", format_field_errors(.errors))]
    Validation { errors: BTreeMap<String, Vec<String>> },

    #[error("access denied: {0}")]
    Security(#[from] SecurityDenied),

    /// A sub-collection item's type is not one the collection accepts
    #[error("cannot resolve type '{type_name}' for collection '{collection}'")]
    TypeResolution { type_name: String, collection: String },

    /// Concurrent modification detected by the persistence collaborator
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure not otherwise classified
    #[error("service error: {0}")]
    Service(#[source] anyhow::Error),

    /// Failure of one step inside a multi-step operation
    #[error("{operation} failed: {source}")]
    SubOperation {
        operation: String,
        #[source]
        source: Box<AdminError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Security,
    TypeResolution,
    Conflict,
    Service,
}

/// Errors a persistence collaborator raises inside its `anyhow::Error` so
/// the core can classify them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity_type} '{id}' was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        entity_type: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("{entity_type} '{id}' does not exist")]
    NotFound { entity_type: String, id: String },

    #[error("{entity_type} '{id}' already exists")]
    AlreadyExists { entity_type: String, id: String },

    #[error("{entity_type} '{id}' now refers to '{parent_id}' through '{foreign_key}'")]
    DependentAdded {
        entity_type: String,
        id: String,
        foreign_key: String,
        parent_id: String,
    },
}

impl AdminError {
    pub fn not_found(what: impl fmt::Display) -> Self {
        AdminError::NotFound(what.to_string())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        AdminError::Validation { errors }
    }

    pub fn within(self, operation: impl Into<String>) -> Self {
        AdminError::SubOperation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// Classify a collaborator failure
    pub fn from_store(err: anyhow::Error) -> Self {
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::VersionConflict { .. })
            | Some(StoreError::AlreadyExists { .. })
            | Some(StoreError::DependentAdded { .. }) => AdminError::Conflict(err.to_string()),
            Some(StoreError::NotFound { .. }) => AdminError::NotFound(err.to_string()),
            None => AdminError::Service(err),
        }
    }

    /// Underlying error kind, looking through sub-operation wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdminError::NotFound(_) => ErrorKind::NotFound,
            AdminError::Validation { .. } => ErrorKind::Validation,
            AdminError::Security(_) => ErrorKind::Security,
            AdminError::TypeResolution { .. } => ErrorKind::TypeResolution,
            AdminError::Conflict(_) => ErrorKind::Conflict,
            AdminError::Service(_) => ErrorKind::Service,
            AdminError::SubOperation { source, .. } => source.kind(),
        }
    }

    pub fn is_security(&self) -> bool {
        self.kind() == ErrorKind::Security
    }
}

fn format_field_errors(errors: &BTreeMap<String, Vec<String>>) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join("; ")))
        .collect::<Vec<_>>()
        .join(", ")
}
