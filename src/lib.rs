pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod security;
pub mod seed;
pub mod service;
pub mod store;

pub use config::{AdminConfig, RemovalPolicy};
pub use error::{AdminError, AdminResult, ErrorKind, StoreError};
pub use logic::{ContextualIdResolver, ValidationError, ValidationErrorType, ValidationResult};
pub use model::*;
pub use security::{PermitAll, RoleSecurityGate, SecuredOperation, SecurityDenied, SecurityGate};
pub use service::AdminEntityService;
pub use store::{EntityStore, InMemoryStore, PersistenceStore, SchemaSource};

/// Install the `env_logger` backend with an `info` default, overridable
/// through `RUST_LOG`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
