pub mod cascade;
pub mod collections;
pub mod criteria;
pub mod metadata;
pub mod persister;
pub mod query;
pub mod relationship_id;
pub mod validate;

pub use cascade::*;
pub use collections::*;
pub use criteria::*;
pub use metadata::*;
pub use persister::*;
pub use query::*;
pub use relationship_id::*;
pub use validate::*;
