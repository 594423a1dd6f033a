pub mod common;
pub mod entity;
pub mod filter;
pub mod form;
pub mod metadata;
pub mod schema;
pub mod user_context;

pub use common::*;
pub use entity::*;
pub use filter::*;
pub use form::*;
pub use metadata::*;
pub use schema::*;
pub use user_context::*;
