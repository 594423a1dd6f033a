pub mod memory;
pub mod metadata_cache;
pub mod traits;

pub use memory::*;
pub use metadata_cache::*;
pub use traits::*;
