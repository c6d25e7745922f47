mod aggregate_store;
mod mem;
mod record_store;
mod snapshot_cache;

pub use aggregate_store::*;
pub use mem::*;
pub use record_store::*;
pub use snapshot_cache::*;
