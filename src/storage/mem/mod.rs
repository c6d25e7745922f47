mod mem_aggregate_store;
mod mem_record_store;

pub use mem_aggregate_store::*;
pub use mem_record_store::*;
