//! Delta aggregation over a change stream of per-location readings.
//!
//! [`ChangeListener`] turns every observed reading into an increment against
//! the last reading cached for the same record and queues it in a
//! [`PendingChangeSet`]. [`BatchCommitter`] drains that set on a fixed
//! interval and applies it to an [`AggregateStore`] as one atomic batch.
//! [`AggregationEngine`] wires both together.
mod config;
pub mod constants;
mod core;
mod errors;
mod ingest;
mod metrics;
mod model;
mod storage;
mod stream;
pub mod utils;

pub use self::config::*;
pub use self::core::*;
pub use errors::*;
pub use ingest::*;
pub use metrics::*;
pub use model::*;
pub use storage::*;
pub use stream::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
