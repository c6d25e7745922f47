//! Delta Aggregation Error Hierarchy
//!
//! Errors are grouped by the layer that raises them. Event-level errors
//! (decode, missing baseline) only ever cost one event; commit errors cost one
//! batch; subscription errors cost a stream until it reconnects.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (task runtime, IO, retry exhaustion)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Engine configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failures raised while turning events into committed deltas
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// Shutdown requested; background loops return this to unwind
    #[error("Exit")]
    Exit,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    /// Malformed composite identifier
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Update observed for a record that has no cached snapshot
    #[error("Missing baseline for record {record_id}: update arrived before any create")]
    MissingBaseline { record_id: String },

    /// Batch write failed or exceeded its deadline
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Change stream could not be opened or was lost
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    /// Event payload does not describe a valid record
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Event parent path has no owning aggregate
    #[error("Cannot resolve aggregate target from path {path}")]
    UnresolvableTarget { path: String },

    /// Lifecycle call made in the wrong state
    #[error("Invalid state transition: {0}")]
    InvalidTransition(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Input is not standard base64
    #[error("Identifier {id} is not valid base64")]
    Base64 {
        id: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Decoded bytes are not UTF-8
    #[error("Identifier {id} does not decode to UTF-8")]
    Utf8 {
        id: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Decoded key lacks the `|` separator
    #[error("Identifier {id} decodes to {decoded:?} which has no separator")]
    MissingSeparator { id: String, decoded: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// Store rejected the batch
    #[error("Batch of {targets} targets rejected by store: {reason}")]
    Rejected { targets: usize, reason: String },

    /// Store did not answer before the commit deadline
    #[error("Batch of {targets} targets timed out after {duration:?}")]
    Timeout { targets: usize, duration: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// Subscribe call failed
    #[error("Failed to subscribe to {query}: {reason}")]
    SubscribeFailed { query: String, reason: String },

    /// Stream closed by the remote end
    #[error("Stream for {query} disconnected")]
    Disconnected { query: String },

    /// Reconnect attempts exhausted
    #[error("Gave up on {query} after {attempts} reconnect attempts")]
    RetriesExhausted { query: String, attempts: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse seed data: {0}")]
    SeedParse(#[from] serde_json::Error),

    #[error("Retry timeout after {0:?}")]
    RetryTimeout(Duration),

    #[error("{0}")]
    RetryTaskFailed(String),
}

// ============== Conversion Implementations ============== //
impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Aggregation(AggregationError::Decode(e))
    }
}

impl From<CommitError> for Error {
    fn from(e: CommitError) -> Self {
        Error::Aggregation(AggregationError::Commit(e))
    }
}

impl From<SubscriptionError> for Error {
    fn from(e: SubscriptionError) -> Self {
        Error::Aggregation(AggregationError::Subscription(e))
    }
}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        Error::System(SystemError::TaskFailed(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::System(SystemError::SeedParse(e))
    }
}

impl Error {
    /// Short label used for the dropped-events metric.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Aggregation(AggregationError::Decode(_)) => "decode",
            Error::Aggregation(AggregationError::MissingBaseline { .. }) => "missing_baseline",
            Error::Aggregation(AggregationError::InvalidRecord(_)) => "invalid_record",
            Error::Aggregation(AggregationError::UnresolvableTarget { .. }) => "unresolvable_target",
            Error::Aggregation(AggregationError::Commit(_)) => "commit",
            Error::Aggregation(AggregationError::Subscription(_)) => "subscription",
            Error::Aggregation(AggregationError::InvalidTransition(_)) => "invalid_transition",
            Error::System(_) => "system",
            Error::Config(_) => "config",
            Error::Fatal(_) => "fatal",
            Error::Exit => "exit",
        }
    }
}
