//! Request correlation: request ids, a bounded in-memory log store and an
//! optional best-effort JSON-lines file sink.
//!
//! # Module Structure
//!
//! - [`tracker`] - Ring buffer of [`LogRecord`]s with query-by-id/recency
//! - [`sink`] - Background task appending records to a log file

mod sink;
mod tracker;

pub use sink::{LogSink, DEFAULT_SINK_BUFFER};
pub use tracker::{
    CorrelationTracker, LogLevel, LogRecord, DEFAULT_LOG_CAPACITY, MAX_REQUEST_ID_LEN,
};
