//! Correlation tracker owning the process-wide log ring buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::sink::LogSink;

/// Default number of records retained in memory.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Longest caller-supplied request id that is accepted as-is.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Severity / lifecycle stage of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Received,
    Succeeded,
    Failed,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Received => "Received",
            LogLevel::Succeeded => "Succeeded",
            LogLevel::Failed => "Failed",
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
        }
    }

    /// Whether the record closes out a conversion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LogLevel::Succeeded | LogLevel::Failed)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured log entry tagged with its request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Assigns request ids and buffers their log records.
///
/// Appends and reads share one short synchronous critical section, so the
/// buffer order is the insertion order. The lock is never held across an
/// await point.
#[derive(Debug)]
pub struct CorrelationTracker {
    capacity: usize,
    records: Mutex<VecDeque<LogRecord>>,
    sink: Option<LogSink>,
}

impl Default for CorrelationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl CorrelationTracker {
    /// Creates a tracker retaining at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            sink: None,
        }
    }

    /// Creates a tracker that also forwards every record to `sink`.
    pub fn with_sink(capacity: usize, sink: LogSink) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new(capacity)
        }
    }

    /// Generates a fresh UUID v4 request id.
    pub fn new_request_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Keeps a caller-supplied id when it is usable, otherwise generates one.
    ///
    /// Usable ids are 1-128 visible ASCII characters.
    pub fn resolve_request_id(candidate: Option<&str>) -> String {
        match candidate.map(str::trim) {
            Some(id)
                if !id.is_empty()
                    && id.len() <= MAX_REQUEST_ID_LEN
                    && id.bytes().all(|b| b.is_ascii_graphic()) =>
            {
                id.to_string()
            }
            _ => Self::new_request_id(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Appends a record, evicting the oldest one at capacity.
    pub fn record(&self, request_id: &str, level: LogLevel, message: impl Into<String>) {
        self.push(LogRecord {
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            details: None,
        });
    }

    /// Same as [`record`](Self::record) with a structured details object.
    pub fn record_with_details(
        &self,
        request_id: &str,
        level: LogLevel,
        message: impl Into<String>,
        details: serde_json::Value,
    ) {
        self.push(LogRecord {
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            details: Some(details),
        });
    }

    /// Most recent records first, optionally filtered to one request id.
    ///
    /// Each call reads the buffer as it is now. Unknown ids yield an empty
    /// vector.
    pub fn query(&self, request_id: Option<&str>, limit: usize) -> Vec<LogRecord> {
        let records = self.lock();
        records
            .iter()
            .rev()
            .filter(|record| request_id.map_or(true, |id| record.request_id == id))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Flushes and stops the file sink, if any.
    pub async fn shutdown(&self) {
        if let Some(sink) = &self.sink {
            sink.close().await;
        }
    }

    /// Ring, tracing output and file sink all see records in the order the
    /// lock is acquired.
    fn push(&self, record: LogRecord) {
        let mut records = self.lock();
        emit(&record);
        if let Some(sink) = &self.sink {
            sink.offer(&record);
        }

        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn emit(record: &LogRecord) {
    let details = record
        .details
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_default();

    match record.level {
        LogLevel::Failed | LogLevel::Error => tracing::error!(
            request_id = %record.request_id,
            stage = %record.level,
            details = %details,
            "{}",
            record.message
        ),
        LogLevel::Warn => tracing::warn!(
            request_id = %record.request_id,
            stage = %record.level,
            details = %details,
            "{}",
            record.message
        ),
        _ => tracing::info!(
            request_id = %record.request_id,
            stage = %record.level,
            details = %details,
            "{}",
            record.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn capacity_never_zero() {
        let tracker = CorrelationTracker::new(0);
        assert_eq!(tracker.capacity(), 1);
    }

    #[test]
    fn generated_ids_are_uuids() {
        let id = CorrelationTracker::new_request_id();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, CorrelationTracker::new_request_id());
    }

    #[test]
    fn caller_ids_are_kept_when_valid() {
        assert_eq!(CorrelationTracker::resolve_request_id(Some("t1")), "t1");
        assert_eq!(
            CorrelationTracker::resolve_request_id(Some("  abc-123  ")),
            "abc-123"
        );
    }

    #[test]
    fn unusable_caller_ids_are_replaced() {
        let too_long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        for candidate in [None, Some(""), Some("has space"), Some(too_long.as_str())] {
            let id = CorrelationTracker::resolve_request_id(candidate);
            assert!(
                Uuid::parse_str(&id).is_ok(),
                "expected generated id for {candidate:?}, got {id}"
            );
        }
    }

    #[test]
    fn query_returns_newest_first() {
        let tracker = CorrelationTracker::new(10);
        tracker.record("a", LogLevel::Info, "first");
        tracker.record("a", LogLevel::Info, "second");
        tracker.record("a", LogLevel::Info, "third");

        let messages: Vec<_> = tracker
            .query(None, 10)
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(messages, vec!["third", "second", "first"]);
    }

    #[test]
    fn query_filters_by_request_id_and_limit() {
        let tracker = CorrelationTracker::new(10);
        tracker.record("a", LogLevel::Received, "a1");
        tracker.record("b", LogLevel::Received, "b1");
        tracker.record("a", LogLevel::Succeeded, "a2");
        tracker.record("a", LogLevel::Info, "a3");

        let only_a = tracker.query(Some("a"), 2);
        assert_eq!(only_a.len(), 2);
        assert_eq!(only_a[0].message, "a3");
        assert_eq!(only_a[1].message, "a2");
        assert!(only_a.iter().all(|r| r.request_id == "a"));
    }

    #[test]
    fn unknown_id_yields_empty() {
        let tracker = CorrelationTracker::new(10);
        tracker.record("a", LogLevel::Info, "hello");
        assert!(tracker.query(Some("missing"), 10).is_empty());
    }

    #[test]
    fn oldest_records_are_evicted() {
        let capacity = 5;
        let extra = 3;
        let tracker = CorrelationTracker::new(capacity);
        for i in 0..capacity + extra {
            tracker.record("r", LogLevel::Info, format!("m{i}"));
        }

        assert_eq!(tracker.len(), capacity);
        let messages: Vec<_> = tracker
            .query(None, capacity)
            .into_iter()
            .map(|r| r.message)
            .collect();
        let expected: Vec<_> = (extra..capacity + extra)
            .rev()
            .map(|i| format!("m{i}"))
            .collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn details_are_kept() {
        let tracker = CorrelationTracker::new(4);
        tracker.record_with_details(
            "d",
            LogLevel::Failed,
            "boom",
            json!({"error_kind": "RenderTimeout"}),
        );

        let record = &tracker.query(Some("d"), 1)[0];
        assert_eq!(record.level, LogLevel::Failed);
        assert!(record.level.is_terminal());
        assert_eq!(
            record.details.as_ref().unwrap()["error_kind"],
            "RenderTimeout"
        );
    }

    #[test]
    fn record_serializes_without_empty_details() {
        let tracker = CorrelationTracker::new(4);
        tracker.record("s", LogLevel::Received, "hello");
        let json = serde_json::to_value(&tracker.query(None, 1)[0]).unwrap();
        assert_eq!(json["level"], "Received");
        assert!(json.get("details").is_none());
    }
}
