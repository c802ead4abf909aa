//! Best-effort persistence of log records as JSON lines.
//!
//! Records are handed to a background task over a bounded channel. A full
//! channel drops the record for the file only; the in-memory buffer keeps it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::tracker::LogRecord;

/// Records queued for the writer before new ones are dropped.
pub const DEFAULT_SINK_BUFFER: usize = 1024;

/// Handle to the background log-file writer.
#[derive(Debug)]
pub struct LogSink {
    tx: mpsc::Sender<LogRecord>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LogSink {
    /// Spawns the writer task. Must be called from within a tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>, buffer: usize) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_writer(path, rx, shutdown.clone()));

        Self {
            tx,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// Queues a copy of `record` without waiting. Returns false when dropped.
    pub fn offer(&self, record: &LogRecord) -> bool {
        self.tx.try_send(record.clone()).is_ok()
    }

    /// Writes out everything already queued, then stops the task. Idempotent.
    pub async fn close(&self) {
        self.shutdown.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "log sink task ended abnormally");
            }
        }
    }
}

async fn run_writer(
    path: PathBuf,
    mut rx: mpsc::Receiver<LogRecord>,
    shutdown: CancellationToken,
) {
    let file = match OpenOptions::new().create(true).append(true).open(&path).await {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "log file unavailable; records stay in memory only"
            );
            return;
        }
    };
    let mut writer = BufWriter::new(file);

    loop {
        tokio::select! {
            biased;
            received = rx.recv() => match received {
                Some(record) => {
                    write_record(&mut writer, &record, &path).await;
                    if rx.is_empty() {
                        if let Err(err) = writer.flush().await {
                            tracing::warn!(path = %path.display(), error = %err, "failed to flush log file");
                        }
                    }
                }
                None => break,
            },
            _ = shutdown.cancelled() => {
                while let Ok(record) = rx.try_recv() {
                    write_record(&mut writer, &record, &path).await;
                }
                break;
            }
        }
    }

    if let Err(err) = writer.flush().await {
        tracing::warn!(path = %path.display(), error = %err, "failed to flush log file");
    }
}

async fn write_record<W>(writer: &mut W, record: &LogRecord, path: &Path)
where
    W: AsyncWriteExt + Unpin,
{
    let mut line = match serde_json::to_vec(record) {
        Ok(line) => line,
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize log record");
            return;
        }
    };
    line.push(b'\n');

    if let Err(err) = writer.write_all(&line).await {
        tracing::warn!(path = %path.display(), error = %err, "failed to append to log file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{CorrelationTracker, LogLevel};

    #[tokio::test]
    async fn records_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.jsonl");

        let tracker = CorrelationTracker::with_sink(10, LogSink::spawn(&path, 16));
        tracker.record("f1", LogLevel::Received, "start");
        tracker.record("f1", LogLevel::Succeeded, "done");
        tracker.shutdown().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let records: Vec<LogRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "start");
        assert_eq!(records[1].level, LogLevel::Succeeded);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::spawn(dir.path().join("logs.jsonl"), 4);
        sink.close().await;
        sink.close().await;
    }

    #[tokio::test]
    async fn unwritable_path_keeps_memory_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("logs.jsonl");

        let tracker = CorrelationTracker::with_sink(10, LogSink::spawn(&path, 4));
        tracker.record("u1", LogLevel::Info, "kept");
        tracker.shutdown().await;

        assert_eq!(tracker.query(Some("u1"), 10).len(), 1);
        assert!(!path.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn file_order_matches_buffer_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.jsonl");
        let writers = 4;
        let per_writer = 100;
        let total = writers * per_writer;
        let tracker = CorrelationTracker::with_sink(total, LogSink::spawn(&path, total));

        std::thread::scope(|scope| {
            for w in 0..writers {
                let tracker = &tracker;
                scope.spawn(move || {
                    for i in 0..per_writer {
                        tracker.record(&format!("w{w}"), LogLevel::Info, format!("{w}-{i}"));
                    }
                });
            }
        });
        tracker.shutdown().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let written: Vec<String> = contents
            .lines()
            .map(|line| serde_json::from_str::<LogRecord>(line).unwrap().message)
            .collect();
        let buffered: Vec<String> = tracker
            .query(None, total)
            .into_iter()
            .rev()
            .map(|r| r.message)
            .collect();
        assert_eq!(written.len(), total);
        assert_eq!(written, buffered);
    }
}
