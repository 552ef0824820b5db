//! Operator-facing ring-buffer log, served by `/api/server-logs?since=<ms>`.
//!
//! This is separate from the `tracing`/`tracing-subscriber` structured log
//! stream the rest of the workspace's ambient stack emits to stdout/OTLP:
//! that stream is for operators watching a terminal or a collector: this
//! ring buffer is the dApp-facing operator console surface. [`RingBufferLayer`]
//! bridges the two so call sites only ever call `tracing::info!`/`warn!`/
//! `error!` once, and both sinks receive it.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub source: String,
    pub timestamp_ms: u64,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

/// Bounded ring of the most recent `CAPACITY` log entries.
pub struct RingLogger {
    entries: Mutex<VecDeque<LogEntry>>,
}

impl Default for RingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RingLogger {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(CAPACITY)),
        }
    }

    pub fn push(&self, message: impl Into<String>, kind: LogKind, source: impl Into<String>) {
        let mut entries = self.entries.lock().expect("ring logger mutex poisoned");
        if entries.len() == CAPACITY {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            message: message.into(),
            kind,
            source: source.into(),
            timestamp_ms: now_ms(),
        });
    }

    /// All entries with `timestamp_ms > since`, oldest first.
    pub fn since(&self, since_ms: u64) -> Vec<LogEntry> {
        let entries = self.entries.lock().expect("ring logger mutex poisoned");
        entries
            .iter()
            .filter(|e| e.timestamp_ms > since_ms)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

/// A `tracing_subscriber::Layer` that mirrors every `INFO`+ event into a
/// shared [`RingLogger`].
pub struct RingBufferLayer {
    logger: std::sync::Arc<RingLogger>,
}

impl RingBufferLayer {
    pub fn new(logger: std::sync::Arc<RingLogger>) -> Self {
        Self { logger }
    }
}

impl<S: Subscriber> Layer<S> for RingBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > tracing::Level::INFO {
            return;
        }
        let kind = match level {
            tracing::Level::ERROR => LogKind::Error,
            tracing::Level::WARN => LogKind::Warn,
            _ => LogKind::Info,
        };
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.logger
            .push(visitor.message, kind, event.metadata().target());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_to_capacity() {
        let logger = RingLogger::new();
        for i in 0..(CAPACITY + 10) {
            logger.push(format!("entry {i}"), LogKind::Info, "test");
        }
        assert_eq!(logger.since(0).len(), CAPACITY);
    }

    #[test]
    fn since_filters_by_timestamp() {
        let logger = RingLogger::new();
        logger.push("a", LogKind::Info, "test");
        let cutoff = now_ms();
        std::thread::sleep(std::time::Duration::from_millis(2));
        logger.push("b", LogKind::Info, "test");
        let recent = logger.since(cutoff);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "b");
    }
}
