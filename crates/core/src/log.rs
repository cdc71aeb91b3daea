// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log lines and windows ingested from monitored containers.

use serde::{Deserialize, Serialize};

use crate::container::ContainerId;

/// Severity inferred from simple pattern heuristics on a raw log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

impl LogLevel {
    /// Infer a level from a raw line using simple pattern heuristics:
    /// `error`/`fatal` -> error, `warn` -> warn, `debug` -> debug, else info.
    /// Case-insensitive substring match.
    pub fn infer(line: &str) -> Self {
        let lower = line.to_ascii_lowercase();
        if lower.contains("error") || lower.contains("fatal") {
            LogLevel::Error
        } else if lower.contains("warn") {
            LogLevel::Warn
        } else if lower.contains("debug") {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

/// A single log line as published on the `log` topic, already redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub container_id: ContainerId,
    pub stream: LogStream,
    pub level: LogLevel,
    pub text: String,
    pub timestamp_ms: u64,
}

/// Which of the container's two output streams a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

crate::simple_display! {
    LogStream {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Default number of lines the ingester batches into one window (named
/// `LOG_LINES_PER_CHECK` in the environment table).
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Maximum characters of a single line forwarded to the classifier
/// (each truncated to 500 chars before being sent to the classifier).
pub const MAX_LINE_CHARS_FOR_CLASSIFIER: usize = 500;

/// An immutable, ordered batch of log lines from a single container.
///
/// Emitted by the ingester when the configured window size is reached or
/// the flush interval elapses with at least one buffered line.
/// Window sequence numbers are monotonically increasing per container so
/// the anomaly gate can detect and reject stale verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogWindow {
    pub container_id: ContainerId,
    pub sequence: u64,
    pub lines: Vec<LogLine>,
    pub earliest_ms: u64,
    pub latest_ms: u64,
}

impl LogWindow {
    /// Truncate each line to `MAX_LINE_CHARS_FOR_CLASSIFIER` characters for
    /// inclusion in a classifier request, preserving char boundaries.
    pub fn truncated_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| {
                let mut end = l.text.len().min(MAX_LINE_CHARS_FOR_CLASSIFIER);
                while !l.text.is_char_boundary(end) {
                    end -= 1;
                }
                l.text[..end].to_string()
            })
            .collect()
    }
}

/// Accumulates raw lines for a single container into windows, flushing on
/// size or time. Owned by the log ingester task.
pub struct WindowBuilder {
    container_id: ContainerId,
    max_size: usize,
    buffer: Vec<LogLine>,
    next_sequence: u64,
}

impl WindowBuilder {
    pub fn new(container_id: ContainerId, max_size: usize) -> Self {
        Self { container_id, max_size: max_size.max(1), buffer: Vec::new(), next_sequence: 0 }
    }

    pub fn push(&mut self, line: LogLine) -> Option<LogWindow> {
        self.buffer.push(line);
        if self.buffer.len() >= self.max_size {
            self.flush()
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Emit whatever is buffered as a window, if non-empty.
    pub fn flush(&mut self) -> Option<LogWindow> {
        if self.buffer.is_empty() {
            return None;
        }
        let lines = std::mem::take(&mut self.buffer);
        let earliest_ms = lines.first().map(|l| l.timestamp_ms).unwrap_or(0);
        let latest_ms = lines.last().map(|l| l.timestamp_ms).unwrap_or(0);
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(LogWindow { container_id: self.container_id.clone(), sequence, lines, earliest_ms, latest_ms })
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
