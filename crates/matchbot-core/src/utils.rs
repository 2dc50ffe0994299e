use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::Result;

/// RFC3339 timestamp in UTC (for logs).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

const AUDIT_MAX_TEXT: usize = 500;

/// One processed inbound event.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl AuditEvent {
    pub fn command(sender: &str, origin: &str, content: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: "command".to_string(),
            sender: Some(sender.to_string()),
            origin: Some(origin.to_string()),
            content: Some(content.to_string()),
        }
    }

    pub fn join(user: &str, channel: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: "join".to_string(),
            sender: Some(user.to_string()),
            origin: Some(channel.to_string()),
            content: None,
        }
    }
}

/// Append-only audit trail; plain lines or JSONL. A logger without a path
/// swallows everything, so callers never branch.
pub struct AuditLogger {
    path: Option<PathBuf>,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: Option<PathBuf>, json: bool) -> Self {
        Self { path, json }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            json: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        event.content = event
            .content
            .map(|c| truncate_text(&c, AUDIT_MAX_TEXT));

        let line = if self.json {
            serde_json::to_string(&event)?
        } else {
            format!(
                "[{}] {} {}@{}: {}",
                event.timestamp,
                event.event,
                event.sender.as_deref().unwrap_or("-"),
                event.origin.as_deref().unwrap_or("-"),
                event.content.as_deref().unwrap_or("")
            )
        };

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

fn truncate_text(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
