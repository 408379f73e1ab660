//! Delivery of fired rules.
//!
//! The engine hands each fired rule to a [`Dispatcher`] and moves on;
//! retrying and delivery guarantees belong to the dispatcher.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use homeward_core::Rule;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

pub trait Dispatcher: Send + Sync {
    fn notify(&self, rule: &Rule, fired_at: DateTime<Utc>) -> Result<(), DispatchError>;
}

impl<T: Dispatcher + ?Sized> Dispatcher for &T {
    fn notify(&self, rule: &Rule, fired_at: DateTime<Utc>) -> Result<(), DispatchError> {
        (**self).notify(rule, fired_at)
    }
}

/// Logs each arrival at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn notify(&self, rule: &Rule, fired_at: DateTime<Utc>) -> Result<(), DispatchError> {
        tracing::info!(
            rule_id = %rule.id,
            recipients = rule.recipients.len(),
            "arrived at {} ({})",
            rule.label,
            fired_at.to_rfc3339()
        );
        Ok(())
    }
}

/// One line of the outbox file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub rule_id: String,
    pub label: String,
    pub recipients: Vec<String>,
    pub fired_at: DateTime<Utc>,
}

impl OutboxEntry {
    pub fn new(rule: &Rule, fired_at: DateTime<Utc>) -> Self {
        Self {
            rule_id: rule.id.clone(),
            label: rule.label.clone(),
            recipients: rule.recipients.clone(),
            fired_at,
        }
    }
}

/// Appends one JSON line per fired rule to a file, for a delivery agent to
/// pick up.
pub struct OutboxDispatcher {
    path: PathBuf,
}

impl OutboxDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Dispatcher for OutboxDispatcher {
    fn notify(&self, rule: &Rule, fired_at: DateTime<Utc>) -> Result<(), DispatchError> {
        let mut line = serde_json::to_string(&OutboxEntry::new(rule, fired_at))?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use homeward_core::RuleDraft;

    fn rule() -> Rule {
        RuleDraft::at("home", 49.4178, 2.8261)
            .with_recipients(&["alice", "bob"])
            .normalize()
            .expect("valid")
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T18:00:00Z")
            .expect("valid RFC3339")
            .with_timezone(&Utc)
    }

    #[test]
    fn outbox_appends_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("outbox.jsonl");
        let outbox = OutboxDispatcher::new(&path);

        outbox.notify(&rule(), t0()).expect("first");
        outbox.notify(&rule(), t0()).expect("second");

        let content = std::fs::read_to_string(&path).expect("read");
        let entries: Vec<OutboxEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rule_id, "home");
        assert_eq!(entries[0].recipients, vec!["alice", "bob"]);
        assert_eq!(entries[0].fired_at, t0());
    }

    #[test]
    fn outbox_in_missing_dir_fails() {
        let outbox = OutboxDispatcher::new("/nonexistent/dir/outbox.jsonl");
        assert!(matches!(
            outbox.notify(&rule(), t0()),
            Err(DispatchError::Io(_))
        ));
    }

    #[test]
    fn log_dispatcher_never_fails() {
        assert!(LogDispatcher.notify(&rule(), t0()).is_ok());
    }
}
