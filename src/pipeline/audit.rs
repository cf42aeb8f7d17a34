//! Best-effort record of every classification.
//!
//! The orchestrator calls `record` after assembling a result and ignores
//! failures: an unwritable log never costs a report its classification.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::types::{EnrichedResult, Priority};

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit log lock poisoned")]
    LockPoisoned,
}

pub trait AuditSink: Send + Sync {
    fn record(&self, raw: &str, normalized: &str, result: &EnrichedResult) -> Result<(), AuditError>;
}

/// One line of the JSONL prediction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub normalized: String,
    pub category: Option<String>,
    pub category_confidence: f32,
    pub priority: Priority,
    pub priority_confidence: f32,
    pub room: Option<String>,
    pub floor: Option<String>,
    pub elapsed_time: Option<String>,
}

impl AuditEntry {
    pub fn new(raw: &str, normalized: &str, result: &EnrichedResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            text: raw.to_string(),
            normalized: normalized.to_string(),
            category: result.category.clone(),
            category_confidence: result.category_confidence,
            priority: result.priority,
            priority_confidence: result.priority_confidence,
            room: result.meta.room.clone(),
            floor: result.meta.floor.clone(),
            elapsed_time: result.meta.elapsed_time.clone(),
        }
    }
}

/// Appends one JSON object per line. Parent directories are created on demand.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, raw: &str, normalized: &str, result: &EnrichedResult) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(&AuditEntry::new(raw, normalized, result))?;
        line.push('\n');

        let _guard = self.write_lock.lock().map_err(|_| AuditError::LockPoisoned)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Emits a structured log line per classification. Report text is omitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, raw: &str, _normalized: &str, result: &EnrichedResult) -> Result<(), AuditError> {
        tracing::info!(
            text_len = raw.chars().count(),
            category = result.category.as_deref().unwrap_or("-"),
            category_confidence = result.category_confidence,
            priority = %result.priority,
            priority_confidence = result.priority_confidence,
            overrides = result.overrides.len(),
            "Report classified"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _raw: &str, _normalized: &str, _result: &EnrichedResult) -> Result<(), AuditError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{ExtractedMeta, PrioritySource, ProbabilityMap};
    use tempfile::TempDir;

    fn result() -> EnrichedResult {
        EnrichedResult {
            category: Some("điện".into()),
            category_confidence: 0.8,
            category_probs: ProbabilityMap::new(),
            combined_probs: None,
            priority: Priority::Urgent,
            priority_confidence: 0.9,
            priority_probs: None,
            priority_source: PrioritySource::PriorityModel,
            overrides: Vec::new(),
            meta: ExtractedMeta {
                room: Some("402".into()),
                floor: Some("4".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn jsonl_log_appends_one_line_per_call() {
        let dir = TempDir::new().unwrap();
        let log = JsonlAuditLog::new(dir.path().join("logs").join("predictions.jsonl"));

        log.record("Phòng 402 cháy", "phong 402 cháy", &result()).unwrap();
        log.record("lần hai", "lần hai", &result()).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let entries: Vec<AuditEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "Phòng 402 cháy");
        assert_eq!(entries[0].priority, Priority::Urgent);
        assert_eq!(entries[0].floor.as_deref(), Some("4"));
        assert_ne!(entries[0].id, entries[1].id);
    }

    #[test]
    fn jsonl_log_reports_unwritable_path() {
        let dir = TempDir::new().unwrap();
        // a directory where the file should be
        let log = JsonlAuditLog::new(dir.path());
        assert!(log.record("x", "x", &result()).is_err());
    }

    #[test]
    fn other_sinks_accept_everything() {
        assert!(TracingAuditSink.record("x", "x", &result()).is_ok());
        assert!(NoopAuditSink.record("x", "x", &result()).is_ok());
    }
}
