//! Audit log entries
//!
//! Every invocation of the engine leaves exactly one audit entry in the host's event
//! log. This is the only channel through which operators see what happened to a
//! sample, so entries carry the human-readable action trace as well as the rendered
//! cause chain of any fault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name under which entries are recorded
pub const AUDIT_NAME: &str = "SkipLot";

/// Source under which entries are recorded
pub const AUDIT_SOURCE: &str = "skiplot::engine";

/// Severity of an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditLevel {
    Error,
    Warning,
    Informational,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Error => "Error",
            AuditLevel::Warning => "Warning",
            AuditLevel::Informational => "Informational",
        }
    }
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the host event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub level: AuditLevel,
    pub name: String,
    pub source: String,

    /// Technical message; for faults, the action label and the full cause chain
    pub message: String,

    /// Operator-facing text, the action trace joined with `<br>`
    pub friendly_message: String,

    /// Cause chain, one element per error, outermost first
    #[serde(default)]
    pub stack_trace: Option<String>,

    pub event_date_time: DateTime<Utc>,
}

impl AuditEntry {
    fn new(level: AuditLevel, message: String, friendly_message: String) -> Self {
        Self {
            level,
            name: AUDIT_NAME.to_string(),
            source: AUDIT_SOURCE.to_string(),
            message,
            friendly_message,
            stack_trace: None,
            event_date_time: Utc::now(),
        }
    }

    /// Entry for an invocation that ran to completion
    pub fn informational(friendly_message: impl Into<String>) -> Self {
        Self::new(
            AuditLevel::Informational,
            "Task executed successfully.".to_string(),
            friendly_message.into(),
        )
    }

    /// Entry for an invocation that ended without processing anything worth noting
    pub fn warning(message: impl Into<String>, friendly_message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Warning, message.into(), friendly_message.into())
    }

    /// Entry for an invocation aborted by a configuration error or fault
    pub fn error(
        action: &str,
        cause_chain: &[String],
        friendly_message: impl Into<String>,
    ) -> Self {
        let mut entry = Self::new(
            AuditLevel::Error,
            format!(
                "Action that raised the error: {action} <br>{}",
                cause_chain.join(" ")
            ),
            friendly_message.into(),
        );
        entry.stack_trace = Some(cause_chain.join("\n"));
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_informational_entry() {
        let entry = AuditEntry::informational("Sample Id: 4<br>New aggregate Id: 9");
        assert_eq!(entry.level, AuditLevel::Informational);
        assert_eq!(entry.name, "SkipLot");
        assert_eq!(entry.source, "skiplot::engine");
        assert!(entry.stack_trace.is_none());
    }

    #[test]
    fn test_error_entry_includes_action_and_chain() {
        let chain = vec![
            "Store error: query failed".to_string(),
            "connection reset".to_string(),
        ];
        let entry = AuditEntry::error("GetWorkSampleCount", &chain, "Error when executing task.");

        assert_eq!(entry.level, AuditLevel::Error);
        assert_eq!(
            entry.message,
            "Action that raised the error: GetWorkSampleCount <br>Store error: query failed connection reset"
        );
        assert_eq!(
            entry.stack_trace.as_deref(),
            Some("Store error: query failed\nconnection reset")
        );
    }

    #[test]
    fn test_level_display() {
        assert_eq!(AuditLevel::Warning.to_string(), "Warning");
    }
}
