//! Task aggregate, status/priority vocabulary, and version tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task lifecycle status.
///
/// `Overdue` is a computed state: clients may never set it explicitly, the
/// service rewrites a task into it when its due date has elapsed and the
/// status is not terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Draft,
    Open,
    InProgress,
    Completed,
    Overdue,
    Cancelled,
}

/// Returned when a stored or query string names no known status/priority.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized value: {0}")]
pub struct ParseStatusError(pub String);

impl TaskStatus {
    /// Canonical storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed and Cancelled are terminal for the due scanner: rows in
    /// either state are never claimed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "open" => Ok(Self::Open),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError(value.to_owned())),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Ordering rank used by priority sorts (Low < Medium < High).
    pub const fn rank(self) -> i16 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseStatusError(value.to_owned())),
        }
    }
}

/// Generates a fresh opaque version token.
///
/// The token is rewritten on every committed mutation of a task row; clients
/// carry it base64-encoded in conditional-request headers. Modeled as plain
/// bytes rather than a store-native rowversion so the scheme is portable.
pub fn fresh_version() -> Vec<u8> {
    Uuid::new_v4().as_bytes().to_vec()
}

/// Task row as the domain sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub owner_id: Uuid,
    pub assignee_id: Option<Uuid>,
    /// Reserved flag; never mutated by the core.
    pub reminder_sent: bool,
    /// The scanner's claim marker. NULL means unclaimed; once set it stays
    /// set for the lifetime of the row.
    pub due_notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Opaque token rewritten on every committed write.
    pub version: Vec<u8>,
}

impl Task {
    /// True when the due date has elapsed and the status is not terminal.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now && !self.status.is_terminal()
    }

    /// Status as observed by clients: `Overdue` when the task has drifted
    /// past its due date without an update, the stored status otherwise.
    pub fn effective_status(&self, now: DateTime<Utc>) -> TaskStatus {
        if self.is_overdue(now) {
            TaskStatus::Overdue
        } else {
            self.status
        }
    }
}
