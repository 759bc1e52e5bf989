//! crates/picata_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of the LMS wire format and of the web layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name used when a course carries no usable name field at all.
pub const UNKNOWN_COURSE: &str = "Unknown Course";

//=========================================================================================
// Course Directory
//=========================================================================================

/// A course exactly as the LMS reported it, before any parsing.
///
/// Every field except the id may be missing: Canvas strips most attributes from
/// courses the account can no longer access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseListing {
    pub id: u64,
    pub name: Option<String>,
    pub course_code: Option<String>,
    pub sis_course_id: Option<String>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
}

/// A course with its resolved display name and parsed term boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub id: u64,
    pub name: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Whether a course is still running or already finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseTerm {
    #[default]
    Current,
    Past,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quiz {
    pub id: u64,
    pub course_id: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: u64,
    pub name: String,
}

/// One attempt at a quiz. `user_id` is optional because the LMS occasionally
/// returns submissions detached from any enrolled user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSubmission {
    pub id: u64,
    pub user_id: Option<u64>,
    pub attempt: Option<u32>,
    pub score: Option<f64>,
    pub workflow_state: String,
}

//=========================================================================================
// Attendance
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Here,
    #[default]
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Here => "Here",
            AttendanceStatus::Absent => "Absent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Here" => Some(AttendanceStatus::Here),
            "Absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

/// A single row of the tabulated attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub student_name: String,
    pub status: AttendanceStatus,
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Represents a single message in the transcript. Turns are never edited once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, text: text.into() }
    }
}

//=========================================================================================
// Documents
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOrigin {
    /// Shipped with the deployment and loaded into every session.
    Bundled,
    Uploaded,
}

/// Text extracted from one PDF, already chunked and re-joined into model context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    pub source: String,
    pub origin: DocumentOrigin,
    pub text: String,
}
