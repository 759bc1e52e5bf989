//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser pages and the API server.

use chrono::{DateTime, Utc};
use picata_core::catalog::SkippedCourse;
use picata_core::domain::{
    AttendanceRecord, AttendanceStatus, ChatRole, ChatTurn, Course, CourseTerm, DocumentOrigin,
    DocumentText, Quiz, Student,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Home and Session
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HomeResponse {
    pub title: String,
    pub description: String,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: Uuid,
    /// Documents already loaded into the new session's chat context.
    pub documents: Vec<DocumentSummary>,
}

//=========================================================================================
// Teacher Portal
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseListQuery {
    /// `current` or `past`. Defaults to the term last viewed in this session.
    #[param(value_type = Option<String>, example = "current")]
    pub term: Option<CourseTerm>,
}

#[derive(Serialize, ToSchema)]
pub struct CourseSummary {
    pub id: u64,
    pub name: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            name: course.name.clone(),
            start_at: course.start_at,
            end_at: course.end_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SkippedCourseReport {
    pub course_id: u64,
    pub reason: String,
}

impl From<&SkippedCourse> for SkippedCourseReport {
    fn from(skipped: &SkippedCourse) -> Self {
        Self {
            course_id: skipped.course_id,
            reason: skipped.reason.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CourseListResponse {
    #[schema(value_type = String, example = "current")]
    pub term: CourseTerm,
    pub courses: Vec<CourseSummary>,
    /// Courses that could not be classified, e.g. because of malformed dates.
    pub skipped: Vec<SkippedCourseReport>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizSummary {
    pub id: u64,
    pub title: String,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizListResponse {
    pub course_id: u64,
    pub quizzes: Vec<QuizSummary>,
    /// Set when the LMS could not list quizzes for this course.
    pub error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StudentSummary {
    pub id: u64,
    pub name: String,
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            name: student.name.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RosterResponse {
    pub course_id: u64,
    pub students: Vec<StudentSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct SubmissionSummary {
    pub submission_id: u64,
    pub student_id: u64,
    pub student_name: String,
    pub attempt: Option<u32>,
    pub score: Option<f64>,
    pub workflow_state: String,
}

#[derive(Serialize, ToSchema)]
pub struct SubmissionListResponse {
    pub course_id: u64,
    pub quiz_id: u64,
    pub submissions: Vec<SubmissionSummary>,
    /// Submissions that were skipped, with the reason.
    pub warnings: Vec<String>,
}

#[derive(Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceDelivery {
    /// Write the CSV into the server's attendance directory.
    #[default]
    Save,
    /// Return the CSV bytes as a file download.
    Download,
}

#[derive(Deserialize, ToSchema)]
pub struct AttendanceRequest {
    /// Student id -> `Here` or `Absent`. Students not listed are Absent.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub marks: HashMap<u64, AttendanceStatus>,
    #[serde(default)]
    pub delivery: AttendanceDelivery,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceRow {
    pub student_name: String,
    pub status: String,
}

impl From<&AttendanceRecord> for AttendanceRow {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            student_name: record.student_name.clone(),
            status: record.status.as_str().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceResponse {
    pub file_name: String,
    pub path: String,
    pub rows: Vec<AttendanceRow>,
    pub total_present: usize,
    pub total_students: usize,
}

//=========================================================================================
// Student Portal
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct DocumentSummary {
    pub source: String,
    pub origin: String,
    pub characters: usize,
}

impl From<&DocumentText> for DocumentSummary {
    fn from(document: &DocumentText) -> Self {
        Self {
            source: document.source.clone(),
            origin: match document.origin {
                DocumentOrigin::Bundled => "bundled".to_string(),
                DocumentOrigin::Uploaded => "uploaded".to_string(),
            },
            characters: document.text.chars().count(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UploadFailure {
    pub file: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentUploadResponse {
    /// Every document now in the session's context.
    pub documents: Vec<DocumentSummary>,
    /// Files from this upload that were already processed earlier in the session.
    pub reused: Vec<String>,
    pub errors: Vec<UploadFailure>,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
    pub latency_ms: u64,
    pub turns: usize,
}

#[derive(Serialize, ToSchema)]
pub struct TurnDto {
    pub role: String,
    pub text: String,
}

impl From<&ChatTurn> for TurnDto {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            role: match turn.role {
                ChatRole::User => "user".to_string(),
                ChatRole::Assistant => "assistant".to_string(),
            },
            text: turn.text.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TranscriptResponse {
    /// `idle` or `awaiting_model`.
    pub state: String,
    pub turns: Vec<TurnDto>,
}
