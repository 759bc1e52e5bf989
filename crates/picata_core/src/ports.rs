//! crates/picata_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the LMS, the model host, the PDF library and the filesystem.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Course, CourseListing, Quiz, QuizSubmission, Student};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, PDF parsing).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Local storage (the server's own disk) failed, as opposed to an upstream service.
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read-only access to the Learning Management System.
#[async_trait]
pub trait LmsService: Send + Sync {
    /// Every course visible to the configured account, in LMS order.
    async fn list_courses(&self) -> PortResult<Vec<CourseListing>>;

    async fn get_course(&self, course_id: u64) -> PortResult<Course>;

    async fn list_quizzes(&self, course_id: u64) -> PortResult<Vec<Quiz>>;

    async fn get_quiz(&self, course_id: u64, quiz_id: u64) -> PortResult<Quiz>;

    /// Users enrolled in the course as students.
    async fn list_students(&self, course_id: u64) -> PortResult<Vec<Student>>;

    async fn list_quiz_submissions(
        &self,
        course_id: u64,
        quiz_id: u64,
    ) -> PortResult<Vec<QuizSubmission>>;
}

/// A fully rendered prompt plus the longest the caller is willing to wait for it.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub elapsed: Duration,
}

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Sends the prompt and waits for the complete response text.
    async fn complete(&self, request: CompletionRequest) -> PortResult<Completion>;
}

#[async_trait]
pub trait DocumentTextExtractor: Send + Sync {
    /// Extracts plain text from a PDF, one entry per page in page order.
    async fn extract_pages(&self, pdf: &[u8]) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait AttendanceArchive: Send + Sync {
    /// Persists a complete attendance export and returns where it was written.
    /// Implementations must never leave a partially written file behind.
    async fn save(&self, file_name: &str, contents: &[u8]) -> PortResult<String>;
}
