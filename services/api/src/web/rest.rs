//! services/api/src/web/rest.rs
//!
//! Contains the home endpoint, the shared mapping from port errors to HTTP
//! responses, and the master definition for the OpenAPI specification.

use axum::{http::StatusCode, response::Json};
use picata_core::ports::PortError;
use tracing::error;
use utoipa::OpenApi;

use crate::web::{protocol::*, session, student, teacher};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        home_handler,
        session::start_session_handler,
        session::end_session_handler,
        teacher::list_courses_handler,
        teacher::list_quizzes_handler,
        teacher::list_students_handler,
        teacher::list_submissions_handler,
        teacher::submit_attendance_handler,
        student::upload_documents_handler,
        student::list_documents_handler,
        student::clear_documents_handler,
        student::transcript_handler,
        student::chat_handler,
    ),
    components(schemas(
        HomeResponse,
        SessionResponse,
        CourseSummary,
        SkippedCourseReport,
        CourseListResponse,
        QuizSummary,
        QuizListResponse,
        StudentSummary,
        RosterResponse,
        SubmissionSummary,
        SubmissionListResponse,
        AttendanceDelivery,
        AttendanceRequest,
        AttendanceRow,
        AttendanceResponse,
        DocumentSummary,
        UploadFailure,
        DocumentUploadResponse,
        DocumentListResponse,
        ChatRequest,
        ChatResponse,
        TurnDto,
        TranscriptResponse,
    )),
    tags(
        (name = "picaTA API", description = "Teacher dashboard over the LMS and the student tutoring chat.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Home
//=========================================================================================

/// GET / - Landing page content
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome text", body = HomeResponse))
)]
pub async fn home_handler() -> Json<HomeResponse> {
    Json(HomeResponse {
        title: "Welcome to picaTA".to_string(),
        description: "PICATA is a tool for instructors who wish to combine Peer Instruction (PI) and Continuous Assessments (CA) utilizing results from students' earlier CA data.".to_string(),
    })
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a failed port call to the status and message returned to the page.
///
/// Upstream failures (LMS or model host) surface as gateway errors; failures of the
/// server's own storage are 500s.
pub(crate) fn port_failure(action: &str, e: PortError) -> (StatusCode, String) {
    error!("Failed to {}: {:?}", action, e);
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PortError::Unauthorized | PortError::Unexpected(_) => StatusCode::BAD_GATEWAY,
        PortError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, format!("Failed to {}: {}", action, e))
}
