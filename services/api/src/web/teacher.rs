//! services/api/src/web/teacher.rs
//!
//! Teacher portal endpoints: course directory, quiz and roster pickers,
//! submission listing and attendance capture.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{Local, Utc};
use picata_core::attendance::{export_file_name, AttendanceSheet};
use picata_core::catalog::build_directory;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::web::{
    protocol::*,
    rest::port_failure,
    state::{AppState, SessionHandle},
};

/// GET /teacher/courses - Current or past courses visible to the LMS account
#[utoipa::path(
    get,
    path = "/teacher/courses",
    params(CourseListQuery),
    responses(
        (status = 200, description = "Selectable courses of the requested term", body = CourseListResponse),
        (status = 401, description = "No active session"),
        (status = 502, description = "The LMS could not be reached")
    )
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<CourseListQuery>,
) -> Result<Json<CourseListResponse>, (StatusCode, String)> {
    let term = {
        let mut session = session.lock().await;
        if let Some(term) = query.term {
            session.course_term = term;
        }
        session.course_term
    };

    let listings = state
        .lms
        .list_courses()
        .await
        .map_err(|e| port_failure("list courses", e))?;
    let directory = build_directory(&listings, Utc::now());
    info!(
        "Course directory: {} current, {} past, {} skipped.",
        directory.current.len(),
        directory.past.len(),
        directory.skipped.len()
    );

    Ok(Json(CourseListResponse {
        term,
        courses: directory
            .selectable(term)
            .into_iter()
            .map(CourseSummary::from)
            .collect(),
        skipped: directory.skipped.iter().map(SkippedCourseReport::from).collect(),
    }))
}

/// GET /teacher/courses/{course_id}/quizzes - Quizzes of one course
///
/// A course without quizzes is not an error: the list is empty and `error` explains why.
#[utoipa::path(
    get,
    path = "/teacher/courses/{course_id}/quizzes",
    params(("course_id" = u64, Path, description = "LMS course id")),
    responses(
        (status = 200, description = "Quizzes, or an empty list with an error message", body = QuizListResponse)
    )
)]
pub async fn list_quizzes_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<u64>,
) -> Json<QuizListResponse> {
    match state.lms.list_quizzes(course_id).await {
        Ok(quizzes) => Json(QuizListResponse {
            course_id,
            quizzes: quizzes.iter().map(QuizSummary::from).collect(),
            error: None,
        }),
        Err(e) => {
            warn!("No quizzes for course {}: {}", course_id, e);
            Json(QuizListResponse {
                course_id,
                quizzes: Vec::new(),
                error: Some(format!("No quizzes could be loaded for this course: {}", e)),
            })
        }
    }
}

/// GET /teacher/courses/{course_id}/students - Enrolled students
#[utoipa::path(
    get,
    path = "/teacher/courses/{course_id}/students",
    params(("course_id" = u64, Path, description = "LMS course id")),
    responses(
        (status = 200, description = "Student roster", body = RosterResponse),
        (status = 404, description = "Unknown course")
    )
)]
pub async fn list_students_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<u64>,
) -> Result<Json<RosterResponse>, (StatusCode, String)> {
    let students = state
        .lms
        .list_students(course_id)
        .await
        .map_err(|e| port_failure("list students", e))?;

    Ok(Json(RosterResponse {
        course_id,
        students: students.iter().map(StudentSummary::from).collect(),
    }))
}

/// GET /teacher/courses/{course_id}/quizzes/{quiz_id}/submissions - Quiz submissions by student
///
/// Submissions that cannot be tied to an enrolled student are skipped and reported in `warnings`.
#[utoipa::path(
    get,
    path = "/teacher/courses/{course_id}/quizzes/{quiz_id}/submissions",
    params(
        ("course_id" = u64, Path, description = "LMS course id"),
        ("quiz_id" = u64, Path, description = "LMS quiz id")
    ),
    responses(
        (status = 200, description = "Submissions joined to student names", body = SubmissionListResponse),
        (status = 404, description = "Unknown course or quiz")
    )
)]
pub async fn list_submissions_handler(
    State(state): State<Arc<AppState>>,
    Path((course_id, quiz_id)): Path<(u64, u64)>,
) -> Result<Json<SubmissionListResponse>, (StatusCode, String)> {
    let roster = state
        .lms
        .list_students(course_id)
        .await
        .map_err(|e| port_failure("list students", e))?;
    let submissions = state
        .lms
        .list_quiz_submissions(course_id, quiz_id)
        .await
        .map_err(|e| port_failure("list quiz submissions", e))?;

    let names: HashMap<u64, &str> = roster.iter().map(|s| (s.id, s.name.as_str())).collect();
    let mut warnings = Vec::new();
    let mut summaries = Vec::new();

    for submission in submissions {
        let Some(user_id) = submission.user_id else {
            warnings.push(format!("Submission {} has no user", submission.id));
            continue;
        };
        let Some(name) = names.get(&user_id) else {
            warnings.push(format!(
                "Submission {} belongs to user {}, who is not an enrolled student",
                submission.id, user_id
            ));
            continue;
        };
        summaries.push(SubmissionSummary {
            submission_id: submission.id,
            student_id: user_id,
            student_name: name.to_string(),
            attempt: submission.attempt,
            score: submission.score,
            workflow_state: submission.workflow_state,
        });
    }
    if !warnings.is_empty() {
        warn!("Quiz {} submissions skipped: {:?}", quiz_id, warnings);
    }

    Ok(Json(SubmissionListResponse {
        course_id,
        quiz_id,
        submissions: summaries,
        warnings,
    }))
}

/// POST /teacher/courses/{course_id}/quizzes/{quiz_id}/attendance - Record attendance
///
/// Every enrolled student appears in the export; students without a mark are Absent.
#[utoipa::path(
    post,
    path = "/teacher/courses/{course_id}/quizzes/{quiz_id}/attendance",
    params(
        ("course_id" = u64, Path, description = "LMS course id"),
        ("quiz_id" = u64, Path, description = "LMS quiz id")
    ),
    request_body = AttendanceRequest,
    responses(
        (status = 201, description = "Attendance saved on the server", body = AttendanceResponse),
        (status = 200, description = "Attendance CSV download", body = String, content_type = "text/csv"),
        (status = 400, description = "A mark refers to a student who is not enrolled"),
        (status = 404, description = "Unknown course or quiz")
    )
)]
pub async fn submit_attendance_handler(
    State(state): State<Arc<AppState>>,
    Path((course_id, quiz_id)): Path<(u64, u64)>,
    Json(req): Json<AttendanceRequest>,
) -> Result<Response, (StatusCode, String)> {
    let lms = &state.lms;
    let course = lms
        .get_course(course_id)
        .await
        .map_err(|e| port_failure("load course", e))?;
    let quiz = lms
        .get_quiz(course_id, quiz_id)
        .await
        .map_err(|e| port_failure("load quiz", e))?;
    let roster = lms
        .list_students(course_id)
        .await
        .map_err(|e| port_failure("list students", e))?;

    let mut sheet = AttendanceSheet::new(roster);
    for (student_id, status) in &req.marks {
        sheet
            .mark(*student_id, *status)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    }

    let csv = sheet.to_csv();
    let file_name = export_file_name(&course.name, &quiz.title, Local::now().date_naive());
    let rows = sheet.rows();
    let total_present = sheet.present_count();
    info!(
        "Attendance for '{}' / '{}': {} of {} present.",
        course.name,
        quiz.title,
        total_present,
        rows.len()
    );

    match req.delivery {
        AttendanceDelivery::Download => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            csv,
        )
            .into_response()),
        AttendanceDelivery::Save => {
            let path = state
                .attendance_archive
                .save(&file_name, csv.as_bytes())
                .await
                .map_err(|e| port_failure("save attendance", e))?;

            Ok((
                StatusCode::CREATED,
                Json(AttendanceResponse {
                    file_name,
                    path,
                    total_students: rows.len(),
                    rows: rows.iter().map(AttendanceRow::from).collect(),
                    total_present,
                }),
            )
                .into_response())
        }
    }
}
