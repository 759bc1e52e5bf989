pub mod chat_task;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod session;
pub mod state;
pub mod student;
pub mod teacher;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use state::AppState;

/// Builds the full application: public routes, session-protected portal routes,
/// CORS for the configured front-end origin, and the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/", get(rest::home_handler))
        .route(
            "/session",
            post(session::start_session_handler).delete(session::end_session_handler),
        );

    // Portal routes (session required)
    let protected_routes = Router::new()
        .route("/teacher/courses", get(teacher::list_courses_handler))
        .route(
            "/teacher/courses/{course_id}/quizzes",
            get(teacher::list_quizzes_handler),
        )
        .route(
            "/teacher/courses/{course_id}/students",
            get(teacher::list_students_handler),
        )
        .route(
            "/teacher/courses/{course_id}/quizzes/{quiz_id}/submissions",
            get(teacher::list_submissions_handler),
        )
        .route(
            "/teacher/courses/{course_id}/quizzes/{quiz_id}/attendance",
            post(teacher::submit_attendance_handler),
        )
        .route(
            "/student/documents",
            post(student::upload_documents_handler)
                .get(student::list_documents_handler)
                .delete(student::clear_documents_handler),
        )
        .route("/student/transcript", get(student::transcript_handler))
        .route("/student/chat", post(student::chat_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::require_session,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi())))
}
