//! Shared test infrastructure for the HTTP-level tests.
//!
//! The application is assembled with in-memory fakes for the LMS, the model host
//! and the PDF parser, and a real filesystem archive under a temporary directory.
//! Requests go through the full router with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use picata_api::{
    adapters::FsAttendanceArchive,
    config::Config,
    web::{router, state::AppState},
};
use picata_core::domain::{Course, CourseListing, Quiz, QuizSubmission, Student};
use picata_core::ports::{
    Completion, CompletionRequest, DocumentTextExtractor, LanguageModelService, LmsService,
    PortError, PortResult,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const COURSE_ID: u64 = 101;
pub const QUIZ_ID: u64 = 7;
pub const COURSE_NAME: &str = "Discrete Math";
pub const QUIZ_TITLE: &str = "Quiz 1";
/// A quiz whose title carries a double quote and a control character.
pub const QUOTED_QUIZ_ID: u64 = 8;

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CAROL: u64 = 3;

pub const TUTOR_ANSWER: &str = "What do you think connects two vertices?";

// ============================================================================
// FAKE LMS
// ============================================================================

pub struct FakeLms {
    pub courses: Vec<CourseListing>,
    pub quizzes: HashMap<u64, Vec<Quiz>>,
    pub students: HashMap<u64, Vec<Student>>,
    pub submissions: HashMap<(u64, u64), Vec<QuizSubmission>>,
}

fn listing(id: u64, name: Option<&str>, end_at: Option<&str>) -> CourseListing {
    CourseListing {
        id,
        name: name.map(str::to_string),
        end_at: end_at.map(str::to_string),
        ..Default::default()
    }
}

impl FakeLms {
    /// One current course with a quiz and three students, one past course,
    /// one course without any name, and one with a malformed end date.
    pub fn seeded() -> Self {
        let courses = vec![
            listing(COURSE_ID, Some(COURSE_NAME), Some("2099-12-20T23:59:59Z")),
            listing(102, Some("Intro to Logic"), Some("2020-05-01T00:00:00Z")),
            CourseListing {
                id: 103,
                course_code: Some("CS-205".to_string()),
                ..Default::default()
            },
            listing(104, None, Some("2020-01-01T00:00:00Z")),
            listing(105, Some("Broken Dates"), Some("next spring")),
        ];

        let students = vec![
            Student { id: ALICE, name: "Alice".to_string() },
            Student { id: BOB, name: "Bob".to_string() },
            Student { id: CAROL, name: "Carol".to_string() },
        ];

        let submissions = vec![
            QuizSubmission {
                id: 900,
                user_id: Some(ALICE),
                attempt: Some(1),
                score: Some(8.5),
                workflow_state: "complete".to_string(),
            },
            QuizSubmission {
                id: 901,
                user_id: Some(42),
                attempt: Some(1),
                score: Some(3.0),
                workflow_state: "complete".to_string(),
            },
            QuizSubmission {
                id: 902,
                user_id: None,
                attempt: None,
                score: None,
                workflow_state: "untaken".to_string(),
            },
        ];

        Self {
            courses,
            quizzes: HashMap::from([(
                COURSE_ID,
                vec![
                    Quiz {
                        id: QUIZ_ID,
                        course_id: COURSE_ID,
                        title: QUIZ_TITLE.to_string(),
                    },
                    Quiz {
                        id: QUOTED_QUIZ_ID,
                        course_id: COURSE_ID,
                        title: "The \"Hard\"\u{7} One".to_string(),
                    },
                ],
            )]),
            students: HashMap::from([(COURSE_ID, students)]),
            submissions: HashMap::from([((COURSE_ID, QUIZ_ID), submissions)]),
        }
    }
}

#[async_trait]
impl LmsService for FakeLms {
    async fn list_courses(&self) -> PortResult<Vec<CourseListing>> {
        Ok(self.courses.clone())
    }

    async fn get_course(&self, course_id: u64) -> PortResult<Course> {
        let listing = self
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .ok_or_else(|| PortError::NotFound(format!("course {}", course_id)))?;
        picata_core::catalog::to_course(listing).map_err(PortError::Unexpected)
    }

    async fn list_quizzes(&self, course_id: u64) -> PortResult<Vec<Quiz>> {
        self.quizzes
            .get(&course_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("quizzes of course {}", course_id)))
    }

    async fn get_quiz(&self, course_id: u64, quiz_id: u64) -> PortResult<Quiz> {
        self.list_quizzes(course_id)
            .await?
            .into_iter()
            .find(|q| q.id == quiz_id)
            .ok_or_else(|| PortError::NotFound(format!("quiz {}", quiz_id)))
    }

    async fn list_students(&self, course_id: u64) -> PortResult<Vec<Student>> {
        self.students
            .get(&course_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("course {}", course_id)))
    }

    async fn list_quiz_submissions(
        &self,
        course_id: u64,
        quiz_id: u64,
    ) -> PortResult<Vec<QuizSubmission>> {
        self.submissions
            .get(&(course_id, quiz_id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("quiz {}", quiz_id)))
    }
}

// ============================================================================
// FAKE MODEL HOST
// ============================================================================

pub enum ModelBehavior {
    Answer(String),
    Fail,
    TimeOut,
    /// Answers only after `FakeModel::release` is called.
    Gated(String),
}

pub struct FakeModel {
    behavior: ModelBehavior,
    prompts: Mutex<Vec<String>>,
    gate: Notify,
}

impl FakeModel {
    pub fn new(behavior: ModelBehavior) -> Self {
        Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
            gate: Notify::new(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl LanguageModelService for FakeModel {
    async fn complete(&self, request: CompletionRequest) -> PortResult<Completion> {
        self.prompts.lock().unwrap().push(request.prompt);
        match &self.behavior {
            ModelBehavior::Answer(text) => Ok(Completion {
                text: text.clone(),
                elapsed: Duration::from_millis(5),
            }),
            ModelBehavior::Fail => Err(PortError::Unexpected("connection refused".to_string())),
            ModelBehavior::TimeOut => Err(PortError::Timeout(request.timeout)),
            ModelBehavior::Gated(text) => {
                self.gate.notified().await;
                Ok(Completion {
                    text: text.clone(),
                    elapsed: Duration::from_millis(5),
                })
            }
        }
    }
}

// ============================================================================
// FAKE PDF PARSER
// ============================================================================

/// Treats any body starting with `%PDF` as a PDF whose pages are separated by form feeds.
pub struct FakeExtractor;

pub fn fake_pdf(pages: &[&str]) -> Vec<u8> {
    format!("%PDF{}", pages.join("\u{c}")).into_bytes()
}

#[async_trait]
impl DocumentTextExtractor for FakeExtractor {
    async fn extract_pages(&self, pdf: &[u8]) -> PortResult<Vec<String>> {
        let text = std::str::from_utf8(pdf)
            .ok()
            .and_then(|t| t.strip_prefix("%PDF"))
            .ok_or_else(|| PortError::InvalidInput("not a PDF document".to_string()))?;
        Ok(text.split('\u{c}').map(str::to_string).collect())
    }
}

// ============================================================================
// APPLICATION SETUP
// ============================================================================

pub fn test_config(attendance_dir: PathBuf) -> Config {
    Config {
        bind_address: ([127, 0, 0, 1], 0).into(),
        log_level: tracing::Level::DEBUG,
        cors_origin: "http://localhost:3000".to_string(),
        canvas_url: "http://canvas.test".to_string(),
        canvas_token: "test-token".to_string(),
        ollama_url: "http://ollama.test".to_string(),
        ollama_model: "llama3.2".to_string(),
        model_timeout: Duration::from_secs(5),
        attendance_dir,
        bundled_pdf_path: None,
        chunk_size: 1000,
        chunk_overlap: 200,
        session_idle_timeout: chrono::Duration::minutes(60),
    }
}

pub struct TestApp {
    pub router: Router,
    pub model: Arc<FakeModel>,
    /// Keeps the attendance directory alive for the duration of the test.
    pub attendance_dir: TempDir,
}

pub fn spawn_app(behavior: ModelBehavior) -> TestApp {
    let attendance_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Arc::new(test_config(attendance_dir.path().to_path_buf()));
    let model = Arc::new(FakeModel::new(behavior));

    let state = AppState::new(
        config.clone(),
        Arc::new(FakeLms::seeded()),
        model.clone(),
        Arc::new(FakeExtractor),
        Arc::new(FsAttendanceArchive::new(config.attendance_dir.clone())),
    )
    .expect("Failed to build app state");

    TestApp {
        router: router(Arc::new(state)).expect("Failed to build router"),
        model,
        attendance_dir,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not UTF-8")
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();
        TestResponse { status, headers, body }
    }

    /// Starts a session and returns the `Cookie` header value that identifies it.
    pub async fn start_session(&self) -> String {
        let response = self
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let set_cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str, cookie: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, cookie: &str, body: serde_json::Value) -> TestResponse {
        self.send(json_request(uri, cookie, body)).await
    }

    /// Uploads `(file name, content type, bytes)` triples as one multipart form.
    pub async fn upload(&self, cookie: &str, files: &[(&str, &str, Vec<u8>)]) -> TestResponse {
        let boundary = "picata-test-boundary";
        let mut body = Vec::new();
        for (name, content_type, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    boundary, name, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/student/documents")
                .header(header::COOKIE, cookie)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

pub fn json_request(uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
