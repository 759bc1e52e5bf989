//! services/api/src/adapters/canvas.rs
//!
//! This module contains the Canvas LMS adapter, the concrete implementation of
//! the `LmsService` port. It talks to the Canvas REST API with `reqwest` and
//! follows Canvas' `Link` header pagination.

use async_trait::async_trait;
use picata_core::catalog;
use picata_core::domain::{Course, CourseListing, Quiz, QuizSubmission, Student};
use picata_core::ports::{LmsService, PortError, PortResult};
use regex::Regex;
use reqwest::{header::HeaderMap, header::LINK, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::debug;

const PAGE_SIZE: &str = "100";

static NEXT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>;\s*rel="next""#).expect("valid Link header regex"));

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LmsService` against a Canvas instance.
#[derive(Clone)]
pub struct CanvasAdapter {
    client: Client,
    base_url: String,
    token: String,
}

impl CanvasAdapter {
    /// Creates a new `CanvasAdapter` for `base_url` (e.g. `https://canvas.example.edu`).
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Canvas request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().path().to_string();
        match status {
            StatusCode::UNAUTHORIZED => Err(PortError::Unauthorized),
            StatusCode::NOT_FOUND => Err(PortError::NotFound(url)),
            _ => Err(PortError::Unexpected(format!(
                "Canvas returned {} for {}",
                status, url
            ))),
        }
    }

    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Unreadable Canvas response: {}", e)))
    }

    /// Fetches every page of a paginated endpoint, returning the raw page bodies in order.
    async fn get_all_pages<P: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> PortResult<Vec<P>> {
        let first = self
            .client
            .get(self.url(path))
            .query(&[("per_page", PAGE_SIZE)])
            .query(query);
        let mut response = self.send(first).await?;
        let mut pages = Vec::new();

        loop {
            let next = next_page_url(response.headers());
            let page = response
                .json::<P>()
                .await
                .map_err(|e| PortError::Unexpected(format!("Unreadable Canvas page: {}", e)))?;
            pages.push(page);

            match next {
                Some(url) => {
                    debug!("Following Canvas pagination to {}", url);
                    response = self.send(self.client.get(url)).await?;
                }
                None => break,
            }
        }

        Ok(pages)
    }
}

/// Extracts the `rel="next"` target from a Canvas `Link` header.
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    NEXT_LINK
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

//=========================================================================================
// "Impure" Canvas Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct CourseRecord {
    id: u64,
    name: Option<String>,
    course_code: Option<String>,
    sis_course_id: Option<String>,
    start_at: Option<String>,
    end_at: Option<String>,
}
impl CourseRecord {
    fn to_domain(self) -> CourseListing {
        CourseListing {
            id: self.id,
            name: self.name,
            course_code: self.course_code,
            sis_course_id: self.sis_course_id,
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}

#[derive(Deserialize)]
struct QuizRecord {
    id: u64,
    title: Option<String>,
}
impl QuizRecord {
    fn to_domain(self, course_id: u64) -> Quiz {
        Quiz {
            id: self.id,
            course_id,
            title: self.title.unwrap_or_else(|| format!("Quiz {}", self.id)),
        }
    }
}

#[derive(Deserialize)]
struct UserRecord {
    id: u64,
    name: Option<String>,
    sortable_name: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> Student {
        Student {
            id: self.id,
            name: self
                .name
                .or(self.sortable_name)
                .unwrap_or_else(|| format!("Student {}", self.id)),
        }
    }
}

#[derive(Deserialize)]
struct QuizSubmissionRecord {
    id: u64,
    user_id: Option<u64>,
    attempt: Option<u32>,
    score: Option<f64>,
    workflow_state: Option<String>,
}
impl QuizSubmissionRecord {
    fn to_domain(self) -> QuizSubmission {
        QuizSubmission {
            id: self.id,
            user_id: self.user_id,
            attempt: self.attempt,
            score: self.score,
            workflow_state: self.workflow_state.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct QuizSubmissionPage {
    #[serde(default)]
    quiz_submissions: Vec<QuizSubmissionRecord>,
}

//=========================================================================================
// `LmsService` Trait Implementation
//=========================================================================================

#[async_trait]
impl LmsService for CanvasAdapter {
    async fn list_courses(&self) -> PortResult<Vec<CourseListing>> {
        let pages: Vec<Vec<CourseRecord>> = self.get_all_pages("/courses", &[]).await?;
        Ok(pages.into_iter().flatten().map(CourseRecord::to_domain).collect())
    }

    async fn get_course(&self, course_id: u64) -> PortResult<Course> {
        let record: CourseRecord = self.get_one(&format!("/courses/{}", course_id)).await?;
        catalog::to_course(&record.to_domain()).map_err(PortError::Unexpected)
    }

    async fn list_quizzes(&self, course_id: u64) -> PortResult<Vec<Quiz>> {
        let pages: Vec<Vec<QuizRecord>> = self
            .get_all_pages(&format!("/courses/{}/quizzes", course_id), &[])
            .await?;
        Ok(pages
            .into_iter()
            .flatten()
            .map(|q| q.to_domain(course_id))
            .collect())
    }

    async fn get_quiz(&self, course_id: u64, quiz_id: u64) -> PortResult<Quiz> {
        let record: QuizRecord = self
            .get_one(&format!("/courses/{}/quizzes/{}", course_id, quiz_id))
            .await?;
        Ok(record.to_domain(course_id))
    }

    async fn list_students(&self, course_id: u64) -> PortResult<Vec<Student>> {
        let pages: Vec<Vec<UserRecord>> = self
            .get_all_pages(
                &format!("/courses/{}/users", course_id),
                &[("enrollment_type[]", "student")],
            )
            .await?;
        Ok(pages.into_iter().flatten().map(UserRecord::to_domain).collect())
    }

    async fn list_quiz_submissions(
        &self,
        course_id: u64,
        quiz_id: u64,
    ) -> PortResult<Vec<QuizSubmission>> {
        let pages: Vec<QuizSubmissionPage> = self
            .get_all_pages(
                &format!("/courses/{}/quizzes/{}/submissions", course_id, quiz_id),
                &[],
            )
            .await?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.quiz_submissions)
            .map(QuizSubmissionRecord::to_domain)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with_link(link: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_str(link).unwrap());
        headers
    }

    #[test]
    fn next_link_is_found_among_other_relations() {
        let headers = headers_with_link(
            r#"<https://canvas.test/api/v1/courses?page=1&per_page=100>; rel="current",<https://canvas.test/api/v1/courses?page=2&per_page=100>; rel="next",<https://canvas.test/api/v1/courses?page=1&per_page=100>; rel="first""#,
        );
        assert_eq!(
            next_page_url(&headers).as_deref(),
            Some("https://canvas.test/api/v1/courses?page=2&per_page=100")
        );
    }

    #[test]
    fn last_page_has_no_next_link() {
        let headers = headers_with_link(
            r#"<https://canvas.test/api/v1/courses?page=3>; rel="current",<https://canvas.test/api/v1/courses?page=1>; rel="first""#,
        );
        assert_eq!(next_page_url(&headers), None);
        assert_eq!(next_page_url(&HeaderMap::new()), None);
    }

    #[test]
    fn restricted_course_record_keeps_missing_fields() {
        let record: CourseRecord =
            serde_json::from_str(r#"{"id": 77, "access_restricted_by_date": true}"#).unwrap();
        let listing = record.to_domain();
        assert_eq!(listing.id, 77);
        assert!(listing.name.is_none());
        assert_eq!(catalog::resolve_display_name(&listing), "Unknown Course");
    }

    #[test]
    fn submission_page_tolerates_missing_user() {
        let page: QuizSubmissionPage = serde_json::from_str(
            r#"{"quiz_submissions": [
                {"id": 1, "user_id": 10, "attempt": 1, "score": 8.5, "workflow_state": "complete"},
                {"id": 2, "user_id": null, "workflow_state": "untaken"}
            ]}"#,
        )
        .unwrap();
        let submissions: Vec<QuizSubmission> = page
            .quiz_submissions
            .into_iter()
            .map(QuizSubmissionRecord::to_domain)
            .collect();
        assert_eq!(submissions[0].score, Some(8.5));
        assert_eq!(submissions[1].user_id, None);
    }

    #[test]
    fn api_paths_are_rooted_at_v1() {
        let adapter = CanvasAdapter::new(
            Client::new(),
            "https://canvas.test/".to_string(),
            "token".to_string(),
        );
        assert_eq!(adapter.url("/courses"), "https://canvas.test/api/v1/courses");
    }
}
