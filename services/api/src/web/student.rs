//! services/api/src/web/student.rs
//!
//! Student portal endpoints: PDF context management and the tutoring chat.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use bytes::Bytes;
use picata_core::chat::ChatError;
use picata_core::documents::{build_document_text, digest};
use picata_core::domain::DocumentOrigin;
use picata_core::ports::PortError;
use std::sync::Arc;
use tracing::{info, warn};

use crate::web::{
    chat_task::{answer_question, ChatTaskError},
    protocol::*,
    state::{AppState, SessionHandle},
};

fn is_pdf(file_name: &str, content_type: Option<&str>) -> bool {
    content_type == Some("application/pdf") || file_name.to_ascii_lowercase().ends_with(".pdf")
}

/// Reads every file part of the upload. Parts without a file name are ignored.
async fn read_files(multipart: &mut Multipart) -> Result<Vec<(String, Option<String>, Bytes)>, (StatusCode, String)> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        files.push((name, content_type, data));
    }
    Ok(files)
}

/// POST /student/documents - Upload one or more PDFs as chat context
///
/// Each file is processed independently: a file that fails to parse is reported in
/// `errors` and the others are still added. Re-uploading a file already processed
/// in this session reuses the cached text.
#[utoipa::path(
    post,
    path = "/student/documents",
    request_body(content_type = "multipart/form-data", description = "One or more PDF files."),
    responses(
        (status = 200, description = "Documents processed", body = DocumentUploadResponse),
        (status = 400, description = "No file in the upload"),
        (status = 401, description = "No active session")
    )
)]
pub async fn upload_documents_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionHandle>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>, (StatusCode, String)> {
    let files = read_files(&mut multipart).await?;
    if files.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        ));
    }

    let mut reused = Vec::new();
    let mut errors = Vec::new();

    for (name, content_type, data) in files {
        if !is_pdf(&name, content_type.as_deref()) {
            errors.push(UploadFailure {
                file: name,
                message: "Only PDF files are accepted".to_string(),
            });
            continue;
        }

        let key = digest(&data);
        if session.lock().await.documents.cached(&key).is_some() {
            info!("Reusing processed text for {}", name);
            reused.push(name);
            continue;
        }

        match state.pdf_extractor.extract_pages(&data).await {
            Ok(pages) => {
                let document = build_document_text(&name, DocumentOrigin::Uploaded, &pages, &state.splitter);
                info!("Processed {} ({} pages).", name, pages.len());
                session.lock().await.documents.insert(key, document);
            }
            Err(e) => {
                warn!("Failed to process {}: {}", name, e);
                errors.push(UploadFailure {
                    file: name,
                    message: e.to_string(),
                });
            }
        }
    }

    let documents = session
        .lock()
        .await
        .documents
        .documents()
        .iter()
        .map(DocumentSummary::from)
        .collect();

    Ok(Json(DocumentUploadResponse {
        documents,
        reused,
        errors,
    }))
}

/// GET /student/documents - Documents in the session's chat context
#[utoipa::path(
    get,
    path = "/student/documents",
    responses((status = 200, description = "Loaded documents", body = DocumentListResponse))
)]
pub async fn list_documents_handler(
    Extension(session): Extension<SessionHandle>,
) -> Json<DocumentListResponse> {
    let session = session.lock().await;
    Json(DocumentListResponse {
        documents: session.documents.documents().iter().map(DocumentSummary::from).collect(),
    })
}

/// DELETE /student/documents - Remove uploaded documents (bundled material stays)
#[utoipa::path(
    delete,
    path = "/student/documents",
    responses((status = 200, description = "Remaining documents", body = DocumentListResponse))
)]
pub async fn clear_documents_handler(
    Extension(session): Extension<SessionHandle>,
) -> Json<DocumentListResponse> {
    let mut session = session.lock().await;
    session.documents.clear_uploads();
    Json(DocumentListResponse {
        documents: session.documents.documents().iter().map(DocumentSummary::from).collect(),
    })
}

/// GET /student/transcript - The session's chat so far
#[utoipa::path(
    get,
    path = "/student/transcript",
    responses((status = 200, description = "Transcript in chronological order", body = TranscriptResponse))
)]
pub async fn transcript_handler(
    Extension(session): Extension<SessionHandle>,
) -> Json<TranscriptResponse> {
    let session = session.lock().await;
    let state = match session.chat.state() {
        picata_core::chat::ChatState::Idle => "idle",
        picata_core::chat::ChatState::AwaitingModel => "awaiting_model",
    };
    Json(TranscriptResponse {
        state: state.to_string(),
        turns: session.chat.transcript().iter().map(TurnDto::from).collect(),
    })
}

/// POST /student/chat - Ask the tutor a question
#[utoipa::path(
    post,
    path = "/student/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The tutor's answer", body = ChatResponse),
        (status = 400, description = "Empty question"),
        (status = 409, description = "The previous question is still being answered"),
        (status = 502, description = "The model host failed; the question stays in the transcript"),
        (status = 504, description = "The model host timed out; the question stays in the transcript")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    match answer_question(&state, &session, &req.question).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            answer: outcome.answer,
            latency_ms: u64::try_from(outcome.latency.as_millis()).unwrap_or(u64::MAX),
            turns: outcome.turns,
        })),
        Err(ChatTaskError::Rejected(e)) => {
            let status = match e {
                ChatError::EmptyQuestion => StatusCode::BAD_REQUEST,
                ChatError::TurnInProgress | ChatError::NoTurnInProgress => StatusCode::CONFLICT,
            };
            Err((status, e.to_string()))
        }
        Err(ChatTaskError::Model(e)) => {
            let status = match e {
                PortError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            Err((status, format!("The assistant could not answer: {}", e)))
        }
    }
}
