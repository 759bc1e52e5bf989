//! services/api/src/web/chat_task.rs
//!
//! This module contains the "worker" function responsible for handling a single
//! question-and-answer turn of the student chat.

use picata_core::chat::ChatError;
use picata_core::ports::{CompletionRequest, LanguageModelService, PortError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

use crate::web::state::{AppState, SessionHandle};

/// What a completed turn hands back to the page.
#[derive(Debug)]
pub struct ChatOutcome {
    pub answer: String,
    pub latency: Duration,
    pub turns: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatTaskError {
    #[error(transparent)]
    Rejected(#[from] ChatError),
    #[error("Model call failed: {0}")]
    Model(#[from] PortError),
}

/// Runs one chat turn against the session.
///
/// The user's question is appended before the model is called and stays in the
/// transcript even if the call fails. The model call and the transcript update run
/// on their own task, so the turn is settled even when the client goes away before
/// the answer arrives. The session lock is not held while waiting on the model;
/// a second question in the meantime is rejected by the session's turn state.
pub async fn answer_question(
    app_state: &AppState,
    session: &SessionHandle,
    question: &str,
) -> Result<ChatOutcome, ChatTaskError> {
    let (prompt, session_id) = {
        let mut state = session.lock().await;
        let pending = state.chat.begin_turn(question)?;
        (pending.prompt(state.documents.context()), state.id)
    };
    info!("Session {}: question received.", session_id);

    let turn = tokio::spawn(run_turn(
        app_state.model.clone(),
        session.clone(),
        session_id,
        CompletionRequest {
            prompt,
            timeout: app_state.config.model_timeout,
        },
    ));

    match turn.await {
        Ok(outcome) => outcome,
        Err(e) => {
            session.lock().await.chat.abandon_turn();
            error!("Session {}: chat task failed: {}", session_id, e);
            Err(ChatTaskError::Model(PortError::Unexpected(e.to_string())))
        }
    }
}

async fn run_turn(
    model: Arc<dyn LanguageModelService>,
    session: SessionHandle,
    session_id: Uuid,
    request: CompletionRequest,
) -> Result<ChatOutcome, ChatTaskError> {
    let started = Instant::now();
    let result = model.complete(request).await;
    let latency = started.elapsed();

    let mut state = session.lock().await;
    match result {
        Ok(completion) => {
            state.chat.complete_turn(completion.text.clone())?;
            info!("⏱️ Session {}: answered in {:?}", session_id, latency);
            Ok(ChatOutcome {
                answer: completion.text,
                latency,
                turns: state.chat.transcript().len(),
            })
        }
        Err(e) => {
            state.chat.abandon_turn();
            error!("Session {}: model call failed after {:?}: {}", session_id, latency, e);
            Err(ChatTaskError::Model(e))
        }
    }
}
