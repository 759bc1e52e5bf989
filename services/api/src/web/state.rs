//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use chrono::{DateTime, Utc};
use picata_core::chat::ChatSession;
use picata_core::chunking::{ChunkingError, TextSplitter};
use picata_core::documents::{self, DocumentLibrary};
use picata_core::domain::{CourseTerm, DocumentOrigin, DocumentText};
use picata_core::ports::{AttendanceArchive, DocumentTextExtractor, LanguageModelService, LmsService};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Sessions)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lms: Arc<dyn LmsService>,
    pub model: Arc<dyn LanguageModelService>,
    pub pdf_extractor: Arc<dyn DocumentTextExtractor>,
    pub attendance_archive: Arc<dyn AttendanceArchive>,
    pub splitter: TextSplitter,
    /// The fixed course document every new session starts with, if one is configured.
    pub bundled_document: Option<Arc<BundledDocument>>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        lms: Arc<dyn LmsService>,
        model: Arc<dyn LanguageModelService>,
        pdf_extractor: Arc<dyn DocumentTextExtractor>,
        attendance_archive: Arc<dyn AttendanceArchive>,
    ) -> Result<Self, ChunkingError> {
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            config,
            lms,
            model,
            pdf_extractor,
            attendance_archive,
            splitter,
            bundled_document: None,
            sessions: Arc::new(SessionStore::default()),
        })
    }

    pub fn with_bundled_document(mut self, document: BundledDocument) -> Self {
        self.bundled_document = Some(Arc::new(document));
        self
    }
}

/// A document processed once at startup and shared by every session.
#[derive(Debug, Clone)]
pub struct BundledDocument {
    pub digest: String,
    pub text: DocumentText,
}

impl BundledDocument {
    /// Reads and chunks the PDF at `path`. A missing or unreadable file is logged and
    /// yields `None`; the service still starts without it.
    pub async fn load(
        path: &Path,
        extractor: &dyn DocumentTextExtractor,
        splitter: &TextSplitter,
    ) -> Option<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not read bundled document {}: {}", path.display(), e);
                return None;
            }
        };

        match extractor.extract_pages(&bytes).await {
            Ok(pages) => {
                let source = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let text = documents::build_document_text(&source, DocumentOrigin::Bundled, &pages, splitter);
                info!("Bundled document {} loaded ({} pages).", source, pages.len());
                Some(Self {
                    digest: documents::digest(&bytes),
                    text,
                })
            }
            Err(e) => {
                warn!("Could not parse bundled document {}: {}", path.display(), e);
                None
            }
        }
    }
}

//=========================================================================================
// SessionState (Specific to One Browser Session)
//=========================================================================================

/// Everything one interactive session remembers between requests.
pub struct SessionState {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub chat: ChatSession,
    pub documents: DocumentLibrary,
    /// Which half of the course directory the instructor is looking at.
    pub course_term: CourseTerm,
}

impl SessionState {
    pub fn new(id: Uuid, bundled: Option<&BundledDocument>) -> Self {
        let now = Utc::now();
        let mut documents = DocumentLibrary::new();
        if let Some(bundled) = bundled {
            documents.insert(bundled.digest.clone(), bundled.text.clone());
        }
        Self {
            id,
            started_at: now,
            last_seen_at: now,
            chat: ChatSession::new(),
            documents,
            course_term: CourseTerm::default(),
        }
    }
}

pub type SessionHandle = Arc<Mutex<SessionState>>;

/// All live sessions, keyed by the id carried in the session cookie.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionStore {
    /// Creates a session and purges sessions idle for longer than `idle_timeout`.
    pub async fn start(
        &self,
        bundled: Option<&BundledDocument>,
        idle_timeout: chrono::Duration,
    ) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(SessionState::new(id, bundled)));
        let cutoff = Utc::now() - idle_timeout;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        // A session whose lock is held is mid-request and therefore not idle.
        sessions.retain(|_, s| match s.try_lock() {
            Ok(state) => state.last_seen_at >= cutoff,
            Err(_) => true,
        });
        if sessions.len() < before {
            info!("Purged {} idle sessions.", before - sessions.len());
        }
        sessions.insert(id, handle.clone());

        (id, handle)
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drops the session and all of its state. Returns whether it existed.
    pub async fn end(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
