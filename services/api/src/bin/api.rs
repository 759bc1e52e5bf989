//! services/api/src/bin/api.rs

use picata_api::{
    adapters::{CanvasAdapter, FsAttendanceArchive, OllamaAdapter, PdfExtractAdapter},
    config::Config,
    error::ApiError,
    web::{
        router,
        state::{AppState, BundledDocument},
    },
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("picata/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let lms = Arc::new(CanvasAdapter::new(
        http_client.clone(),
        config.canvas_url.clone(),
        config.canvas_token.clone(),
    ));
    let model = Arc::new(OllamaAdapter::new(
        http_client,
        config.ollama_url.clone(),
        config.ollama_model.clone(),
    ));
    let pdf_extractor = Arc::new(PdfExtractAdapter::new());
    let attendance_archive = Arc::new(FsAttendanceArchive::new(config.attendance_dir.clone()));
    info!(
        "LMS at {}, model '{}' at {}, attendance saved under {}.",
        config.canvas_url,
        config.ollama_model,
        config.ollama_url,
        config.attendance_dir.display()
    );

    // --- 3. Build the Shared AppState ---
    let mut app_state = AppState::new(
        config.clone(),
        lms,
        model,
        pdf_extractor.clone(),
        attendance_archive,
    )?;

    match &config.bundled_pdf_path {
        Some(path) => {
            if let Some(document) =
                BundledDocument::load(path, pdf_extractor.as_ref(), &app_state.splitter).await
            {
                app_state = app_state.with_bundled_document(document);
            }
        }
        None => warn!("BUNDLED_PDF_PATH is not set; sessions start without course material."),
    }

    // --- 4. Create the Web Router ---
    let app = router(Arc::new(app_state))?;

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
