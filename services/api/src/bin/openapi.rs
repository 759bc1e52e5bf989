//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the picaTA REST API to disk, by default to
//! `openapi.json`. An alternative path can be given as the first argument.

use picata_api::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, spec_json)?;
    println!("✅ OpenAPI specification generated at {}", path);
    Ok(())
}
