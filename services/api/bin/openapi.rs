//! Writes the Debate API's OpenAPI document.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use anyhow::Context;
use debate_api::router::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let document = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to serialize OpenAPI document")?;
    std::fs::write(&output, document)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {}", output.display());
    Ok(())
}
