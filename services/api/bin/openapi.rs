//! Writes the OpenAPI document for the tutor API.
//!
//! Usage: `openapi [PATH]`. With no path the JSON goes to stdout.

use std::io::Write;
use tutor_api::router::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    match std::env::args().nth(1) {
        Some(path) => std::fs::write(path, spec_json)?,
        None => writeln!(std::io::stdout().lock(), "{spec_json}")?,
    }
    Ok(())
}
