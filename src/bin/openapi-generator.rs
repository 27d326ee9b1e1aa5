//! Print the OpenAPI document of the trivia dialog service as pretty JSON.

use utoipa::OpenApi;
use voice_trivia_back::services::documentation::ApiDoc;

fn main() -> Result<(), serde_json::Error> {
    let doc = ApiDoc::openapi().to_pretty_json()?;
    println!("{doc}");
    Ok(())
}
