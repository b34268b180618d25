//! Print the OpenAPI document, or write it to the path given as the first
//! argument.

use std::process::ExitCode;

use server::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> ExitCode {
    let doc = match ApiDoc::openapi().to_pretty_json() {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Failed to serialize the OpenAPI document: {e}");
            return ExitCode::FAILURE;
        }
    };

    match std::env::args().nth(1) {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, doc) {
                eprintln!("Failed to write {path}: {e}");
                return ExitCode::FAILURE;
            }
            eprintln!("Wrote {path}");
        }
        None => println!("{doc}"),
    }
    ExitCode::SUCCESS
}
