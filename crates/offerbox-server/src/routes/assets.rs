use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use include_dir::{include_dir, Dir};
use serde_json::json;

/// Landing page, dashboard and their scripts, compiled into the binary.
static PUBLIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/public");

/// Fallback handler: serve an embedded asset for any unmatched path.
///
/// `/` maps to `index.html`, and extensionless paths such as `/dashboard`
/// are tried with `.html` appended.
pub async fn static_asset(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    let file = PUBLIC_DIR.get_file(path).or_else(|| {
        if path.contains('.') {
            None
        } else {
            PUBLIC_DIR.get_file(format!("{path}.html"))
        }
    });

    match file {
        Some(file) => {
            let name = file.path().to_string_lossy();
            (
                [(header::CONTENT_TYPE, content_type(&name))],
                file.contents(),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Not found." })),
        )
            .into_response(),
    }
}

fn content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or_default() {
        "html" => "text/html; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
