use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Reject requests whose Host header is not on the trusted list. A lone "*"
/// entry disables the check.
pub async fn enforce_trusted_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let trusted = &state.config.trusted_hosts;
    if trusted.iter().any(|host| host.trim() == "*") {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(':').next())
        .unwrap_or("")
        .to_ascii_lowercase();

    if trusted
        .iter()
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(&host))
    {
        next.run(request).await
    } else {
        (StatusCode::BAD_REQUEST, "Untrusted host.").into_response()
    }
}
