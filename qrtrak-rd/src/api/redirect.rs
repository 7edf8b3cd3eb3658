//! Redirect endpoint
//!
//! `GET /r/{id}` is the URL printed inside every dynamic QR code.
//! Responses: 302 with Location on success, 404 for unknown/inactive
//! codes, 403 with an upgrade page when the owner's monthly quota is
//! exhausted, 500 on persistence failure.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tracing::{error, info, warn};

use crate::resolver::{ResolveError, ScanRequest};
use crate::AppState;

/// GET /r/:id
///
/// The id is taken as a string so malformed values get the same 404
/// as unknown codes instead of a framework-level 400.
pub async fn resolve_redirect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let code_id = match id.parse::<i64>() {
        Ok(n) if n > 0 => n,
        _ => return not_found(),
    };

    let request = scan_request_from_headers(&headers);

    match state.resolver.resolve(code_id, &request).await {
        Ok(resolution) => {
            info!(
                "Scan of code {} -> {} ({})",
                code_id, resolution.destination_url, resolution.device_type
            );
            redirect_found(&resolution.destination_url)
        }
        Err(ResolveError::NotFound(_)) => not_found(),
        Err(ResolveError::QuotaExceeded { plan }) => {
            warn!("Scan of code {} rejected: {} plan quota exhausted", code_id, plan);
            quota_exceeded_page(&state.upgrade_url)
        }
        Err(ResolveError::Database(e)) => {
            error!("Scan of code {} failed: {}", code_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Extract scan metadata from request headers.
///
/// Client address comes from the reverse proxy headers; the first
/// X-Forwarded-For entry is the original client.
fn scan_request_from_headers(headers: &HeaderMap) -> ScanRequest {
    let header_str =
        |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        });

    ScanRequest {
        user_agent: header_str(header::USER_AGENT),
        ip_address,
        referrer: header_str(header::REFERER),
    }
}

/// 302 Found with Location (the wire contract fixes 302, so the
/// response is built by hand rather than with axum's Redirect helpers)
fn redirect_found(destination: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, destination.to_string())]).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "QR code not found").into_response()
}

/// 403 upgrade page shown to the scanning end user
fn quota_exceeded_page(upgrade_url: &str) -> Response {
    let template = include_str!("quota_exceeded.html");
    let body = template.replace("{{UPGRADE_URL}}", upgrade_url);
    (StatusCode::FORBIDDEN, Html(body)).into_response()
}
