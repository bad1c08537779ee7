use axum::http::{header, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};

/// Security headers middleware
///
/// Adds headers that apply to every response. Handlers may still set their own values,
/// which are kept.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    // X-Content-Type-Options: Prevent MIME type sniffing
    headers
        .entry(header::X_CONTENT_TYPE_OPTIONS)
        .or_insert(HeaderValue::from_static("nosniff"));

    headers
        .entry(header::REFERRER_POLICY)
        .or_insert(HeaderValue::from_static("strict-origin-when-cross-origin"));

    headers
        .entry(header::X_FRAME_OPTIONS)
        .or_insert(HeaderValue::from_static("DENY"));

    response
}
