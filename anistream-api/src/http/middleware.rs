// HTTP middleware

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use anistream_core::logging::generate_trace_id;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied id that is accepted as-is
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id extension, also echoed back in the `x-request-id` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// The request's `x-request-id`, if it carries a usable one.
pub fn request_id_of(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
}

/// Tag every request with an id, keeping the caller's when it sent one.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request_id_of(&request).map_or_else(generate_trace_id, ToString::to_string);

    // Generated ids are hex, client ids already passed `to_str`
    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers_mut().insert(REQUEST_ID_HEADER.clone(), value.clone());
        request.extensions_mut().insert(RequestId(id));

        let mut response = next.run(request).await;
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
        return response;
    }
    next.run(request).await
}
