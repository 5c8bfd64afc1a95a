//! Request ID middleware
//!
//! Every request gets an `x-request-id` (kept if the caller sent one) that is
//! echoed on the response and attached to handler log events.

use axum::http::{HeaderMap, HeaderName};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: &str = "x-request-id";

pub fn request_id_layer() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    let header_name = HeaderName::from_static(X_REQUEST_ID);

    (
        SetRequestIdLayer::new(header_name.clone(), MakeRequestUuid),
        PropagateRequestIdLayer::new(header_name),
    )
}

pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl RequestIdExt for HeaderMap {
    /// Request id, or `"-"` when the layer did not run
    fn request_id(&self) -> &str {
        self.get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-")
    }
}
