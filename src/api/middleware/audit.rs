//! Audit logging middleware.
//!
//! Assigns each request a UUID, exposes it to handlers as a
//! [`RequestId`] extension and to clients as the `x-request-id` header,
//! and records method, path, status and latency.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::types::{ApiContext, RequestId};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn log_access(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let ctx = req.extensions().get::<ApiContext>().cloned();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::info!(%request_id, %method, %path, status, elapsed_ms, "API request");

    if let Some(ctx) = ctx {
        ctx.core
            .log_access(&request_id, &format!("{method} {path}"), &format!("status:{status}"));
    }
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
