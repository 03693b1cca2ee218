//! API router.
//!
//! Returns a composable `Router`; all routes are nested under `/api/`.
//!
//! Layers (outermost → innermost):
//! 1. Extension(ApiContext) → 2. CORS → 3. Cache-Control → 4. Audit logger

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (outermost layer).
/// Handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/herbs",
            get(endpoints::herbs::list).post(endpoints::herbs::create),
        )
        .route(
            "/herbs/:id",
            get(endpoints::herbs::detail)
                .put(endpoints::herbs::update)
                .delete(endpoints::herbs::remove),
        )
        .route(
            "/formulas",
            get(endpoints::formulas::list).post(endpoints::formulas::create),
        )
        .route("/formulas/import", post(endpoints::formulas::import))
        .route(
            "/formulas/:id",
            get(endpoints::formulas::detail)
                .put(endpoints::formulas::update)
                .delete(endpoints::formulas::remove),
        )
        .route(
            "/formulas/:id/composition",
            get(endpoints::formulas::composition),
        )
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::remove),
        )
        .route(
            "/patients/:id/prescriptions",
            get(endpoints::patients::prescriptions),
        )
        .route(
            "/prescriptions",
            get(endpoints::prescriptions::list).post(endpoints::prescriptions::create),
        )
        .route("/prescriptions/draft", post(endpoints::prescriptions::draft))
        .route(
            "/prescriptions/:id",
            get(endpoints::prescriptions::detail).delete(endpoints::prescriptions::remove),
        )
        .route(
            "/prescriptions/:id/status",
            patch(endpoints::prescriptions::update_status),
        )
        .route("/prescriptions/:id/view", get(endpoints::prescriptions::view))
        .route("/prescriptions/:id/pdf", get(endpoints::prescriptions::pdf))
        .route(
            "/settings",
            get(endpoints::settings::get).put(endpoints::settings::put),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
        .layer(axum::Extension(ctx));

    Router::new().nest("/api", routes)
}
