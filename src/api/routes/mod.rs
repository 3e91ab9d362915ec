pub mod health;
pub mod similar;

use axum::extract::DefaultBodyLimit;
use axum::http::{request::Parts, HeaderValue, Method};
use axum::response::Response;
use axum::{middleware, routing::get, routing::post, Router};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyHeaders, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::error::internal_server_error;
use crate::api::middleware::request_logger;
use crate::api::state::AppState;

const LOCAL_ORIGINS: [&str; 2] = ["http://localhost:3000", "https://localhost:3000"];
const LAN_ORIGIN_PREFIX: &str = "https://10.0.0.";
const LAN_ORIGIN_SUFFIX: &str = ":3000";

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(state.config.cors.allowed_origins.clone());
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/main/find-similar", post(similar::find_similar))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        // outermost, so failures still carry CORS headers
        .layer(cors)
        .with_state(state)
}

fn build_cors(extra_origins: Vec<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AnyHeaders)
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                origin
                    .to_str()
                    .map(|o| origin_allowed(o, &extra_origins))
                    .unwrap_or(false)
            },
        ))
}

fn origin_allowed(origin: &str, extra_origins: &[String]) -> bool {
    if LOCAL_ORIGINS.contains(&origin) || extra_origins.iter().any(|o| o == origin) {
        return true;
    }
    origin
        .strip_prefix(LAN_ORIGIN_PREFIX)
        .is_some_and(|rest| rest.ends_with(LAN_ORIGIN_SUFFIX))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    internal_server_error()
}
