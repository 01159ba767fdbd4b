use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::get,
};
use std::error::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod library;
pub mod model;
pub mod pagination;

pub const API_PREFIX: &str = "/api/v1.0";

/// The complete application: login helper, the guarded API and the error
/// envelope for unknown paths, disallowed methods and panics.
pub fn router(state: handler::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(handler::login))
        .route("/login-results", get(handler::login_results))
        .nest(API_PREFIX, library::routes(&state.validator))
        .fallback(handler::not_found)
        .layer(middleware::map_response(handler::method_not_allowed))
        .layer(CatchPanicLayer::custom(handler::panic_response))
        .layer(cors)
        .with_state(state)
}

pub fn unpack_error(err: &dyn Error) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
