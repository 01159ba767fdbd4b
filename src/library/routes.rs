use std::sync::Arc;

use axum::{
    Router,
    middleware,
    routing::{MethodRouter, delete, get, patch, post},
};

use super::handler;
use crate::auth::{PermissionGuard, TokenValidator, require_permission};
use crate::handler::AppState;

/// Each method is guarded by its own permission. `route_layer` keeps the
/// 405 fallback outside the guard.
pub fn routes(validator: &Arc<TokenValidator>) -> Router<AppState> {
    let guarded = |route: MethodRouter<AppState>, permission: &'static str| {
        route.route_layer(middleware::from_fn_with_state(
            PermissionGuard::new(validator.clone(), permission),
            require_permission,
        ))
    };

    Router::new()
        .route(
            "/books",
            guarded(get(handler::list_books), "get:books")
                .merge(guarded(post(handler::create_book), "post:books")),
        )
        .route(
            "/books/:id",
            guarded(get(handler::get_book), "get:books")
                .merge(guarded(patch(handler::update_book), "patch:books"))
                .merge(guarded(delete(handler::delete_book), "delete:books")),
        )
        .route(
            "/histories",
            guarded(get(handler::list_histories), "get:histories")
                .merge(guarded(post(handler::create_history), "post:histories")),
        )
        .route(
            "/histories/:id",
            guarded(get(handler::get_history), "get:histories")
                .merge(guarded(patch(handler::update_history), "patch:histories"))
                .merge(guarded(delete(handler::delete_history), "delete:histories")),
        )
}
