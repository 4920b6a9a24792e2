//! HTTP route definitions

use crate::state::AppState;
use crate::{handlers, middleware};
use axum::{
    extract::DefaultBodyLimit, middleware as axum_middleware, routing::post, Router,
};
use sealdrop_proto::routes;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Key handling
        .route(routes::REGISTER, post(handlers::register))
        .route(routes::GET_BUNDLE, post(handlers::get_bundle))
        // File storage
        .route(routes::UPLOAD, post(handlers::upload))
        .route(routes::LIST, post(handlers::list))
        .route(routes::DOWNLOAD, post(handlers::download))
        .route(routes::DELETE, post(handlers::delete))
        // Sharing
        .route(routes::SHARE, post(handlers::share))
        .route(routes::REVOKE, post(handlers::revoke))
        // Apply middleware
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::auth_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .with_state(state)
}
