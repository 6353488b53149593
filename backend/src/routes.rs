use axum::{
    body::Body,
    http::Method,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, middleware, state::AppState};

pub fn router(state: AppState) -> Router {
    // Callable endpoints (caller resolved from the bearer token)
    let callable_routes = Router::new()
        .route("/api/setAdminRole", post(handlers::callable::set_admin_role))
        .route(
            "/api/setBarangayOfficialRole",
            post(handlers::callable::set_barangay_official_role),
        )
        .route("/api/startBackup", post(handlers::callable::start_backup))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::caller_identity,
        ));

    // Document store change notifications
    let trigger_routes = Router::new()
        .route(
            "/triggers/users/{id}/updated",
            post(handlers::triggers::user_updated),
        )
        .route(
            "/triggers/reports/{id}/created",
            post(handlers::triggers::report_created),
        )
        .route(
            "/triggers/reports/{id}/updated",
            post(handlers::triggers::report_updated),
        );

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(callable_routes)
        .merge(trigger_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id::request_id))
                .layer(TraceLayer::new_for_http().make_span_with(middleware::request_id::request_span::<Body>))
                .layer(axum_middleware::from_fn(
                    middleware::logging::log_error_responses,
                ))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state)
}
