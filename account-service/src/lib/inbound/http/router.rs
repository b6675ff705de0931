use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::delete_profile::delete_profile;
use super::handlers::login::login;
use super::handlers::profile::get_profile;
use super::handlers::profile::update_profile;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::handlers::reset_password::request_password_reset;
use super::handlers::reset_password::reset_password_with_token;
use super::middleware::authenticate as auth_middleware;
use crate::domain::user::ports::AuthenticateServicePort;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn AuthenticateServicePort>,
}

pub fn create_router(service: Arc<dyn AuthenticateServicePort>) -> Router {
    let state = AppState { service };

    let public_routes = Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .route("/api/v1/refresh", post(refresh))
        .route("/api/v1/reset-password", post(request_password_reset))
        .route(
            "/api/v1/reset-password-with-token",
            post(reset_password_with_token),
        );

    let protected_routes = Router::new()
        .route("/api/v1/profile", get(get_profile).patch(update_profile))
        .route("/api/v1/delete-profile", post(delete_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Headers are left out of the span: they carry bearer tokens
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
