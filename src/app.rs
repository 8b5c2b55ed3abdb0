use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::{middleware as auth_mw, rate_limit};
use crate::handlers;
use crate::AppState;

fn api_cors(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins()
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ));

    let admin_routes = Router::new()
        .route("/api/admin/dashboard", get(handlers::admin::dashboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_mw::require_admin,
        ));

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Mood logs & insights
        .route(
            "/api/mood-logs",
            post(handlers::mood_logs::create_mood_log).get(handlers::mood_logs::list_mood_logs),
        )
        .route("/api/mood-logs/latest", get(handlers::mood_logs::latest_insight))
        .route(
            "/api/mood-logs/:id/recommendations",
            get(handlers::mood_logs::list_recommendations),
        )
        // Peer chat
        .route("/api/matchmaking/join", post(handlers::matchmaking::join_queue))
        .route("/api/matchmaking/leave", post(handlers::matchmaking::leave_queue))
        .route("/api/matchmaking/status", get(handlers::matchmaking::queue_status))
        .route(
            "/api/chat-sessions/:id/end",
            post(handlers::matchmaking::end_session),
        )
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_mw::require_auth,
        ));

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(api_cors(&state));

    // Callable from any origin; CORS sits outside auth so preflights pass
    let function_routes = Router::new()
        .route(
            "/functions/v1/analyze-mood",
            post(handlers::analysis::analyze_mood),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_mw::require_auth,
        ))
        .layer(CorsLayer::permissive());

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(function_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
