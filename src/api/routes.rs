use axum::{
    routing::get,
    Router,
    extract::State,
    http::{header, HeaderName, Method},
    response::Response,
    Json,
};
use tower_http::cors::{AllowMethods, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::models::{Health, RuntimeConfig};
use crate::api::response::{self, CONFIG_CACHE};
use crate::api::{dashboard, proxy};
use crate::AppState;

/// CORS for the API surface: any origin, the given methods, and the headers the widgets send.
pub fn cors_layer(methods: impl Into<AllowMethods>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(methods)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("client-id"),
        ])
}

pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new()
        .route("/config", get(runtime_config))
        .route("/weather", get(proxy::weather))
        .route("/crypto", get(proxy::crypto))
        .route("/github", get(proxy::github))
        .route("/twitch", get(proxy::twitch_streams))
        .route("/twitch-users", get(proxy::twitch_users))
        .route("/suggest", get(proxy::suggest))
        .route("/command", get(dashboard::command))
        .route("/vg-summary", get(dashboard::news_summary))
        .route("/calendar", get(dashboard::calendar))
        .layer(cors_layer([Method::GET, Method::OPTIONS]));

    let mut router = Router::new()
        .route("/healthz", get(health))
        .nest("/api", api);

    if let Some(dir) = app_state.config.static_dir.as_ref() {
        let index = dir.join("index.html");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health() -> Json<Health> {
    Json(Health { ok: true })
}

async fn runtime_config(State(state): State<AppState>) -> Response {
    response::cached(
        CONFIG_CACHE,
        RuntimeConfig {
            twitch_client_id: state.config.twitch_client_id.clone(),
            twitch_redirect_uri: state.config.twitch_redirect_uri.clone(),
        },
    )
}
