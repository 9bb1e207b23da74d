#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;

use newtab_api::api::routes::create_router;
use newtab_api::cache::Clock;
use newtab_api::config::{Config, UpstreamUrls};
use newtab_api::AppState;

/// A config whose every upstream points at the stub server.
pub fn config_for(server: &MockServer) -> Config {
    let base = server.uri();
    Config {
        news_feed_url: format!("{base}/rss"),
        commands_path: "public/cheats.json".into(),
        upstreams: UpstreamUrls {
            weather: format!("{base}/weather"),
            crypto: format!("{base}/crypto"),
            github: format!("{base}/github"),
            twitch: format!("{base}/helix"),
            suggest: format!("{base}/suggest"),
            openai: format!("{base}/v1/chat/completions"),
            google_calendar: format!("{base}/calendars"),
            google_ical: format!("{base}/ical"),
        },
        ..Config::default()
    }
}

pub fn app(config: Config) -> Router {
    create_router(AppState::new(config))
}

pub fn app_with_clock(config: Config, clock: Arc<dyn Clock>) -> Router {
    create_router(AppState::with_clock(config, clock))
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.raw).expect("response body should be JSON")
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let headers = response.headers().clone();
    let raw = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec();
    Reply { status, headers, raw }
}

pub async fn get(app: &Router, uri: &str) -> Reply {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, request).await
}
