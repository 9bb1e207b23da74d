mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app, config_for, get, send};
use newtab_api::config::Config;

#[tokio::test]
async fn health_reports_ok() {
    let reply = get(&app(Config::default()), "/healthz").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "ok": true }));
}

#[tokio::test]
async fn runtime_config_exposes_twitch_client_settings() {
    let config = Config {
        twitch_client_id: "abc123".into(),
        twitch_redirect_uri: "http://localhost:8080/".into(),
        ..Config::default()
    };
    let reply = get(&app(config), "/api/config").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["cache-control"], "public, max-age=300");
    assert_eq!(
        reply.json(),
        json!({ "twitchClientId": "abc123", "twitchRedirectUri": "http://localhost:8080/" })
    );
}

#[tokio::test]
async fn missing_required_parameters_are_rejected() {
    let app = app(Config::default());
    for uri in [
        "/api/weather",
        "/api/weather?lat=59.91",
        "/api/github",
        "/api/github?username=",
        "/api/suggest",
    ] {
        let reply = get(&app, uri).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
        let error = reply.json()["error"].as_str().unwrap_or_default().to_string();
        assert!(!error.is_empty(), "{uri} should explain the error");
    }
}

#[tokio::test]
async fn weather_passes_upstream_body_through() {
    let server = MockServer::start().await;
    let forecast = json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [10.75, 59.91, 8] },
        "properties": {
            "meta": { "updated_at": "2025-03-03T07:00:00Z", "units": { "air_temperature": "celsius" } },
            "timeseries": [{
                "time": "2025-03-03T08:00:00Z",
                "data": {
                    "instant": { "details": { "air_temperature": -1.4, "wind_speed": 3.2 } },
                    "next_1_hours": { "summary": { "symbol_code": "cloudy" } }
                }
            }]
        }
    });
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "59.91"))
        .and(query_param("lon", "10.75"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&forecast))
        .expect(1)
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/weather?lat=59.91&lon=10.75").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), forecast);
}

#[tokio::test]
async fn weather_body_is_returned_byte_for_byte() {
    let server = MockServer::start().await;
    let raw = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[10.75,59.91,8]},"properties":{"timeseries":[{"time":"2025-03-03T08:00:00Z","data":{"instant":{"details":{"air_temperature":1.50,"wind_speed":3.20}}}}]}}"#;
    Mock::given(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(raw, "application/geo+json"))
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/weather?lat=59.91&lon=10.75").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["content-type"], "application/geo+json");
    assert_eq!(String::from_utf8(reply.raw).unwrap(), raw);
}

#[tokio::test]
async fn crypto_keeps_upstream_key_order_and_number_text() {
    let server = MockServer::start().await;
    let raw = r#"{"ethereum":{"usd":2400.10,"usd_24h_change":-0.40},"bitcoin":{"usd":87000.50,"usd_24h_change":1.20}}"#;
    Mock::given(path("/crypto"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(raw, "application/json"))
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/crypto?ids=ethereum,bitcoin").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.raw, raw.as_bytes());
}

#[tokio::test]
async fn weather_upstream_failure_is_500_with_message() {
    let server = MockServer::start().await;
    Mock::given(path("/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/weather?lat=1&lon=2").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = reply.json();
    assert_eq!(body["error"], "Failed to fetch weather data");
    assert!(body["message"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn crypto_defaults_coin_list_and_currency() {
    let server = MockServer::start().await;
    let prices = json!({
        "bitcoin": { "usd": 87000.5, "usd_24h_change": 1.2 },
        "ethereum": { "usd": 2400.1, "usd_24h_change": -0.4 },
        "cardano": { "usd": 0.71, "usd_24h_change": 2.0 },
        "polkadot": { "usd": 4.9, "usd_24h_change": 0.3 },
        "chainlink": { "usd": 15.2, "usd_24h_change": -1.1 }
    });
    Mock::given(method("GET"))
        .and(path("/crypto"))
        .and(query_param("ids", "bitcoin,ethereum,cardano,polkadot,chainlink"))
        .and(query_param("vs_currencies", "usd"))
        .and(query_param("include_24hr_change", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&prices))
        .expect(1)
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/crypto").await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    for coin in ["bitcoin", "ethereum", "cardano", "polkadot", "chainlink"] {
        assert!(body[coin]["usd"].is_number(), "{coin} should be priced");
    }
}

#[tokio::test]
async fn crypto_rejects_unexpected_upstream_shape() {
    let server = MockServer::start().await;
    Mock::given(path("/crypto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "a", "map"])))
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/crypto?ids=bitcoin").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json()["error"], "Failed to fetch crypto data");
}

#[tokio::test]
async fn github_profile_and_repeat_requests_match() {
    let server = MockServer::start().await;
    let profile = json!({
        "login": "octocat",
        "name": "The Octocat",
        "avatar_url": "https://avatars.githubusercontent.com/u/583231",
        "public_repos": 8,
        "followers": 1000
    });
    Mock::given(method("GET"))
        .and(path("/github/users/octocat"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&profile))
        .expect(2)
        .mount(&server)
        .await;

    let app = app(config_for(&server));
    let first = get(&app, "/api/github?username=octocat").await;
    let second = get(&app, "/api/github?username=octocat").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json(), profile);
    assert_eq!(first.json(), second.json());
}

#[tokio::test]
async fn github_repos_use_star_sort_by_default() {
    let server = MockServer::start().await;
    Mock::given(path("/github/users/octocat/repos"))
        .and(query_param("sort", "stars"))
        .and(query_param("per_page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Spoon-Knife", "stargazers_count": 12000 },
            { "name": "Hello-World", "stargazers_count": 2500 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/github?username=octocat&repos=true").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()[0]["name"], "Spoon-Knife");
}

#[tokio::test]
async fn github_unknown_user_is_404() {
    let server = MockServer::start().await;
    Mock::given(path("/github/users/nobody-here"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/github?username=nobody-here").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["error"], "GitHub user not found");
}

fn twitch_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", "Bearer user-token")
        .header("client-id", "client-123")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn twitch_requires_credentials_before_parameters() {
    let reply = get(&app(Config::default()), "/api/twitch").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["error"], "Missing authorization headers");

    let reply = send(&app(Config::default()), twitch_request("/api/twitch")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"], "Missing required parameter: user_id");
}

#[tokio::test]
async fn twitch_streams_forward_caller_credentials() {
    let server = MockServer::start().await;
    let streams = json!({
        "data": [{ "user_login": "streamer", "title": "Speedrun", "viewer_count": 321 }],
        "pagination": {}
    });
    Mock::given(path("/helix/streams/followed"))
        .and(query_param("user_id", "42"))
        .and(header("authorization", "Bearer user-token"))
        .and(header("client-id", "client-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&streams))
        .expect(1)
        .mount(&server)
        .await;

    let reply = send(&app(config_for(&server)), twitch_request("/api/twitch?user_id=42")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), streams);
}

#[tokio::test]
async fn twitch_users_expand_comma_separated_ids() {
    let server = MockServer::start().await;
    Mock::given(path("/helix/users"))
        .and(query_param("id", "1"))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "1", "login": "a" }, { "id": "2", "login": "b" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(config_for(&server));
    let reply = send(&app, twitch_request("/api/twitch-users?ids=1,%202,")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["data"].as_array().unwrap().len(), 2);

    let reply = send(&app, twitch_request("/api/twitch-users?ids=,")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn twitch_expired_token_passes_through_as_401() {
    let server = MockServer::start().await;
    Mock::given(path("/helix/streams/followed"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid OAuth token" })))
        .mount(&server)
        .await;

    let reply = send(&app(config_for(&server)), twitch_request("/api/twitch?user_id=42")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["error"], "Failed to fetch Twitch data");
}

#[tokio::test]
async fn suggest_reshapes_upstream_list() {
    let server = MockServer::start().await;
    Mock::given(path("/suggest"))
        .and(query_param("client", "firefox"))
        .and(query_param("q", "rust async"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json; charset=utf-8")
                .set_body_string(r#"["rust async",["rust async book","rust async trait"]]"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reply = get(&app(config_for(&server)), "/api/suggest?q=rust%20async").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({ "suggestions": ["rust async book", "rust async trait"] })
    );
}

#[tokio::test]
async fn cors_preflight_is_answered_for_api_routes() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/twitch")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "authorization,client-id")
        .body(Body::empty())
        .unwrap();

    let reply = send(&app(Config::default()), request).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["access-control-allow-origin"], "*");
    let allowed = reply.headers["access-control-allow-headers"].to_str().unwrap().to_lowercase();
    assert!(allowed.contains("client-id"));
}

#[tokio::test]
async fn non_get_methods_are_not_allowed() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/crypto")
        .body(Body::empty())
        .unwrap();
    let reply = send(&app(Config::default()), request).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn static_dir_serves_spa_fallback() {
    let dir = std::env::temp_dir().join(format!("newtab-dist-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<!doctype html><title>New tab</title>").unwrap();

    let config = Config {
        static_dir: Some(dir.clone()),
        ..Config::default()
    };
    let reply = get(&app(config), "/settings/layout").await;
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(reply.status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&reply.raw).contains("New tab"));
}
