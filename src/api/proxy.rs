//! Pass-through handlers for the third-party APIs the widgets read from.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use reqwest::header;
use serde::de::IgnoredAny;
use serde_json::Value;

use crate::api::models::{
    present, CryptoQuery, GithubQuery, GithubUser, HelixPage, PriceMap, SuggestQuery, SuggestResponse,
    TwitchStreamsQuery, TwitchUsersQuery, WeatherQuery,
};
use crate::error::{AppError, Result};
use crate::upstream::{self, Verbatim};
use crate::AppState;

pub const DEFAULT_COINS: &str = "bitcoin,ethereum,cardano,polkadot,chainlink";
const GITHUB_USER_AGENT: &str = "newtab-api";

pub async fn weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Verbatim> {
    let (Some(lat), Some(lon)) = (present(query.lat), present(query.lon)) else {
        return Err(AppError::BadRequest("Missing required parameters: lat, lon".to_string()));
    };

    let request = upstream::client()
        .get(&state.config.upstreams.weather)
        .query(&[("lat", lat.as_str()), ("lon", lon.as_str())])
        .header(header::USER_AGENT, &state.config.weather_user_agent);

    let (_, forecast) = upstream::verbatim::<IgnoredAny>(request, "Weather API")
        .await
        .map_err(|e| e.labeled("Failed to fetch weather data"))?;
    tracing::info!(%lat, %lon, bytes = forecast.body.len(), "weather forecast proxied");
    Ok(forecast)
}

pub async fn crypto(
    State(state): State<AppState>,
    Query(query): Query<CryptoQuery>,
) -> Result<Verbatim> {
    let ids = present(query.ids).unwrap_or_else(|| DEFAULT_COINS.to_string());
    let currencies = present(query.vs_currencies).unwrap_or_else(|| "usd".to_string());
    let change = present(query.include_24hr_change).unwrap_or_else(|| "true".to_string());

    let request = upstream::client()
        .get(&state.config.upstreams.crypto)
        .query(&[
            ("ids", ids.as_str()),
            ("vs_currencies", currencies.as_str()),
            ("include_24hr_change", change.as_str()),
        ])
        .timeout(state.config.upstream_timeout);

    let (prices, body) = upstream::verbatim::<PriceMap>(request, "CoinGecko API")
        .await
        .map_err(|e| e.labeled("Failed to fetch crypto data"))?;
    tracing::info!(coins = prices.len(), "crypto prices proxied");
    Ok(body)
}

fn valid_github_login(login: &str) -> bool {
    login.len() <= 39 && login.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn truthy(flag: Option<&str>) -> bool {
    match flag.map(str::trim) {
        Some(value) => !matches!(value.to_ascii_lowercase().as_str(), "false" | "0" | "no"),
        None => false,
    }
}

pub async fn github(
    State(state): State<AppState>,
    Query(query): Query<GithubQuery>,
) -> Result<Verbatim> {
    let Some(username) = present(query.username) else {
        return Err(AppError::BadRequest("Missing GitHub username".to_string()));
    };
    if !valid_github_login(&username) {
        return Err(AppError::BadRequest("Invalid GitHub username".to_string()));
    }

    let base = state.config.upstreams.github.trim_end_matches('/');
    let with_repos = truthy(query.repos.as_deref());

    let request = if with_repos {
        let per_page = query
            .per_page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(3)
            .clamp(1, 100)
            .to_string();
        let sort = present(query.sort).unwrap_or_else(|| "stars".to_string());
        upstream::client()
            .get(format!("{}/users/{}/repos", base, username))
            .query(&[("sort", sort.as_str()), ("per_page", per_page.as_str())])
    } else {
        upstream::client().get(format!("{}/users/{}", base, username))
    };
    let request = request
        .header(header::USER_AGENT, GITHUB_USER_AGENT)
        .header(header::ACCEPT, "application/vnd.github+json");

    let not_found = |err: AppError| match err {
        AppError::Upstream { status: Some(404), .. } => AppError::NotFound("GitHub user not found".to_string()),
        other if with_repos => other.labeled("Failed to fetch GitHub repositories"),
        other => other.labeled("Failed to fetch GitHub profile"),
    };

    if with_repos {
        let (repos, body) = upstream::verbatim::<Vec<IgnoredAny>>(request, "GitHub API")
            .await
            .map_err(not_found)?;
        tracing::info!(%username, repos = repos.len(), "github repositories proxied");
        Ok(body)
    } else {
        let (user, body) = upstream::verbatim::<GithubUser>(request, "GitHub API")
            .await
            .map_err(not_found)?;
        tracing::info!(%username, login = %user.login, "github profile proxied");
        Ok(body)
    }
}

/// The caller's own Twitch credentials, forwarded as-is.
fn twitch_credentials(headers: &HeaderMap) -> Result<(String, String)> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    match (read("authorization"), read("client-id")) {
        (Some(authorization), Some(client_id)) => Ok((authorization, client_id)),
        _ => Err(AppError::Unauthorized("Missing authorization headers".to_string())),
    }
}

async fn helix(
    state: &AppState,
    path: &str,
    params: &[(&str, &str)],
    credentials: (String, String),
) -> Result<(HelixPage, Verbatim)> {
    let (authorization, client_id) = credentials;
    let url = format!("{}/{}", state.config.upstreams.twitch.trim_end_matches('/'), path);
    let request = upstream::client()
        .get(url)
        .query(params)
        .header(header::AUTHORIZATION, authorization)
        .header("Client-Id", client_id)
        .header(header::ACCEPT, "application/json")
        .timeout(state.config.upstream_timeout);
    upstream::verbatim(request, "Twitch API").await
}

pub async fn twitch_streams(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TwitchStreamsQuery>,
) -> Result<Verbatim> {
    let credentials = twitch_credentials(&headers)?;
    let Some(user_id) = present(query.user_id) else {
        return Err(AppError::BadRequest("Missing required parameter: user_id".to_string()));
    };

    let (page, body) = helix(&state, "streams/followed", &[("user_id", user_id.as_str())], credentials)
        .await
        .map_err(|e| e.labeled("Failed to fetch Twitch data"))?;
    tracing::info!(live = page.data.len(), "twitch followed streams proxied");
    Ok(body)
}

pub async fn twitch_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TwitchUsersQuery>,
) -> Result<Verbatim> {
    let credentials = twitch_credentials(&headers)?;
    let ids: Vec<String> = query
        .ids
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(AppError::BadRequest("Missing required parameter: ids".to_string()));
    }

    let params: Vec<(&str, &str)> = ids.iter().map(|id| ("id", id.as_str())).collect();
    let (page, body) = helix(&state, "users", &params, credentials)
        .await
        .map_err(|e| e.labeled("Failed to fetch Twitch users data"))?;
    tracing::info!(users = page.data.len(), "twitch users proxied");
    Ok(body)
}

/// Pull the suggestion list out of the `[query, [suggestions..], ..]` answer.
pub fn parse_suggestions(body: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AppError::ParseError(format!("Suggest API returned invalid JSON: {}", e)))?;
    let list = value
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::ParseError("Suggest API returned an unexpected shape".to_string()))?;
    Ok(list
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<SuggestResponse>> {
    let Some(q) = present(query.q) else {
        return Err(AppError::BadRequest("Missing query".to_string()));
    };

    let request = upstream::client()
        .get(&state.config.upstreams.suggest)
        .query(&[("client", "firefox"), ("q", q.as_str())]);

    let suggestions = async {
        let body = upstream::text(request, "Suggest API").await?;
        parse_suggestions(&body)
    }
    .await
    .map_err(|e| e.labeled("Failed to fetch suggestions"))?;

    Ok(Json(SuggestResponse { suggestions }))
}
