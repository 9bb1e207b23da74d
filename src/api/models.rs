use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::calendar::Event;

#[derive(Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

#[derive(Deserialize)]
pub struct CryptoQuery {
    pub ids: Option<String>,
    pub vs_currencies: Option<String>,
    pub include_24hr_change: Option<String>,
}

#[derive(Deserialize)]
pub struct GithubQuery {
    pub username: Option<String>,
    pub repos: Option<String>,
    pub sort: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Deserialize)]
pub struct TwitchStreamsQuery {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct TwitchUsersQuery {
    pub ids: Option<String>,
}

#[derive(Deserialize)]
pub struct SuggestQuery {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct CalendarQuery {
    #[serde(rename = "calendarLink")]
    pub calendar_link: Option<String>,
}

// The upstream shapes below only gate what is proxied; the caller still receives the upstream bytes.

/// CoinGecko `simple/price`: coin id -> currency/24h-change fields.
pub type PriceMap = BTreeMap<String, Map<String, Value>>;

#[derive(Deserialize)]
pub struct GithubUser {
    pub login: String,
}

/// A Twitch Helix list response.
#[derive(Deserialize)]
pub struct HelixPage {
    pub data: Vec<IgnoredAny>,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub twitch_client_id: String,
    pub twitch_redirect_uri: String,
}

#[derive(Serialize)]
pub struct Health {
    pub ok: bool,
}

/// Calendar failures are reported with a 200 so the widget can render its empty state.
#[derive(Serialize)]
pub struct CalendarFailure {
    pub error: String,
    pub message: String,
    pub events: Vec<Event>,
}

/// Treats absent and blank query values alike.
pub fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
