use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::ConfigError(format!("Invalid LOG_FORMAT: {}", other))),
        }
    }
}

/// Base URLs of every third-party API the service talks to.
#[derive(Clone, Debug)]
pub struct UpstreamUrls {
    pub weather: String,
    pub crypto: String,
    pub github: String,
    pub twitch: String,
    pub suggest: String,
    pub openai: String,
    pub google_calendar: String,
    pub google_ical: String,
}

impl Default for UpstreamUrls {
    fn default() -> Self {
        UpstreamUrls {
            weather: "https://api.met.no/weatherapi/locationforecast/2.0/compact".to_string(),
            crypto: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            github: "https://api.github.com".to_string(),
            twitch: "https://api.twitch.tv/helix".to_string(),
            suggest: "https://suggestqueries.google.com/complete/search".to_string(),
            openai: "https://api.openai.com/v1/chat/completions".to_string(),
            google_calendar: "https://www.googleapis.com/calendar/v3/calendars".to_string(),
            google_ical: "https://calendar.google.com/calendar/ical".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub log_format: LogFormat,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub google_calendar_api_key: Option<String>,
    pub google_calendar_id: Option<String>,
    pub twitch_client_id: String,
    pub twitch_redirect_uri: String,
    pub commands_path: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub news_feed_url: String,
    pub weather_user_agent: String,
    pub upstream_timeout: Duration,
    pub upstreams: UpstreamUrls,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            log_format: LogFormat::Compact,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            google_calendar_api_key: None,
            google_calendar_id: None,
            twitch_client_id: String::new(),
            twitch_redirect_uri: String::new(),
            commands_path: PathBuf::from("public/cheats.json"),
            static_dir: None,
            news_feed_url: "https://www.vg.no/rss/feed".to_string(),
            weather_user_agent: "newtab-api/0.1 (+https://github.com/)".to_string(),
            upstream_timeout: Duration::from_secs(10),
            upstreams: UpstreamUrls::default(),
        }
    }
}

/// Reads a variable, treating unset and blank values the same.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        let server_addr = SocketAddr::new(ip, port);

        let log_format = match optional("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        let upstream_timeout = match optional("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .map_err(|e| AppError::ConfigError(format!("Invalid UPSTREAM_TIMEOUT_SECS: {}", e)))?;
                Duration::from_secs(secs)
            }
            None => defaults.upstream_timeout,
        };

        let base = defaults.upstreams;
        let upstreams = UpstreamUrls {
            weather: optional("WEATHER_API_URL").unwrap_or(base.weather),
            crypto: optional("CRYPTO_API_URL").unwrap_or(base.crypto),
            github: optional("GITHUB_API_URL").unwrap_or(base.github),
            twitch: optional("TWITCH_API_URL").unwrap_or(base.twitch),
            suggest: optional("SUGGEST_API_URL").unwrap_or(base.suggest),
            openai: optional("OPENAI_API_URL").unwrap_or(base.openai),
            google_calendar: optional("GOOGLE_CALENDAR_API_URL").unwrap_or(base.google_calendar),
            google_ical: optional("GOOGLE_ICAL_URL").unwrap_or(base.google_ical),
        };

        Ok(Config {
            server_addr,
            log_format,
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_model: optional("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            google_calendar_api_key: optional("GOOGLE_CALENDAR_API_KEY"),
            google_calendar_id: optional("GOOGLE_CALENDAR_ID"),
            twitch_client_id: optional("VITE_TWITCH_CLIENT_ID")
                .or_else(|| optional("TWITCH_CLIENT_ID"))
                .unwrap_or_default(),
            twitch_redirect_uri: optional("VITE_TWITCH_REDIRECT_URI")
                .or_else(|| optional("TWITCH_REDIRECT_URI"))
                .unwrap_or_default(),
            commands_path: optional("COMMANDS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.commands_path),
            static_dir: optional("STATIC_DIR").map(PathBuf::from),
            news_feed_url: optional("NEWS_FEED_URL").unwrap_or(defaults.news_feed_url),
            weather_user_agent: optional("WEATHER_USER_AGENT").unwrap_or(defaults.weather_user_agent),
            upstream_timeout,
            upstreams,
        })
    }
}
