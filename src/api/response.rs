use axum::Json;
use axum::http::header::CACHE_CONTROL;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub const CONFIG_CACHE: &str = "public, max-age=300";
pub const NEWS_CACHE: &str = "s-maxage=300, stale-while-revalidate=600";
pub const CALENDAR_CACHE: &str = "public, max-age=900";

/// A 200 JSON response carrying a `Cache-Control` directive.
pub fn cached<T: Serialize>(directive: &'static str, data: T) -> Response {
    ([(CACHE_CONTROL, directive)], Json(data)).into_response()
}
