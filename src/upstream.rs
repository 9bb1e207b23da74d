use axum::body::Bytes;
use axum::response::IntoResponse;
use reqwest::{header, Client, ClientBuilder, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use once_cell::sync::Lazy;
use crate::error::{AppError, Result};

// Create a static client to reuse connections across handlers
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

pub fn client() -> &'static Client {
    &CLIENT
}

/// Send a single request; non-2xx answers become `AppError::Upstream` carrying the status.
pub async fn send(request: RequestBuilder, service: &str) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(service, status = status.as_u16(), body = %truncate(&body, 300), "upstream returned an error");
    Err(AppError::upstream(
        Some(status.as_u16()),
        format!("{} responded with status: {}", service, status.as_u16()),
    ))
}

pub async fn json<T: DeserializeOwned>(request: RequestBuilder, service: &str) -> Result<T> {
    let response = send(request, service).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::ParseError(format!("{} returned an unexpected body: {}", service, e)))
}

/// An upstream body returned to the caller byte for byte, with the upstream `Content-Type`.
#[derive(Debug, Clone)]
pub struct Verbatim {
    pub content_type: String,
    pub body: Bytes,
}

impl IntoResponse for Verbatim {
    fn into_response(self) -> axum::response::Response {
        ([(axum::http::header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Like [`json`], but hands back the original bytes next to the checked shape.
pub async fn verbatim<T: DeserializeOwned>(request: RequestBuilder, service: &str) -> Result<(T, Verbatim)> {
    let response = send(request, service).await?;
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();
    let body = response.bytes().await?;
    let checked = serde_json::from_slice(&body)
        .map_err(|e| AppError::ParseError(format!("{} returned an unexpected body: {}", service, e)))?;
    Ok((checked, Verbatim { content_type, body }))
}

pub async fn text(request: RequestBuilder, service: &str) -> Result<String> {
    let response = send(request, service).await?;
    Ok(response.text().await?)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
