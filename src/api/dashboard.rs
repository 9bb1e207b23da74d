use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};

use crate::api::models::{CalendarFailure, CalendarQuery};
use crate::api::response::{self, CALENDAR_CACHE, NEWS_CACHE};
use crate::calendar::{self, Lookup};
use crate::command::CommandEntry;
use crate::error::Result;
use crate::AppState;

pub async fn command(State(state): State<AppState>) -> Result<Json<CommandEntry>> {
    state.commands.get_command().map(Json)
}

pub async fn news_summary(State(state): State<AppState>) -> Result<Response> {
    let news = state
        .news
        .get_summaries()
        .await
        .map_err(|e| e.labeled("Failed to summarize news feed"))?;
    Ok(response::cached(NEWS_CACHE, news))
}

pub async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Response {
    let now = state.clock.now();
    match calendar::upcoming_events(&state.config, query.calendar_link.as_deref(), now).await {
        Ok(Lookup::Found(found)) => {
            tracing::info!(source = ?found.source, count = found.count, "calendar events served");
            response::cached(CALENDAR_CACHE, found)
        }
        Ok(Lookup::NotConfigured) => Json(CalendarFailure {
            error: "Calendar not configured".to_string(),
            message: "Provide a public calendar link/ID in Settings or set GOOGLE_CALENDAR_API_KEY"
                .to_string(),
            events: Vec::new(),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "calendar lookup failed");
            Json(CalendarFailure {
                error: "Failed to fetch calendar events".to_string(),
                message: err.detail(),
                events: Vec::new(),
            })
            .into_response()
        }
    }
}
