//! Upcoming events for the calendar widget.
//!
//! A public calendar is read through its ICS export first. When no ICS address can be derived
//! from the configured link, the Google Calendar API is used if an API key is configured.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::IcalParser;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::upstream;

pub const MAX_EVENTS: usize = 20;

pub fn window() -> Duration {
    Duration::days(7)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum CalendarSource {
    #[serde(rename = "ics")]
    Ics,
    #[serde(rename = "google-api")]
    GoogleApi,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
    pub html_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvents {
    pub source: CalendarSource,
    pub events: Vec<Event>,
    pub count: usize,
}

#[derive(Debug)]
pub enum Lookup {
    Found(CalendarEvents),
    NotConfigured,
}

/// An event as read from either source, before normalisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Resolve upcoming events for `link` (or the configured default calendar).
pub async fn upcoming_events(config: &Config, link: Option<&str>, now: DateTime<Utc>) -> Result<Lookup> {
    let input = link
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .or(config.google_calendar_id.as_deref())
        .unwrap_or("")
        .trim();

    if let Some(ics) = ics_url(input, &config.upstreams.google_ical) {
        tracing::debug!(url = %ics, "reading calendar via ICS");
        let body = upstream::text(upstream::client().get(&ics), "Calendar ICS feed").await?;
        let events = parse_ics(&body)?
            .into_iter()
            .filter(|event| event.start.is_some_and(|start| in_window(start, now)))
            .collect();
        return Ok(Lookup::Found(found(CalendarSource::Ics, events)));
    }

    let Some(api_key) = config.google_calendar_api_key.as_deref() else {
        return Ok(Lookup::NotConfigured);
    };

    let id = match calendar_id(input) {
        id if id.is_empty() => "primary".to_string(),
        id => id,
    };
    let endpoint = format!("{}/{}/events", config.upstreams.google_calendar.trim_end_matches('/'), encode(&id));
    let time_min = now.to_rfc3339();
    let time_max = (now + window()).to_rfc3339();
    let request = upstream::client().get(&endpoint).query(&[
        ("key", api_key),
        ("timeMin", time_min.as_str()),
        ("timeMax", time_max.as_str()),
        ("singleEvents", "true"),
        ("orderBy", "startTime"),
        ("maxResults", "20"),
    ]);

    let page: GoogleEvents = upstream::json(request, "Google Calendar API").await?;
    let events = page.items.into_iter().map(GoogleEvent::into_raw).collect();
    Ok(Lookup::Found(found(CalendarSource::GoogleApi, events)))
}

fn found(source: CalendarSource, events: Vec<RawEvent>) -> CalendarEvents {
    let events = normalize(events);
    CalendarEvents {
        source,
        count: events.len(),
        events,
    }
}

pub fn in_window(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start >= now && start <= now + window()
}

/// Sort by start, keep the first [`MAX_EVENTS`] and convert to the client shape.
pub fn normalize(mut events: Vec<RawEvent>) -> Vec<Event> {
    events.retain(|event| event.start.is_some());
    events.sort_by_key(|event| event.start);
    events
        .into_iter()
        .take(MAX_EVENTS)
        .enumerate()
        .filter_map(|(index, event)| {
            let start = event.start?;
            let end = event.end.unwrap_or(start);
            let summary = event.summary.filter(|s| !s.is_empty());
            let id = event
                .uid
                .filter(|uid| !uid.is_empty())
                .unwrap_or_else(|| format!("{}-{}", summary.as_deref().unwrap_or("event"), index));
            Some(Event {
                id,
                summary: summary.unwrap_or_else(|| "No title".to_string()),
                description: event.description.unwrap_or_default(),
                start: EventTime {
                    date_time: start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                },
                end: EventTime {
                    date_time: end.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                },
                html_link: event.url.unwrap_or_default(),
            })
        })
        .collect()
}

/// Derive the public ICS address for a calendar link, embed URL or calendar id.
pub fn ics_url(input: &str, ical_base: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(trimmed) {
        let http = matches!(url.scheme(), "http" | "https");
        if http && url.fragment().is_none() && url.path().to_ascii_lowercase().ends_with(".ics") {
            return Some(trimmed.to_string());
        }
        if let Some((_, src)) = url.query_pairs().find(|(key, _)| key == "src") {
            return Some(public_ics(ical_base, &src));
        }
    }

    if trimmed.contains('@') {
        return Some(public_ics(ical_base, trimmed));
    }

    None
}

fn public_ics(base: &str, id: &str) -> String {
    format!("{}/{}/public/basic.ics", base.trim_end_matches('/'), encode(id))
}

/// Extract a calendar id from a bare id, an embed URL (`src=`) or an API URL (`/calendars/{id}/`).
pub fn calendar_id(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains('@') && !trimmed.starts_with("http") {
        return trimmed.to_string();
    }

    if let Ok(url) = Url::parse(trimmed) {
        if let Some((_, src)) = url.query_pairs().find(|(key, _)| key == "src") {
            return src.into_owned();
        }
        if let Some(segments) = url.path_segments() {
            let segments: Vec<&str> = segments.collect();
            if let Some(pos) = segments.iter().position(|s| *s == "calendars") {
                if pos + 2 < segments.len() && !segments[pos + 1].is_empty() {
                    return percent_decode(segments[pos + 1]);
                }
            }
        }
    }

    trimmed.to_string()
}

// Same set `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

fn percent_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse the `VEVENT`s of an iCalendar document. Recurrence rules are not expanded.
pub fn parse_ics(text: &str) -> Result<Vec<RawEvent>> {
    let mut events = Vec::new();
    for calendar in IcalParser::new(text.as_bytes()) {
        let calendar = calendar.map_err(|e| AppError::ParseError(format!("Invalid ICS feed: {}", e)))?;
        events.extend(calendar.events.iter().map(raw_event));
    }
    Ok(events)
}

// Alarm properties live in `event.alarms` and are ignored.
fn raw_event(event: &IcalEvent) -> RawEvent {
    let mut raw = RawEvent::default();
    for property in &event.properties {
        let Some(value) = property.value.as_deref() else {
            continue;
        };
        let params = property.params.as_deref().unwrap_or_default();
        match property.name.to_ascii_uppercase().as_str() {
            "UID" => raw.uid = Some(value.trim().to_string()),
            "SUMMARY" => raw.summary = Some(unescape(value)),
            "DESCRIPTION" => raw.description = Some(unescape(value)),
            "URL" => raw.url = Some(value.trim().to_string()),
            "DTSTART" => raw.start = parse_ics_time(value, params),
            "DTEND" => raw.end = parse_ics_time(value, params),
            _ => {}
        }
    }
    raw
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn parse_ics_time(value: &str, params: &[(String, Vec<String>)]) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let param = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, values)| values.first())
            .map(|v| v.trim_matches('"'))
    };
    let tz = param("TZID").and_then(|name| name.parse::<Tz>().ok());

    let is_date = param("VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE")) || value.len() == 8;
    let naive = if is_date {
        NaiveDate::parse_from_str(value, "%Y%m%d").ok()?.and_hms_opt(0, 0, 0)?
    } else if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
        return Some(Utc.from_utc_datetime(&naive));
    } else {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?
    };

    match tz {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc)),
        // floating time
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

#[derive(Debug, Deserialize)]
struct GoogleEvents {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    start: Option<GoogleTime>,
    end: Option<GoogleTime>,
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl GoogleTime {
    fn resolve(&self) -> Option<DateTime<Utc>> {
        if let Some(dt) = self.date_time.as_deref() {
            return DateTime::parse_from_rfc3339(dt).ok().map(|dt| dt.with_timezone(&Utc));
        }
        let date = NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()?;
        Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
    }
}

impl GoogleEvent {
    fn into_raw(self) -> RawEvent {
        RawEvent {
            start: self.start.as_ref().and_then(GoogleTime::resolve),
            end: self.end.as_ref().and_then(GoogleTime::resolve),
            uid: self.id,
            summary: self.summary,
            description: self.description,
            url: self.html_link,
        }
    }
}
