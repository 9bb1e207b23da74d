use chrono::{DateTime, Utc};
use scraper::Html;
use serde::Deserialize;
use serde_xml_rs::SerdeXml;
use crate::error::{AppError, Result};
use crate::upstream;

pub const FEED_USER_AGENT: &str = "DashboardApp/1.0";

/// Categories whose articles are shown on the dashboard, compared case-insensitively.
pub const ALLOWED_CATEGORIES: [&str; 6] = [
    "Innenriks",
    "Utenriks",
    "Politikk",
    "Nyheter",
    "Teknologi",
    "Forbruker",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "#text", default)]
    value: String,
}

pub async fn fetch_feed(url: &str) -> Result<String> {
    let request = upstream::client()
        .get(url)
        .header(reqwest::header::USER_AGENT, FEED_USER_AGENT);
    upstream::text(request, "News feed")
        .await
        .map_err(|e| AppError::FetchError(e.to_string()))
}

/// Parse an RSS 2.0 document into feed items, in feed order.
///
/// Items are identified by `<guid>`, falling back to `<link>`; items with neither are dropped.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    // Channel children may interleave `<item>` with other elements.
    let rss: Rss = SerdeXml::new()
        .overlapping_sequences(true)
        .from_str(xml)
        .map_err(|e| AppError::ParseError(format!("Failed to parse RSS feed: {}", e)))?;

    let items = rss
        .channel
        .items
        .into_iter()
        .filter_map(|raw| {
            let link = raw.link.map(|l| l.trim().to_string()).unwrap_or_default();
            let guid = raw
                .guid
                .map(|g| g.value.trim().to_string())
                .filter(|g| !g.is_empty())
                .or_else(|| Some(link.clone()).filter(|l| !l.is_empty()))?;

            Some(FeedItem {
                guid,
                title: raw.title.map(|t| collapse_whitespace(&t)).unwrap_or_default(),
                link,
                published_at: raw.pub_date.as_deref().and_then(parse_pub_date),
                description: raw
                    .description
                    .map(|d| strip_html(&d))
                    .filter(|d| !d.is_empty()),
                categories: raw
                    .categories
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .collect(),
            })
        })
        .collect();

    Ok(items)
}

pub fn is_allowed(item: &FeedItem, allowed: &[&str]) -> bool {
    item.categories.iter().any(|cat| {
        let cat = cat.to_lowercase();
        allowed.iter().any(|a| a.to_lowercase() == cat)
    })
}

/// The first `limit` items whose category is in the allow-list, keeping feed order.
pub fn select_items(items: Vec<FeedItem>, allowed: &[&str], limit: usize) -> Vec<FeedItem> {
    items
        .into_iter()
        .filter(|item| is_allowed(item, allowed))
        .take(limit)
        .collect()
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Reduce an HTML fragment to its visible text.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>VG RSS</title>
    <link>https://www.vg.no</link>
    <description>Siste nytt</description>
    <item>
      <title>Storting vedtar budsjett</title>
      <link>https://www.vg.no/nyheter/a/1</link>
      <guid isPermaLink="false">vg-1</guid>
      <pubDate>Mon, 03 Mar 2025 08:15:00 +0100</pubDate>
      <description>&lt;p&gt;Budsjettet er &lt;b&gt;klart&lt;/b&gt;.&lt;/p&gt;</description>
      <category>Politikk</category>
    </item>
    <item>
      <title>Cupfinale i kveld</title>
      <link>https://www.vg.no/sport/a/2</link>
      <guid>vg-2</guid>
      <category>Sport</category>
    </item>
    <item>
      <title>Ny mobil lansert</title>
      <link>https://www.vg.no/teknologi/a/3</link>
      <category>TEKNOLOGI</category>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_in_feed_order() {
        let items = parse_feed(FEED).unwrap();
        let guids: Vec<&str> = items.iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, ["vg-1", "vg-2", "https://www.vg.no/teknologi/a/3"]);
    }

    #[test]
    fn description_html_is_stripped() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(items[0].description.as_deref(), Some("Budsjettet er klart ."));
        assert!(items[1].description.is_none());
    }

    #[test]
    fn pub_date_is_normalised_to_utc() {
        let items = parse_feed(FEED).unwrap();
        let published = items[0].published_at.unwrap();
        assert_eq!(published.to_rfc3339(), "2025-03-03T07:15:00+00:00");
    }

    #[test]
    fn category_filter_is_case_insensitive() {
        let items = parse_feed(FEED).unwrap();
        let selected = select_items(items, &ALLOWED_CATEGORIES, 5);
        let titles: Vec<&str> = selected.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Storting vedtar budsjett", "Ny mobil lansert"]);
    }

    #[test]
    fn selection_respects_limit() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(select_items(items, &ALLOWED_CATEGORIES, 1).len(), 1);
    }

    #[test]
    fn items_split_by_other_channel_elements_are_all_read() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>VG RSS</title>
    <item>
      <title>Regjeringen legger fram plan</title>
      <link>https://www.vg.no/nyheter/a/10</link>
      <guid>vg-10</guid>
      <category domain="https://www.vg.no">Innenriks</category>
    </item>
    <lastBuildDate>Mon, 03 Mar 2025 09:00:00 +0100</lastBuildDate>
    <item>
      <title>Valg i Tyskland</title>
      <link>https://www.vg.no/nyheter/a/11</link>
      <guid>vg-11</guid>
      <description><![CDATA[<p>Resultatet er <em>klart</em></p>]]></description>
      <category>Utenriks</category>
      <media:content url="https://akamai.vgc.no/bilde.jpg" medium="image" />
    </item>
  </channel>
</rss>"#;

        let items = parse_feed(xml).unwrap();
        let guids: Vec<&str> = items.iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, ["vg-10", "vg-11"]);
        assert_eq!(items[0].categories, ["Innenriks"]);
        assert_eq!(items[1].description.as_deref(), Some("Resultatet er klart"));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        assert!(matches!(parse_feed("<rss><channel>"), Err(AppError::ParseError(_))));
    }
}
