//! This client drives the JSON search API behind the events page.
//!
//! The API wants a short-lived anti-bot token and the set of category ids the
//! site embeds in a script tag on the events page. Both are fetched fresh on
//! every run.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::America::Denver;
use chrono_tz::Tz;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{Error, Result},
    event::{clean_text, compose_description, DescriptionParts, Event},
    retry::RetryPolicy,
};

static TOKEN_URL: &str = "https://www.visitlaramie.org/plugins/core/get_simple_token/";
pub(crate) static EVENTS_PAGE_URL: &str = "https://www.visitlaramie.org/events/";
static QUERY_URL: &str =
    "https://www.visitlaramie.org/includes/rest_v2/plugins_events_events_by_date/find";
static CATEGORY_MARKER: &str = "categories = [";
static QUERY_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";

/// Fixed headers emulating a browser issuing an AJAX request. The API answers
/// 403 to anything that looks like a plain script.
pub(crate) fn headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    headers.insert(REFERER, HeaderValue::from_static(EVENTS_PAGE_URL));
    headers
}

/// Scrape the next 30 days of events through the JSON search API.
pub async fn scrape_events(retry: &RetryPolicy) -> Result<Vec<Event>> {
    let client = reqwest::Client::builder()
        .default_headers(headers())
        .build()?;
    let categories = fetch_categories(&client).await?;
    tracing::debug!(categories = categories.len(), "discovered event categories");
    let token = fetch_simple_token(&client, retry).await?;
    let (start, end) = query_window(Utc::now().with_timezone(&Denver));
    let query = build_query(&categories, start, end).to_string();
    let response = fetch_events(&client, retry, &query, &token).await?;
    let events: Vec<Event> = response.docs.docs.into_iter().map(normalize).collect();
    tracing::info!(events = events.len(), "fetched events from the search API");
    Ok(events)
}

/// Fetch the anti-bot token. The response body, stripped of whitespace and
/// surrounding quotes, is the token.
async fn fetch_simple_token(client: &reqwest::Client, retry: &RetryPolicy) -> Result<String> {
    let body = retry
        .run(move || {
            let request = client.get(TOKEN_URL);
            async move { Ok(request.send().await?.error_for_status()?.text().await?) }
        })
        .await?;
    Ok(clean_token(&body))
}

fn clean_token(body: &str) -> String {
    body.trim().trim_matches('"').to_string()
}

/// Fetch the events page and pull the category ids out of its script tags.
///
/// Not retried: the page either carries the marker or the run cannot proceed.
async fn fetch_categories(client: &reqwest::Client) -> Result<Vec<String>> {
    let response = client
        .get(EVENTS_PAGE_URL)
        .send()
        .await?
        .error_for_status()?;
    extract_categories(&response.text().await?)
}

#[derive(Debug, Deserialize)]
struct Category {
    value: String,
}

/// Substring contract, not markup parsing: one of the page's scripts inlines
/// `categories = [...];` and the array literal is plain JSON.
fn extract_categories(html: &str) -> Result<Vec<String>> {
    let dom = Html::parse_document(html);
    let script_selector = Selector::parse("script").unwrap();
    let mut categories: Vec<String> = vec![];
    for script in dom.select(&script_selector) {
        let text: String = script.text().collect();
        let Some(marker) = text.find(CATEGORY_MARKER) else {
            continue;
        };
        // Slice from the opening bracket through the `]` before the `;`.
        let start = marker + CATEGORY_MARKER.len() - 1;
        let Some(close) = text[start..].find("];") else {
            continue;
        };
        let parsed: Vec<Category> = serde_json::from_str(&text[start..start + close + 1])?;
        categories = parsed.into_iter().map(|category| category.value).collect();
    }
    if categories.is_empty() {
        return Err(Error::CategoriesNotFound);
    }
    Ok(categories)
}

/// The query window starts at today's local midnight in Mountain Time and
/// spans exactly 30 days. Both endpoints are converted to UTC for the API.
fn query_window(now: DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = now
        .with_time(NaiveTime::MIN)
        .single()
        .expect("midnight exists in America/Denver");
    let start = midnight.with_timezone(&Utc);
    let end = (midnight + Duration::days(30)).with_timezone(&Utc);
    (start, end)
}

/// Build the search query: active events, any of the discovered categories,
/// within the window. The `options` block mirrors what the site's own
/// frontend sends.
fn build_query(
    categories: &[String],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> serde_json::Value {
    json!({
        "filter": {
            "active": true,
            "$and": [
                { "categories.catId": { "$in": categories } }
            ],
            "date_range": {
                "start": { "$date": start.format(QUERY_DATE_FORMAT).to_string() },
                "end": { "$date": end.format(QUERY_DATE_FORMAT).to_string() }
            }
        },
        "options": {
            "limit": 100,
            "skip": 0,
            "count": true,
            "castDocs": false,
            "fields": {
                "_id": 1,
                "location": 1,
                "date": 1,
                "startDate": 1,
                "endDate": 1,
                "recurrence": 1,
                "recurType": 1,
                "latitude": 1,
                "longitude": 1,
                "media_raw": 1,
                "recid": 1,
                "title": 1,
                "url": 1,
                "categories": 1,
                "listing.primary_category": 1,
                "listing.title": 1,
                "listing.url": 1
            },
            "hooks": [],
            "sort": { "date": 1, "rank": 1, "title_sort": 1 }
        }
    })
}

async fn fetch_events(
    client: &reqwest::Client,
    retry: &RetryPolicy,
    query: &str,
    token: &str,
) -> Result<QueryResponse> {
    retry
        .run(move || {
            let request = client
                .get(QUERY_URL)
                .query(&[("json", query), ("token", token)]);
            async move { Ok(request.send().await?.error_for_status()?.json().await?) }
        })
        .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResponse {
    docs: DocsEnvelope,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocsEnvelope {
    docs: Vec<RawEvent>,
}

/// One record as the API returns it. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEvent {
    title: Option<String>,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
    location: Option<String>,
    url: Option<String>,
    categories: Vec<RawCategory>,
    media_raw: Vec<RawMedia>,
    listing: Option<RawListing>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCategory {
    #[serde(rename = "catName")]
    cat_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMedia {
    mediaurl: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawListing {
    title: Option<String>,
    url: Option<String>,
}

fn normalize(raw: RawEvent) -> Event {
    let title = clean_text(raw.title.as_deref().unwrap_or("No Title"));
    let start = raw.start_date.as_deref().and_then(parse_timestamp);
    let end = raw.end_date.as_deref().and_then(parse_timestamp);
    let location = clean_text(raw.location.as_deref().unwrap_or_default());
    let link = raw.url.unwrap_or_default();
    let categories = raw
        .categories
        .into_iter()
        .map(|category| category.cat_name.unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ");
    let media_url = raw
        .media_raw
        .into_iter()
        .next()
        .and_then(|media| media.mediaurl)
        .unwrap_or_default();
    let (venue, venue_url) = match raw.listing {
        Some(listing) => (
            listing.title.unwrap_or_default(),
            listing.url.unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    let description = compose_description(&DescriptionParts {
        title: &title,
        link: &link,
        venue: &venue,
        venue_url: &venue_url,
        media_url: &media_url,
        categories: &categories,
    });
    Event {
        title,
        start,
        end,
        description,
        location,
    }
}

/// Bad timestamps are absorbed: the field just ends up empty.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_extract_categories() {
        let html = include_str!("event_client/tests/events_page.html");
        let categories = extract_categories(html).unwrap();
        assert_eq!(categories, vec!["cat_1", "cat_7", "cat_12"]);
    }

    #[test]
    fn test_extract_categories_missing_marker() {
        let html = "<html><head><script>var widget = {};</script></head><body></body></html>";
        assert!(matches!(
            extract_categories(html),
            Err(Error::CategoriesNotFound)
        ));
    }

    #[test]
    fn test_clean_token() {
        assert_eq!(clean_token(" \"a1b2c3\"\n"), "a1b2c3");
        assert_eq!(clean_token("plain"), "plain");
    }

    #[test]
    fn test_query_window_spans_30_days_from_local_midnight() {
        let now = Denver.with_ymd_and_hms(2024, 6, 15, 13, 45, 12).unwrap();
        let (start, end) = query_window(now);
        // Midnight Mountain Daylight Time is 06:00 UTC.
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 15, 6, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 7, 15, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_build_query() {
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 6, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 7, 15, 6, 0, 0).unwrap();
        let query = build_query(&["cat_1".to_string()], start, end);
        assert_eq!(query["filter"]["active"], true);
        assert_eq!(query["filter"]["$and"][0]["categories.catId"]["$in"][0], "cat_1");
        assert_eq!(
            query["filter"]["date_range"]["start"]["$date"],
            "2024-06-15T06:00:00.000Z"
        );
        assert_eq!(
            query["filter"]["date_range"]["end"]["$date"],
            "2024-07-15T06:00:00.000Z"
        );
        assert_eq!(query["options"]["limit"], 100);
    }

    #[test]
    fn test_normalize() {
        let response: QueryResponse =
            serde_json::from_str(include_str!("event_client/tests/response.json")).unwrap();
        let events: Vec<Event> = response.docs.docs.into_iter().map(normalize).collect();
        assert_eq!(events.len(), 3);

        let first = &events[0];
        assert_eq!(first.title, "Farmers Market at Depot Park");
        assert_eq!(
            first.start,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap())
        );
        assert_eq!(
            first.end,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 21, 0, 0).unwrap())
        );
        assert_eq!(first.location, "Depot Park");
        assert_eq!(
            first.description,
            "Farmers Market at Depot Park\n\
             More info: https://www.visitlaramie.org/event/farmers-market/8661/\n\
             Venue: Depot Park\n\
             Venue Info: https://www.visitlaramie.org/listing/depot-park/241/\n\
             Image: https://assets.simpleviewinc.com/sv/farmers.jpg\n\
             Categories: Music, Outdoors"
        );

        // A malformed timestamp is absorbed, the record survives without a start.
        let second = &events[1];
        assert_eq!(second.title, "Gallery Walk");
        assert_eq!(second.start, None);
        assert_eq!(second.description, "Gallery Walk");

        let third = &events[2];
        assert_eq!(third.title, "No Title");
        assert_eq!(
            third.start,
            Some(Utc.with_ymd_and_hms(2024, 6, 8, 6, 0, 0).unwrap())
        );
    }
}
