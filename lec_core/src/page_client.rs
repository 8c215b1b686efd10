//! Scrapes the statically rendered events page.
//!
//! Fallback for when the JSON search API is unavailable. Each event card only
//! exposes a month abbreviation and a day number, so scraped events carry the
//! current year and a date-only start, which serializes as an all-day entry.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::America::Denver;
use scraper::{ElementRef, Html, Selector};

use crate::{
    error::Result,
    event::{clean_text, compose_description, DescriptionParts, Event},
    event_client::{headers, EVENTS_PAGE_URL},
    retry::RetryPolicy,
};

static CARD_SELECTOR: &str = ".shared-item-card";
static TITLE_LINK_SELECTOR: &str = "h3 a";
static MONTH_SELECTOR: &str = ".mini-date-container .month";
static DAY_SELECTOR: &str = ".mini-date-container .day";
static LOCATION_SELECTOR: &str = ".location";

/// Scrape the event cards off the events page itself.
pub async fn scrape_events(retry: &RetryPolicy) -> Result<Vec<Event>> {
    let client = reqwest::Client::builder()
        .default_headers(headers())
        .build()?;
    let client = &client;
    let body = retry
        .run(move || {
            let request = client.get(EVENTS_PAGE_URL);
            async move { Ok(request.send().await?.error_for_status()?.text().await?) }
        })
        .await?;
    let events = parse_events(&body, Utc::now().with_timezone(&Denver).year());
    tracing::info!(events = events.len(), "scraped the static events page");
    Ok(events)
}

/// Parse the event cards. Cards without a title anchor are skipped; cards
/// with an unparsable date are kept without a start time.
fn parse_events(html: &str, year: i32) -> Vec<Event> {
    let dom = Html::parse_document(html);
    let card_selector = Selector::parse(CARD_SELECTOR).unwrap();
    let title_link_selector = Selector::parse(TITLE_LINK_SELECTOR).unwrap();
    let month_selector = Selector::parse(MONTH_SELECTOR).unwrap();
    let day_selector = Selector::parse(DAY_SELECTOR).unwrap();
    let location_selector = Selector::parse(LOCATION_SELECTOR).unwrap();
    let element_text = |element: ElementRef| clean_text(&element.text().collect::<String>());
    let mut events = vec![];
    for card in dom.select(&card_selector) {
        let Some(anchor) = card.select(&title_link_selector).next() else {
            continue;
        };
        let title = element_text(anchor);
        let link = anchor.value().attr("href").unwrap_or_default().to_string();
        let month = card
            .select(&month_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let day = card
            .select(&day_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let start = parse_card_date(&month, &day, year);
        let location = card
            .select(&location_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let description = compose_description(&DescriptionParts {
            title: &title,
            link: &link,
            venue: "",
            venue_url: "",
            media_url: "",
            categories: "",
        });
        events.push(Event {
            title,
            start,
            end: None,
            description,
            location,
        });
    }
    events
}

/// Combine the card's month abbreviation and day number with the given year
/// into midnight Mountain Time. Unparsable labels yield no start time.
fn parse_card_date(month: &str, day: &str, year: i32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(&format!("{month} {day} {year}"), "%b %d %Y").ok()?;
    Denver
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()
        .map(|start| start.with_timezone(&Utc))
}
