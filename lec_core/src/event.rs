//! The normalized event shape shared by both scraping strategies.

use chrono::{DateTime, Utc};

/// Base URL prefixed onto the relative links the site hands out.
pub static BASE_URL: &str = "https://www.visitlaramie.org";

/// One event, held in memory between scraping and serialization.
///
/// Events without a start time never reach the output calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub title: String,
    pub start: Option<DateTime<Utc>>,
    /// Only meaningful when `start` is present.
    pub end: Option<DateTime<Utc>>,
    pub description: String,
    /// Free-text location, may be empty.
    pub location: String,
}

/// Trim scraped text and flatten embedded newlines to spaces.
pub(crate) fn clean_text(text: &str) -> String {
    text.trim().replace('\n', " ")
}

/// The optional pieces of an event description.
pub(crate) struct DescriptionParts<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub venue: &'a str,
    pub venue_url: &'a str,
    pub media_url: &'a str,
    pub categories: &'a str,
}

/// Compose the description text: the title first, then one line per present
/// part, always in the same order. Empty parts are skipped entirely.
pub(crate) fn compose_description(parts: &DescriptionParts) -> String {
    let mut description = String::from(parts.title);
    if !parts.link.is_empty() {
        description.push_str(&format!("\nMore info: {BASE_URL}{}", parts.link));
    }
    if !parts.venue.is_empty() {
        description.push_str(&format!("\nVenue: {}", parts.venue));
    }
    if !parts.venue_url.is_empty() {
        description.push_str(&format!("\nVenue Info: {BASE_URL}{}", parts.venue_url));
    }
    if !parts.media_url.is_empty() {
        description.push_str(&format!("\nImage: {}", parts.media_url));
    }
    if !parts.categories.is_empty() {
        description.push_str(&format!("\nCategories: {}", parts.categories));
    }
    description
}
