//! Builds the iCalendar document from normalized events.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::America::Denver;
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEventBuilder, Property},
    ical_property,
};
use regex::Regex;

use crate::event::Event;

static PROD_ID: &str = "-//Laramie Events//visitlaramie.org";
static TIMEZONE: &str = "America/Denver";
static DATE_FORMAT: &str = "%Y%m%d";
static DATETIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Build the calendar. Events without a start time are dropped here.
///
/// An event whose start is exactly local midnight in Mountain Time becomes a
/// date-only all-day entry; anything else becomes a timed entry in UTC.
pub fn build_calendar(events: &[Event]) -> IcalCalendar {
    let changed = chrono::Local::now().format("%Y%m%dT%H%M%S").to_string();
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(PROD_ID)
        .build();
    for event in events {
        let Some(start) = event.start else {
            continue;
        };
        let builder = IcalEventBuilder::tzid(TIMEZONE)
            .uid(uid(&event.title, start))
            .changed(&changed);
        let start_mt = start.with_timezone(&Denver);
        let builder = if start_mt.time() == NaiveTime::MIN {
            builder.one_day(start_mt.format(DATE_FORMAT).to_string())
        } else {
            let timed = builder.set(ical_property!(
                "DTSTART",
                start.format(DATETIME_FORMAT).to_string()
            ));
            match event.end {
                Some(end) => timed.set(ical_property!(
                    "DTEND",
                    end.format(DATETIME_FORMAT).to_string()
                )),
                None => timed,
            }
        };
        let mut builder = builder
            .set(ical_property!("SUMMARY", &event.title))
            .set(ical_property!("DESCRIPTION", &event.description));
        if !event.location.is_empty() {
            builder = builder.set(ical_property!("LOCATION", &event.location));
        }
        calendar.events.push(builder.build());
    }
    calendar
}

/// Get a unique id for an event at a specific start time.
///
/// Changing this function is a breaking change!
fn uid(title: &str, start: DateTime<Utc>) -> String {
    let whitespace_regex = Regex::new(r"\s+").unwrap();
    let title = whitespace_regex.replace_all(title, "-");
    format!(
        "{}_{}@visitlaramie.org",
        title,
        start.format(DATETIME_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use ical::generator::IcalEvent;

    use super::*;

    fn event(title: &str, start: Option<DateTime<Utc>>) -> Event {
        Event {
            title: title.to_string(),
            start,
            end: None,
            description: title.to_string(),
            location: String::new(),
        }
    }

    fn property<'a>(ical_event: &'a IcalEvent, name: &str) -> Option<&'a String> {
        ical_event
            .properties
            .iter()
            .find(|property| property.name == name)
            .and_then(|property| property.value.as_ref())
    }

    #[test]
    fn test_events_without_start_are_dropped() {
        let events = [
            event("Kept", Some(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap())),
            event("Dropped", None),
        ];
        let calendar = build_calendar(&events);
        assert_eq!(calendar.events.len(), 1);
        assert_eq!(property(&calendar.events[0], "SUMMARY").unwrap(), "Kept");
    }

    #[test]
    fn test_all_day_and_timed_entries() {
        // Midnight Mountain Daylight Time is 06:00 UTC.
        let all_day = event(
            "All Day",
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()),
        );
        let mut timed = event(
            "Timed",
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()),
        );
        timed.end = Some(Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap());

        let calendar = build_calendar(&[all_day, timed]);
        assert_eq!(calendar.events.len(), 2);

        // Date-only entry for the midnight start, timed UTC entry otherwise.
        assert_eq!(property(&calendar.events[0], "DTSTART").unwrap(), "20240601");
        assert_eq!(
            property(&calendar.events[1], "DTSTART").unwrap(),
            "20240601T180000Z"
        );
        assert_eq!(
            property(&calendar.events[1], "DTEND").unwrap(),
            "20240601T200000Z"
        );
    }

    /// All-day detection follows the zone database, not a fixed offset:
    /// midnight Mountain Standard Time is 07:00 UTC.
    #[test]
    fn test_all_day_detection_across_dst() {
        let winter = event(
            "Winter",
            Some(Utc.with_ymd_and_hms(2024, 12, 1, 7, 0, 0).unwrap()),
        );
        let calendar = build_calendar(&[winter]);
        assert_eq!(
            property(&calendar.events[0], "DTSTART").unwrap(),
            "20241201"
        );
    }

    #[test]
    fn test_location_only_when_present() {
        let mut located = event(
            "Located",
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()),
        );
        located.location = "Depot Park".to_string();
        let bare = event(
            "Bare",
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()),
        );

        let calendar = build_calendar(&[located, bare]);
        assert_eq!(
            property(&calendar.events[0], "LOCATION").unwrap(),
            "Depot Park"
        );
        assert!(property(&calendar.events[1], "LOCATION").is_none());
    }

    #[test]
    fn test_uid_is_stable() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        assert_eq!(
            uid("Farmers Market", start),
            "Farmers-Market_20240601T180000Z@visitlaramie.org"
        );
    }
}
