//! This crate implements the scraping pipeline behind an iCalendar feed of
//! upcoming Laramie events.
//!
//! The events are read from <https://www.visitlaramie.org>, either through the
//! site's JSON search API (see [`event_client`]) or by scraping the statically
//! rendered events page (see [`page_client`]).

pub use ical;

pub mod calendar;
pub mod error;
pub mod event;
pub mod event_client;
pub mod page_client;
pub mod retry;

pub use error::{Error, Result};
