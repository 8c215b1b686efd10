use std::{
    fs::{create_dir_all, write},
    path::PathBuf,
};

use anyhow::Result;
use clap::Parser;
use lec_core::{
    calendar::build_calendar, event_client, ical::generator::Emitter, page_client,
    retry::RetryPolicy,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(about = "Generate an iCalendar feed of upcoming Laramie events")]
pub struct Arguments {
    /// where to write the generated calendar
    #[arg(long, default_value = "./docs/events.ics")]
    pub output: PathBuf,
    /// scrape the static events page instead of the JSON search API
    #[arg(long)]
    pub static_page: bool,
    /// enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Arguments::parse();
    let default_filter = if args.verbose {
        "lec_core=debug"
    } else {
        "lec_core=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let retry = RetryPolicy::default();
    let events = if args.static_page {
        page_client::scrape_events(&retry).await?
    } else {
        event_client::scrape_events(&retry).await?
    };
    let calendar = build_calendar(&events);
    let count = calendar.events.len();
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    write(&args.output, calendar.generate())?;
    println!("Created {} with {} events!", args.output.display(), count);
    Ok(())
}
