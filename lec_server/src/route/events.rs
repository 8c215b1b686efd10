use axum::{
    extract::Query,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use lec_core::{
    calendar::build_calendar, event_client, ical::generator::Emitter, page_client,
    retry::RetryPolicy,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    static_page: bool,
}

/// Handle calendar requests.
///
/// `?static_page=true` scrapes the rendered page instead of the search API.
pub async fn handler(
    Query(query_params): Query<QueryParams>,
) -> Result<Response, (StatusCode, String)> {
    let retry = RetryPolicy::default();
    let events = if query_params.static_page {
        page_client::scrape_events(&retry).await
    } else {
        event_client::scrape_events(&retry).await
    }
    .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    let calendar = build_calendar(&events);
    tracing::info!(events = calendar.events.len(), "serving generated calendar");
    let response = ([(CONTENT_TYPE, "text/calendar")], calendar.generate()).into_response();
    Ok(response)
}
