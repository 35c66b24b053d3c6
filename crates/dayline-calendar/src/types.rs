//! Calendar API types and timeline records.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A calendar from the user's calendar list. Only the id is needed to fetch events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRef {
    pub id: String,
}

/// A timed event on one calendar.
///
/// `start <= end` always holds; events without both date-times are never built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub color_id: Option<String>,
}

/// Background/foreground pair from the user's palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair {
    pub background: String,
    pub foreground: String,
}

/// Color id → palette entry. An empty mapping is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ColorMapping(HashMap<String, ColorPair>);

impl ColorMapping {
    pub fn resolve(&self, color_id: &str) -> Option<&ColorPair> {
        self.0.get(color_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ColorPair)> for ColorMapping {
    fn from_iter<I: IntoIterator<Item = (String, ColorPair)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An event placed on the timeline, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedEvent {
    pub record: EventRecord,
    pub top_offset_px: f64,
    pub height_px: f64,
    pub background_color: String,
    pub foreground_color: String,
    /// e.g. "9am"
    pub start_label: String,
    /// e.g. "10:30am"
    pub end_label: String,
}

impl PositionedEvent {
    pub fn title(&self) -> &str {
        &self.record.title
    }

    /// "9am - 10:30am"
    pub fn time_range_label(&self) -> String {
        format!("{} - {}", self.start_label, self.end_label)
    }
}

// API Response Types

/// API response for calendar list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListResponse {
    #[serde(default)]
    pub items: Vec<ApiCalendar>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCalendar {
    pub id: String,
}

impl From<ApiCalendar> for CalendarRef {
    fn from(api: ApiCalendar) -> Self {
        Self { id: api.id }
    }
}

/// API response for event list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    pub next_page_token: Option<String>,
}

/// Google Calendar API event response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub color_id: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

impl ApiEventTime {
    pub fn timed(date_time: &str) -> Self {
        Self {
            date_time: Some(date_time.to_string()),
            date: None,
        }
    }
}

/// API response for the color palette.
#[derive(Debug, Deserialize)]
pub struct ColorsResponse {
    #[serde(default)]
    pub event: ColorMapping,
}

impl EventRecord {
    /// Convert an API event, dropping all-day, unparseable and inverted events.
    pub fn from_api(api: ApiEvent) -> Option<Self> {
        let start = parse_date_time(api.start.as_ref()?)?;
        let end = parse_date_time(api.end.as_ref()?)?;

        if end < start {
            tracing::warn!(
                "Skipping event {:?} that ends before it starts",
                api.id.as_deref().unwrap_or_default()
            );
            return None;
        }

        Some(Self {
            title: api.summary.unwrap_or_default(),
            start,
            end,
            color_id: api.color_id,
        })
    }
}

fn parse_date_time(api: &ApiEventTime) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(api.date_time.as_deref()?).ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_event_from_api() {
        let json = r#"{
            "id": "event123",
            "summary": "Team Meeting",
            "colorId": "5",
            "start": {"dateTime": "2024-02-01T10:00:00-05:00"},
            "end": {"dateTime": "2024-02-01T11:00:00-05:00"}
        }"#;

        let api_event: ApiEvent = serde_json::from_str(json).unwrap();
        let event = EventRecord::from_api(api_event).unwrap();

        assert_eq!(event.title, "Team Meeting");
        assert_eq!(event.color_id.as_deref(), Some("5"));
        assert_eq!(event.start.to_rfc3339(), "2024-02-01T10:00:00-05:00");
    }

    #[test]
    fn test_all_day_event_is_excluded() {
        let json = r#"{
            "id": "event456",
            "summary": "Holiday",
            "start": {"date": "2024-02-01"},
            "end": {"date": "2024-02-02"}
        }"#;

        let api_event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(EventRecord::from_api(api_event).is_none());
    }

    #[test]
    fn test_missing_end_is_excluded() {
        let api_event = ApiEvent {
            summary: Some("Open ended".into()),
            start: Some(ApiEventTime::timed("2024-02-01T10:00:00Z")),
            ..Default::default()
        };
        assert!(EventRecord::from_api(api_event).is_none());
    }

    #[test]
    fn test_inverted_event_is_excluded() {
        let api_event = ApiEvent {
            summary: Some("Backwards".into()),
            start: Some(ApiEventTime::timed("2024-02-01T11:00:00Z")),
            end: Some(ApiEventTime::timed("2024-02-01T10:00:00Z")),
            ..Default::default()
        };
        assert!(EventRecord::from_api(api_event).is_none());
    }

    #[test]
    fn test_untitled_event_gets_empty_title() {
        let api_event = ApiEvent {
            start: Some(ApiEventTime::timed("2024-02-01T10:00:00Z")),
            end: Some(ApiEventTime::timed("2024-02-01T10:00:00Z")),
            ..Default::default()
        };
        let event = EventRecord::from_api(api_event).unwrap();
        assert_eq!(event.title, "");
        assert_eq!(event.start, event.end);
    }

    #[test]
    fn test_colors_response() {
        let json = r##"{
            "kind": "calendar#colors",
            "calendar": {"1": {"background": "#ac725e", "foreground": "#1d1d1d"}},
            "event": {
                "1": {"background": "#a4bdfc", "foreground": "#1d1d1d"},
                "11": {"background": "#dc2127", "foreground": "#1d1d1d"}
            }
        }"##;

        let colors: ColorsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(colors.event.len(), 2);
        assert_eq!(colors.event.resolve("11").unwrap().background, "#dc2127");
    }

    #[test]
    fn test_calendar_list_response() {
        let json = r#"{
            "items": [
                {"id": "primary", "summary": "Me", "accessRole": "owner"},
                {"id": "team@group.calendar.google.com"}
            ]
        }"#;

        let resp: CalendarListResponse = serde_json::from_str(json).unwrap();
        let refs: Vec<CalendarRef> = resp.items.into_iter().map(CalendarRef::from).collect();
        assert_eq!(refs[1].id, "team@group.calendar.google.com");
        assert!(resp.next_page_token.is_none());
    }
}
