//! Merges today's events from every calendar into one positioned list.

use chrono::TimeZone;
use dayline_auth::AccessToken;
use tracing::instrument;

use crate::client::CalendarSource;
use crate::error::CalendarError;
use crate::time_math::{format_clock_time, height_px, offset_px, DayWindow, TimelineLayout};
use crate::types::{CalendarRef, ColorMapping, EventRecord, PositionedEvent};

pub struct CalendarAggregator<'a, S> {
    source: &'a S,
    layout: TimelineLayout,
}

impl<'a, S: CalendarSource> CalendarAggregator<'a, S> {
    pub fn new(source: &'a S, layout: TimelineLayout) -> Self {
        Self { source, layout }
    }

    pub async fn list_calendars(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<CalendarRef>, CalendarError> {
        let calendars = self.source.list_calendars(token).await?;
        tracing::info!("Found {} calendars", calendars.len());
        Ok(calendars)
    }

    /// Timed events of one calendar within `window`, in start order.
    pub async fn fetch_day_events<Tz: TimeZone>(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        window: &DayWindow<Tz>,
    ) -> Result<Vec<EventRecord>, CalendarError> {
        let api_events = self
            .source
            .list_events(token, calendar_id, &window.time_min(), &window.time_max())
            .await?;

        let fetched = api_events.len();
        let mut records: Vec<EventRecord> = api_events
            .into_iter()
            .filter_map(EventRecord::from_api)
            .collect();
        records.sort_by_key(|r| r.start);

        tracing::debug!(
            "Calendar {}: {} events, {} timed",
            calendar_id,
            fetched,
            records.len()
        );
        Ok(records)
    }

    /// Fetch each calendar in listing order, one at a time, and position its events.
    ///
    /// Output is grouped by calendar, not sorted globally by time. Any calendar
    /// failing abandons the whole day.
    #[instrument(skip_all, fields(calendars = calendars.len()), level = "info")]
    pub async fn aggregate_today<Tz: TimeZone>(
        &self,
        token: &AccessToken,
        calendars: &[CalendarRef],
        window: &DayWindow<Tz>,
        colors: &ColorMapping,
    ) -> Result<Vec<PositionedEvent>, CalendarError> {
        let tz = window.timezone();
        let mut positioned = Vec::new();

        for calendar in calendars {
            let records = self
                .fetch_day_events(token, &calendar.id, window)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        "Aborting aggregation: calendar {} failed: {}",
                        calendar.id,
                        e
                    );
                    CalendarError::Aggregation {
                        calendar_id: calendar.id.clone(),
                        source: Box::new(e),
                    }
                })?;

            positioned.extend(
                records
                    .into_iter()
                    .map(|record| position_event(record, &tz, &self.layout, colors)),
            );
        }

        tracing::info!("Aggregated {} events", positioned.len());
        Ok(positioned)
    }
}

/// Place one event on the timeline, in the wall-clock time of `tz`.
pub fn position_event<Tz: TimeZone>(
    record: EventRecord,
    tz: &Tz,
    layout: &TimelineLayout,
    colors: &ColorMapping,
) -> PositionedEvent {
    let start = record.start.with_timezone(tz);
    let end = record.end.with_timezone(tz);

    let top_offset_px = offset_px(&start, layout.start_hour, layout.scale);
    let height_px = height_px(&start, &end, layout.scale);
    if start.date_naive() != end.date_naive() || height_px < 0.0 {
        tracing::warn!(
            "Event {:?} crosses midnight; height {}px is not meaningful",
            record.title,
            height_px
        );
    }

    let (background_color, foreground_color) = colors.colors_for(record.color_id.as_deref());

    PositionedEvent {
        start_label: format_clock_time(&start),
        end_label: format_clock_time(&end),
        top_offset_px,
        height_px,
        background_color,
        foreground_color,
        record,
    }
}
