//! Google Calendar day timeline for Dayline.
//!
//! Fetches today's events across all of the user's calendars, positions them on
//! a vertical time axis and caches the rendered list until the user refreshes,
//! signs out, or the day changes.

pub mod aggregator;
pub mod cache;
pub mod client;
pub mod colors;
pub mod error;
pub mod session;
pub mod store;
pub mod time_math;
pub mod types;

pub use aggregator::CalendarAggregator;
pub use cache::{CacheState, EventCache, RenderedEventList, ScrollPositionStore};
pub use client::{CalendarClient, CalendarSource};
pub use colors::{ColorResolver, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
pub use error::{CalendarError, SessionError};
pub use session::{
    AuthSessionManager, Clock, LoadOutcome, LocalClock, PresentationSink, SessionState,
};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use time_math::{DayWindow, TimelineLayout};
pub use types::{CalendarRef, ColorMapping, ColorPair, EventRecord, PositionedEvent};
