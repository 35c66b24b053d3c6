//! Cache of the last rendered event list, plus the saved scroll position.
//!
//! The rendered list lives in a clearable store: `invalidate` wipes that whole
//! store. The scroll position lives in a separate durable store and survives
//! sign-out.

use chrono::NaiveDate;
use serde_json::Value;

use crate::store::{KeyValueStore, StoreError};
use crate::types::PositionedEvent;

const EVENT_LIST_KEY: &str = "eventListCache";
const EVENT_LIST_DAY_KEY: &str = "eventListCacheDay";
const SCROLL_POSITION_KEY: &str = "lastScrollPosition";

/// Opaque serialized rendering of a positioned event list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEventList(String);

impl RenderedEventList {
    pub fn render(events: &[PositionedEvent]) -> Result<Self, StoreError> {
        serde_json::to_string(events)
            .map(Self)
            .map_err(|e| StoreError::Write(format!("Failed to serialize event list: {}", e)))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the blob back into events for display.
    pub fn events(&self) -> Result<Vec<PositionedEvent>, StoreError> {
        serde_json::from_str(&self.0).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Populated,
}

pub struct EventCache<K> {
    store: K,
    expire_at_midnight: bool,
}

impl<K: KeyValueStore> EventCache<K> {
    pub fn new(store: K, expire_at_midnight: bool) -> Self {
        Self {
            store,
            expire_at_midnight,
        }
    }

    /// The cached rendering for `today`, if there is one.
    ///
    /// A blob rendered on another day is dropped and reported as absent when
    /// midnight expiry is on.
    pub fn try_load(&self, today: NaiveDate) -> Result<Option<RenderedEventList>, StoreError> {
        let blob = match self.store.get(EVENT_LIST_KEY)? {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::String(_)) | None => {
                tracing::debug!("Event cache miss");
                return Ok(None);
            }
            Some(other) => {
                return Err(StoreError::Corrupt(format!(
                    "expected a string under {}, found {}",
                    EVENT_LIST_KEY, other
                )))
            }
        };

        if self.expire_at_midnight {
            let cached_day = self
                .store
                .get(EVENT_LIST_DAY_KEY)?
                .and_then(|v| v.as_str().and_then(|s| s.parse::<NaiveDate>().ok()));

            if cached_day != Some(today) {
                tracing::info!(
                    "Event cache is from {:?}, today is {}; invalidating",
                    cached_day,
                    today
                );
                self.invalidate()?;
                return Ok(None);
            }
        }

        tracing::info!("Event cache hit");
        Ok(Some(RenderedEventList(blob)))
    }

    pub fn store(&self, rendered: &RenderedEventList, day: NaiveDate) -> Result<(), StoreError> {
        self.store.set(EVENT_LIST_KEY, Value::String(rendered.0.clone()))?;
        self.store.set(EVENT_LIST_DAY_KEY, Value::String(day.to_string()))?;
        tracing::debug!("Stored rendered event list for {}", day);
        Ok(())
    }

    pub fn invalidate(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        tracing::info!("Event cache invalidated");
        Ok(())
    }

    pub fn state(&self) -> Result<CacheState, StoreError> {
        Ok(match self.store.get(EVENT_LIST_KEY)? {
            Some(Value::String(s)) if !s.is_empty() => CacheState::Populated,
            _ => CacheState::Empty,
        })
    }
}

/// Last vertical scroll offset of the timeline.
pub struct ScrollPositionStore<K> {
    store: K,
}

impl<K: KeyValueStore> ScrollPositionStore<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Option<f64>, StoreError> {
        Ok(self
            .store
            .get(SCROLL_POSITION_KEY)?
            .and_then(|v| v.as_f64()))
    }

    pub fn save(&self, offset: f64) -> Result<(), StoreError> {
        let value = serde_json::Number::from_f64(offset)
            .map(Value::Number)
            .ok_or_else(|| StoreError::Write(format!("Invalid scroll offset {}", offset)))?;
        self.store.set(SCROLL_POSITION_KEY, value)
    }
}
