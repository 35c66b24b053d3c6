//! Sign-in state and the fetch-or-cache pipeline.
//!
//! `AuthSessionManager` owns the current access token. Every load goes through
//! the event cache first; only a miss touches the network. At most one pipeline
//! run is in flight at a time, and a sign-out while a run is in flight makes that
//! run drop its results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use dayline_auth::{AccessToken, IdentityError, IdentityProvider};
use parking_lot::Mutex;

use crate::aggregator::CalendarAggregator;
use crate::cache::{EventCache, RenderedEventList};
use crate::client::CalendarSource;
use crate::colors::ColorResolver;
use crate::error::{CalendarError, SessionError};
use crate::store::KeyValueStore;
use crate::time_math::{today_window, TimelineLayout};
use crate::types::PositionedEvent;

/// Where the timeline is drawn.
pub trait PresentationSink {
    fn render(&self, events: &[PositionedEvent]);
    fn clear(&self);
    fn show_error(&self, message: &str);
}

impl<T: PresentationSink + ?Sized> PresentationSink for Arc<T> {
    fn render(&self, events: &[PositionedEvent]) {
        (**self).render(events)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn show_error(&self, message: &str) {
        (**self).show_error(message)
    }
}

/// Wall clock used to pick "today".
pub trait Clock {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SignedIn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// No token, nothing was loaded.
    SignedOut,
    /// Rendered from the cache without any network call.
    Cached { events: Vec<PositionedEvent> },
    /// Fetched, rendered and written to the cache.
    Fetched { events: Vec<PositionedEvent> },
    /// The session was signed out while fetching; results were dropped.
    Discarded,
}

pub struct AuthSessionManager<I, S, K, P, C = LocalClock> {
    identity: I,
    source: S,
    cache: EventCache<K>,
    presentation: P,
    clock: C,
    layout: TimelineLayout,
    token: Mutex<Option<AccessToken>>,
    generation: AtomicU64,
    pipeline: tokio::sync::Mutex<ColorResolver>,
}

impl<I, S, K, P, C> AuthSessionManager<I, S, K, P, C>
where
    I: IdentityProvider,
    S: CalendarSource,
    K: KeyValueStore,
    P: PresentationSink,
    C: Clock,
{
    pub fn new(
        identity: I,
        source: S,
        cache: EventCache<K>,
        presentation: P,
        clock: C,
        layout: TimelineLayout,
    ) -> Self {
        Self {
            identity,
            source,
            cache,
            presentation,
            clock,
            layout,
            token: Mutex::new(None),
            generation: AtomicU64::new(0),
            pipeline: tokio::sync::Mutex::new(ColorResolver::new()),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.token.lock().is_some() {
            SessionState::SignedIn
        } else {
            SessionState::SignedOut
        }
    }

    pub fn cache(&self) -> &EventCache<K> {
        &self.cache
    }

    /// Startup: silent token check, then load if a session exists.
    pub async fn start(&self) -> Result<LoadOutcome, SessionError> {
        match self.silent_check().await {
            Ok(Some(_)) => self.load().await,
            Ok(None) => Ok(LoadOutcome::SignedOut),
            Err(e) => {
                tracing::warn!("Silent sign-in check failed: {}", e);
                Ok(LoadOutcome::SignedOut)
            }
        }
    }

    /// Acquire a token without prompting. `None` means nobody is signed in.
    pub async fn silent_check(&self) -> Result<Option<AccessToken>, SessionError> {
        match self.identity.get_token(false).await {
            Ok(token) => {
                tracing::info!("User is signed in");
                *self.token.lock() = Some(token.clone());
                Ok(Some(token))
            }
            Err(IdentityError::NotSignedIn) => {
                tracing::info!("User is not signed in");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Prompt the user to sign in, then run the pipeline.
    pub async fn interactive_sign_in(&self) -> Result<LoadOutcome, SessionError> {
        let token = match self.identity.get_token(true).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Interactive sign-in failed: {}", e);
                self.presentation.show_error(&e.to_string());
                return Err(e.into());
            }
        };

        tracing::info!("Signed in");
        *self.token.lock() = Some(token);
        self.load().await
    }

    /// Revoke the token, then always empty the cache and the view.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let token = self.token.lock().take();
        self.generation.fetch_add(1, Ordering::SeqCst);

        match token {
            Some(token) => {
                if let Err(e) = self.identity.revoke_token(&token).await {
                    tracing::warn!(
                        "Token revocation failed, clearing local state anyway: {}",
                        e
                    );
                }
            }
            None => tracing::debug!("Sign-out without a token; nothing to revoke"),
        }

        let cleared = self.cache.invalidate();
        self.presentation.clear();
        cleared?;

        tracing::info!("Sign out successful");
        Ok(())
    }

    /// Drop the cached list and fetch everything again.
    pub async fn refresh(&self) -> Result<LoadOutcome, SessionError> {
        let token = self.current_token()?;
        let mut resolver = self
            .pipeline
            .try_lock()
            .map_err(|_| SessionError::Busy)?;

        self.cache.invalidate()?;
        self.run_pipeline(&mut resolver, &token).await
    }

    /// Render from the cache, or fetch on a miss.
    pub async fn load(&self) -> Result<LoadOutcome, SessionError> {
        let token = self.current_token()?;
        let mut resolver = self
            .pipeline
            .try_lock()
            .map_err(|_| SessionError::Busy)?;

        self.run_pipeline(&mut resolver, &token).await
    }

    fn current_token(&self) -> Result<AccessToken, SessionError> {
        self.token.lock().clone().ok_or(SessionError::NotSignedIn)
    }

    async fn run_pipeline(
        &self,
        resolver: &mut ColorResolver,
        token: &AccessToken,
    ) -> Result<LoadOutcome, SessionError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let now = self.clock.now();
        let today = now.date_naive();

        if let Some(events) = self.cached_events(today)? {
            self.presentation.render(&events);
            return Ok(LoadOutcome::Cached { events });
        }

        let events = match self.fetch(resolver, token, &now).await {
            Ok(events) => events,
            Err(e) => return Err(self.fetch_failed(e)),
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::info!(
                "Session changed while loading; discarding {} events",
                events.len()
            );
            return Ok(LoadOutcome::Discarded);
        }

        self.presentation.render(&events);
        let stored = RenderedEventList::render(&events)
            .and_then(|rendered| self.cache.store(&rendered, today));
        match stored {
            Ok(()) => tracing::info!("Event list cached"),
            Err(e) => tracing::warn!("Failed to cache event list: {}", e),
        }

        Ok(LoadOutcome::Fetched { events })
    }

    /// Cached events for `today`. An unreadable cache is wiped and treated as a miss.
    fn cached_events(
        &self,
        today: chrono::NaiveDate,
    ) -> Result<Option<Vec<PositionedEvent>>, SessionError> {
        let decoded = self
            .cache
            .try_load(today)
            .and_then(|hit| hit.map(|rendered| rendered.events()).transpose());

        match decoded {
            Ok(events) => Ok(events),
            Err(e) => {
                tracing::warn!("Discarding unreadable event cache: {}", e);
                self.cache.invalidate()?;
                Ok(None)
            }
        }
    }

    async fn fetch(
        &self,
        resolver: &mut ColorResolver,
        token: &AccessToken,
        now: &DateTime<C::Tz>,
    ) -> Result<Vec<PositionedEvent>, CalendarError> {
        let colors = match resolver.refresh(&self.source, token).await {
            Ok(colors) => colors,
            Err(e) if e.is_network() => {
                tracing::warn!("Color palette unavailable, using the last one: {}", e);
                resolver.mapping().clone()
            }
            Err(e) => return Err(e),
        };

        let aggregator = CalendarAggregator::new(&self.source, self.layout);
        let calendars = aggregator.list_calendars(token).await?;
        let window = today_window(now);

        aggregator
            .aggregate_today(token, &calendars, &window, &colors)
            .await
    }

    fn fetch_failed(&self, e: CalendarError) -> SessionError {
        if e.is_auth() {
            tracing::warn!("Calendar access rejected, signing out: {}", e);
            *self.token.lock() = None;
        } else {
            tracing::warn!("Failed to load events, keeping current view: {}", e);
        }

        self.presentation.show_error(&e.to_string());
        SessionError::Calendar(e)
    }
}
