//! Google Calendar API client.

use dayline_auth::AccessToken;
use tracing::instrument;

use crate::error::CalendarError;
use crate::types::*;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Read-only calendar data the timeline needs.
#[allow(async_fn_in_trait)]
pub trait CalendarSource {
    async fn list_calendars(&self, token: &AccessToken) -> Result<Vec<CalendarRef>, CalendarError>;

    /// Single-occurrence events of one calendar between `time_min` and `time_max`
    /// (RFC 3339), ordered by start time.
    async fn list_events(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<ApiEvent>, CalendarError>;

    async fn fetch_colors(&self, token: &AccessToken) -> Result<ColorMapping, CalendarError>;
}

pub struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for CalendarClient {
    fn default() -> Self {
        Self::new(CALENDAR_API_BASE)
    }
}

impl CalendarClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        token: &AccessToken,
        url: &str,
    ) -> Result<T, CalendarError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", token.bearer_header())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CalendarError::InvalidResponse(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(CalendarError::TokenExpired)
        } else if status.as_u16() == 403 {
            Err(CalendarError::AccessDenied)
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(CalendarError::RateLimited(retry_after))
        } else if status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::Server {
                status: status.as_u16(),
                message: text,
            })
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::ApiError {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

impl CalendarSource for CalendarClient {
    #[instrument(skip(self, token), level = "info")]
    async fn list_calendars(&self, token: &AccessToken) -> Result<Vec<CalendarRef>, CalendarError> {
        let base = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = match &page_token {
                Some(pt) => format!("{}?pageToken={}", base, urlencoding::encode(pt)),
                None => base.clone(),
            };

            let resp: CalendarListResponse = self.get(token, &url).await?;
            calendars.extend(resp.items.into_iter().map(CalendarRef::from));

            match resp.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(calendars)
    }

    #[instrument(skip(self, token), level = "info")]
    async fn list_events(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<ApiEvent>, CalendarError> {
        let base = format!(
            "{}/calendars/{}/events?timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(time_min),
            urlencoding::encode(time_max),
        );
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = match &page_token {
                Some(pt) => format!("{}&pageToken={}", base, urlencoding::encode(pt)),
                None => base.clone(),
            };

            let resp: EventListResponse = self.get(token, &url).await?;
            events.extend(resp.items);

            match resp.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(events)
    }

    #[instrument(skip(self, token), level = "info")]
    async fn fetch_colors(&self, token: &AccessToken) -> Result<ColorMapping, CalendarError> {
        let url = format!("{}/colors", self.base_url);
        let resp: ColorsResponse = self.get(token, &url).await?;
        Ok(resp.event)
    }
}
