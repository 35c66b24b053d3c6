//! The user's event color palette.

use dayline_auth::AccessToken;

use crate::client::CalendarSource;
use crate::error::CalendarError;
use crate::types::ColorMapping;

pub const DEFAULT_BACKGROUND: &str = "#78a8f5";
pub const DEFAULT_FOREGROUND: &str = "#1d1d1d";

/// Holds the last palette that was fetched successfully.
#[derive(Debug, Default)]
pub struct ColorResolver {
    mapping: ColorMapping,
}

impl ColorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the palette once. On failure the previous palette stays in place.
    pub async fn refresh<S: CalendarSource>(
        &mut self,
        source: &S,
        token: &AccessToken,
    ) -> Result<ColorMapping, CalendarError> {
        let mapping = source.fetch_colors(token).await?;
        tracing::debug!("Loaded {} event colors", mapping.len());
        self.mapping = mapping.clone();
        Ok(mapping)
    }

    /// The last good palette, used when a fetch fails.
    pub fn mapping(&self) -> &ColorMapping {
        &self.mapping
    }
}

impl ColorMapping {
    /// (background, foreground) for an event, falling back to the fixed defaults.
    pub fn colors_for(&self, color_id: Option<&str>) -> (String, String) {
        let pair = color_id.and_then(|id| self.resolve(id));
        (
            pair.map_or(DEFAULT_BACKGROUND, |p| p.background.as_str()).to_string(),
            pair.map_or(DEFAULT_FOREGROUND, |p| p.foreground.as_str()).to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::{ApiEvent, CalendarRef, ColorPair};
    use std::cell::Cell;

    struct PaletteSource {
        fail: Cell<bool>,
    }

    impl CalendarSource for PaletteSource {
        async fn list_calendars(
            &self,
            _token: &AccessToken,
        ) -> Result<Vec<CalendarRef>, CalendarError> {
            Ok(vec![])
        }

        async fn list_events(
            &self,
            _token: &AccessToken,
            _calendar_id: &str,
            _time_min: &str,
            _time_max: &str,
        ) -> Result<Vec<ApiEvent>, CalendarError> {
            Ok(vec![])
        }

        async fn fetch_colors(&self, _token: &AccessToken) -> Result<ColorMapping, CalendarError> {
            if self.fail.get() {
                return Err(CalendarError::Server {
                    status: 500,
                    message: "down".into(),
                });
            }
            Ok(palette())
        }
    }

    fn palette() -> ColorMapping {
        [(
            "5".to_string(),
            ColorPair {
                background: "#fbd75b".to_string(),
                foreground: "#1d1d1d".to_string(),
            },
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_unknown_color_id_uses_defaults() {
        let (bg, fg) = palette().colors_for(Some("99"));
        assert_eq!(bg, "#78a8f5");
        assert_eq!(fg, "#1d1d1d");
    }

    #[test]
    fn test_absent_color_id_uses_defaults() {
        let (bg, fg) = ColorMapping::default().colors_for(None);
        assert_eq!(bg, DEFAULT_BACKGROUND);
        assert_eq!(fg, DEFAULT_FOREGROUND);
    }

    #[test]
    fn test_known_color_id_resolves() {
        let (bg, _) = palette().colors_for(Some("5"));
        assert_eq!(bg, "#fbd75b");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_palette() {
        let source = PaletteSource {
            fail: Cell::new(false),
        };
        let token = AccessToken::new("t");
        let mut resolver = ColorResolver::new();
        assert!(resolver.mapping().resolve("5").is_none());

        resolver.refresh(&source, &token).await.unwrap();
        assert!(resolver.mapping().resolve("5").is_some());

        source.fail.set(true);
        assert!(resolver.refresh(&source, &token).await.is_err());
        assert_eq!(
            resolver.mapping().resolve("5").unwrap().background,
            "#fbd75b"
        );
    }
}
