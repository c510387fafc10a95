use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A weather observation tied to a calendar date.
///
/// Rows in `weather_cache` carry this shape; diary entries embed a by-value
/// copy taken at creation time, so later cache writes never affect them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WeatherSnapshot {
    pub date: NaiveDate,
    /// Short category string from the provider, e.g. "Clear".
    pub condition: String,
    /// Provider icon code, e.g. "01d".
    pub icon: String,
    /// Degrees as reported by the provider (Kelvin for OpenWeatherMap).
    pub temperature: f64,
}
