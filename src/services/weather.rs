use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::Config;
use crate::error::AppResult;
use crate::models::weather::WeatherSnapshot;

const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather provider returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected weather payload: {0}")]
    Payload(String),
}

/// Produces a [`WeatherSnapshot`] for a calendar date, preferring cached rows
/// and falling back to a live OpenWeatherMap call.
#[derive(Debug, Clone)]
pub struct WeatherService {
    client: Client,
    api_key: String,
    city: String,
}

impl WeatherService {
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            api_key: config.weather_api_key.clone(),
            city: config.weather_city.clone(),
        })
    }

    /// Snapshot for `date`: the lowest-id cached row if any exist, otherwise
    /// a live fetch. The fallback returns *today's* weather even for past
    /// dates — when we have no historical data, we show current conditions.
    ///
    /// Takes an executor so the diary create path can run the lookup inside
    /// its own transaction.
    pub async fn resolve_for_date<'e, E>(&self, db: E, date: NaiveDate) -> AppResult<WeatherSnapshot>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let cached = sqlx::query_as::<_, WeatherSnapshot>(
            r#"
            SELECT date, condition, icon, temperature FROM weather_cache
            WHERE date = $1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(date)
        .fetch_optional(db)
        .await?;

        match cached {
            Some(snapshot) => Ok(snapshot),
            None => Ok(self.fetch_current().await?),
        }
    }

    /// Current conditions for the configured city, stamped with today's date.
    pub async fn fetch_current(&self) -> Result<WeatherSnapshot, WeatherError> {
        let response = self
            .client
            .get(CURRENT_WEATHER_URL)
            .query(&[("q", self.city.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status));
        }

        let body = response.text().await?;
        parse_current(&body, Utc::now().date_naive())
    }

    /// Daily refresh: fetch current conditions and append a cache row.
    /// Append-only — a second run the same day adds a second row; readers
    /// take the lowest id.
    pub async fn refresh_cache(&self, db: &PgPool) -> AppResult<WeatherSnapshot> {
        let snapshot = self.fetch_current().await?;

        sqlx::query(
            "INSERT INTO weather_cache (date, condition, icon, temperature) VALUES ($1, $2, $3, $4)",
        )
        .bind(snapshot.date)
        .bind(&snapshot.condition)
        .bind(&snapshot.icon)
        .bind(snapshot.temperature)
        .execute(db)
        .await?;

        Ok(snapshot)
    }
}

/// Spawns the once-daily cache refresh loop. Failures are logged and the loop
/// keeps running; the next attempt is the next day's slot.
pub fn spawn_refresh_worker(db: PgPool, weather: WeatherService, refresh_hour: u32) {
    tokio::spawn(async move {
        loop {
            let delay = next_refresh_delay(refresh_hour, Utc::now());
            tokio::time::sleep(delay).await;

            match weather.refresh_cache(&db).await {
                Ok(snapshot) => {
                    tracing::info!(
                        date = %snapshot.date,
                        condition = %snapshot.condition,
                        "Weather cache refreshed"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Weather cache refresh failed");
                }
            }
        }
    });
}

/// Time until the next occurrence of `refresh_hour:00` UTC.
fn next_refresh_delay(refresh_hour: u32, now: DateTime<Utc>) -> Duration {
    let hour = refresh_hour.min(23);
    let mut next = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("hour is clamped to 0-23");
    if next <= now.naive_utc() {
        next += chrono::Duration::days(1);
    }
    (next - now.naive_utc()).to_std().unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct ProviderPayload {
    weather: Vec<ProviderCondition>,
    main: ProviderMain,
}

#[derive(Debug, Deserialize)]
struct ProviderCondition {
    main: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct ProviderMain {
    temp: f64,
}

// Only weather[0].main, weather[0].icon and main.temp are read; everything
// else in the provider response is ignored.
fn parse_current(body: &str, date: NaiveDate) -> Result<WeatherSnapshot, WeatherError> {
    let payload: ProviderPayload =
        serde_json::from_str(body).map_err(|e| WeatherError::Payload(e.to_string()))?;

    let condition = payload
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::Payload("empty weather conditions".into()))?;

    Ok(WeatherSnapshot {
        date,
        condition: condition.main,
        icon: condition.icon,
        temperature: payload.main.temp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed-down real response shape from the provider.
    const SAMPLE: &str = r#"{
        "coord": {"lon": 126.9778, "lat": 37.5683},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "main": {"temp": 278.15, "feels_like": 276.2, "pressure": 1024, "humidity": 45},
        "name": "Seoul"
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_condition_icon_and_temperature() {
        let snapshot = parse_current(SAMPLE, date(2023, 1, 15)).unwrap();
        assert_eq!(snapshot.date, date(2023, 1, 15));
        assert_eq!(snapshot.condition, "Clear");
        assert_eq!(snapshot.icon, "01d");
        assert_eq!(snapshot.temperature, 278.15);
    }

    #[test]
    fn missing_weather_array_is_a_payload_error() {
        let body = r#"{"main": {"temp": 278.15}}"#;
        assert!(matches!(
            parse_current(body, date(2023, 1, 15)),
            Err(WeatherError::Payload(_))
        ));
    }

    #[test]
    fn empty_weather_array_is_a_payload_error() {
        let body = r#"{"weather": [], "main": {"temp": 278.15}}"#;
        assert!(matches!(
            parse_current(body, date(2023, 1, 15)),
            Err(WeatherError::Payload(_))
        ));
    }

    #[test]
    fn missing_temperature_is_a_payload_error() {
        let body = r#"{"weather": [{"main": "Clear", "icon": "01d"}], "main": {"pressure": 1024}}"#;
        assert!(matches!(
            parse_current(body, date(2023, 1, 15)),
            Err(WeatherError::Payload(_))
        ));
    }

    #[test]
    fn non_json_body_is_a_payload_error() {
        assert!(matches!(
            parse_current("Failed to get response.", date(2023, 1, 15)),
            Err(WeatherError::Payload(_))
        ));
    }

    #[test]
    fn refresh_later_today_waits_until_that_hour() {
        let now = date(2023, 5, 10).and_hms_opt(0, 30, 0).unwrap().and_utc();
        let delay = next_refresh_delay(1, now);
        assert_eq!(delay, Duration::from_secs(30 * 60));
    }

    #[test]
    fn refresh_hour_already_passed_waits_until_tomorrow() {
        let now = date(2023, 5, 10).and_hms_opt(2, 0, 0).unwrap().and_utc();
        let delay = next_refresh_delay(1, now);
        assert_eq!(delay, Duration::from_secs(23 * 60 * 60));
    }

    #[test]
    fn refresh_exactly_at_hour_schedules_next_day() {
        let now = date(2023, 5, 10).and_hms_opt(1, 0, 0).unwrap().and_utc();
        let delay = next_refresh_delay(1, now);
        assert_eq!(delay, Duration::from_secs(24 * 60 * 60));
    }
}
