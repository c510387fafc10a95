use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::models::weather::WeatherSnapshot;

/// A user-authored note for a date. The snapshot's own `date` can differ from
/// the entry's `date`: a cache miss falls back to current weather.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub text: String,
    pub weather: WeatherSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// The snapshot lives in flattened weather_* columns on diary_entries.
impl<'r> FromRow<'r, PgRow> for DiaryEntry {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            date: row.try_get("date")?,
            text: row.try_get("text")?,
            weather: WeatherSnapshot {
                date: row.try_get("weather_date")?,
                condition: row.try_get("weather_condition")?,
                icon: row.try_get("weather_icon")?,
                temperature: row.try_get("weather_temperature")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
