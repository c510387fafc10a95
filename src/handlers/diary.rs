use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::models::diary::{DateQuery, DiaryEntry, RangeQuery};
use crate::AppState;

/// Create an entry for a date, embedding the weather resolved for that date.
///
/// Runs at serializable isolation so concurrent creates and the daily refresh
/// cannot interleave between the cache lookup and the insert.
pub async fn create_diary(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
    text: String,
) -> AppResult<()> {
    tracing::info!(date = %query.date, "Creating diary entry");

    let mut tx = state.db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    let snapshot = state.weather.resolve_for_date(&mut *tx, query.date).await?;

    sqlx::query(
        r#"
        INSERT INTO diary_entries (date, text, weather_date, weather_condition, weather_icon, weather_temperature)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(query.date)
    .bind(&text)
    .bind(snapshot.date)
    .bind(&snapshot.condition)
    .bind(&snapshot.icon)
    .bind(snapshot.temperature)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn read_diary(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<Vec<DiaryEntry>>> {
    validate_read_date(query.date)?;

    let entries = sqlx::query_as::<_, DiaryEntry>(
        "SELECT * FROM diary_entries WHERE date = $1 ORDER BY id ASC",
    )
    .bind(query.date)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

/// Entries with date in `[startDate, endDate]`. A reversed range matches
/// nothing and yields an empty list — the caller owns the ordering.
pub async fn read_diaries(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<DiaryEntry>>> {
    let entries = sqlx::query_as::<_, DiaryEntry>(
        r#"
        SELECT * FROM diary_entries
        WHERE date BETWEEN $1 AND $2
        ORDER BY date ASC, id ASC
        "#,
    )
    .bind(query.start_date)
    .bind(query.end_date)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

/// Replace the text of the first (lowest-id) entry for a date. The embedded
/// weather snapshot stays as it was at creation time.
pub async fn update_diary(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
    text: String,
) -> AppResult<()> {
    let entry = sqlx::query_as::<_, DiaryEntry>(
        "SELECT * FROM diary_entries WHERE date = $1 ORDER BY id ASC LIMIT 1",
    )
    .bind(query.date)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No diary entry for {}", query.date)))?;

    sqlx::query("UPDATE diary_entries SET text = $2, updated_at = NOW() WHERE id = $1")
        .bind(entry.id)
        .bind(&text)
        .execute(&state.db)
        .await?;

    Ok(())
}

/// Delete every entry for a date. A date with no entries is a silent no-op.
pub async fn delete_diary(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM diary_entries WHERE date = $1")
        .bind(query.date)
        .execute(&state.db)
        .await?;

    tracing::debug!(
        date = %query.date,
        deleted = result.rows_affected(),
        "Deleted diary entries"
    );

    Ok(())
}

// Sanity guard against absurd input, not a business rule: reads past
// 3050-01-01 are rejected.
fn validate_read_date(date: NaiveDate) -> Result<(), AppError> {
    let ceiling = NaiveDate::from_ymd_opt(3050, 1, 1).expect("static date");
    if date > ceiling {
        return Err(AppError::InvalidDate(date));
    }
    Ok(())
}
