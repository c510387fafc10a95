use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "weatherdiary-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    // The probe doubles as a staleness signal: the newest cached weather date
    // shows whether the daily refresh has been running.
    let last_cached =
        sqlx::query_scalar::<_, Option<NaiveDate>>("SELECT MAX(date) FROM weather_cache")
            .fetch_one(&state.db)
            .await;

    match last_cached {
        Ok(last) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": { "database": "ok" },
                "last_weather_refresh": last,
            })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": { "database": "failed" },
            })),
        ),
    }
}
