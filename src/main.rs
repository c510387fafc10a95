use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;
use services::weather::WeatherService;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub weather: WeatherService,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        // Diary
        .route("/create/diary", post(handlers::diary::create_diary))
        .route("/read/diary", get(handlers::diary::read_diary))
        .route("/read/diaries", get(handlers::diary::read_diaries))
        .route("/update/diary", put(handlers::diary::update_diary))
        .route("/delete/diary", delete(handlers::diary::delete_diary))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weatherdiary_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let weather = WeatherService::new(&config).expect("Failed to build weather client");

    let state = AppState {
        db,
        config: config.clone(),
        weather,
    };

    // Daily weather cache refresh
    services::weather::spawn_refresh_worker(
        state.db.clone(),
        state.weather.clone(),
        config.weather_refresh_hour,
    );

    let app = app(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let config = Arc::new(Config {
            database_url: "postgres://localhost/unused".into(),
            host: "127.0.0.1".into(),
            port: 0,
            weather_api_key: "test-key".into(),
            weather_city: "Seoul".into(),
            weather_refresh_hour: 1,
        });
        // Lazy pool: never connects unless a handler actually hits the DB.
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let weather = WeatherService::new(&config).unwrap();
        AppState {
            db,
            config,
            weather,
        }
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["service"], "weatherdiary-api");
    }

    #[tokio::test]
    async fn read_diary_rejects_far_future_dates() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .uri("/read/diary?date=3051-01-01")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], 400);
    }

    #[tokio::test]
    async fn read_diary_requires_a_date_param() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .uri("/read/diary")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
