use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    pub weather_api_key: String,
    pub weather_city: String,
    /// Hour of day (UTC) at which the daily weather refresh runs.
    pub weather_refresh_hour: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),

            weather_api_key: env::var("OPENWEATHERMAP_API_KEY")
                .expect("OPENWEATHERMAP_API_KEY must be set"),
            weather_city: env::var("WEATHER_CITY").unwrap_or_else(|_| "Seoul".into()),
            weather_refresh_hour: env::var("WEATHER_REFRESH_HOUR")
                .unwrap_or_else(|_| "1".into())
                .parse()
                .expect("WEATHER_REFRESH_HOUR must be an hour (0-23)"),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
