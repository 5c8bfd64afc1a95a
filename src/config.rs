use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Database (in-memory store when unset)
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// JSON fixture loaded into the in-memory store
    pub dev_fixture_path: Option<String>,

    // Redis (detection cache disabled when unset)
    pub redis_url: Option<String>,
    pub conflict_cache_ttl_seconds: u64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Scoring service
    pub scoring_service_url: Option<String>,
    pub scoring_service_token: Option<String>,
    pub recommendation_timeout_seconds: u64,

    // Detection
    pub travel_time_threshold_minutes: i32,
    pub travel_distance_threshold_km: f64,
    pub default_confidence_threshold: u8,
    pub max_detection_range_days: i64,
}

/// Parse an optional variable, falling back to `default` when it is unset
fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        _ => Ok(default),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // Database
        let database_url = optional("DATABASE_URL");
        if database_url.is_none() && !env.is_dev() {
            anyhow::bail!("DATABASE_URL must be set outside dev");
        }
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;
        let dev_fixture_path = optional("DEV_FIXTURE_PATH");

        // Redis
        let redis_url = optional("REDIS_URL");
        let conflict_cache_ttl_seconds = parse_or("CONFLICT_CACHE_TTL_SECONDS", 60)?;

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Scoring service
        let scoring_service_url = optional("SCORING_SERVICE_URL");
        let scoring_service_token = optional("SCORING_SERVICE_TOKEN");
        let recommendation_timeout_seconds = parse_or("RECOMMENDATION_TIMEOUT_SECONDS", 10)?;

        // Detection
        let travel_time_threshold_minutes = parse_or("TRAVEL_TIME_THRESHOLD_MINUTES", 45)?;
        let travel_distance_threshold_km = parse_or("TRAVEL_DISTANCE_THRESHOLD_KM", 50.0)?;
        let default_confidence_threshold: u8 = parse_or("DEFAULT_CONFIDENCE_THRESHOLD", 70)?;
        if default_confidence_threshold > 100 {
            anyhow::bail!("DEFAULT_CONFIDENCE_THRESHOLD must be between 0 and 100");
        }
        let max_detection_range_days = parse_or("MAX_DETECTION_RANGE_DAYS", 93)?;

        Ok(Settings {
            env,
            server_addr,
            database_url,
            database_max_connections,
            dev_fixture_path,
            redis_url,
            conflict_cache_ttl_seconds,
            cors_allow_origins,
            scoring_service_url,
            scoring_service_token,
            recommendation_timeout_seconds,
            travel_time_threshold_minutes,
            travel_distance_threshold_km,
            default_confidence_threshold,
            max_detection_range_days,
        })
    }

    /// Dev settings with every optional integration disabled
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Settings {
            env: Environment::Dev,
            server_addr: "127.0.0.1:0".to_string(),
            database_url: None,
            database_max_connections: 1,
            dev_fixture_path: None,
            redis_url: None,
            conflict_cache_ttl_seconds: 60,
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            scoring_service_url: None,
            scoring_service_token: None,
            recommendation_timeout_seconds: 1,
            travel_time_threshold_minutes: 45,
            travel_distance_threshold_km: 50.0,
            default_confidence_threshold: 70,
            max_detection_range_days: 93,
        }
    }
}
