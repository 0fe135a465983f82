/**
 * Server Configuration
 *
 * This module handles loading of server configuration from environment
 * variables, with sensible defaults for local development.
 *
 * # Error Handling
 *
 * Configuration errors are logged but do not prevent server startup.
 * Invalid numeric values fall back to their defaults, and an unreachable
 * database leaves the server running on the in-process store.
 */
use std::time::Duration;

use sqlx::PgPool;

const DEFAULT_PORT: u16 = 8080;
const DEV_JWT_SECRET: &str = "your-secret-key-change-in-production";
const MIN_PING_PERIOD: Duration = Duration::from_millis(1);
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Tunables of the real-time hub and its connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Bound of each connection's outbound queue
    pub outbound_capacity: usize,
    /// Read deadline, extended only when a pong arrives
    pub pong_wait: Duration,
    /// Deadline for writing a single frame
    pub write_wait: Duration,
    /// Largest inbound frame accepted, in bytes
    pub max_message_bytes: usize,
    /// Consecutive undecodable frames tolerated before closing
    pub max_malformed_frames: u32,
    /// Number of messages replayed on connect
    pub history_limit: i64,
}

impl HubConfig {
    /// Ping period, 9/10 of the pong wait so a probe lands before the deadline
    pub fn ping_period(&self) -> Duration {
        (self.pong_wait * 9 / 10).max(MIN_PING_PERIOD)
    }

    /// Replace values a connection cannot run with by their defaults
    ///
    /// Queue capacity, deadlines, frame limit and history size must be
    /// positive. A zero malformed-frame threshold is kept: it closes on the
    /// first bad frame.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            outbound_capacity: positive_or(
                "outbound_capacity",
                self.outbound_capacity,
                defaults.outbound_capacity,
            ),
            pong_wait: positive_or("pong_wait", self.pong_wait, defaults.pong_wait),
            write_wait: positive_or("write_wait", self.write_wait, defaults.write_wait),
            max_message_bytes: positive_or(
                "max_message_bytes",
                self.max_message_bytes,
                defaults.max_message_bytes,
            ),
            max_malformed_frames: self.max_malformed_frames,
            history_limit: positive_or("history_limit", self.history_limit, defaults.history_limit),
        }
    }

    /// Load from `WS_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            outbound_capacity: env_or("WS_OUTBOUND_CAPACITY", defaults.outbound_capacity),
            pong_wait: Duration::from_secs(env_or(
                "WS_PONG_WAIT_SECS",
                defaults.pong_wait.as_secs(),
            )),
            write_wait: Duration::from_secs(env_or(
                "WS_WRITE_WAIT_SECS",
                defaults.write_wait.as_secs(),
            )),
            max_message_bytes: env_or("WS_MAX_MESSAGE_BYTES", defaults.max_message_bytes),
            max_malformed_frames: env_or("WS_MAX_MALFORMED_FRAMES", defaults.max_malformed_frames),
            history_limit: env_or("WS_HISTORY_LIMIT", defaults.history_limit),
        }
        .sanitized()
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            pong_wait: Duration::from_secs(60),
            write_wait: Duration::from_secs(10),
            max_message_bytes: 512,
            max_malformed_frames: 10,
            history_limit: 50,
        }
    }
}

/// Server-wide configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub hub: HubConfig,
}

impl ServerConfig {
    /// Load configuration from the environment
    ///
    /// Call `dotenv::dotenv()` first to pick up a local `.env` file.
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set. Using the development secret.");
            DEV_JWT_SECRET.to_string()
        });

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string());

        Self {
            port: env_or("SERVER_PORT", DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            jwt_secret,
            cors_origins: parse_origins(&cors_origins),
            hub: HubConfig::from_env(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            hub: HubConfig::default(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T>(key: &str, raw: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("Invalid value {:?} for {}, using {}", raw, key, default);
            default
        }
    }
}

fn positive_or<T>(name: &str, value: T, default: T) -> T
where
    T: PartialOrd + Default + std::fmt::Debug,
{
    if value > T::default() {
        value
    } else {
        tracing::warn!("{} must be positive, got {:?}; using {:?}", name, value, default);
        default
    }
}

/// Database configuration result
///
/// Contains the database connection pool if successfully configured,
/// or `None` if the database is not available.
pub type DatabaseConfig = Option<PgPool>;

/// Load and initialize database connection pool
///
/// This function:
/// 1. Creates a PostgreSQL connection pool for `database_url`
/// 2. Runs database migrations
///
/// # Returns
///
/// - `Some(PgPool)` if database is successfully configured
/// - `None` if no URL is configured, the connection fails, or migrations fail
pub async fn load_database(database_url: Option<&str>) -> DatabaseConfig {
    let Some(database_url) = database_url else {
        tracing::warn!("DATABASE_URL not set. Messages will be kept in memory only.");
        return None;
    };

    tracing::info!("Connecting to database...");

    let pool = match PgPool::connect(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Messages will be kept in memory only.");
            return None;
        }
    };

    tracing::info!("Running database migrations...");
    if let Err(e) = sqlx::migrate!().run(&pool).await {
        tracing::error!("Failed to run database migrations: {:?}", e);
        tracing::warn!("Messages will be kept in memory only.");
        return None;
    }

    tracing::info!("Database ready");
    Some(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_period_is_nine_tenths() {
        let config = HubConfig::default();
        assert_eq!(config.ping_period(), Duration::from_secs(54));

        let short = HubConfig {
            pong_wait: Duration::from_millis(500),
            ..HubConfig::default()
        };
        assert_eq!(short.ping_period(), Duration::from_millis(450));
    }

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.outbound_capacity, 256);
        assert_eq!(config.write_wait, Duration::from_secs(10));
        assert_eq!(config.max_message_bytes, 512);
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_invalid_number_falls_back() {
        assert_eq!(parse_or("WS_HISTORY_LIMIT", "lots", 50i64), 50);
        assert_eq!(parse_or("WS_HISTORY_LIMIT", " 20 ", 50i64), 20);
        assert_eq!(parse_or("SERVER_PORT", "99999", 8080u16), 8080);
    }

    #[test]
    fn test_zero_capacity_and_deadlines_fall_back() {
        let config = HubConfig {
            outbound_capacity: 0,
            pong_wait: Duration::ZERO,
            write_wait: Duration::ZERO,
            max_message_bytes: 0,
            ..HubConfig::default()
        }
        .sanitized();

        assert_eq!(config.outbound_capacity, 256);
        assert_eq!(config.pong_wait, Duration::from_secs(60));
        assert_eq!(config.write_wait, Duration::from_secs(10));
        assert_eq!(config.max_message_bytes, 512);
    }

    #[test]
    fn test_non_positive_history_limit_falls_back() {
        for limit in [0, -5] {
            let config = HubConfig {
                history_limit: limit,
                ..HubConfig::default()
            }
            .sanitized();
            assert_eq!(config.history_limit, 50);
        }
    }

    #[test]
    fn test_valid_values_survive_sanitizing() {
        let config = HubConfig {
            outbound_capacity: 1,
            pong_wait: Duration::from_millis(400),
            max_malformed_frames: 0,
            history_limit: 5,
            ..HubConfig::default()
        };
        assert_eq!(config.clone().sanitized(), config);
    }

    #[test]
    fn test_ping_period_never_zero() {
        let config = HubConfig {
            pong_wait: Duration::from_nanos(1),
            ..HubConfig::default()
        };
        assert_eq!(config.ping_period(), Duration::from_millis(1));
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://a.test, ,http://b.test "),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
