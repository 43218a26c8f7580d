use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::matching::allocator::{AllocationPolicy, CapacityMode};
use crate::matching::domain::RiskLevel;
use crate::matching::scoring::ScoringConfig;
use crate::matching::service::{AutoAssignPolicy, MatchingConfig};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub matching: MatchingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            matching: load_matching()?,
        })
    }
}

fn load_matching() -> Result<MatchingConfig, ConfigError> {
    let capacity_mode = match env::var("MATCH_CAPACITY_MODE") {
        Ok(value) => {
            CapacityMode::from_label(&value).ok_or(ConfigError::InvalidCapacityMode(value))?
        }
        Err(_) => CapacityMode::default(),
    };

    let defaults = ScoringConfig::default();
    let recommendation_threshold = match env::var("MATCH_RECOMMEND_THRESHOLD") {
        Ok(value) => match value.trim().parse::<f32>() {
            Ok(threshold) if (0.0..=1.0).contains(&threshold) => threshold,
            _ => return Err(ConfigError::InvalidThreshold(value)),
        },
        Err(_) => defaults.recommendation_threshold,
    };

    let auto_defaults = AutoAssignPolicy::default();
    let minimum_risk = match env::var("MATCH_AUTO_ASSIGN_MIN_RISK") {
        Ok(value) => RiskLevel::from_label(&value).ok_or(ConfigError::InvalidRiskLevel(value))?,
        Err(_) => auto_defaults.minimum_risk,
    };

    Ok(MatchingConfig {
        scoring: ScoringConfig {
            recommendation_threshold,
            ..defaults
        },
        allocation: AllocationPolicy { capacity_mode },
        auto_assign: AutoAssignPolicy {
            minimum_risk,
            ..auto_defaults
        },
    })
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCapacityMode(String),
    InvalidThreshold(String),
    InvalidRiskLevel(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCapacityMode(value) => write!(
                f,
                "MATCH_CAPACITY_MODE must be 'advisory' or 'strict', got '{value}'"
            ),
            ConfigError::InvalidThreshold(value) => write!(
                f,
                "MATCH_RECOMMEND_THRESHOLD must be a number between 0 and 1, got '{value}'"
            ),
            ConfigError::InvalidRiskLevel(value) => write!(
                f,
                "MATCH_AUTO_ASSIGN_MIN_RISK must be LOW, MEDIUM, HIGH or CRITICAL, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidCapacityMode(_)
            | ConfigError::InvalidThreshold(_)
            | ConfigError::InvalidRiskLevel(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("MATCH_CAPACITY_MODE");
        env::remove_var("MATCH_RECOMMEND_THRESHOLD");
        env::remove_var("MATCH_AUTO_ASSIGN_MIN_RISK");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.matching, MatchingConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn matching_settings_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MATCH_CAPACITY_MODE", "Strict");
        env::set_var("MATCH_RECOMMEND_THRESHOLD", "0.65");
        env::set_var("MATCH_AUTO_ASSIGN_MIN_RISK", "high");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.matching.allocation.capacity_mode,
            CapacityMode::Strict
        );
        assert!((config.matching.scoring.recommendation_threshold - 0.65).abs() < 1e-6);
        assert_eq!(config.matching.auto_assign.minimum_risk, RiskLevel::High);
        assert!(config.matching.auto_assign.require_counselor_for_mentor);
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MATCH_RECOMMEND_THRESHOLD", "1.5");

        match AppConfig::load() {
            Err(ConfigError::InvalidThreshold(value)) => assert_eq!(value, "1.5"),
            other => panic!("expected invalid threshold, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_unknown_capacity_mode() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MATCH_CAPACITY_MODE", "lenient");

        let err = AppConfig::load().expect_err("mode rejected");
        assert!(err.to_string().contains("lenient"));
        reset_env();
    }
}
