use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub pipeline: PipelineConfig,
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

        let mut pipeline = PipelineConfig::default();
        if let Ok(raw) = env::var("PIPELINE_TOP_N") {
            let top_n = raw
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidTopN { value: raw })?;
            pipeline = pipeline.with_top_n(top_n)?;
        }
        if let Ok(raw) = env::var("PIPELINE_LENIENT") {
            pipeline.lenient = matches!(raw.trim(), "1" | "true" | "yes");
        }
        if let Ok(raw) = env::var("PIPELINE_CONCURRENCY") {
            pipeline.concurrency = raw
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidConcurrency)?;
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline,
        })
    }
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

/// Similarity thresholds used by the overlap auditor. Loaded once per run and
/// treated as read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapThresholds {
    pub material: f32,
    pub minor: f32,
    pub duplicate: f32,
    pub identical: f32,
}

impl Default for OverlapThresholds {
    fn default() -> Self {
        Self {
            material: 0.82,
            minor: 0.72,
            duplicate: 0.88,
            identical: 0.95,
        }
    }
}

/// Pipeline-wide knobs: candidate selection, ranking size, gate limits.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub thresholds: OverlapThresholds,
    /// Minimum blended relevance for a candidate to survive mapping.
    pub relevance_floor: f32,
    /// Maximum candidates retained per responsibility.
    pub candidate_cap: usize,
    /// Relevance at or above which a trace is recorded as primary.
    pub primary_relevance: f32,
    /// Number of competencies selected by the ranker.
    pub top_n: usize,
    /// Downgrades blocking Error rules to recorded warnings.
    pub lenient: bool,
    /// Reaudit passes allowed per job after remediation.
    pub max_reaudits: usize,
    pub unmapped_rate_limit: f32,
    pub missing_summary_limit: f32,
    pub coverage_floor: f32,
    pub top_n_bounds: (usize, usize),
    /// Worker-pool width for fanning jobs out.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: OverlapThresholds::default(),
            relevance_floor: 0.6,
            candidate_cap: 5,
            primary_relevance: 0.8,
            top_n: 8,
            lenient: false,
            max_reaudits: 1,
            unmapped_rate_limit: 0.05,
            missing_summary_limit: 0.10,
            coverage_floor: 0.80,
            top_n_bounds: (6, 10),
            concurrency: 4,
        }
    }
}

impl PipelineConfig {
    /// Replace the ranking size, rejecting values outside the supported band.
    pub fn with_top_n(mut self, top_n: usize) -> Result<Self, ConfigError> {
        let (lower, upper) = self.top_n_bounds;
        if top_n < lower || top_n > upper {
            return Err(ConfigError::InvalidTopN {
                value: top_n.to_string(),
            });
        }
        self.top_n = top_n;
        Ok(self)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTopN { value: String },
    InvalidConcurrency,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTopN { value } => {
                write!(f, "top-N selection '{}' is outside the 6..=10 band", value)
            }
            ConfigError::InvalidConcurrency => {
                write!(f, "PIPELINE_CONCURRENCY must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
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
        env::remove_var("PIPELINE_TOP_N");
        env::remove_var("PIPELINE_LENIENT");
        env::remove_var("PIPELINE_CONCURRENCY");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn rejects_top_n_outside_band() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PIPELINE_TOP_N", "12");
        let error = AppConfig::load().expect_err("top-N outside band");
        assert!(matches!(error, ConfigError::InvalidTopN { .. }));
    }

    #[test]
    fn top_n_band_accepts_edges() {
        let config = PipelineConfig::default();
        assert!(config.clone().with_top_n(6).is_ok());
        assert!(config.clone().with_top_n(10).is_ok());
        assert!(config.with_top_n(5).is_err());
    }
}
