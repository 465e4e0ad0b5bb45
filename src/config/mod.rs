//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `CLAIMFLOW_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{Capability, ClientsConfig};
use crate::constants::{
    DEFAULT_LOG_RETENTION, DEFAULT_MIN_RELEVANCE, DEFAULT_QUERIES_PER_CLAIM,
    DEFAULT_SEARCH_RESULTS, DEFAULT_TOP_K, DEFAULT_WORKER_POOL_SIZE,
};
use crate::metrics::InfluxConfig;
use crate::provider::llm::DEFAULT_LLM_MODEL;
use crate::ranking::RankerConfig;

/// Orchestration knobs for one video run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Claims processed concurrently per video.
    pub worker_pool_size: usize,
    pub top_k: usize,
    /// Evidence scoring below this is dropped.
    pub min_relevance: f32,
    pub queries_per_claim: usize,
    /// Per-claim budget. `None` disables it.
    pub claim_deadline: Option<Duration>,
    /// Budget for the whole transcript run. `None` disables it.
    pub video_deadline: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            top_k: DEFAULT_TOP_K,
            min_relevance: DEFAULT_MIN_RELEVANCE,
            queries_per_claim: DEFAULT_QUERIES_PER_CLAIM,
            claim_deadline: Some(Duration::from_secs(180)),
            video_deadline: Some(Duration::from_secs(900)),
        }
    }
}

impl PipelineConfig {
    pub fn ranker(&self) -> RankerConfig {
        RankerConfig {
            top_k: self.top_k,
            min_score: self.min_relevance,
        }
    }

    /// Checks ranges, and that the worker pool stays strictly below every capability's
    /// in-flight ceiling so one video can never hold all permits of a capability.
    pub fn validate(&self, clients: &ClientsConfig) -> Result<(), ConfigError> {
        if self.worker_pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "worker_pool_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.queries_per_claim == 0 {
            return Err(ConfigError::InvalidValue {
                name: "queries_per_claim",
                reason: "must be at least 1".to_string(),
            });
        }
        self.ranker()
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                name: "ranker",
                reason,
            })?;

        for capability in Capability::ALL {
            let policy = clients.get(capability);
            policy
                .validate()
                .map_err(|reason| ConfigError::InvalidClientConfig { capability, reason })?;
            if self.worker_pool_size >= policy.max_in_flight {
                return Err(ConfigError::PoolNotBelowCeiling {
                    pool: self.worker_pool_size,
                    capability,
                    ceiling: policy.max_in_flight,
                });
            }
        }

        Ok(())
    }
}

/// Server and pipeline configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `CLAIMFLOW_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// SQLite database file. `None` keeps results in memory.
    pub database_path: Option<PathBuf>,

    /// Base URL of the speech-to-text service. `None` disables audio input.
    pub speech_url: Option<String>,

    pub search_api_key: Option<String>,
    pub search_engine_id: Option<String>,

    /// Results requested per search query (1-10). Default: `5`.
    pub search_results: usize,

    /// Model used for decomposition and verification.
    pub llm_model: String,

    /// Verify with the keyword baseline instead of the language model.
    pub baseline_verifier: bool,

    /// Latency metrics sink. Enabled when `CLAIMFLOW_INFLUX_URL` is set.
    pub influx: Option<InfluxConfig>,

    /// Processing log entries kept in memory. Default: `50_000`.
    pub log_retention: usize,

    pub pipeline: PipelineConfig,
    pub clients: ClientsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            database_path: None,
            speech_url: None,
            search_api_key: None,
            search_engine_id: None,
            search_results: DEFAULT_SEARCH_RESULTS,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            baseline_verifier: false,
            influx: None,
            log_retention: DEFAULT_LOG_RETENTION,
            pipeline: PipelineConfig::default(),
            clients: ClientsConfig::default(),
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "CLAIMFLOW_PORT";
    const ENV_BIND_ADDR: &'static str = "CLAIMFLOW_BIND_ADDR";
    const ENV_DATABASE_PATH: &'static str = "CLAIMFLOW_DATABASE_PATH";
    const ENV_SPEECH_URL: &'static str = "CLAIMFLOW_SPEECH_URL";
    pub const ENV_SEARCH_API_KEY: &'static str = "CLAIMFLOW_SEARCH_API_KEY";
    pub const ENV_SEARCH_ENGINE_ID: &'static str = "CLAIMFLOW_SEARCH_ENGINE_ID";
    const ENV_SEARCH_RESULTS: &'static str = "CLAIMFLOW_SEARCH_RESULTS";
    const ENV_LLM_MODEL: &'static str = "CLAIMFLOW_LLM_MODEL";
    const ENV_BASELINE_VERIFIER: &'static str = "CLAIMFLOW_BASELINE_VERIFIER";
    const ENV_INFLUX_URL: &'static str = "CLAIMFLOW_INFLUX_URL";
    const ENV_INFLUX_ORG: &'static str = "CLAIMFLOW_INFLUX_ORG";
    const ENV_INFLUX_BUCKET: &'static str = "CLAIMFLOW_INFLUX_BUCKET";
    const ENV_INFLUX_TOKEN: &'static str = "CLAIMFLOW_INFLUX_TOKEN";
    const ENV_LOG_RETENTION: &'static str = "CLAIMFLOW_LOG_RETENTION";
    const ENV_WORKER_POOL_SIZE: &'static str = "CLAIMFLOW_WORKER_POOL_SIZE";
    const ENV_TOP_K: &'static str = "CLAIMFLOW_TOP_K";
    const ENV_MIN_RELEVANCE: &'static str = "CLAIMFLOW_MIN_RELEVANCE";
    const ENV_QUERIES_PER_CLAIM: &'static str = "CLAIMFLOW_QUERIES_PER_CLAIM";
    const ENV_CLAIM_DEADLINE_MS: &'static str = "CLAIMFLOW_CLAIM_DEADLINE_MS";
    const ENV_VIDEO_DEADLINE_MS: &'static str = "CLAIMFLOW_VIDEO_DEADLINE_MS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;

        let pipeline = PipelineConfig {
            worker_pool_size: Self::parse_from_env(
                Self::ENV_WORKER_POOL_SIZE,
                defaults.pipeline.worker_pool_size,
            ),
            top_k: Self::parse_from_env(Self::ENV_TOP_K, defaults.pipeline.top_k),
            min_relevance: Self::parse_from_env(
                Self::ENV_MIN_RELEVANCE,
                defaults.pipeline.min_relevance,
            ),
            queries_per_claim: Self::parse_from_env(
                Self::ENV_QUERIES_PER_CLAIM,
                defaults.pipeline.queries_per_claim,
            ),
            claim_deadline: Self::parse_deadline_from_env(
                Self::ENV_CLAIM_DEADLINE_MS,
                defaults.pipeline.claim_deadline,
            ),
            video_deadline: Self::parse_deadline_from_env(
                Self::ENV_VIDEO_DEADLINE_MS,
                defaults.pipeline.video_deadline,
            ),
        };

        let influx = Self::parse_optional_string_from_env(Self::ENV_INFLUX_URL).map(|url| {
            InfluxConfig {
                url,
                org: Self::parse_string_from_env(Self::ENV_INFLUX_ORG, "claimflow".to_string()),
                bucket: Self::parse_string_from_env(
                    Self::ENV_INFLUX_BUCKET,
                    "claimflow".to_string(),
                ),
                token: Self::parse_string_from_env(Self::ENV_INFLUX_TOKEN, String::new()),
            }
        });

        Ok(Self {
            port,
            bind_addr,
            database_path: Self::parse_optional_path_from_env(Self::ENV_DATABASE_PATH),
            speech_url: Self::parse_optional_string_from_env(Self::ENV_SPEECH_URL),
            search_api_key: Self::parse_optional_string_from_env(Self::ENV_SEARCH_API_KEY),
            search_engine_id: Self::parse_optional_string_from_env(Self::ENV_SEARCH_ENGINE_ID),
            search_results: Self::parse_from_env(
                Self::ENV_SEARCH_RESULTS,
                defaults.search_results,
            ),
            llm_model: Self::parse_string_from_env(Self::ENV_LLM_MODEL, defaults.llm_model),
            baseline_verifier: Self::parse_bool_from_env(
                Self::ENV_BASELINE_VERIFIER,
                defaults.baseline_verifier,
            ),
            influx,
            log_retention: Self::parse_from_env(Self::ENV_LOG_RETENTION, defaults.log_retention),
            pipeline,
            clients: ClientsConfig::from_env(),
        })
    }

    /// Validates paths, ranges and the pool/ceiling invariant (does not create anything).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.database_path {
            if path.is_dir() {
                return Err(ConfigError::InvalidValue {
                    name: Self::ENV_DATABASE_PATH,
                    reason: format!("{} is a directory", path.display()),
                });
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.exists() {
                    return Err(ConfigError::PathNotFound {
                        path: parent.to_path_buf(),
                    });
                }
                if !parent.is_dir() {
                    return Err(ConfigError::NotADirectory {
                        path: parent.to_path_buf(),
                    });
                }
            }
        }

        if !(1..=10).contains(&self.search_results) {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_SEARCH_RESULTS,
                reason: format!("must be between 1 and 10, got {}", self.search_results),
            });
        }

        if self.log_retention == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_LOG_RETENTION,
                reason: "must be at least 1".to_string(),
            });
        }

        self.pipeline.validate(&self.clients)
    }

    /// Search credentials, required by every deployment that retrieves evidence.
    pub fn search_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let key = self
            .search_api_key
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar {
                name: Self::ENV_SEARCH_API_KEY,
            })?;
        let engine = self
            .search_engine_id
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar {
                name: Self::ENV_SEARCH_ENGINE_ID,
            })?;
        Ok((key, engine))
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        Self::parse_optional_string_from_env(var_name).map(PathBuf::from)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(var_name).unwrap_or(default)
    }

    fn parse_from_env<T: std::str::FromStr>(var_name: &str, default: T) -> T {
        env::var(var_name)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        match env::var(var_name).map(|v| v.trim().to_ascii_lowercase()) {
            Ok(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
            Ok(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
            _ => default,
        }
    }

    /// `0` disables the deadline.
    fn parse_deadline_from_env(var_name: &str, default: Option<Duration>) -> Option<Duration> {
        match env::var(var_name).ok().and_then(|v| v.trim().parse::<u64>().ok()) {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => default,
        }
    }
}
