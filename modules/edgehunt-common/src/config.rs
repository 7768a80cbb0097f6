use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;

/// Upper bound for any configured timeout (one day).
const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Run configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Reasoning service
    pub openai_api_key: Option<String>,
    pub reasoning_model_name: String,
    pub reasoning_timeout_seconds: f64,

    // Simulator backend
    pub use_mock_backend: bool,
    pub backend_host: String,
    pub backend_port: u16,
    pub backend_timeout_seconds: f64,

    // Experiment
    pub max_iterations: u32,
    pub critical_ttc_threshold: f64,
    pub data_dir: PathBuf,
    pub template_path: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            reasoning_model_name: "gpt-4o".to_string(),
            reasoning_timeout_seconds: 30.0,
            use_mock_backend: true,
            backend_host: "127.0.0.1".to_string(),
            backend_port: 2000,
            backend_timeout_seconds: 20.0,
            max_iterations: 10,
            critical_ttc_threshold: 1.5,
            data_dir: PathBuf::from("data"),
            template_path: None,
            seed: None,
        }
    }
}

impl Config {
    /// Parse the process environment without range checks, so callers can
    /// layer overrides on top before calling [`validate`](Self::validate).
    pub fn parse_env() -> Result<Self, ConfigError> {
        Self::parse_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Unset keys keep
    /// their defaults; set-but-malformed keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::parse_lookup(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            openai_api_key: lookup("OPENAI_API_KEY"),
            reasoning_model_name: lookup("EDGEHUNT_MODEL").unwrap_or(defaults.reasoning_model_name),
            reasoning_timeout_seconds: parsed(
                &lookup,
                "EDGEHUNT_REASONING_TIMEOUT_SECS",
                defaults.reasoning_timeout_seconds,
            )?,
            use_mock_backend: match lookup("EDGEHUNT_USE_MOCK") {
                Some(raw) => parse_bool("EDGEHUNT_USE_MOCK", &raw)?,
                None => defaults.use_mock_backend,
            },
            backend_host: lookup("EDGEHUNT_BACKEND_HOST").unwrap_or(defaults.backend_host),
            backend_port: parsed(&lookup, "EDGEHUNT_BACKEND_PORT", defaults.backend_port)?,
            backend_timeout_seconds: parsed(
                &lookup,
                "EDGEHUNT_BACKEND_TIMEOUT_SECS",
                defaults.backend_timeout_seconds,
            )?,
            max_iterations: parsed(&lookup, "EDGEHUNT_MAX_ITERATIONS", defaults.max_iterations)?,
            critical_ttc_threshold: parsed(
                &lookup,
                "EDGEHUNT_CRITICAL_TTC",
                defaults.critical_ttc_threshold,
            )?,
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            template_path: lookup("EDGEHUNT_TEMPLATE").map(PathBuf::from),
            seed: match lookup("EDGEHUNT_SEED") {
                Some(raw) => Some(parse_value("EDGEHUNT_SEED", &raw)?),
                None => None,
            },
        };

        Ok(config)
    }

    /// Reject values the search loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::OutOfRange {
                key: "max_iterations",
                requirement: "at least 1",
            });
        }
        if !(self.critical_ttc_threshold.is_finite() && self.critical_ttc_threshold > 0.0) {
            return Err(ConfigError::OutOfRange {
                key: "critical_ttc_threshold",
                requirement: "finite and greater than zero",
            });
        }
        check_timeout("backend_timeout_seconds", self.backend_timeout_seconds)?;
        check_timeout("reasoning_timeout_seconds", self.reasoning_timeout_seconds)?;
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.backend_timeout_seconds)
    }

    pub fn reasoning_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.reasoning_timeout_seconds)
    }

    /// Log the effective configuration with secrets redacted.
    pub fn log_redacted(&self) {
        let backend = format!("{}:{}", self.backend_host, self.backend_port);
        info!(
            model = self.reasoning_model_name.as_str(),
            api_key = if self.openai_api_key.is_some() { "set" } else { "unset" },
            reasoning_timeout_s = self.reasoning_timeout_seconds,
            mock_backend = self.use_mock_backend,
            backend = backend.as_str(),
            backend_timeout_s = self.backend_timeout_seconds,
            max_iterations = self.max_iterations,
            critical_ttc = self.critical_ttc_threshold,
            data_dir = %self.data_dir.display(),
            seed = ?self.seed,
            "Configuration loaded"
        );
    }
}

fn check_timeout(key: &'static str, seconds: f64) -> Result<(), ConfigError> {
    if seconds.is_finite() && seconds > 0.0 && seconds <= MAX_TIMEOUT_SECS {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            requirement: "greater than zero and at most 86400 seconds",
        })
    }
}

fn parsed<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected true/false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.reasoning_model_name, "gpt-4o");
        assert!(config.use_mock_backend);
        assert_eq!(config.backend_port, 2000);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.critical_ttc_threshold, 1.5);
        assert_eq!(config.backend_timeout(), Duration::from_secs(20));
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("EDGEHUNT_USE_MOCK", "false"),
            ("EDGEHUNT_BACKEND_PORT", "2010"),
            ("EDGEHUNT_MAX_ITERATIONS", "25"),
            ("EDGEHUNT_CRITICAL_TTC", "2.0"),
            ("EDGEHUNT_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert!(!config.use_mock_backend);
        assert_eq!(config.backend_port, 2010);
        assert_eq!(config.max_iterations, 25);
        assert_eq!(config.critical_ttc_threshold, 2.0);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let config = load(&[("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(
            load(&[("EDGEHUNT_BACKEND_PORT", "not-a-port")]),
            Err(ConfigError::Invalid { key: "EDGEHUNT_BACKEND_PORT", .. })
        ));
        assert!(matches!(
            load(&[("EDGEHUNT_USE_MOCK", "maybe")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn zero_iterations_rejected() {
        assert!(matches!(
            load(&[("EDGEHUNT_MAX_ITERATIONS", "0")]),
            Err(ConfigError::OutOfRange { key: "max_iterations", .. })
        ));
        assert!(matches!(
            load(&[("EDGEHUNT_CRITICAL_TTC", "-1")]),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn infinite_or_huge_timeouts_rejected() {
        for key in ["EDGEHUNT_BACKEND_TIMEOUT_SECS", "EDGEHUNT_REASONING_TIMEOUT_SECS"] {
            for raw in ["inf", "1e300", "86401"] {
                assert!(
                    matches!(load(&[(key, raw)]), Err(ConfigError::OutOfRange { .. })),
                    "{key}={raw} accepted"
                );
            }
        }
        let config = load(&[("EDGEHUNT_BACKEND_TIMEOUT_SECS", "86400")]).unwrap();
        assert_eq!(config.backend_timeout(), Duration::from_secs(86_400));
    }

    #[test]
    fn infinite_threshold_rejected() {
        assert!(matches!(
            load(&[("EDGEHUNT_CRITICAL_TTC", "inf")]),
            Err(ConfigError::OutOfRange { key: "critical_ttc_threshold", .. })
        ));
    }

    #[test]
    fn parse_defers_range_checks_to_validate() {
        let vars: HashMap<String, String> =
            HashMap::from([("EDGEHUNT_MAX_ITERATIONS".to_string(), "0".to_string())]);
        let mut config = Config::parse_lookup(|key| vars.get(key).cloned()).unwrap();
        assert!(config.validate().is_err());

        config.max_iterations = 5;
        assert!(config.validate().is_ok());
    }
}
