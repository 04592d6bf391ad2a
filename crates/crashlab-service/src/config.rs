//! Service configuration loaded from YAML with environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crashlab_damage::{EstimatorConfig, Money, PriceTable};
use crashlab_errors::{CrashlabError, Result};
use crashlab_protocol::{ClientBuilder, ClientConfig, DEFAULT_PORT};
use crashlab_session::SessionConfig;

use crate::logging::LogFormat;

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Simulator connection
    pub simulator: SimulatorSettings,
    /// Log output
    pub logging: LoggingSettings,
    /// Session tracker tuning
    pub session: SessionConfig,
    /// Repair estimator tuning
    pub estimator: EstimatorSettings,
}

/// Where the simulator listens and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Simulator host
    pub host: String,
    /// Simulator port
    pub port: u16,
    /// Deadline for establishing the connection
    pub connect_timeout_ms: u64,
    /// Deadline for ordinary commands
    pub command_timeout_ms: u64,
    /// Deadline for `execute_crash`
    pub crash_timeout_ms: u64,
    /// Sensor streaming rate
    pub telemetry_frequency_hz: u32,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 30_000,
            command_timeout_ms: 10_000,
            crash_timeout_ms: 30_000,
            telemetry_frequency_hz: 10,
        }
    }
}

impl SimulatorSettings {
    /// Connect deadline.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Command deadline.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Crash deadline.
    pub fn crash_timeout(&self) -> Duration {
        Duration::from_millis(self.crash_timeout_ms)
    }
}

/// Log level and output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Parts pricing and inspection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorSettings {
    /// Price in currency units for parts missing from the catalog
    pub fallback_part_price: f64,
    /// Overall score above which an inspection is attached
    pub inspection_threshold: f64,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            fallback_part_price: 250.0,
            inspection_threshold: EstimatorConfig::default().inspection_threshold,
        }
    }
}

impl EstimatorSettings {
    /// Default price table with the configured fallback.
    pub fn price_table(&self) -> PriceTable {
        PriceTable::default().with_fallback(Money::from_units(1).scale(self.fallback_part_price))
    }

    /// Estimator tuning.
    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            inspection_threshold: self.inspection_threshold,
        }
    }
}

impl ServiceConfig {
    /// Parse a YAML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// `Config` if the document is not valid YAML for this shape.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| CrashlabError::config(format!("invalid configuration: {e}")))
    }

    /// Load, override from the process environment and validate.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Config` if it does not parse or
    /// validate.
    pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Defaults, overridden from the process environment and validated.
    ///
    /// # Errors
    ///
    /// `Config` if an override does not parse or the result does not validate.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CRASHLAB_*` overrides read through `lookup`.
    ///
    /// `CRASHLAB_SIM_TIMEOUT` is in seconds and sets the command deadline.
    ///
    /// # Errors
    ///
    /// `Config` if a numeric or format override does not parse.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CRASHLAB_SIM_HOST") {
            self.simulator.host = host;
        }
        if let Some(port) = lookup("CRASHLAB_SIM_PORT") {
            self.simulator.port = parse_override("CRASHLAB_SIM_PORT", &port)?;
        }
        if let Some(timeout) = lookup("CRASHLAB_SIM_TIMEOUT") {
            let seconds: u64 = parse_override("CRASHLAB_SIM_TIMEOUT", &timeout)?;
            self.simulator.command_timeout_ms = seconds.saturating_mul(1000);
        }
        if let Some(level) = lookup("CRASHLAB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CRASHLAB_LOG_FORMAT") {
            self.logging.format = parse_override("CRASHLAB_LOG_FORMAT", &format)?;
        }
        Ok(())
    }

    /// Reject settings the service cannot run with.
    ///
    /// # Errors
    ///
    /// `Config` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulator;
        if sim.host.trim().is_empty() {
            return Err(CrashlabError::config("simulator.host must not be empty"));
        }
        if sim.port == 0 {
            return Err(CrashlabError::config("simulator.port must be non-zero"));
        }
        for (name, value) in [
            ("connect_timeout_ms", sim.connect_timeout_ms),
            ("command_timeout_ms", sim.command_timeout_ms),
            ("crash_timeout_ms", sim.crash_timeout_ms),
        ] {
            if value == 0 {
                return Err(CrashlabError::config(format!(
                    "simulator.{name} must be non-zero"
                )));
            }
        }
        if !(1..=100).contains(&sim.telemetry_frequency_hz) {
            return Err(CrashlabError::config(format!(
                "simulator.telemetry_frequency_hz must be in 1..=100, got {}",
                sim.telemetry_frequency_hz
            )));
        }
        if self.session.event_log_capacity == 0 {
            return Err(CrashlabError::config(
                "session.event_log_capacity must be non-zero",
            ));
        }
        if !self.session.crash_delta_threshold.is_finite()
            || self.session.crash_delta_threshold < 0.0
        {
            return Err(CrashlabError::config(
                "session.crash_delta_threshold must be a non-negative number",
            ));
        }
        if !self.estimator.fallback_part_price.is_finite()
            || self.estimator.fallback_part_price < 0.0
        {
            return Err(CrashlabError::config(
                "estimator.fallback_part_price must be a non-negative number",
            ));
        }
        Ok(())
    }

    /// Protocol client configuration for these settings.
    pub fn client_config(&self) -> ClientConfig {
        let sim = &self.simulator;
        ClientBuilder::new()
            .address(sim.host.clone(), sim.port)
            .connect_timeout(sim.connect_timeout())
            .command_timeout(sim.command_timeout())
            .crash_timeout(sim.crash_timeout())
            .build()
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CrashlabError::config(format!("{key}={value}: {e}")))
}
