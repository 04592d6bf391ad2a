//! crashlabd - crash test session runner
//!
//! Drives a simulator crash test end to end, scores saved damage data
//! offline and checks simulator health.

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crashlab_errors::{CrashlabError, ErrorCategory, ErrorDisposition};
use crashlab_protocol::{CrashType, DamageData};
use crashlab_service::{Assessment, CrashParams, ServiceConfig, SimulatorService, init_logging};

/// Attempts at reading telemetry after the crash before giving up.
const TELEMETRY_ATTEMPTS: u32 = 3;

/// Pause between telemetry attempts.
const TELEMETRY_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "crashlabd")]
#[command(about = "Run simulator crash tests and estimate repair costs")]
#[command(version)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(long, global = true, env = "CRASHLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a saved damage report without a simulator
    Assess {
        /// JSON file holding a `get_damage_data` reply or a bare component map
        file: PathBuf,
    },

    /// Load a scenario, crash the vehicle and estimate the repairs
    Run {
        /// Vehicle model
        #[arg(long, default_value = "tcross")]
        model: String,

        /// Scenario type
        #[arg(long, default_value = "crash_test")]
        scenario: String,

        /// Impact speed in km/h
        #[arg(long, default_value_t = 50.0)]
        speed: f64,

        /// Approach angle in degrees
        #[arg(long, default_value_t = 0.0)]
        angle: f64,

        /// Collision type
        #[arg(long, default_value = "frontal")]
        crash_type: CrashType,

        /// Object to collide with
        #[arg(long, default_value = "barrier")]
        target: String,
    },

    /// Check that the simulator is reachable
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            if cli.json {
                output::print_error_json(&e, code);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(code)
        }
    }
}

async fn execute(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load_from_path(path).await?,
        None => ServiceConfig::from_env()?,
    };
    if let Some(level) = verbosity_level(cli.verbose) {
        config.logging.level = level.to_string();
    }
    init_logging(&config.logging)?;

    let service = SimulatorService::new(config);
    match &cli.command {
        Commands::Assess { file } => {
            let damage = read_damage_file(file).await?;
            let assessment = service.assess_offline(&damage).await?;
            output::print_assessment(&assessment, cli.json);
            Ok(())
        }
        Commands::Run {
            model,
            scenario,
            speed,
            angle,
            crash_type,
            target,
        } => {
            let params = CrashParams {
                crash_type: *crash_type,
                speed_kmh: *speed,
                angle_deg: *angle,
                target: target.clone(),
                automated: true,
            };
            params.validate().map_err(CrashlabError::from)?;

            service.connect().await?;
            let result = run_crash_test(&service, model, scenario, &params).await;
            service.disconnect().await;
            output::print_assessment(&result?, cli.json);
            Ok(())
        }
        Commands::Health => {
            let connected = service.connect().await;
            let status = service.health_check().await;
            output::print_health(&status, cli.json);
            service.disconnect().await;
            connected?;
            Ok(())
        }
    }
}

async fn run_crash_test(
    service: &SimulatorService,
    model: &str,
    scenario: &str,
    params: &CrashParams,
) -> Result<Assessment> {
    let session = service.load_scenario(model, scenario).await?;
    info!(session_id = %session.id, "Scenario ready");

    service
        .start_telemetry(service.config().simulator.telemetry_frequency_hz)
        .await?;
    let outcome = service.execute_crash(params).await?;
    info!(
        crash_detected = outcome.crash_detected,
        impact_force = outcome.impact_force.unwrap_or_default(),
        "Crash finished"
    );

    let mut attempt = 1;
    let assessment = loop {
        match service.assess().await {
            Ok(assessment) => break assessment,
            Err(e) if e.is_retryable() && attempt < TELEMETRY_ATTEMPTS => {
                warn!(attempt, error = %e, "Telemetry not ready, retrying");
                attempt = attempt.saturating_add(1);
                tokio::time::sleep(TELEMETRY_RETRY_DELAY).await;
            }
            Err(e) => return Err(e.into()),
        }
    };

    service.end_session().await?;
    Ok(assessment)
}

async fn read_damage_file(path: &Path) -> Result<DamageData> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_damage(&content).with_context(|| format!("Invalid damage data in {}", path.display()))
}

/// Accept either a full `get_damage_data` reply or a bare component map.
fn parse_damage(content: &str) -> Result<DamageData> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if value.get("components").is_some() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(DamageData {
            components: serde_json::from_value(value)?,
            ..DamageData::default()
        })
    }
}

fn verbosity_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

/// 0 ok, 2 connection, 3 timeout, 4 invalid input, 1 anything else.
fn exit_code(error: &anyhow::Error) -> u8 {
    if let Some(e) = error.downcast_ref::<CrashlabError>() {
        return match (e.category(), e.disposition()) {
            (ErrorCategory::Connection, _) => 2,
            (ErrorCategory::Timeout, _) => 3,
            (_, ErrorDisposition::InvalidInput) => 4,
            _ => 1,
        };
    }
    if error.downcast_ref::<serde_json::Error>().is_some() {
        return 4;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashlab_errors::{SimulatorError, ValidationError};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_run_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["crashlabd", "run"])?;
        assert!(!cli.json);
        assert!(cli.config.is_none());
        let Commands::Run {
            model,
            scenario,
            crash_type,
            target,
            ..
        } = cli.command
        else {
            return Err("expected run".into());
        };
        assert_eq!(model, "tcross");
        assert_eq!(scenario, "crash_test");
        assert_eq!(crash_type, CrashType::Frontal);
        assert_eq!(target, "barrier");
        Ok(())
    }

    #[test]
    fn parse_run_with_options() -> TestResult {
        let cli = Cli::try_parse_from([
            "crashlabd",
            "run",
            "--model",
            "golf",
            "--speed",
            "80",
            "--crash-type",
            "side",
            "--json",
        ])?;
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Run { ref model, crash_type: CrashType::Side, .. } if model == "golf"
        ));
        Ok(())
    }

    #[test]
    fn parse_rejects_unknown_crash_type() {
        assert!(Cli::try_parse_from(["crashlabd", "run", "--crash-type", "sideways"]).is_err());
    }

    #[test]
    fn parse_global_flags() -> TestResult {
        let cli = Cli::try_parse_from(["crashlabd", "-vv", "--config", "lab.yaml", "health"])?;
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("lab.yaml")));
        assert!(matches!(cli.command, Commands::Health));
        Ok(())
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(verbosity_level(0), None);
        assert_eq!(verbosity_level(1), Some("debug"));
        assert_eq!(verbosity_level(5), Some("trace"));
    }

    #[test]
    fn exit_codes_follow_error_class() {
        let connection = anyhow::Error::from(CrashlabError::from(SimulatorError::connection_failed(
            "localhost:64256",
            "refused",
        )));
        assert_eq!(exit_code(&connection), 2);

        let timeout = anyhow::Error::from(CrashlabError::from(SimulatorError::timeout(
            "execute_crash",
            30_000,
        )));
        assert_eq!(exit_code(&timeout), 3);

        let invalid = anyhow::Error::from(CrashlabError::from(ValidationError::unknown_scenario(
            "polo",
            "crash_test",
        )));
        assert_eq!(exit_code(&invalid), 4);

        let rejected = anyhow::Error::from(CrashlabError::from(SimulatorError::rejected(
            "load_scenario",
            "busy",
        )));
        assert_eq!(exit_code(&rejected), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("something else")), 1);
    }

    #[test]
    fn parse_damage_accepts_both_shapes() -> TestResult {
        let full = parse_damage(r#"{"components": {"hood": 0.4}, "crash_detected": true}"#)?;
        assert_eq!(full.components.len(), 1);
        assert_eq!(full.crash_detected, Some(true));

        let bare = parse_damage(r#"{"bumper_F": 0.85, "door_FL": {"damage": 0.3}}"#)?;
        assert_eq!(bare.components.len(), 2);
        assert_eq!(bare.crash_detected, None);
        Ok(())
    }

    #[test]
    fn parse_damage_rejects_non_numeric_levels() {
        let code = parse_damage(r#"{"hood": "bent"}"#)
            .err()
            .map_or(0, |e| exit_code(&e));
        assert_eq!(code, 4);
    }
}
