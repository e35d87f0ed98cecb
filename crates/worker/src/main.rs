use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gatelink_core::{
    load_worker_config, validate_worker_config, AutomationWorker, CallbackSink,
    ConsoleConnector, ConsoleCredentials, HttpCallbackSink, JobRequest, WebConsole,
};

/// One automation run, started by the job dispatcher with a fixed parameter set.
#[derive(Debug, Parser)]
#[command(name = "gatelink-worker", version, about = "Console automation worker")]
struct Cli {
    /// Worker configuration file.
    #[arg(long, env = "GATELINK_WORKER_CONFIG", default_value = "worker.toml")]
    config: PathBuf,

    /// get_qr, get_pairing_code, set_mode, set_blasting or sync_devices.
    #[arg(long)]
    action: String,

    /// Key under which the front end polls for the outcome.
    #[arg(long)]
    correlation_id: String,

    #[arg(long)]
    owner_id: Option<String>,

    /// Required for pairing-code links.
    #[arg(long)]
    phone_number: Option<String>,

    #[arg(long)]
    target_account_id: Option<String>,

    #[arg(long)]
    control_value: Option<String>,

    #[arg(long, env = "GATELINK_CONSOLE_USERNAME", hide_env_values = true)]
    console_username: String,

    #[arg(long, env = "GATELINK_CONSOLE_PASSWORD", hide_env_values = true)]
    console_password: String,

    #[arg(long, env = "GATELINK_CALLBACK_SECRET", hide_env_values = true)]
    callback_secret: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

impl Cli {
    fn job_request(&self) -> JobRequest {
        JobRequest {
            action: self.action.clone(),
            correlation_id: self.correlation_id.clone(),
            owner_id: self.owner_id.clone(),
            phone_number: self.phone_number.clone(),
            target_account_id: self.target_account_id.clone(),
            control_value: self.control_value.clone(),
        }
    }
}

fn init_telemetry(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_telemetry(cli.json_logs);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    info!(version = env!("CARGO_PKG_VERSION"), "gatelink-worker starting");

    let config = load_worker_config(&cli.config)
        .with_context(|| format!("Failed to load worker config from {:?}", cli.config))?;
    validate_worker_config(&config).context("Worker configuration validation failed")?;

    let connector: Arc<dyn ConsoleConnector> = Arc::new(WebConsole::new(config.console.clone()));
    let sink: Arc<dyn CallbackSink> = Arc::new(
        HttpCallbackSink::new(config.callback.clone(), cli.callback_secret.clone())
            .context("Failed to create callback client")?,
    );
    let credentials = ConsoleCredentials::new(&cli.console_username, &cli.console_password);

    let worker = AutomationWorker::new(config, credentials, connector, sink);
    let outcome = worker.run(&cli.job_request()).await;

    info!(
        correlation_id = %cli.correlation_id,
        outcome = outcome.label(),
        exit_code = outcome.exit_code(),
        "Job finished"
    );
    Ok(outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let base = [
            "gatelink-worker",
            "--console-username",
            "operator",
            "--console-password",
            "pw",
            "--callback-secret",
            "s3cret",
        ];
        Cli::try_parse_from(base.iter().chain(args.iter()))
    }

    #[test]
    fn test_pairing_arguments_map_to_job_request() {
        let cli = parse(&[
            "--action",
            "get_pairing_code",
            "--correlation-id",
            "job_1",
            "--phone-number",
            "+15550001111",
            "--owner-id",
            "user-9",
        ])
        .unwrap();

        let request = cli.job_request();
        assert_eq!(request.action, "get_pairing_code");
        assert_eq!(request.correlation_id, "job_1");
        assert_eq!(request.phone_number.as_deref(), Some("+15550001111"));
        assert_eq!(request.owner_id.as_deref(), Some("user-9"));
        assert!(request.target_account_id.is_none());
        assert_eq!(cli.config, PathBuf::from("worker.toml"));
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_control_arguments() {
        let cli = parse(&[
            "--action",
            "set_mode",
            "--correlation-id",
            "job_2",
            "--target-account-id",
            "dev-5",
            "--control-value",
            "on",
            "--json-logs",
        ])
        .unwrap();

        let request = cli.job_request();
        assert_eq!(request.target_account_id.as_deref(), Some("dev-5"));
        assert_eq!(request.control_value.as_deref(), Some("on"));
        assert!(cli.json_logs);
    }

    #[test]
    fn test_action_is_required() {
        assert!(parse(&["--correlation-id", "job_3"]).is_err());
    }
}
