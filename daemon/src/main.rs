//! idgate daemon: serves the verification API over HTTP.

mod config;

use anyhow::Context;
use clap::Parser;
use config::{ConfigOverrides, DaemonConfig};
use idgate_rpc::RpcServer;
use idgate_store::InMemoryVerificationStore;
use idgate_utils::{format_duration, init_logging, LogFormat};
use idgate_verification::{SystemClock, TracingEventSink, VerificationService};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "idgate-daemon", about = "Identity verification and access-gating service")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "IDGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind the HTTP server to.
    #[arg(long, env = "IDGATE_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// HTTP port.
    #[arg(long, env = "IDGATE_PORT")]
    port: Option<u16>,

    /// Log format: "human" or "json".
    #[arg(long, env = "IDGATE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "IDGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Minimum similarity score for a passing face comparison.
    #[arg(long, env = "IDGATE_FACE_MATCH_THRESHOLD")]
    face_match_threshold: Option<f64>,

    /// Cap face and liveness retries instead of allowing unlimited attempts.
    #[arg(long, env = "IDGATE_STRICT_RETRIES")]
    strict_retries: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Run,
    /// Print the effective configuration as TOML and exit.
    Config,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen_addr: self.listen_addr.clone(),
            port: self.port,
            log_format: self.log_format,
            log_level: self.log_level.clone(),
            face_match_threshold: self.face_match_threshold,
            strict_retries: self.strict_retries,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    let config = base.with_overrides(cli.overrides());
    config.validate().context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Run => run(config).await,
    }
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    init_logging(config.log_format, &config.log_level)?;
    let addr = config.socket_addr()?;
    let params = config.verification.clone();

    tracing::info!(
        %addr,
        face_match_threshold = params.face_match_threshold,
        liveness_freshness = %format_duration(params.liveness_freshness_secs),
        session_ttl = %format_duration(params.liveness_session_ttl_secs),
        "starting idgate daemon"
    );

    let service = Arc::new(VerificationService::new(
        params,
        Arc::new(InMemoryVerificationStore::new()),
        Arc::new(TracingEventSink),
        Arc::new(SystemClock),
    ));

    let sweeper = {
        let service = service.clone();
        let period = Duration::from_secs(config.session_purge_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = service.purge_expired_sessions() {
                    tracing::warn!(error = %e, "liveness session sweep failed");
                }
            }
        })
    };

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown signal received"),
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        }
    };
    RpcServer::new(addr, service).serve(shutdown).await?;

    sweeper.abort();
    tracing::info!("idgate daemon exited cleanly");
    Ok(())
}
