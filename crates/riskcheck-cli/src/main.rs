//! `riskcheck` command-line client

#![forbid(unsafe_code)]

mod commands;
mod render;
mod state;

use clap::{Parser, Subcommand};
use riskcheck_client::{ClientConfig, ClientError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter
const ENV_LOG: &str = "RISKCHECK_LOG";

#[derive(Parser)]
#[command(name = "riskcheck", version)]
#[command(about = "Self-assessment client for the compliance backend")]
#[command(
    after_help = "Environment:\n  RISKCHECK_API_BASE_URL  Backend origin\n  RISKCHECK_STATE_DIR     Durable state directory\n  RISKCHECK_LOG           Log filter (default: info)"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "RISKCHECK_CONFIG")]
    config: Option<PathBuf>,
    /// Backend origin; overrides configuration and environment
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or choose the business stage
    Stage {
        /// PRE_AUTONOMO, AUTONOMO or SL
        stage: Option<String>,
    },
    /// List industry keys
    Industries,
    /// Submit the questionnaire
    Assess(commands::AssessArgs),
    /// Reconcile and show the current result
    Result {
        /// Assessment id; defaults to the remembered one
        #[arg(long)]
        id: Option<String>,
        /// Print the view model as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Start checkout for a paid tier
    Unlock {
        /// basic_15 or expert_39
        tier: String,
    },
    /// Confirm a returning checkout session
    ConfirmPayment {
        session_id: String,
    },
    /// Print the report URL or download the PDF
    Report {
        #[arg(long)]
        id: Option<String>,
        /// Save the PDF here instead of printing the URL
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show where the remembered assessment is in the flow
    Flow,
    /// Forget the remembered assessment
    Reset,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.trim());
        config.validate()?;
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if matches!(cli.command, Commands::Industries) {
        commands::industries();
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    let ctx = commands::Context::open(&config)?;
    match cli.command {
        Commands::Stage { stage: None } => commands::show_stage(&ctx).await,
        Commands::Stage { stage: Some(stage) } => commands::select_stage(&ctx, &stage).await,
        Commands::Industries => Ok(ExitCode::SUCCESS),
        Commands::Assess(args) => commands::assess(&ctx, args).await,
        Commands::Result { id, json } => commands::result(&ctx, id.as_deref(), json).await,
        Commands::Unlock { tier } => commands::unlock(&ctx, &tier).await,
        Commands::ConfirmPayment { session_id } => commands::confirm_payment(&ctx, &session_id).await,
        Commands::Report { id, out } => commands::report(&ctx, id.as_deref(), out.as_deref()).await,
        Commands::Flow => commands::flow(&ctx).await,
        Commands::Reset => commands::reset(&ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            if e.downcast_ref::<ClientError>().is_some_and(ClientError::is_retryable) {
                eprintln!("This looks temporary; try again shortly.");
            }
            ExitCode::FAILURE
        }
    }
}
