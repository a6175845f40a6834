use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{debug, info};
use shared::ImageRef;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use xray_client::report::{render_health, render_model_info, render_state};
use xray_client::{build_view_model, ApiResult, ClientConfig, Submission, UiState};

/// Chest X-ray pneumonia screening against a remote classifier
#[derive(Parser)]
#[command(name = "xray")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true, env = "XRAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the inference server base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the server is up and its model loaded
    Health,

    /// Upload an X-ray image and print the diagnosis
    Scan {
        /// Path to the image
        image: PathBuf,
    },

    /// Print the server's model metadata
    ModelInfo,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let mut config = ClientConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
        config.validate().context("validating --base-url")?;
    }
    debug!("Using server {}", config.base_url);

    let view_model = Arc::new(build_view_model(&config).context("building HTTP client")?);

    match cli.command {
        Commands::Health => match view_model.repository().check_health().await {
            ApiResult::Success(health) => {
                println!("{}", render_health(health.model_loaded));
                println!("status: {}  version: {}", health.status, health.version);
                Ok(ExitCode::SUCCESS)
            }
            ApiResult::Error(err) => {
                println!("{}", render_health(false));
                println!("{}", err.message);
                Ok(ExitCode::FAILURE)
            }
            ApiResult::Loading => Ok(ExitCode::FAILURE),
        },
        Commands::ModelInfo => match view_model.repository().model_info().await {
            ApiResult::Success(info) => {
                print!("{}", render_model_info(&info));
                Ok(ExitCode::SUCCESS)
            }
            ApiResult::Error(err) => bail!("{} (code {})", err.message, err.code),
            ApiResult::Loading => Ok(ExitCode::FAILURE),
        },
        Commands::Scan { image } => {
            let health = view_model.spawn_health_check();

            view_model.set_selected_image(Some(ImageRef::from(image.as_path())));
            info!("Analyzing {}", image.display());
            let state = match view_model.submit_image(&image).await {
                Submission::Completed(state) => state,
                Submission::Ignored | Submission::Discarded => view_model.ui_state(),
            };

            if let Ok(healthy) = health.await {
                debug!("Server health: {}", render_health(healthy));
            }

            print!("{}", render_state(&state));
            let code = match state {
                UiState::Success(_) => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            view_model.reset();
            Ok(code)
        }
    }
}
