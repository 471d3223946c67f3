/*
pushdigest - single-binary main.rs
Starts the Rocket HTTP server, or runs the pipeline once for a URL given on the command line.
*/

use anyhow::Context;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use pushdigest::factory::build_pipeline;
use pushdigest::server::{launch_rocket, AppState};

#[derive(Parser, Debug)]
#[command(name = "pushdigest", about = "Summarize an article and push it to a messaging channel")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Process this URL once and exit instead of serving HTTP
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// With --url, print the generated message instead of pushing it
    #[arg(long, requires = "url")]
    no_notify: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Credentials usually come from a local .env during development
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let pipeline = build_pipeline(&config).context("failed to initialize pipeline")?;
    let pipeline = Arc::new(pipeline);

    if let Some(url) = args.url {
        info!(%url, no_notify = args.no_notify, "running pipeline once");
        if args.no_notify {
            match pipeline.prepare(&url).await {
                Ok(message) => println!("{}", message),
                Err(e) => {
                    println!("{}", e.public_message());
                    anyhow::bail!("pipeline failed at stage after '{}'", e.reached());
                }
            }
        } else {
            match pipeline.run(&url).await {
                Ok(result) => println!("{}", result),
                Err(e) => {
                    println!("{}", e.public_message());
                    anyhow::bail!("pipeline failed at stage after '{}'", e.reached());
                }
            }
        }
        return Ok(());
    }

    info!("Launching Rocket HTTP server");
    launch_rocket(AppState::new(pipeline), &config.server).await?;

    info!("Shutdown complete");
    Ok(())
}
