use anyhow::{Context, Result};
use clap::Parser;
use nanphoto::app::App;
use nanphoto::auth::SessionGate;
use nanphoto::models::Config;
use nanphoto::server::{self, AppState};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "nanphoto")]
#[command(about = "Gemini-backed chat and image generation server")]
struct CliArgs {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nanphoto=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    info!("Starting nanphoto");

    let config = Config::from_env().context("Failed to load configuration")?;
    let gate = SessionGate::new(config.password.clone());
    if gate.is_enabled() {
        info!("Password protection enabled");
    }

    let app = match App::from_config(&config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    server::serve(AppState::new(app, gate), args.bind).await?;
    Ok(())
}
