use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use trace_server::{build_router, create_default_config, load_config, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "system.toml")]
    config: PathBuf,
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if !args.config.exists() {
        warn!(path = %args.config.display(), "config file missing, creating default config");
        create_default_config(&args.config)?;
    }

    let config = load_config(&args.config)?;
    let state = Arc::new(AppState::from_config(config)?);
    let app = build_router(state.clone());

    info!(
        service = %state.server.name,
        environment = %state.server.environment,
        "listening on {}",
        args.listen
    );
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
