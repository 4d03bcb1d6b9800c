//! Nexus operator server - web interface for steering a decomposition run.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use nexus::agents::command_engine;
use nexus::controller::RunController;
use nexus::io::config::{CONFIG_FILE, load_config};

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "nexus-ui")]
#[command(about = "Web UI for steering a nexus decomposition run")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Config file (missing file means defaults)
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Directory containing UI static files (defaults to ./ui/dist)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nexus_ui=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let cfg = load_config(&args.config)?;
    info!(config = %args.config.display(), "starting nexus-ui");

    let engine = Arc::new(command_engine(&cfg)?);
    let controller = Arc::new(RunController::new(Arc::clone(&engine), cfg.interval()));
    // Ticks for the life of the server; cycles only run while toggled on.
    controller.spawn();

    let state = AppState::new(engine);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    let ui_dir = args
        .ui_dir
        .unwrap_or_else(|| PathBuf::from("ui").join("dist"));
    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    } else {
        info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
