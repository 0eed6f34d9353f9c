mod error;
mod game_ws;
mod lobby;
mod room;
mod state;

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shared::Config;

use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "quadball-server")]
#[command(about = "Authoritative realtime server for quadball matches")]
struct Args {
    /// Address to bind the HTTP/WebSocket listener to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Simulation tick rate, in Hz
    #[arg(long, default_value_t = 20)]
    tick_hz: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quadball_server=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::default();
    config.tick_hz = args.tick_hz;

    let state = AppState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ws/lobby", get(lobby::handle_lobby_ws))
        .route("/ws/game/:room_id/:player_id", get(game_ws::handle_game_ws))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "quadball server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
