//! Runs one Parlor game variant over WebSocket.
//!
//! Clients connect to `ws://<bind>/ws/<room>`; `/` and `/ws` land in the
//! default room.
//!
//! Run with:
//! ```not_rust
//! cargo run -p game-server -- --game guess
//! cargo run -p game-server -- --game snake --bind 0.0.0.0:9000 --board 30x20
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use parlor::prelude::*;
use parlor_games::{Chat, GuessConfig, GuessNumber, RockPaperScissors, Snake, SnakeConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Game {
    Chat,
    Guess,
    Rps,
    Snake,
}

#[derive(Parser, Debug)]
#[command(name = "game-server")]
#[command(about = "Multi-room WebSocket game server", long_about = None)]
struct Args {
    /// Game variant every room runs
    #[arg(short, long, value_enum, default_value_t = Game::Chat)]
    game: Game,

    /// Address to bind the server to
    #[arg(short, long, env = "PARLOR_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Room for clients that do not name one
    #[arg(long, default_value = "lobby")]
    default_room: String,

    /// Disconnect clients silent for this many seconds
    #[arg(long)]
    idle_secs: Option<u64>,

    /// Default log level for Parlor crates (RUST_LOG overrides)
    #[arg(long, env = "PARLOR_LOG", default_value = "info")]
    log_level: String,

    /// Largest secret for the guess game
    #[arg(long, default_value_t = 100)]
    max_secret: i64,

    /// Snake board size as WIDTHxHEIGHT
    #[arg(long, default_value = "20x20", value_parser = parse_board)]
    board: (i32, i32),
}

fn parse_board(s: &str) -> Result<(i32, i32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s}"))?;
    let w: i32 = w.parse().map_err(|_| format!("bad width: {w}"))?;
    let h: i32 = h.parse().map_err(|_| format!("bad height: {h}"))?;
    if w < 2 || h < 2 {
        return Err("board must be at least 2x2".into());
    }
    Ok((w, h))
}

#[tokio::main]
async fn main() -> Result<(), ParlorError> {
    let args = Args::parse();
    parlor::logging::init(&args.log_level);

    let mut builder = ParlorServerBuilder::new()
        .bind(&args.bind)
        .default_room(args.default_room.as_str());
    if let Some(secs) = args.idle_secs {
        builder = builder.idle_timeout(Duration::from_secs(secs));
    }

    tracing::info!(game = ?args.game, bind = %args.bind, "starting");
    match args.game {
        Game::Chat => serve(builder.build::<Chat>(()).await?).await,
        Game::Guess => {
            let config = GuessConfig {
                range: 1..=args.max_secret,
            };
            serve(builder.build::<GuessNumber>(config).await?).await
        }
        Game::Rps => serve(builder.build::<RockPaperScissors>(()).await?).await,
        Game::Snake => {
            let (width, height) = args.board;
            let config = SnakeConfig {
                width,
                height,
                ..SnakeConfig::default()
            };
            serve(builder.build::<Snake>(config).await?).await
        }
    }
}

async fn serve<G: RoomLogic>(server: ParlorServer<G>) -> Result<(), ParlorError> {
    tracing::info!(addr = %server.local_addr()?, "listening");
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("ctrl-c received, shutting down");
        })
        .await
}
