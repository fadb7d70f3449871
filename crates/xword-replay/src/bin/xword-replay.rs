//! Crossword Replay Viewer
//!
//! Load a recording file (plain JSON or typed document) and serve it.
//!
//! ```text
//! xword-replay <recording.json> [port]
//! ```

use std::env;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xword_replay::{parse_recording, EngineConfig, ReplayServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xword_replay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        let program = args.first().map_or("xword-replay", String::as_str);
        eprintln!("usage: {program} <recording.json> [port]");
        std::process::exit(2);
    };

    let port: u16 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| ServerConfig::from_env().port);

    let text = tokio::fs::read_to_string(path).await?;
    let recording = parse_recording(&text)?;

    println!("Crossword Replay");
    println!("================");
    println!();
    if !recording.puzzle_title.is_empty() {
        println!("  Puzzle:  {} ({})", recording.puzzle_title, recording.puzzle_date);
    }
    println!("  Grid:    {0}x{0}", recording.grid_size);
    println!("  Actions: {}", recording.action_count());
    println!("  Time:    {}", xword_replay::format_clock(recording.duration_ms()));
    println!();
    println!("Open http://localhost:{} in a browser client to watch.", port);
    println!();

    let server = ReplayServer::new(recording, EngineConfig::from_env())?;
    server.serve(port).await?;

    Ok(())
}
