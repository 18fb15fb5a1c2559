use clap::Parser;
use log::{error, info};
use server::{GameServer, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;

/// Crossword game server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// TCP port to listen on for game clients
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Address of the account service
    #[clap(short, long, default_value = "127.0.0.1:8081")]
    accounts: SocketAddr,
    /// Address of the word repository
    #[clap(short, long, default_value = "127.0.0.1:8082")]
    words: SocketAddr,
    /// Timeout for account service calls
    #[clap(long, default_value = "5000")]
    account_timeout_ms: u64,
    /// Timeout for word repository calls
    #[clap(long, default_value = "2000")]
    word_timeout_ms: u64,
    /// Maximum number of concurrent sessions
    #[clap(short, long, default_value = "20")]
    max_sessions: usize,
    /// Stems tried before giving up on a new puzzle
    #[clap(long, default_value = "25")]
    max_generation_attempts: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        bind: format!("{}:{}", args.host, args.port),
        accounts: args.accounts,
        words: args.words,
        account_timeout: Duration::from_millis(args.account_timeout_ms),
        word_timeout: Duration::from_millis(args.word_timeout_ms),
        max_sessions: args.max_sessions,
        max_generation_attempts: args.max_generation_attempts,
    };

    let server = GameServer::new(&config).await?;
    info!(
        "Using account service at {} and word repository at {}",
        config.accounts, config.words
    );

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Game server stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
