use accounts::{AccountServer, AccountStore};
use clap::Parser;
use log::{error, info};

/// Account and persistence service
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// TCP port to listen on
    #[clap(short, long, default_value = "8081")]
    port: u16,
    /// Directory holding one record file per user
    #[clap(short, long, default_value = "./UserData")]
    data_dir: String,
    /// Maximum number of requests served at once
    #[clap(short, long, default_value = "20")]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let store = AccountStore::open(&args.data_dir)?;
    let address = format!("{}:{}", args.host, args.port);
    let server = AccountServer::new(&address, store, args.max_connections).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Account service stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
