use clap::Parser;
use log::{error, info};
use words::{WordServer, WordStore};

/// Word repository service
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// UDP port to listen on
    #[clap(short, long, default_value = "8082")]
    port: u16,
    /// Word list, whitespace separated
    #[clap(short, long, default_value = "./words/data/words.txt")]
    words_file: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let store = WordStore::open(&args.words_file)?;
    let address = format!("{}:{}", args.host, args.port);
    let server = WordServer::new(&address, store).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Word repository stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
