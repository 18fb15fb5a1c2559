//! TCP accept loop for game clients

use crate::collaborators::{AccountService, TcpAccountService, UdpWordRepository, WordRepository};
use crate::config::ServerConfig;
use crate::session::Session;
use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

/// Game server handing each connection its own session task
pub struct GameServer {
    listener: TcpListener,
    words: Arc<dyn WordRepository>,
    accounts: Arc<dyn AccountService>,
    sessions: Arc<Semaphore>,
    max_generation_attempts: usize,
}

impl GameServer {
    /// Binds the listener and connects to the real collaborators
    pub async fn new(config: &ServerConfig) -> io::Result<Self> {
        let words = Arc::new(UdpWordRepository::new(config.words, config.word_timeout));
        let accounts = Arc::new(TcpAccountService::new(
            config.accounts,
            config.account_timeout,
        ));
        Self::with_collaborators(config, words, accounts).await
    }

    pub async fn with_collaborators(
        config: &ServerConfig,
        words: Arc<dyn WordRepository>,
        accounts: Arc<dyn AccountService>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.bind).await?;
        info!("Game server listening on {}", listener.local_addr()?);

        Ok(GameServer {
            listener,
            words,
            accounts,
            sessions: Arc::new(Semaphore::new(config.max_sessions.max(1))),
            max_generation_attempts: config.max_generation_attempts,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts clients forever; connections beyond the session limit wait
    /// until a running session ends.
    pub async fn run(&self) -> io::Result<()> {
        loop {
            let permit = match Arc::clone(&self.sessions).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            };

            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept client: {}", e);
                    continue;
                }
            };
            info!("Client connected from {}", addr);

            let words = Arc::clone(&self.words);
            let accounts = Arc::clone(&self.accounts);
            let max_generation_attempts = self.max_generation_attempts;

            tokio::spawn(async move {
                let (reader, writer) = stream.into_split();
                let mut session = Session::new(BufReader::new(reader), writer, words, accounts)
                    .with_max_generation_attempts(max_generation_attempts);

                match session.run().await {
                    Ok(()) => info!("Client {} closed its session", addr),
                    Err(e) => warn!("Session with {} ended: {}", addr, e),
                }
                drop(permit);
            });
        }
    }
}
