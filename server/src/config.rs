use crate::generator::DEFAULT_MAX_ATTEMPTS;
use std::net::SocketAddr;
use std::time::Duration;

/// Everything the game server needs to know about its surroundings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub accounts: SocketAddr,
    pub words: SocketAddr,
    pub account_timeout: Duration,
    pub word_timeout: Duration,
    pub max_sessions: usize,
    pub max_generation_attempts: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            accounts: SocketAddr::from(([127, 0, 0, 1], 8081)),
            words: SocketAddr::from(([127, 0, 0, 1], 8082)),
            account_timeout: Duration::from_millis(5000),
            word_timeout: Duration::from_millis(2000),
            max_sessions: 20,
            max_generation_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
