//! UDP front end of the word repository
//!
//! Every datagram is one request and gets exactly one reply datagram. The
//! repository gives no delivery guarantee; callers time out on their side.

use crate::store::WordStore;
use log::{debug, error, info, warn};
use shared::protocol::{
    is_valid_word, status_code, INVALID_WORD, NOT_FOUND, UNKNOWN_REQUEST, WORD_ADDED,
    WORD_ALREADY_PRESENT, WORD_MISSING, WORD_REMOVED,
};
use shared::WordRequest;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::RwLock;

pub const MAX_DATAGRAM: usize = 2048;

/// Word repository server owning the store and its lock
pub struct WordServer {
    socket: Arc<UdpSocket>,
    store: Arc<RwLock<WordStore>>,
}

impl WordServer {
    pub async fn new(addr: &str, store: WordStore) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Word repository listening on {}", socket.local_addr()?);

        Ok(WordServer {
            socket,
            store: Arc::new(RwLock::new(store)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives requests until the socket fails permanently.
    ///
    /// Each request is answered from its own task so a slow file rewrite
    /// does not hold up lookups.
    pub async fn run(&self) -> io::Result<()> {
        let mut buffer = [0u8; MAX_DATAGRAM];

        loop {
            match self.socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => {
                    let message = String::from_utf8_lossy(&buffer[..len]).into_owned();
                    let socket = Arc::clone(&self.socket);
                    let store = Arc::clone(&self.store);

                    tokio::spawn(async move {
                        let reply = handle_request(&store, &message).await;
                        debug!("{} -> {:?} -> {:?}", addr, message, reply);
                        if let Err(e) = socket.send_to(reply.as_bytes(), addr).await {
                            error!("Failed to reply to {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// Produces the reply text for one request
pub async fn handle_request(store: &RwLock<WordStore>, message: &str) -> String {
    let request = match WordRequest::parse(message) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected word request {:?}: {}", message, e);
            return UNKNOWN_REQUEST.to_string();
        }
    };

    match request {
        WordRequest::Add(word) => {
            if !is_valid_word(&word) {
                return INVALID_WORD.to_string();
            }
            let mut store = store.write().await;
            match store.add(&word) {
                Ok(true) => WORD_ADDED.to_string(),
                Ok(false) => WORD_ALREADY_PRESENT.to_string(),
                Err(e) => {
                    error!("Failed to persist word list: {}", e);
                    format!("Failed to update database: {}", e)
                }
            }
        }
        WordRequest::Remove(word) => {
            let mut store = store.write().await;
            match store.remove(&word) {
                Ok(true) => WORD_REMOVED.to_string(),
                Ok(false) => WORD_MISSING.to_string(),
                Err(e) => {
                    error!("Failed to persist word list: {}", e);
                    format!("Failed to update database: {}", e)
                }
            }
        }
        WordRequest::Query(word) => {
            let store = store.read().await;
            status_code(store.contains(&word)).to_string()
        }
        WordRequest::FetchByContainedChar(letter) => {
            let store = store.read().await;
            let word = store.random_containing(letter, &mut rand::thread_rng());
            word.unwrap_or(NOT_FOUND).to_string()
        }
        WordRequest::FetchByMinLength(length) => {
            let store = store.read().await;
            let word = store.random_with_min_length(length, &mut rand::thread_rng());
            word.unwrap_or(NOT_FOUND).to_string()
        }
    }
}
