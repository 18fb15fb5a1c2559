//! TCP front end of the account service
//!
//! One request per connection. The first line is `<operation>;<username>`;
//! a `save` request carries the record on the following lines, closed by an
//! empty line or the end of the stream.

use crate::store::{AccountError, AccountStore};
use log::{debug, error, info, warn};
use shared::protocol::{status_code, ACCOUNT_ERROR_PREFIX};
use shared::AccountRequest;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Semaphore};

pub struct AccountServer {
    listener: TcpListener,
    store: Arc<Mutex<AccountStore>>,
    permits: Arc<Semaphore>,
}

impl AccountServer {
    pub async fn new(addr: &str, store: AccountStore, max_connections: usize) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Account service listening on {}", listener.local_addr()?);

        Ok(AccountServer {
            listener,
            store: Arc::new(Mutex::new(store)),
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections, at most `max_connections` in flight
    pub async fn run(&self) -> io::Result<()> {
        loop {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            };

            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                let (reader, mut writer) = stream.into_split();
                let mut reader = BufReader::new(reader);

                if let Err(e) = handle_connection(&store, &mut reader, &mut writer).await {
                    warn!("Account request from {} failed: {}", addr, e);
                }
                drop(permit);
            });
        }
    }
}

/// Serves one request read from `reader`
pub async fn handle_connection<R, W>(
    store: &Mutex<AccountStore>,
    reader: &mut R,
    writer: &mut W,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }

    let request = match AccountRequest::parse(&line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed account request {:?}: {}", line.trim_end(), e);
            let reply = format!("{}{}\n", ACCOUNT_ERROR_PREFIX, e);
            writer.write_all(reply.as_bytes()).await?;
            return writer.flush().await;
        }
    };
    debug!("Account request {:?}", request);

    let reply = match request {
        AccountRequest::Login(username) => answer(
            store
                .lock()
                .await
                .login(&username)
                .map(|outcome| format!("{}\n", outcome.code())),
        ),
        AccountRequest::Logout(username) => {
            answer(store.lock().await.logout(&username).map(status_line))
        }
        AccountRequest::Load(username) => answer(store.lock().await.load(&username).map(
            |mut record| {
                if !record.ends_with('\n') {
                    record.push('\n');
                }
                record.push('\n');
                record
            },
        )),
        AccountRequest::Save(username) => {
            let record = read_record(reader).await?;
            answer(store.lock().await.save(&username, &record).map(status_line))
        }
    };

    writer.write_all(reply.as_bytes()).await?;
    writer.flush().await
}

async fn read_record<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<String> {
    let mut record = String::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let content = line.trim_end_matches(['\r', '\n']);
        if content.is_empty() {
            break;
        }
        record.push_str(content);
        record.push('\n');
    }

    Ok(record)
}

fn status_line(ok: bool) -> String {
    format!("{}\n", status_code(ok))
}

fn answer(result: Result<String, AccountError>) -> String {
    result.unwrap_or_else(|e| {
        warn!("Account request refused: {}", e);
        format!("{}{}\n", ACCOUNT_ERROR_PREFIX, e)
    })
}
