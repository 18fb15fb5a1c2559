//! Clients for the two services a session depends on
//!
//! Both sit behind traits so sessions can be driven against in-memory doubles.
//! Every call is bounded by a timeout; none is retried here.

use async_trait::async_trait;
use log::{debug, warn};
use shared::protocol::{parse_status, ACCOUNT_ERROR_PREFIX, NOT_FOUND, UNKNOWN_REQUEST};
use shared::{AccountRequest, LoginOutcome, WordRequest};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};

const WORD_SERVICE: &str = "word repository";
const ACCOUNT_SERVICE: &str = "account service";
const MAX_DATAGRAM: usize = 2048;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{service} did not answer within {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },
    #[error("{service} unreachable: {source}")]
    Io {
        service: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{service} sent an unexpected reply '{reply}'")]
    Malformed { service: &'static str, reply: String },
    #[error("{service} refused the request: {reason}")]
    Rejected {
        service: &'static str,
        reason: String,
    },
}

impl CollaboratorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CollaboratorError::Timeout { .. })
    }
}

#[async_trait]
pub trait WordRepository: Send + Sync {
    /// A random word at least `length` letters long, `None` if there is none
    async fn fetch_by_min_length(&self, length: usize)
        -> Result<Option<String>, CollaboratorError>;

    /// A random word containing `letter`, `None` if there is none
    async fn fetch_containing(&self, letter: char) -> Result<Option<String>, CollaboratorError>;

    async fn exists(&self, word: &str) -> Result<bool, CollaboratorError>;

    /// Returns the repository's status text
    async fn add(&self, word: &str) -> Result<String, CollaboratorError>;

    /// Returns the repository's status text
    async fn remove(&self, word: &str) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait AccountService: Send + Sync {
    async fn login(&self, username: &str) -> Result<LoginOutcome, CollaboratorError>;

    async fn logout(&self, username: &str) -> Result<bool, CollaboratorError>;

    /// The user's encoded record
    async fn load(&self, username: &str) -> Result<String, CollaboratorError>;

    async fn save(&self, username: &str, record: &str) -> Result<bool, CollaboratorError>;
}

async fn bounded<T, F>(service: &'static str, after: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = io::Result<T>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(CollaboratorError::Io { service, source }),
        Err(_) => {
            warn!("{} timed out after {:?}", service, after);
            Err(CollaboratorError::Timeout { service, after })
        }
    }
}

/// Word repository reached over UDP, one socket per request
#[derive(Debug, Clone)]
pub struct UdpWordRepository {
    addr: SocketAddr,
    timeout: Duration,
}

impl UdpWordRepository {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    async fn request(&self, request: WordRequest) -> Result<String, CollaboratorError> {
        let message = request.encode();
        let addr = self.addr;

        let reply = bounded(WORD_SERVICE, self.timeout, async move {
            let local: SocketAddr = if addr.is_ipv4() {
                ([0, 0, 0, 0], 0).into()
            } else {
                ([0u16; 8], 0).into()
            };
            let socket = UdpSocket::bind(local).await?;
            socket.connect(addr).await?;
            socket.send(message.as_bytes()).await?;

            let mut buffer = [0u8; MAX_DATAGRAM];
            let len = socket.recv(&mut buffer).await?;
            Ok::<_, io::Error>(String::from_utf8_lossy(&buffer[..len]).into_owned())
        })
        .await?;

        debug!("{:?} -> {:?}", request, reply);
        if reply == UNKNOWN_REQUEST {
            return Err(CollaboratorError::Rejected {
                service: WORD_SERVICE,
                reason: reply,
            });
        }
        Ok(reply)
    }

    async fn fetch(&self, request: WordRequest) -> Result<Option<String>, CollaboratorError> {
        let reply = self.request(request).await?;
        let word = reply.trim();
        if word == NOT_FOUND {
            Ok(None)
        } else {
            Ok(Some(word.to_string()))
        }
    }
}

#[async_trait]
impl WordRepository for UdpWordRepository {
    async fn fetch_by_min_length(
        &self,
        length: usize,
    ) -> Result<Option<String>, CollaboratorError> {
        self.fetch(WordRequest::FetchByMinLength(length)).await
    }

    async fn fetch_containing(&self, letter: char) -> Result<Option<String>, CollaboratorError> {
        self.fetch(WordRequest::FetchByContainedChar(letter)).await
    }

    async fn exists(&self, word: &str) -> Result<bool, CollaboratorError> {
        let reply = self.request(WordRequest::Query(word.to_string())).await?;
        parse_status(&reply).ok_or(CollaboratorError::Malformed {
            service: WORD_SERVICE,
            reply,
        })
    }

    async fn add(&self, word: &str) -> Result<String, CollaboratorError> {
        self.request(WordRequest::Add(word.to_string())).await
    }

    async fn remove(&self, word: &str) -> Result<String, CollaboratorError> {
        self.request(WordRequest::Remove(word.to_string())).await
    }
}

/// Account service reached over TCP, one connection per request
#[derive(Debug, Clone)]
pub struct TcpAccountService {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpAccountService {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    /// Sends one request and reads either its status line or, for
    /// `multiline`, every line up to the closing empty line.
    async fn exchange(
        &self,
        request: AccountRequest,
        payload: Option<&str>,
        multiline: bool,
    ) -> Result<String, CollaboratorError> {
        let mut message = request.encode();
        if let Some(payload) = payload {
            message.push_str(payload);
            if !payload.ends_with('\n') {
                message.push('\n');
            }
            message.push('\n');
        }
        let addr = self.addr;

        let reply = bounded(ACCOUNT_SERVICE, self.timeout, async move {
            let stream = TcpStream::connect(addr).await?;
            let (reader, mut writer) = stream.into_split();
            writer.write_all(message.as_bytes()).await?;
            writer.flush().await?;

            let mut reader = BufReader::new(reader);
            let mut reply = String::new();
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).await? == 0 {
                    break;
                }
                let content = line.trim_end_matches(['\r', '\n']);
                if !multiline || content.is_empty() || content.starts_with(ACCOUNT_ERROR_PREFIX) {
                    reply.push_str(content);
                    break;
                }
                reply.push_str(content);
                reply.push('\n');
            }
            Ok::<_, io::Error>(reply)
        })
        .await?;

        debug!("{:?} -> {:?}", request, reply);
        if let Some(reason) = reply.strip_prefix(ACCOUNT_ERROR_PREFIX) {
            return Err(CollaboratorError::Rejected {
                service: ACCOUNT_SERVICE,
                reason: reason.trim().to_string(),
            });
        }
        Ok(reply)
    }

    async fn status(
        &self,
        request: AccountRequest,
        payload: Option<&str>,
    ) -> Result<bool, CollaboratorError> {
        let reply = self.exchange(request, payload, false).await?;
        parse_status(&reply).ok_or(CollaboratorError::Malformed {
            service: ACCOUNT_SERVICE,
            reply,
        })
    }
}

#[async_trait]
impl AccountService for TcpAccountService {
    async fn login(&self, username: &str) -> Result<LoginOutcome, CollaboratorError> {
        let reply = self
            .exchange(AccountRequest::Login(username.to_string()), None, false)
            .await?;
        LoginOutcome::from_code(&reply).ok_or(CollaboratorError::Malformed {
            service: ACCOUNT_SERVICE,
            reply,
        })
    }

    async fn logout(&self, username: &str) -> Result<bool, CollaboratorError> {
        self.status(AccountRequest::Logout(username.to_string()), None)
            .await
    }

    async fn load(&self, username: &str) -> Result<String, CollaboratorError> {
        let reply = self
            .exchange(AccountRequest::Load(username.to_string()), None, true)
            .await?;
        if reply.is_empty() {
            return Err(CollaboratorError::Malformed {
                service: ACCOUNT_SERVICE,
                reply,
            });
        }
        Ok(reply)
    }

    async fn save(&self, username: &str, record: &str) -> Result<bool, CollaboratorError> {
        self.status(AccountRequest::Save(username.to_string()), Some(record))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_word_request_times_out() {
        // Bound but never answered
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let repository =
            UdpWordRepository::new(silent.local_addr().unwrap(), Duration::from_millis(50));

        let err = repository.fetch_containing('a').await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_word_fetch_reply_mapping() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let repository =
            UdpWordRepository::new(server.local_addr().unwrap(), Duration::from_secs(2));

        tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM];
            for reply in ["track", "", "error detected"] {
                let (len, peer) = server.recv_from(&mut buf).await.unwrap();
                assert!(std::str::from_utf8(&buf[..len]).unwrap().contains(';'));
                server.send_to(reply.as_bytes(), peer).await.unwrap();
            }
        });

        assert_eq!(
            repository.fetch_containing('t').await.unwrap(),
            Some("track".to_string())
        );
        assert_eq!(repository.fetch_by_min_length(40).await.unwrap(), None);
        assert!(matches!(
            repository.exists("cat").await,
            Err(CollaboratorError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_account_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let service = TcpAccountService::new(listener.local_addr().unwrap(), Duration::from_secs(2));

        tokio::spawn(async move {
            let replies = [
                "2\n",
                "Username;amy\nScore;0\nState;Idle\n\n",
                "error;invalid username\n",
            ];
            for reply in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut line = String::new();
                let (reader, mut writer) = stream.split();
                BufReader::new(reader).read_line(&mut line).await.unwrap();
                writer.write_all(reply.as_bytes()).await.unwrap();
            }
        });

        assert_eq!(service.login("amy").await.unwrap(), LoginOutcome::Registered);
        assert_eq!(
            service.load("amy").await.unwrap(),
            "Username;amy\nScore;0\nState;Idle\n"
        );
        assert!(matches!(
            service.logout("amy").await,
            Err(CollaboratorError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_account_timeout() {
        // Accepts but never replies
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let service =
            TcpAccountService::new(listener.local_addr().unwrap(), Duration::from_millis(50));
        let _hold = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        assert!(service.login("amy").await.unwrap_err().is_timeout());
    }
}
