//! Integration tests for the three services
//!
//! Every test starts a word repository, an account service and a game server
//! on ephemeral ports and plays through them as a real client would.

use accounts::{AccountServer, AccountStore};
use server::{GameServer, ServerConfig};
use shared::{decode, GameState, MESSAGE_END};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use words::{WordServer, WordStore};

const WORDS: &[&str] = &[
    "elephant", "leopard", "cat", "rabbit", "monkey", "dolphin", "action", "track", "garden",
    "window", "planet", "orange", "bridge", "castle", "silver", "market", "pencil", "rocket",
    "forest", "island", "butter", "candle", "dragon", "engine", "finger", "guitar", "hammer",
];

struct Services {
    game: SocketAddr,
    user_data: PathBuf,
    _dir: TempDir,
}

impl Services {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let words_file = dir.path().join("words.txt");
        std::fs::write(&words_file, WORDS.join("\n")).unwrap();
        let user_data = dir.path().join("UserData");

        let word_server = WordServer::new("127.0.0.1:0", WordStore::open(&words_file).unwrap())
            .await
            .unwrap();
        let words = word_server.local_addr().unwrap();
        tokio::spawn(async move { word_server.run().await });

        let account_server =
            AccountServer::new("127.0.0.1:0", AccountStore::open(&user_data).unwrap(), 8)
                .await
                .unwrap();
        let accounts = account_server.local_addr().unwrap();
        tokio::spawn(async move { account_server.run().await });

        let config = ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            accounts,
            words,
            account_timeout: Duration::from_secs(2),
            word_timeout: Duration::from_secs(2),
            ..ServerConfig::default()
        };
        let game_server = GameServer::new(&config).await.unwrap();
        let game = game_server.local_addr().unwrap();
        tokio::spawn(async move { game_server.run().await });

        Services {
            game,
            user_data,
            _dir: dir,
        }
    }

    async fn connect(&self) -> Client {
        let (reader, writer) = TcpStream::connect(self.game).await.unwrap().into_split();
        Client {
            reader: BufReader::new(reader),
            writer,
        }
    }

    fn record(&self, username: &str) -> shared::UserData {
        let path = self.user_data.join(format!("{}.txt", username));
        decode(&std::fs::read_to_string(path).unwrap()).unwrap()
    }
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Everything up to the next end-of-message line
    async fn read_message(&mut self) -> String {
        let mut message = String::new();
        loop {
            let mut line = String::new();
            let read = timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
                .await
                .expect("server went quiet")
                .unwrap();
            if read == 0 || line.trim_end() == MESSAGE_END {
                return message;
            }
            message.push_str(&line);
        }
    }

    async fn send(&mut self, line: &str) -> String {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
        self.read_message().await
    }

    async fn login(&mut self, username: &str) -> String {
        let welcome = self.read_message().await;
        assert!(welcome.contains("Please enter your username"));
        self.send(username).await
    }
}

/// FULL GAME TESTS
mod game_tests {
    use super::*;

    #[tokio::test]
    async fn register_play_and_win() {
        let services = Services::start().await;
        let mut client = services.connect().await;

        let menu = client.login("amy").await;
        assert!(menu.contains("Creating new account: amy"));
        assert!(menu.contains("New Game;x"));

        let reply = client.send("Add;zebra").await;
        assert!(reply.contains("Word added to database"));

        let screen = client.send("New Game;3").await;
        assert!(screen.contains("Attempts remaining: 6"));

        // The game is persisted before the first guess
        let words = match services.record("amy").game {
            GameState::Play(game) => game.words,
            GameState::Idle => panic!("new game was not saved"),
        };
        assert_eq!(words.len(), 3);

        let reply = client.send(&words[0]).await;
        assert!(reply.contains(&format!("*Successful guess: '{}'", words[0])));
        let reply = client.send(&words[1]).await;
        assert!(reply.contains("Attempts remaining: 4"));
        let reply = client.send(&words[2]).await;
        assert!(reply.contains("You win!"));

        let farewell = client.send("*Exit*").await;
        assert!(farewell.contains("Logging out: amy"));

        let stored = services.record("amy");
        assert_eq!(stored.score, 1);
        assert_eq!(stored.game, GameState::Idle);
    }

    #[tokio::test]
    async fn saved_game_survives_reconnect() {
        let services = Services::start().await;

        let mut first = services.connect().await;
        first.login("bob").await;
        first.send("New Game;4").await;
        first.send("q").await;
        first.send("*Save*").await;
        first.send("*Exit*").await;

        let mut second = services.connect().await;
        let menu = second.login("bob").await;
        assert!(menu.contains("Logging in as: bob"));
        let screen = second.send("Continue").await;
        assert!(screen.contains("Attempts remaining: 7"));
        second.send("*Exit*").await;
    }

    #[tokio::test]
    async fn impossible_word_count_is_reported() {
        let services = Services::start().await;
        let mut client = services.connect().await;
        client.login("cleo").await;

        let reply = client.send("New Game;15").await;
        assert!(reply.contains("Could not generate puzzle"));
        let reply = client.send("New Game;16").await;
        assert!(reply.contains("Word count must be between 2 and 15, got 16."));
        let reply = client.send("Continue").await;
        assert!(reply.contains("No existing game found."));

        client.send("*Exit*").await;
        assert_eq!(services.record("cleo").game, GameState::Idle);
    }
}

/// SESSION LIFECYCLE TESTS
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_login_is_refused() {
        let services = Services::start().await;

        let mut first = services.connect().await;
        first.login("dan").await;

        let mut second = services.connect().await;
        let reply = second.login("dan").await;
        assert!(reply.contains("Error: User already logged in."));
        assert!(reply.contains("Please enter your username"));

        let reply = second.send("eve").await;
        assert!(reply.contains("Creating new account: eve"));

        first.send("*Exit*").await;
        second.send("*Exit*").await;
    }

    #[tokio::test]
    async fn dropped_client_is_logged_out() {
        let services = Services::start().await;

        let mut client = services.connect().await;
        client.login("fay").await;
        client.send("New Game;2").await;
        drop(client);

        // Cleanup runs on the server after it notices the disconnect
        let mut reply = String::new();
        for _ in 0..20 {
            sleep(Duration::from_millis(50)).await;
            let mut retry = services.connect().await;
            reply = retry.login("fay").await;
            if reply.contains("Logging in as: fay") {
                retry.send("*Exit*").await;
                break;
            }
        }
        assert!(reply.contains("Logging in as: fay"));
        assert!(services.record("fay").game.is_playing());
    }
}
