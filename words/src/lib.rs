//! # Word Repository
//!
//! Supplies candidate words to the game server. The repository is a single
//! UDP service: each datagram carries one `<opcode>;<argument>` request and is
//! answered by one datagram.
//!
//! ## Operations
//!
//! - `Add;word` / `Remove;word` mutate the list and rewrite the words file
//! - `Query;word` answers `1` or `0`
//! - `FetchByContainedChar;c` answers a random word containing `c`
//! - `FetchByMinLength;n` answers a random word at least `n` letters long
//!
//! Fetches answer with an empty datagram when nothing matches.
//!
//! ## Module Organization
//!
//! ### Store Module (`store`)
//! The word list itself. Owned by the server behind a read-write lock.
//!
//! ### Network Module (`network`)
//! Datagram receive loop and request dispatch.
//!
//! ```rust,no_run
//! use words::{WordServer, WordStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = WordStore::open("words.txt")?;
//!     let server = WordServer::new("127.0.0.1:8082", store).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod store;

pub use network::WordServer;
pub use store::WordStore;
