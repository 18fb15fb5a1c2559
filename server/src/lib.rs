//! # Crossword Game Server
//!
//! Orchestrates player sessions for the crossword puzzle game. Clients connect
//! over TCP and exchange plain text lines; every prompt that expects a reply
//! is closed by an `*End of Message*` line.
//!
//! The server owns no persistent state of its own. It leans on two
//! collaborators:
//!
//! - the **word repository** (UDP) supplies candidate words and answers
//!   existence queries
//! - the **account service** (TCP) handles login/logout and stores each
//!   user's encoded record
//!
//! ## Session Lifecycle
//!
//! ### Logging In
//! The client is asked for a username until the account service accepts it.
//! Duplicate logins and unreachable services re-prompt instead of dropping the
//! connection. The user's record is then loaded; failing to load it is the one
//! login error that ends the session.
//!
//! ### Menu
//! `Add;word` and `Remove;word` are forwarded to the word repository.
//! `New Game;N` generates and saves a fresh puzzle of N words (2 to 15) before
//! play starts, so an unplayed game survives a crash. `Continue` resumes a
//! saved game.
//!
//! ### Playing
//! Each turn shows the masked grid and the attempts left. A guess is a single
//! letter, the stem or a leaf; `?word` checks the repository for free;
//! `*Save*` returns to the menu. Solving the puzzle adds one to the score.
//!
//! ## Module Organization
//!
//! ### Collaborators Module (`collaborators`)
//! Traits for both services plus their network clients. Every call is bounded
//! by a timeout.
//!
//! ### Generator Module (`generator`)
//! Builds a word set from repository fetches with bounded retries and an
//! overall attempt ceiling.
//!
//! ### Session Module (`session`)
//! The per-connection state machine.
//!
//! ### Network Module (`network`)
//! Accept loop with a bounded number of concurrent sessions.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::{GameServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let server = GameServer::new(&config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Handling
//!
//! Malformed commands, collaborator timeouts and refused saves are shown to
//! the client and followed by a best-effort save; the session stays where it
//! was. Only the client's own transport failing ends a session, and even then
//! the user's state is saved and they are logged out.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod generator;
pub mod network;
pub mod session;

pub use collaborators::{
    AccountService, CollaboratorError, TcpAccountService, UdpWordRepository, WordRepository,
};
pub use config::ServerConfig;
pub use error::SessionError;
pub use generator::{GenerationError, WordSet, WordSetGenerator};
pub use network::GameServer;
pub use session::{Session, SessionState};
