//! # Account Service
//!
//! Authenticates players and keeps one persisted record per account. The game
//! server talks to it over short TCP connections, one request each:
//!
//! | request             | reply                                    |
//! |---------------------|------------------------------------------|
//! | `login;u`           | `1` existing, `2` registered, `0` already logged in |
//! | `logout;u`          | `1` / `0`                                |
//! | `load;u`            | the record, then an empty line           |
//! | `save;u` + record   | `1` / `0`                                |
//!
//! Refused requests answer `error;<reason>`.
//!
//! All store access goes through one mutex owned by [`AccountServer`].

pub mod network;
pub mod store;

pub use network::AccountServer;
pub use store::{AccountError, AccountStore};
