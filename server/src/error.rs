//! Errors raised while driving a client session

use crate::collaborators::CollaboratorError;
use crate::generator::GenerationError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid command syntax: '{0}'. Try again.")]
    InvalidCommand(String),
    #[error("Word count argument '{0}' is not a number.")]
    InvalidWordCount(String),
    #[error("Word count must be between {min} and {max}, got {got}.")]
    WordCountOutOfRange { got: usize, min: usize, max: usize },
    #[error("No existing game found.")]
    NoExistingGame,
    #[error("Invalid guess: '{0}'. Try again.")]
    InvalidGuess(String),
    #[error("Invalid word: '{0}'.")]
    InvalidWord(String),
    #[error("Service unavailable: {0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("Could not generate puzzle: {0}")]
    Generation(#[from] GenerationError),
    #[error("Couldn't save game: {0}")]
    Persistence(String),
    #[error("Failed to load user data: {0}")]
    LoadFailed(String),
    #[error("No user is logged in.")]
    NotLoggedIn,
    #[error("Client disconnected")]
    ClientDisconnected,
    #[error("Client connection failed: {0}")]
    ClientIo(#[from] io::Error),
}

impl SessionError {
    /// Fatal errors end the session; everything else is reported and the
    /// session carries on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::LoadFailed(_)
                | SessionError::NotLoggedIn
                | SessionError::ClientDisconnected
                | SessionError::ClientIo(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fatal_classification() {
        assert!(SessionError::ClientDisconnected.is_fatal());
        assert!(SessionError::LoadFailed("gone".into()).is_fatal());
        assert!(!SessionError::NoExistingGame.is_fatal());
        assert!(!SessionError::Collaborator(CollaboratorError::Timeout {
            service: "account service",
            after: Duration::from_secs(5),
        })
        .is_fatal());
    }

    #[test]
    fn test_generation_errors_convert() {
        let err: SessionError = GenerationError::Impossible(25).into();
        assert_eq!(
            err.to_string(),
            "Could not generate puzzle: no buildable word set found after 25 attempts"
        );
    }
}
