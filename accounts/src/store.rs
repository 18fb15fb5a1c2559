//! Account records and the set of users currently logged in
//!
//! Each account is one file, `<data_dir>/<username>.txt`, holding the encoded
//! `UserData`. The file existing is what makes a username registered.

use log::{debug, info, warn};
use shared::{decode, encode, LoginOutcome, UserData};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const RECORD_EXTENSION: &str = "txt";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid username '{0}'")]
    InvalidUsername(String),
    #[error("account storage failure: {0}")]
    Io(#[from] io::Error),
}

/// Usernames become file names, so they must stay inside the data directory
pub fn validate_username(username: &str) -> Result<(), AccountError> {
    let invalid = username.is_empty()
        || username.starts_with('.')
        || username
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ';' || c.is_control());

    if invalid {
        Err(AccountError::InvalidUsername(username.to_string()))
    } else {
        Ok(())
    }
}

#[derive(Debug)]
pub struct AccountStore {
    data_dir: PathBuf,
    logged_in: HashSet<String>,
}

impl AccountStore {
    /// Opens the store, creating the data directory if needed
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, AccountError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        info!("Account records stored in {}", data_dir.display());

        Ok(Self {
            data_dir,
            logged_in: HashSet::new(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn record_path(&self, username: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", username, RECORD_EXTENSION))
    }

    pub fn is_registered(&self, username: &str) -> bool {
        self.record_path(username).is_file()
    }

    pub fn is_logged_in(&self, username: &str) -> bool {
        self.logged_in.contains(username)
    }

    /// Marks the user logged in, registering unknown usernames
    pub fn login(&mut self, username: &str) -> Result<LoginOutcome, AccountError> {
        validate_username(username)?;

        if self.logged_in.contains(username) {
            warn!("Refused login for {}: already logged in", username);
            return Ok(LoginOutcome::AlreadyLoggedIn);
        }

        let outcome = if self.is_registered(username) {
            LoginOutcome::Existing
        } else {
            self.write_record(username, &encode(&UserData::new(username)))?;
            info!("Registered new account {}", username);
            LoginOutcome::Registered
        };

        self.logged_in.insert(username.to_string());
        info!("{} logged in", username);
        Ok(outcome)
    }

    /// Returns false if the user was not logged in
    pub fn logout(&mut self, username: &str) -> Result<bool, AccountError> {
        validate_username(username)?;

        let removed = self.logged_in.remove(username);
        if removed {
            info!("{} logged out", username);
        }
        Ok(removed)
    }

    /// Returns the stored record, writing a fresh one if the user has none
    pub fn load(&self, username: &str) -> Result<String, AccountError> {
        validate_username(username)?;

        match std::fs::read_to_string(self.record_path(username)) {
            Ok(record) => Ok(record),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let record = encode(&UserData::new(username));
                self.write_record(username, &record)?;
                Ok(record)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the stored record.
    ///
    /// Returns false without touching disk if `record` does not decode or
    /// belongs to a different user.
    pub fn save(&self, username: &str, record: &str) -> Result<bool, AccountError> {
        validate_username(username)?;

        let user = match decode(record) {
            Ok(user) => user,
            Err(e) => {
                warn!("Refused save for {}: {}", username, e);
                return Ok(false);
            }
        };
        if user.username != username {
            warn!(
                "Refused save for {}: record belongs to {}",
                username, user.username
            );
            return Ok(false);
        }

        // Re-encode so the file is always in canonical form
        self.write_record(username, &encode(&user))?;
        debug!("Saved {} ({})", username, user.game.tag());
        Ok(true)
    }

    fn write_record(&self, username: &str, record: &str) -> io::Result<()> {
        std::fs::write(self.record_path(username), record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn store() -> (tempfile::TempDir, AccountStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::open(dir.path().join("UserData")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_login_registers_then_refuses_duplicates() {
        let (_dir, mut store) = store();

        assert_eq!(assert_ok!(store.login("amy")), LoginOutcome::Registered);
        assert!(store.is_registered("amy"));
        assert!(store.is_logged_in("amy"));
        assert_eq!(assert_ok!(store.login("amy")), LoginOutcome::AlreadyLoggedIn);

        assert!(assert_ok!(store.logout("amy")));
        assert!(!assert_ok!(store.logout("amy")));
        assert_eq!(assert_ok!(store.login("amy")), LoginOutcome::Existing);
    }

    #[test]
    fn test_registration_survives_restart() {
        let (dir, mut store) = store();
        assert_ok!(store.login("bob"));
        drop(store);

        let mut reopened = assert_ok!(AccountStore::open(dir.path().join("UserData")));
        assert!(!reopened.is_logged_in("bob"));
        assert_eq!(assert_ok!(reopened.login("bob")), LoginOutcome::Existing);
    }

    #[test]
    fn test_load_creates_default_record() {
        let (_dir, store) = store();

        let record = assert_ok!(store.load("cleo"));
        assert_eq!(record, "Username;cleo\nScore;0\nState;Idle\n");
        assert!(store.is_registered("cleo"));
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = store();
        let record = "Username;dan\nScore;4\nState;Idle\n";

        assert!(assert_ok!(store.save("dan", record)));
        assert_eq!(assert_ok!(store.load("dan")), record);
    }

    #[test]
    fn test_save_refuses_bad_records() {
        let (_dir, store) = store();

        assert!(!assert_ok!(store.save("eve", "Username;eve\nScore;x\nState;Idle\n")));
        assert!(!assert_ok!(store.save("eve", "Username;mallory\nScore;1\nState;Idle\n")));
        assert!(!store.is_registered("eve"));
    }

    #[test]
    fn test_invalid_usernames() {
        let (_dir, mut store) = store();

        for name in ["", "../etc", "a/b", "a;b", ".hidden"] {
            assert!(matches!(
                assert_err!(store.login(name)),
                AccountError::InvalidUsername(_)
            ));
        }
        assert_ok!(validate_username("frank"));
    }
}
