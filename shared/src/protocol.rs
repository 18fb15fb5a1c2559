//! Request/response formats spoken between the game server and its collaborators
//!
//! The word repository takes one datagram `<opcode>;<argument>` and answers
//! with one datagram. The account service takes one line
//! `<operation>;<username>` per connection; `save` is followed by the record
//! and an empty line, and a `load` answer is the record followed by an empty
//! line.

use thiserror::Error;

/// Empty response from the word repository meaning "no such word"
pub const NOT_FOUND: &str = "";
pub const WORD_ADDED: &str = "Word added to database";
pub const WORD_ALREADY_PRESENT: &str = "Word already in database";
pub const WORD_REMOVED: &str = "Word removed from database";
pub const WORD_MISSING: &str = "Word not found in database";
pub const INVALID_WORD: &str = "Invalid word";
pub const UNKNOWN_REQUEST: &str = "error detected";

/// Words are single tokens of letters only
pub fn is_valid_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_alphabetic)
}

/// Prefix of an account service answer to a request it refused to process
pub const ACCOUNT_ERROR_PREFIX: &str = "error;";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("request '{0}' is missing its argument")]
    MissingArgument(String),
    #[error("invalid argument '{0}'")]
    InvalidArgument(String),
}

fn split_request(line: &str) -> Result<(&str, &str), ProtocolError> {
    let (op, argument) = line
        .split_once(';')
        .ok_or_else(|| ProtocolError::MissingArgument(line.to_string()))?;
    let argument = argument.trim();
    if argument.is_empty() {
        return Err(ProtocolError::MissingArgument(line.to_string()));
    }
    Ok((op.trim(), argument))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordRequest {
    Add(String),
    Remove(String),
    Query(String),
    FetchByContainedChar(char),
    FetchByMinLength(usize),
}

impl WordRequest {
    pub fn encode(&self) -> String {
        match self {
            WordRequest::Add(word) => format!("Add;{}", word),
            WordRequest::Remove(word) => format!("Remove;{}", word),
            WordRequest::Query(word) => format!("Query;{}", word),
            WordRequest::FetchByContainedChar(c) => format!("FetchByContainedChar;{}", c),
            WordRequest::FetchByMinLength(len) => format!("FetchByMinLength;{}", len),
        }
    }

    pub fn parse(message: &str) -> Result<Self, ProtocolError> {
        let (op, argument) = split_request(message.trim_end_matches(['\r', '\n']))?;

        match op {
            "Add" => Ok(WordRequest::Add(argument.to_string())),
            "Remove" => Ok(WordRequest::Remove(argument.to_string())),
            "Query" => Ok(WordRequest::Query(argument.to_string())),
            "FetchByContainedChar" => {
                let mut chars = argument.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(WordRequest::FetchByContainedChar(c)),
                    _ => Err(ProtocolError::InvalidArgument(argument.to_string())),
                }
            }
            "FetchByMinLength" => argument
                .parse()
                .map(WordRequest::FetchByMinLength)
                .map_err(|_| ProtocolError::InvalidArgument(argument.to_string())),
            other => Err(ProtocolError::UnknownOperation(other.to_string())),
        }
    }
}

/// Answer to an account `login`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    AlreadyLoggedIn,
    Existing,
    Registered,
}

impl LoginOutcome {
    pub fn code(self) -> &'static str {
        match self {
            LoginOutcome::AlreadyLoggedIn => "0",
            LoginOutcome::Existing => "1",
            LoginOutcome::Registered => "2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(LoginOutcome::AlreadyLoggedIn),
            "1" => Some(LoginOutcome::Existing),
            "2" => Some(LoginOutcome::Registered),
            _ => None,
        }
    }
}

/// Status line for boolean account operations
pub fn status_code(ok: bool) -> &'static str {
    if ok {
        "1"
    } else {
        "0"
    }
}

pub fn parse_status(line: &str) -> Option<bool> {
    match line.trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRequest {
    Login(String),
    Logout(String),
    Load(String),
    /// The record payload travels on the lines after the request line
    Save(String),
}

impl AccountRequest {
    pub fn username(&self) -> &str {
        match self {
            AccountRequest::Login(u)
            | AccountRequest::Logout(u)
            | AccountRequest::Load(u)
            | AccountRequest::Save(u) => u,
        }
    }

    /// Request line, including its terminator
    pub fn encode(&self) -> String {
        let op = match self {
            AccountRequest::Login(_) => "login",
            AccountRequest::Logout(_) => "logout",
            AccountRequest::Load(_) => "load",
            AccountRequest::Save(_) => "save",
        };
        format!("{};{}\n", op, self.username())
    }

    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let (op, username) = split_request(line.trim_end_matches(['\r', '\n']))?;
        let username = username.to_string();

        match op {
            "login" => Ok(AccountRequest::Login(username)),
            "logout" => Ok(AccountRequest::Logout(username)),
            "load" => Ok(AccountRequest::Load(username)),
            "save" => Ok(AccountRequest::Save(username)),
            other => Err(ProtocolError::UnknownOperation(other.to_string())),
        }
    }
}
