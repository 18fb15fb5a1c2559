//! Per-connection state machine
//!
//! ```text
//! LoggingIn ──login+load──▶ Menu ◀──save/win/lose──▶ Playing
//!                            │                          │
//!                            └────────── *Exit* ────────┴──▶ Closed
//! ```
//!
//! Every prompt that expects a reply is closed by [`MESSAGE_END`]; status
//! lines in between are sent as they happen. Recoverable errors are shown to
//! the client, followed by a best-effort save, and the session stays in the
//! state it was in.

use crate::collaborators::{AccountService, WordRepository};
use crate::error::SessionError;
use crate::generator::{WordSetGenerator, DEFAULT_MAX_ATTEMPTS};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::protocol::is_valid_word;
use shared::{
    attempts_for, decode, encode, ActiveGame, GameState, LoginOutcome, UserData, EXIT_TOKEN,
    MAX_WORD_COUNT, MESSAGE_END, MIN_WORD_COUNT, RESERVED_GUESS_CHARS, SAVE_TOKEN,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const WELCOME: &str = "Welcome to the crossword puzzle game. Please enter your username.";

pub const USER_MENU: &str = "\nEnter a command (case sensitive):\n\
    Add;WordName              Add a word to the word repository\n\
    Remove;WordName           Remove a word from the word repository\n\
    New Game;x                Start a new game with x words\n\
    Continue                  Continue the saved game\n\
    *Exit*                    Log out and quit";

pub const GAME_MENU: &str = "\nEnter a guess or command (case sensitive):\n\
    Letter                    Guess a letter\n\
    WordName                  Guess a word\n\
    ?WordName                 Check whether a word is in the word repository\n\
    *Save*                    Save and return to the main menu\n\
    *Exit*                    Save, log out and quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggingIn,
    Menu,
    Playing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    Add(String),
    Remove(String),
    NewGame(usize),
    Continue,
    Exit,
}

pub fn parse_menu_command(input: &str) -> Result<MenuCommand, SessionError> {
    let input = input.trim();
    if input == EXIT_TOKEN {
        return Ok(MenuCommand::Exit);
    }
    if input == "Continue" {
        return Ok(MenuCommand::Continue);
    }

    let (command, argument) = input
        .split_once(';')
        .ok_or_else(|| SessionError::InvalidCommand(input.to_string()))?;
    let argument = argument.trim();

    match command {
        "Add" | "Remove" => {
            if !is_valid_word(argument) {
                return Err(SessionError::InvalidWord(argument.to_string()));
            }
            if command == "Add" {
                Ok(MenuCommand::Add(argument.to_string()))
            } else {
                Ok(MenuCommand::Remove(argument.to_string()))
            }
        }
        "New Game" => {
            let count: usize = argument
                .parse()
                .map_err(|_| SessionError::InvalidWordCount(argument.to_string()))?;
            if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&count) {
                return Err(SessionError::WordCountOutOfRange {
                    got: count,
                    min: MIN_WORD_COUNT,
                    max: MAX_WORD_COUNT,
                });
            }
            Ok(MenuCommand::NewGame(count))
        }
        "Continue" => Ok(MenuCommand::Continue),
        _ => Err(SessionError::InvalidCommand(input.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameInput {
    Save,
    Exit,
    Query(String),
    Guess(String),
}

pub fn parse_game_input(input: &str) -> Result<GameInput, SessionError> {
    let input = input.trim();
    if input == SAVE_TOKEN {
        return Ok(GameInput::Save);
    }
    if input == EXIT_TOKEN {
        return Ok(GameInput::Exit);
    }
    if input.is_empty() || input.contains(&RESERVED_GUESS_CHARS[..]) {
        return Err(SessionError::InvalidGuess(input.to_string()));
    }

    match input.strip_prefix('?') {
        Some(word) if is_valid_word(word.trim()) => Ok(GameInput::Query(word.trim().to_string())),
        Some(_) => Err(SessionError::InvalidGuess(input.to_string())),
        None => Ok(GameInput::Guess(input.to_string())),
    }
}

/// One client connection, from the username prompt to logout
pub struct Session<R, W> {
    reader: R,
    writer: W,
    words: Arc<dyn WordRepository>,
    accounts: Arc<dyn AccountService>,
    rng: StdRng,
    max_generation_attempts: usize,
    state: SessionState,
    /// Set once the account service has accepted the login
    logged_in: Option<String>,
    user: Option<UserData>,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(
        reader: R,
        writer: W,
        words: Arc<dyn WordRepository>,
        accounts: Arc<dyn AccountService>,
    ) -> Self {
        Self {
            reader,
            writer,
            words,
            accounts,
            rng: StdRng::from_entropy(),
            max_generation_attempts: DEFAULT_MAX_ATTEMPTS,
            state: SessionState::LoggingIn,
            logged_in: None,
            user: None,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_max_generation_attempts(mut self, max_attempts: usize) -> Self {
        self.max_generation_attempts = max_attempts;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user(&self) -> Option<&UserData> {
        self.user.as_ref()
    }

    /// Drives the session until the client exits or its transport fails.
    ///
    /// Other fatal errors are sent to the client as a last message. Either
    /// way a logged-in user is saved and logged out.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let result = self.drive().await;

        if let Err(e) = &result {
            warn!("Session ended abnormally: {}", e);
            if !matches!(e, SessionError::ClientDisconnected | SessionError::ClientIo(_)) {
                if let Err(write) = self.finish(&format!("Error: {}", e)).await {
                    debug!("Could not report {} to the client: {}", e, write);
                }
            }
            self.abandon().await;
        }
        self.state = SessionState::Closed;
        result
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        loop {
            let step = match self.state {
                SessionState::LoggingIn => self.login().await,
                SessionState::Menu => self.menu().await,
                SessionState::Playing => self.play_turn().await,
                SessionState::Closed => return Ok(()),
            };

            match step {
                Ok(next) => {
                    if next != self.state {
                        debug!("{:?} -> {:?}", self.state, next);
                    }
                    self.state = next;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => self.recover(e).await?,
            }
        }
    }

    async fn recover(&mut self, error: SessionError) -> Result<(), SessionError> {
        debug!("Recoverable session error: {}", error);
        self.say(&format!("Error: {}", error)).await?;

        if !matches!(error, SessionError::Persistence(_)) {
            self.persist_or_report().await?;
        }
        Ok(())
    }

    async fn login(&mut self) -> Result<SessionState, SessionError> {
        let input = self.prompt(WELCOME).await?;
        let username = input.trim().to_string();

        if username == EXIT_TOKEN {
            self.finish("Goodbye.").await?;
            return Ok(SessionState::Closed);
        }
        if username.is_empty() {
            self.say("Error: Username cannot be empty.\nTry again.").await?;
            return Ok(SessionState::LoggingIn);
        }

        match self.accounts.login(&username).await {
            Ok(LoginOutcome::AlreadyLoggedIn) => {
                self.say("Error: User already logged in.\nTry again.").await?;
                return Ok(SessionState::LoggingIn);
            }
            Ok(LoginOutcome::Existing) => {
                self.say(&format!("Logging in as: {}", username)).await?;
            }
            Ok(LoginOutcome::Registered) => {
                self.say(&format!("Creating new account: {}", username)).await?;
            }
            Err(e) => {
                warn!("Login for {} failed: {}", username, e);
                self.say(&format!("Error: Could not log in: {}\nTry again.", e))
                    .await?;
                return Ok(SessionState::LoggingIn);
            }
        }

        info!("{} logged in", username);
        self.logged_in = Some(username.clone());

        let record = self
            .accounts
            .load(&username)
            .await
            .map_err(|e| SessionError::LoadFailed(e.to_string()))?;
        let user = decode(&record).map_err(|e| SessionError::LoadFailed(e.to_string()))?;
        if user.username != username {
            return Err(SessionError::LoadFailed(format!(
                "record belongs to '{}'",
                user.username
            )));
        }

        self.user = Some(user);
        Ok(SessionState::Menu)
    }

    async fn menu(&mut self) -> Result<SessionState, SessionError> {
        let input = self.prompt(USER_MENU).await?;

        match parse_menu_command(&input)? {
            MenuCommand::Exit => {
                self.close().await?;
                Ok(SessionState::Closed)
            }
            MenuCommand::Add(word) => {
                let status = self.words.add(&word).await?;
                self.say(&status).await?;
                Ok(SessionState::Menu)
            }
            MenuCommand::Remove(word) => {
                let status = self.words.remove(&word).await?;
                self.say(&status).await?;
                Ok(SessionState::Menu)
            }
            MenuCommand::NewGame(count) => {
                self.new_game(count).await?;
                Ok(SessionState::Playing)
            }
            MenuCommand::Continue => {
                if self.user_mut()?.game.is_playing() {
                    Ok(SessionState::Playing)
                } else {
                    Err(SessionError::NoExistingGame)
                }
            }
        }
    }

    async fn new_game(&mut self, count: usize) -> Result<(), SessionError> {
        let set = WordSetGenerator::new(self.words.as_ref())
            .with_max_attempts(self.max_generation_attempts)
            .generate(count, &mut self.rng)
            .await?;
        debug!("New game with {:?}", set.words);

        let attempts = attempts_for(set.words.len());
        self.user_mut()?.game = GameState::Play(ActiveGame::new(attempts, set.words, set.puzzle));
        self.persist_or_report().await
    }

    async fn play_turn(&mut self) -> Result<SessionState, SessionError> {
        let screen = match &self.user_mut()?.game {
            GameState::Play(game) => format!(
                "\n{}{}\nAttempts remaining: {}",
                game.puzzle.display(),
                GAME_MENU,
                game.attempts
            ),
            GameState::Idle => return Ok(SessionState::Menu),
        };
        let input = self.prompt(&screen).await?;

        match parse_game_input(&input)? {
            GameInput::Save => {
                self.persist_or_report().await?;
                Ok(SessionState::Menu)
            }
            GameInput::Exit => {
                self.close().await?;
                Ok(SessionState::Closed)
            }
            GameInput::Query(word) => {
                let found = self.words.exists(&word).await?;
                let verdict = if found { "is" } else { "is not" };
                self.say(&format!("'{}' {} in the word repository.", word, verdict))
                    .await?;
                Ok(SessionState::Playing)
            }
            GameInput::Guess(guess) => self.guess(&guess).await,
        }
    }

    async fn guess(&mut self, guess: &str) -> Result<SessionState, SessionError> {
        let (hit, solved, attempts) = {
            let game = match &mut self.user_mut()?.game {
                GameState::Play(game) => game,
                GameState::Idle => return Err(SessionError::NoExistingGame),
            };
            let hit = game.puzzle.apply_guess(guess);
            let solved = hit && game.puzzle.is_solved();
            if !solved {
                game.attempts = game.attempts.saturating_sub(1);
            }
            (hit, solved, game.attempts)
        };

        if hit {
            self.say(&format!("\n*Successful guess: '{}'. Puzzle updated.", guess))
                .await?;
        } else {
            self.say(&format!("\n*Unsuccessful guess: '{}'.", guess))
                .await?;
        }

        if solved {
            let user = self.user_mut()?;
            user.score += 1;
            user.game = GameState::Idle;
            info!("{} solved a puzzle (score {})", user.username, user.score);
            self.say("You win!").await?;
        } else if attempts == 0 {
            // Out of attempts ends the game even after a hit that did not solve it
            self.user_mut()?.game = GameState::Idle;
            self.say("You lose!").await?;
        } else {
            return Ok(SessionState::Playing);
        }

        self.persist_or_report().await?;
        Ok(SessionState::Menu)
    }

    /// Logs out and saves on the exit token
    async fn close(&mut self) -> Result<(), SessionError> {
        let Some(username) = self.logged_in.take() else {
            return self.finish("Goodbye.").await;
        };

        let logged_out = match self.accounts.logout(&username).await {
            Ok(logged_out) => logged_out,
            Err(e) => {
                warn!("Logout for {} failed: {}", username, e);
                false
            }
        };
        self.persist_or_report().await?;

        info!("{} logged out", username);
        if logged_out {
            self.finish(&format!("Logging out: {}", username)).await
        } else {
            self.finish(&format!("Failed to log out user: {}", username))
                .await
        }
    }

    /// Cleanup after a fatal error; nothing can be reported to the client
    async fn abandon(&mut self) {
        let Some(username) = self.logged_in.take() else {
            return;
        };

        if let Err(e) = self.persist().await {
            warn!("Could not save {} after disconnect: {}", username, e);
        }
        if let Err(e) = self.accounts.logout(&username).await {
            warn!("Could not log out {} after disconnect: {}", username, e);
        }
        info!("{} disconnected", username);
    }

    async fn persist(&mut self) -> Result<(), SessionError> {
        let Some(user) = &self.user else {
            return Ok(());
        };

        match self.accounts.save(&user.username, &encode(user)).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(SessionError::Persistence(
                "the account service refused the record".to_string(),
            )),
            Err(e) => Err(SessionError::Persistence(e.to_string())),
        }
    }

    /// Saves, reporting a failure to the client without leaving the current state
    async fn persist_or_report(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.persist().await {
            warn!("Persistence failure: {}", e);
            self.say(&format!("Error: {}", e)).await?;
        }
        Ok(())
    }

    fn user_mut(&mut self) -> Result<&mut UserData, SessionError> {
        self.user.as_mut().ok_or(SessionError::NotLoggedIn)
    }

    async fn say(&mut self, text: &str) -> Result<(), SessionError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Last message of the session
    async fn finish(&mut self, text: &str) -> Result<(), SessionError> {
        self.say(&format!("{}\n{}", text, MESSAGE_END)).await
    }

    async fn prompt(&mut self, text: &str) -> Result<String, SessionError> {
        self.say(&format!("{}\n{}", text, MESSAGE_END)).await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(SessionError::ClientDisconnected);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
