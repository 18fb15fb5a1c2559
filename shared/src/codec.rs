//! Line-oriented text format for persisted and transported user state
//!
//! ```text
//! Username;<name>
//! Score;<int>
//! State;<Idle|Play>
//! Attempts;<int>            (Play only)
//! Words;<w1,w2,...>         (Play only)
//! <display grid rows>       (Play only)
//! $
//! <solution grid rows>
//! ```

use crate::puzzle::{Grid, Puzzle};
use crate::{GRID_DELIMITER, IDLE_STATE, PLAY_STATE, WORD_SEPARATOR};
use std::str::Lines;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("End of input reached prematurely (expected {0}).")]
    PrematureEof(&'static str),
    #[error("Failed to parse value in line '{0}'.")]
    ValueParse(String),
    #[error("Expected key '{expected}', found '{found}'.")]
    UnexpectedKey { expected: &'static str, found: String },
    #[error("Parsed value '{0}' is not an integer.")]
    NonInteger(String),
    #[error("Unknown game state '{0}'.")]
    UnknownState(String),
    #[error("Malformed {0} grid.")]
    MalformedGrid(&'static str),
}

/// A game in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGame {
    pub attempts: u32,
    pub words: Vec<String>,
    pub puzzle: Puzzle,
}

impl ActiveGame {
    pub fn new(attempts: u32, words: Vec<String>, puzzle: Puzzle) -> Self {
        Self {
            attempts,
            words,
            puzzle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Idle,
    Play(ActiveGame),
}

impl GameState {
    pub fn tag(&self) -> &'static str {
        match self {
            GameState::Idle => IDLE_STATE,
            GameState::Play(_) => PLAY_STATE,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, GameState::Play(_))
    }
}

/// Everything persisted for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub username: String,
    pub score: u32,
    pub game: GameState,
}

impl UserData {
    /// Fresh record for a newly registered user
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            score: 0,
            game: GameState::Idle,
        }
    }
}

pub fn encode(user: &UserData) -> String {
    let mut out = String::new();
    out.push_str(&format!("Username;{}\n", user.username));
    out.push_str(&format!("Score;{}\n", user.score));
    out.push_str(&format!("State;{}\n", user.game.tag()));

    if let GameState::Play(game) = &user.game {
        out.push_str(&format!("Attempts;{}\n", game.attempts));
        out.push_str(&format!(
            "Words;{}\n",
            game.words.join(&WORD_SEPARATOR.to_string())
        ));
        out.push_str(&game.puzzle.display().to_string());
        out.push_str(GRID_DELIMITER);
        out.push('\n');
        out.push_str(&game.puzzle.solution().to_string());
    }

    out
}

pub fn decode(data: &str) -> Result<UserData, CodecError> {
    let mut lines = data.lines();

    let username = parse_value(&mut lines, "Username")?;
    let score = parse_int(&mut lines, "Score")?;
    let state = parse_value(&mut lines, "State")?;

    let game = match state.as_str() {
        IDLE_STATE => GameState::Idle,
        PLAY_STATE => GameState::Play(parse_game(&mut lines)?),
        _ => return Err(CodecError::UnknownState(state)),
    };

    Ok(UserData {
        username,
        score,
        game,
    })
}

fn parse_game(lines: &mut Lines<'_>) -> Result<ActiveGame, CodecError> {
    let attempts = parse_int(lines, "Attempts")?;
    let words: Vec<String> = parse_value(lines, "Words")?
        .split(WORD_SEPARATOR)
        .map(|w| w.trim().to_string())
        .collect();
    if words.iter().any(|w| w.is_empty()) {
        return Err(CodecError::ValueParse(words.join(&WORD_SEPARATOR.to_string())));
    }

    let display_rows = parse_grid_rows(lines, true);
    if display_rows.is_empty() {
        return Err(CodecError::PrematureEof("display grid"));
    }
    let solution_rows = parse_grid_rows(lines, false);
    if solution_rows.is_empty() {
        return Err(CodecError::PrematureEof("solution grid"));
    }

    let display = Grid::from_rows(&display_rows).ok_or(CodecError::MalformedGrid("display"))?;
    let solution = Grid::from_rows(&solution_rows).ok_or(CodecError::MalformedGrid("solution"))?;
    let puzzle = Puzzle::from_grids(&words[0], display, solution)
        .ok_or(CodecError::MalformedGrid("solution"))?;

    Ok(ActiveGame {
        attempts,
        words,
        puzzle,
    })
}

/// Reads rows until the grid delimiter (when `stop_on_delimiter`) or the end of input
fn parse_grid_rows<'a>(lines: &mut Lines<'a>, stop_on_delimiter: bool) -> Vec<&'a str> {
    let mut rows = Vec::new();
    for line in lines.by_ref() {
        if stop_on_delimiter && line == GRID_DELIMITER {
            break;
        }
        if line.is_empty() {
            continue;
        }
        rows.push(line);
    }
    rows
}

fn parse_value(lines: &mut Lines<'_>, key: &'static str) -> Result<String, CodecError> {
    let line = lines.next().ok_or(CodecError::PrematureEof(key))?;
    let (found, value) = line
        .split_once(';')
        .ok_or_else(|| CodecError::ValueParse(line.to_string()))?;

    if found != key {
        return Err(CodecError::UnexpectedKey {
            expected: key,
            found: found.to_string(),
        });
    }
    if value.is_empty() || value.contains(';') {
        return Err(CodecError::ValueParse(line.to_string()));
    }

    Ok(value.to_string())
}

fn parse_int(lines: &mut Lines<'_>, key: &'static str) -> Result<u32, CodecError> {
    let value = parse_value(lines, key)?;
    value
        .trim()
        .parse()
        .map_err(|_| CodecError::NonInteger(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio_test::{assert_err, assert_ok};

    fn playing_user(words: &[&str], seed: u64) -> UserData {
        let puzzle = assert_ok!(Puzzle::build_with_rng(words, &mut StdRng::seed_from_u64(seed)));
        UserData {
            username: "alice".to_string(),
            score: 3,
            game: GameState::Play(ActiveGame::new(
                (words.len() * 2).min(15) as u32,
                words.iter().map(|w| w.to_string()).collect(),
                puzzle,
            )),
        }
    }

    #[test]
    fn test_idle_user_roundtrip() {
        let user = UserData::new("bob");
        let encoded = encode(&user);

        assert_eq!(encoded, "Username;bob\nScore;0\nState;Idle\n");
        assert_eq!(assert_ok!(decode(&encoded)), user);
    }

    #[test]
    fn test_fresh_two_word_game_roundtrip() {
        let user = playing_user(&["cat", "track"], 11);
        let decoded = assert_ok!(decode(&encode(&user)));

        assert_eq!(decoded, user);
        match decoded.game {
            GameState::Play(game) => {
                assert_eq!(game.attempts, 4);
                assert_eq!(game.words, vec!["cat", "track"]);
            }
            GameState::Idle => panic!("expected a game in progress"),
        }
    }

    #[test]
    fn test_partially_revealed_game_roundtrip() {
        let mut user = playing_user(&["elephant", "leopard", "cat", "monkey", "dolphin"], 5);
        if let GameState::Play(game) = &mut user.game {
            game.puzzle.apply_guess("e");
            game.puzzle.apply_guess("cat");
            game.attempts -= 2;
        }

        let encoded = encode(&user);
        let decoded = assert_ok!(decode(&encoded));
        assert_eq!(decoded, user);
        assert_eq!(encode(&decoded), encoded);
    }

    #[test]
    fn test_encoded_layout() {
        let user = playing_user(&["cat", "track"], 1);
        let encoded = encode(&user);
        let lines: Vec<&str> = encoded.lines().collect();

        assert_eq!(lines[2], "State;Play");
        assert_eq!(lines[3], "Attempts;4");
        assert_eq!(lines[4], "Words;cat,track");
        assert_eq!(lines[8], "$");
        assert_eq!(lines.len(), 12);
        assert!(!encoded.contains("\n\n"));
    }

    #[test]
    fn test_missing_lines_are_rejected() {
        assert_eq!(
            assert_err!(decode("Username;bob\n")),
            CodecError::PrematureEof("Score")
        );
        assert_eq!(
            assert_err!(decode("Username;bob\nScore;1\nState;Play\nAttempts;3\nWords;cat,at\n")),
            CodecError::PrematureEof("display grid")
        );
        assert_eq!(
            assert_err!(decode("Username;bob\nScore;1\nState;Play\nAttempts;3\nWords;cat,at\n---+\n$\n")),
            CodecError::PrematureEof("solution grid")
        );
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(matches!(
            decode("Username bob\nScore;0\nState;Idle\n"),
            Err(CodecError::ValueParse(_))
        ));
        assert!(matches!(
            decode("Username;\nScore;0\nState;Idle\n"),
            Err(CodecError::ValueParse(_))
        ));
        assert!(matches!(
            decode("Name;bob\nScore;0\nState;Idle\n"),
            Err(CodecError::UnexpectedKey { expected: "Username", .. })
        ));
        assert_eq!(
            assert_err!(decode("Username;bob\nScore;lots\nState;Idle\n")),
            CodecError::NonInteger("lots".to_string())
        );
        assert_eq!(
            assert_err!(decode("Username;bob\nScore;0\nState;Paused\n")),
            CodecError::UnknownState("Paused".to_string())
        );
    }

    #[test]
    fn test_inconsistent_grids_are_rejected() {
        let data = "Username;bob\nScore;0\nState;Play\nAttempts;2\nWords;cat,at\n\
                    ...-+\n...-+\n...-+\n$\n..c+\n.at+\n..t+\n";
        assert!(matches!(decode(data), Err(CodecError::MalformedGrid(_))));
    }
}
