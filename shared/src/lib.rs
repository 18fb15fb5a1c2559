pub mod codec;
pub mod protocol;
pub mod puzzle;

pub use codec::{decode, encode, ActiveGame, CodecError, GameState, UserData};
pub use protocol::{AccountRequest, LoginOutcome, ProtocolError, WordRequest};
pub use puzzle::{BuildError, Grid, Puzzle};

pub const MIN_WORD_COUNT: usize = 2;
pub const MAX_WORD_COUNT: usize = 15;
pub const MAX_ATTEMPTS: u32 = 15;

pub const EMPTY_CELL: char = '.';
pub const BORDER_CELL: char = '+';
pub const MASK_CELL: char = '-';

pub const GRID_DELIMITER: &str = "$";
pub const WORD_SEPARATOR: char = ',';
pub const IDLE_STATE: &str = "Idle";
pub const PLAY_STATE: &str = "Play";

/// Line that closes every server-to-client message
pub const MESSAGE_END: &str = "*End of Message*";
pub const EXIT_TOKEN: &str = "*Exit*";
pub const SAVE_TOKEN: &str = "*Save*";

/// Characters a gameplay line may not contain
pub const RESERVED_GUESS_CHARS: [char; 6] = [BORDER_CELL, MASK_CELL, EMPTY_CELL, ';', ',', '$'];

/// Attempts granted for a new game of `word_count` words
pub fn attempts_for(word_count: usize) -> u32 {
    (2 * word_count as u32).min(MAX_ATTEMPTS)
}
