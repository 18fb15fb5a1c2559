//! Assembles a buildable word set from the word repository
//!
//! A stem is fetched first, then one leaf per chosen stem row. A leaf that
//! cannot be fetched after a few tries abandons the stem; the whole process is
//! capped at a fixed number of stems.

use crate::collaborators::{CollaboratorError, WordRepository};
use log::{debug, warn};
use rand::seq::index;
use rand::Rng;
use shared::protocol::is_valid_word;
use shared::{BuildError, Puzzle, MAX_WORD_COUNT, MIN_WORD_COUNT};
use thiserror::Error;

/// Consecutive failed fetches for one leaf before the stem is dropped
pub const LEAF_RETRIES: usize = 5;
pub const DEFAULT_MAX_ATTEMPTS: usize = 25;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("word count must be between {min} and {max}, got {got}")]
    WordCount { got: usize, min: usize, max: usize },
    #[error("the word repository has no word of at least {0} letters")]
    NoStem(usize),
    #[error("no buildable word set found after {0} attempts")]
    Impossible(usize),
    #[error(transparent)]
    Repository(#[from] CollaboratorError),
}

/// Words in puzzle order (stem first) and the puzzle built from them
#[derive(Debug, Clone)]
pub struct WordSet {
    pub words: Vec<String>,
    pub puzzle: Puzzle,
}

pub struct WordSetGenerator<'a> {
    repository: &'a dyn WordRepository,
    max_attempts: usize,
}

impl<'a> WordSetGenerator<'a> {
    pub fn new(repository: &'a dyn WordRepository) -> Self {
        Self {
            repository,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn generate<R>(&self, count: usize, rng: &mut R) -> Result<WordSet, GenerationError>
    where
        R: Rng + Send + ?Sized,
    {
        if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&count) {
            return Err(GenerationError::WordCount {
                got: count,
                min: MIN_WORD_COUNT,
                max: MAX_WORD_COUNT,
            });
        }
        let leaf_count = count - 1;

        for attempt in 1..=self.max_attempts {
            let stem = match self.repository.fetch_by_min_length(leaf_count).await? {
                Some(stem) => stem.trim().to_lowercase(),
                None => return Err(GenerationError::NoStem(leaf_count)),
            };
            let stem_letters: Vec<char> = stem.chars().collect();
            if !is_valid_word(&stem) || stem_letters.len() < leaf_count {
                warn!("Word repository returned unusable stem '{}'", stem);
                continue;
            }

            let rows = index::sample(rng, stem_letters.len(), leaf_count).into_vec();
            let mut words = vec![stem];
            if !self.fetch_leaves(&stem_letters, &rows, &mut words).await {
                debug!("Attempt {}: abandoned stem '{}'", attempt, words[0]);
                continue;
            }

            match Puzzle::build_with_rng(words.as_slice(), rng) {
                Ok(puzzle) => {
                    debug!("Attempt {}: generated {:?}", attempt, words);
                    return Ok(WordSet { words, puzzle });
                }
                Err(BuildError::Unplaceable(leaf)) => {
                    debug!("Attempt {}: could not place '{}' in {:?}", attempt, leaf, words);
                }
                Err(e) => {
                    debug!("Attempt {}: rejected {:?}: {}", attempt, words, e);
                }
            }
        }

        Err(GenerationError::Impossible(self.max_attempts))
    }

    /// Appends one leaf per row; false once any leaf runs out of retries
    async fn fetch_leaves(&self, stem: &[char], rows: &[usize], words: &mut Vec<String>) -> bool {
        for &row in rows {
            let letter = stem[row];
            let mut failures = 0;

            loop {
                match self.repository.fetch_containing(letter).await {
                    Ok(Some(leaf)) => {
                        let leaf = leaf.trim().to_lowercase();
                        if is_valid_word(&leaf) && leaf.contains(letter) && !words.contains(&leaf) {
                            words.push(leaf);
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Leaf fetch for '{}' failed: {}", letter, e),
                }

                failures += 1;
                if failures >= LEAF_RETRIES {
                    return false;
                }
            }
        }
        true
    }
}
