//! Grid construction and guess handling for a single puzzle
//!
//! A puzzle is built from one stem, written top to bottom in the centre
//! column, and a set of leaves, each written left to right across the row of
//! the stem letter it shares. Two grids are kept: the solution, which is never
//! changed after construction, and the display grid the player sees, which
//! starts fully masked and is revealed guess by guess.

use crate::{BORDER_CELL, EMPTY_CELL, MASK_CELL, MAX_WORD_COUNT, MIN_WORD_COUNT};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Reasons a word set cannot be turned into a puzzle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("a puzzle needs between {min} and {max} words, got {got}")]
    WordCount { got: usize, min: usize, max: usize },
    #[error("word {index} is empty")]
    EmptyWord { index: usize },
    #[error("word '{0}' appears more than once")]
    DuplicateWord(String),
    #[error("leaf '{0}' has no free stem row left to connect to")]
    Unplaceable(String),
}

/// Returns true for cells that never hold a guessable letter
pub fn is_sentinel(cell: char) -> bool {
    cell == EMPTY_CELL || cell == BORDER_CELL
}

/// Fixed-size character matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Vec<char>>,
    columns: usize,
}

impl Grid {
    /// Creates a grid of empty cells whose last column is the border
    pub fn blank(rows: usize, columns: usize) -> Self {
        let mut row = vec![EMPTY_CELL; columns];
        if let Some(last) = row.last_mut() {
            *last = BORDER_CELL;
        }

        Self {
            cells: vec![row; rows],
            columns,
        }
    }

    /// Rebuilds a grid from its serialized rows.
    ///
    /// Returns `None` when there are no rows or the rows differ in width.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Option<Self> {
        let cells: Vec<Vec<char>> = rows.iter().map(|r| r.as_ref().chars().collect()).collect();
        let columns = cells.first()?.len();

        if columns == 0 || cells.iter().any(|r| r.len() != columns) {
            return None;
        }

        Some(Self { cells, columns })
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Option<char> {
        self.cells.get(row).and_then(|r| r.get(column)).copied()
    }

    fn set(&mut self, row: usize, column: usize, value: char) {
        self.cells[row][column] = value;
    }

    /// Row text with every sentinel cell removed
    pub fn row_letters(&self, row: usize) -> String {
        self.cells[row].iter().filter(|c| !is_sentinel(**c)).collect()
    }

    /// One string per row, without line terminators
    pub fn row_strings(&self) -> Vec<String> {
        self.cells.iter().map(|r| r.iter().collect()).collect()
    }
}

/// Each row on its own line, every line terminated by `\n`
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A leaf waiting to be placed
///
/// `candidates` is fixed at construction; rows claimed by earlier placements
/// are filtered out at selection time instead of being removed here.
struct Leaf {
    letters: Vec<char>,
    candidates: Vec<usize>,
}

impl Leaf {
    fn new(word: &str, stem: &[char]) -> Self {
        let letters: Vec<char> = word.chars().collect();
        let candidates = stem
            .iter()
            .enumerate()
            .filter(|(_, c)| letters.contains(c))
            .map(|(row, _)| row)
            .collect();

        Self {
            letters,
            candidates,
        }
    }

    fn free_rows(&self, claimed: &HashSet<usize>) -> Vec<usize> {
        self.candidates
            .iter()
            .copied()
            .filter(|row| !claimed.contains(row))
            .collect()
    }
}

/// Solution and display grids for one word set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    stem: String,
    display: Grid,
    solution: Grid,
}

impl Puzzle {
    /// Builds a puzzle using the thread-local random generator
    pub fn build<S: AsRef<str>>(words: &[S]) -> Result<Self, BuildError> {
        Self::build_with_rng(words, &mut rand::thread_rng())
    }

    /// Builds a puzzle from `words`, where `words[0]` is the stem.
    ///
    /// Leaves are placed one at a time, always picking the leaf with the
    /// fewest free candidate rows (earliest in the list on ties). Both the
    /// row and the connecting letter inside the leaf are chosen at random.
    pub fn build_with_rng<S: AsRef<str>, R: Rng + ?Sized>(
        words: &[S],
        rng: &mut R,
    ) -> Result<Self, BuildError> {
        let words = normalize_words(words)?;
        let stem: Vec<char> = words[0].chars().collect();
        let longest_leaf = words[1..]
            .iter()
            .map(|w| w.chars().count())
            .max()
            .unwrap_or(0);

        let rows = stem.len();
        let columns = 2 * longest_leaf + 1;
        let stem_column = (columns - 1) / 2;

        let mut solution = Grid::blank(rows, columns);
        for (row, letter) in stem.iter().enumerate() {
            solution.set(row, stem_column, *letter);
        }

        let mut pending: Vec<Leaf> = words[1..].iter().map(|w| Leaf::new(w, &stem)).collect();
        let mut claimed = HashSet::new();

        while !pending.is_empty() {
            let (index, free) = pending
                .iter()
                .enumerate()
                .map(|(i, leaf)| (i, leaf.free_rows(&claimed)))
                .min_by_key(|(_, free)| free.len())
                .ok_or_else(|| BuildError::Unplaceable(String::new()))?;

            let leaf = pending.remove(index);
            let row = match free.choose(rng) {
                Some(row) => *row,
                None => return Err(BuildError::Unplaceable(leaf.letters.iter().collect())),
            };

            let connecting = stem[row];
            let positions: Vec<usize> = leaf
                .letters
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == connecting)
                .map(|(i, _)| i)
                .collect();
            let position = match positions.choose(rng) {
                Some(position) => *position,
                None => return Err(BuildError::Unplaceable(leaf.letters.iter().collect())),
            };

            let offset = stem_column - position;
            for (i, letter) in leaf.letters.iter().enumerate() {
                solution.set(row, offset + i, *letter);
            }
            claimed.insert(row);
        }

        let display = mask(&solution);

        Ok(Self {
            stem: words[0].clone(),
            display,
            solution,
        })
    }

    /// Reassembles a puzzle from persisted grids.
    ///
    /// Returns `None` if the grids disagree in shape or the stem does not fit.
    pub fn from_grids(stem: &str, display: Grid, solution: Grid) -> Option<Self> {
        let stem = stem.trim().to_lowercase();
        if display.rows() != solution.rows()
            || display.columns() != solution.columns()
            || stem.chars().count() != solution.rows()
        {
            return None;
        }

        Some(Self {
            stem,
            display,
            solution,
        })
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn display(&self) -> &Grid {
        &self.display
    }

    pub fn solution(&self) -> &Grid {
        &self.solution
    }

    fn stem_column(&self) -> usize {
        (self.solution.columns() - 1) / 2
    }

    /// Applies a player guess to the display grid.
    ///
    /// - a single letter reveals every occurrence and succeeds only if some
    ///   cell changed
    /// - the full stem reveals the stem column and always succeeds
    /// - a full leaf reveals its row and succeeds
    ///
    /// Anything else leaves the grid untouched and fails.
    pub fn apply_guess(&mut self, input: &str) -> bool {
        let guess = input.trim().to_lowercase();
        let letters: Vec<char> = guess.chars().collect();

        match letters.as_slice() {
            [] => false,
            [letter] => self.reveal_letter(*letter),
            _ if guess == self.stem => {
                let column = self.stem_column();
                for (row, letter) in letters.iter().enumerate() {
                    self.display.set(row, column, *letter);
                }
                true
            }
            _ => match (0..self.solution.rows()).find(|row| self.solution.row_letters(*row) == guess) {
                Some(row) => {
                    self.display.cells[row] = self.solution.cells[row].clone();
                    true
                }
                None => false,
            },
        }
    }

    fn reveal_letter(&mut self, letter: char) -> bool {
        if is_sentinel(letter) || letter == MASK_CELL {
            return false;
        }

        let mut changed = false;
        for row in 0..self.solution.rows() {
            for column in 0..self.solution.columns() {
                if self.solution.cells[row][column] == letter
                    && self.display.cells[row][column] != letter
                {
                    self.display.set(row, column, letter);
                    changed = true;
                }
            }
        }
        changed
    }

    /// True once the display grid matches the solution exactly
    pub fn is_solved(&self) -> bool {
        self.display.to_string() == self.solution.to_string()
    }
}

fn normalize_words<S: AsRef<str>>(words: &[S]) -> Result<Vec<String>, BuildError> {
    if words.len() < MIN_WORD_COUNT || words.len() > MAX_WORD_COUNT {
        return Err(BuildError::WordCount {
            got: words.len(),
            min: MIN_WORD_COUNT,
            max: MAX_WORD_COUNT,
        });
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(words.len());
    for (index, word) in words.iter().enumerate() {
        let word = word.as_ref().trim().to_lowercase();
        if word.is_empty() {
            return Err(BuildError::EmptyWord { index });
        }
        if !seen.insert(word.clone()) {
            return Err(BuildError::DuplicateWord(word));
        }
        normalized.push(word);
    }
    Ok(normalized)
}

fn mask(solution: &Grid) -> Grid {
    let mut display = solution.clone();
    for row in display.cells.iter_mut() {
        for cell in row.iter_mut() {
            if !is_sentinel(*cell) {
                *cell = MASK_CELL;
            }
        }
    }
    display
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio_test::{assert_err, assert_ok};

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn cat_puzzle(seed: u64) -> Puzzle {
        assert_ok!(Puzzle::build_with_rng(&["cat", "action", "track"], &mut seeded(seed)))
    }

    #[test]
    fn test_grid_dimensions() {
        let puzzle = assert_ok!(Puzzle::build_with_rng(
            &["elephant", "leopard", "cat", "rabbit", "monkey", "dolphin"],
            &mut seeded(7),
        ));

        assert_eq!(puzzle.solution().rows(), 8);
        assert_eq!(puzzle.solution().columns(), 15);
        assert_eq!(puzzle.display().rows(), 8);
        assert_eq!(puzzle.display().columns() % 2, 1);
    }

    #[test]
    fn test_border_and_stem_column() {
        let puzzle = cat_puzzle(1);
        let solution = puzzle.solution();

        for row in 0..solution.rows() {
            assert_eq!(solution.get(row, solution.columns() - 1), Some(BORDER_CELL));
        }
        // longest leaf is "action", so the stem sits in column 6
        let stem: String = (0..3).filter_map(|row| solution.get(row, 6)).collect();
        assert_eq!(stem, "cat");
    }

    #[test]
    fn test_leaves_in_distinct_rows_aligned_on_shared_letter() {
        for seed in 0..20 {
            let puzzle = cat_puzzle(seed);
            let solution = puzzle.solution();

            let mut placed = Vec::new();
            for row in 0..solution.rows() {
                let letters = solution.row_letters(row);
                if letters.len() > 1 {
                    assert_eq!(solution.get(row, 6), "cat".chars().nth(row));
                    placed.push(letters);
                }
            }
            placed.sort();
            assert_eq!(placed, vec!["action".to_string(), "track".to_string()]);
        }
    }

    #[test]
    fn test_display_starts_masked() {
        let puzzle = cat_puzzle(3);
        let display = puzzle.display().to_string();

        assert!(!display.chars().any(|c| c.is_alphabetic()));
        assert!(display.contains(MASK_CELL));
        assert!(!puzzle.is_solved());
    }

    #[test]
    fn test_unknown_letter_changes_nothing() {
        let mut puzzle = cat_puzzle(4);
        let before = puzzle.display().clone();

        assert!(!puzzle.apply_guess("z"));
        assert_eq!(puzzle.display(), &before);
    }

    #[test]
    fn test_letter_guess_reveals_every_occurrence() {
        let mut puzzle = cat_puzzle(5);

        assert!(puzzle.apply_guess("T"));
        let solution = puzzle.solution();
        for row in 0..solution.rows() {
            for column in 0..solution.columns() {
                if solution.get(row, column) == Some('t') {
                    assert_eq!(puzzle.display().get(row, column), Some('t'));
                }
            }
        }

        // nothing left to change
        assert!(!puzzle.apply_guess("t"));
    }

    #[test]
    fn test_stem_guess_is_idempotent() {
        let mut puzzle = cat_puzzle(6);

        assert!(puzzle.apply_guess("cat"));
        let revealed = puzzle.display().clone();
        let column = 6;
        for row in 0..3 {
            assert_eq!(revealed.get(row, column), "cat".chars().nth(row));
        }
        assert!(!puzzle.is_solved());

        assert!(puzzle.apply_guess("CAT"));
        assert_eq!(puzzle.display(), &revealed);
    }

    #[test]
    fn test_leaf_guess_reveals_row_and_completion() {
        let mut puzzle = cat_puzzle(8);

        assert!(puzzle.apply_guess("action"));
        assert!(!puzzle.is_solved());
        assert!(puzzle.apply_guess("track"));
        assert!(!puzzle.is_solved());
        assert!(puzzle.apply_guess("cat"));
        assert!(puzzle.is_solved());
    }

    #[test]
    fn test_unrelated_word_fails() {
        let mut puzzle = cat_puzzle(9);
        assert!(!puzzle.apply_guess("dog"));
        assert!(!puzzle.apply_guess(""));
    }

    #[test]
    fn test_sentinels_are_not_guessable() {
        let mut puzzle = cat_puzzle(10);
        let before = puzzle.display().clone();

        assert!(!puzzle.apply_guess("."));
        assert!(!puzzle.apply_guess("+"));
        assert!(!puzzle.apply_guess("-"));
        assert_eq!(puzzle.display(), &before);
    }

    #[test]
    fn test_unplaceable_leaf_is_reported() {
        // both leaves can only use the single 'x' row
        let err = assert_err!(Puzzle::build_with_rng(&["xyz", "ax", "bx"], &mut seeded(0)));
        assert!(matches!(err, BuildError::Unplaceable(_)));

        let err = assert_err!(Puzzle::build_with_rng(&["abc", "zzz"], &mut seeded(0)));
        assert_eq!(err, BuildError::Unplaceable("zzz".to_string()));
    }

    #[test]
    fn test_word_set_validation() {
        assert!(matches!(
            Puzzle::build(&["solo"]),
            Err(BuildError::WordCount { got: 1, .. })
        ));
        assert_eq!(
            Puzzle::build(&["cat", "Cat"]),
            Err(BuildError::DuplicateWord("cat".to_string()))
        );
        assert_eq!(
            Puzzle::build(&["cat", " "]),
            Err(BuildError::EmptyWord { index: 1 })
        );
    }

    #[test]
    fn test_mixed_case_input_is_lowercased() {
        let puzzle = assert_ok!(Puzzle::build_with_rng(&["CAT", "Track"], &mut seeded(2)));
        assert_eq!(puzzle.stem(), "cat");
        assert!(puzzle.solution().to_string().contains("track"));
    }

    #[test]
    fn test_grid_from_rows() {
        let grid = Grid::from_rows(&["..a+", "bcd+"]).unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.row_letters(1), "bcd");
        assert_eq!(grid.to_string(), "..a+\nbcd+\n");

        assert!(Grid::from_rows(&["..a+", "bc+"]).is_none());
        assert!(Grid::from_rows::<&str>(&[]).is_none());
    }
}
