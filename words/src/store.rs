//! In-memory word list backed by a plain text file
//!
//! Words are kept lowercase, one per line in the file. Every mutation
//! rewrites the file when the store has one.

use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_WORDS: &[&str] = &[
    "elephant", "leopard", "cat", "rabbit", "monkey", "dolphin", "action", "track", "garden",
    "window", "planet", "orange", "bridge", "castle", "silver", "market", "pencil", "rocket",
    "forest", "island", "butter", "candle", "dragon", "engine", "finger", "guitar", "hammer",
    "jacket", "kitten", "ladder", "mirror", "needle", "oyster", "parrot", "quartz", "ribbon",
    "saddle", "turtle", "velvet", "walrus", "yellow", "zipper", "anchor", "basket", "cactus",
];

/// Word repository contents
#[derive(Debug, Default)]
pub struct WordStore {
    words: Vec<String>,
    path: Option<PathBuf>,
}

impl WordStore {
    /// Creates a store that never touches disk
    pub fn in_memory<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::default();
        for word in words {
            store.insert(word.as_ref());
        }
        store
    }

    /// Loads whitespace-separated words from `path`.
    ///
    /// A missing file starts the store from the built-in list; the file is
    /// created on the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut store = match std::fs::read_to_string(&path) {
            Ok(content) => Self::in_memory(content.split_whitespace()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Word file {} not found, starting from the built-in list",
                    path.display()
                );
                Self::in_memory(DEFAULT_WORDS)
            }
            Err(e) => return Err(e),
        };

        info!("Loaded {} words from {}", store.len(), path.display());
        store.path = Some(path);
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn insert(&mut self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        if word.is_empty() || self.contains(&word) {
            return false;
        }
        self.words.push(word);
        true
    }

    pub fn contains(&self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        self.words.iter().any(|w| *w == word)
    }

    /// Adds a word; returns false if it was already present.
    ///
    /// The store is left unchanged if the file cannot be rewritten.
    pub fn add(&mut self, word: &str) -> io::Result<bool> {
        if !self.insert(word) {
            return Ok(false);
        }
        if let Err(e) = self.persist() {
            self.words.pop();
            return Err(e);
        }
        Ok(true)
    }

    /// Removes a word; returns false if it was not present.
    ///
    /// The store is left unchanged if the file cannot be rewritten.
    pub fn remove(&mut self, word: &str) -> io::Result<bool> {
        let word = word.trim().to_lowercase();
        let Some(index) = self.words.iter().position(|w| *w == word) else {
            return Ok(false);
        };

        let removed = self.words.remove(index);
        if let Err(e) = self.persist() {
            self.words.insert(index, removed);
            return Err(e);
        }
        Ok(true)
    }

    pub fn random_with_min_length<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Option<&str> {
        self.words
            .iter()
            .filter(|w| w.chars().count() >= length)
            .collect::<Vec<_>>()
            .choose(rng)
            .copied()
            .map(String::as_str)
    }

    pub fn random_containing<R: Rng + ?Sized>(&self, letter: char, rng: &mut R) -> Option<&str> {
        let letter = letter.to_lowercase().next().unwrap_or(letter);
        self.words
            .iter()
            .filter(|w| w.contains(letter))
            .collect::<Vec<_>>()
            .choose(rng)
            .copied()
            .map(String::as_str)
    }

    fn persist(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut content = self.words.join("\n");
        content.push('\n');
        std::fs::write(path, content)
    }
}
