//! Word-wheel buffer.
//!
//! `display` is what the reader sees, `target` is what it is turning into.
//! Every step copies a window of target tokens over the display starting at a
//! rotating cursor, so a new target fades in a few words at a time.

use super::tokenizer::{detokenize, tokenize, Token};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordWheel {
    display: Vec<Token>,
    target: Vec<Token>,
    cursor: usize,
}

impl WordWheel {
    pub fn new(seed: &str) -> Self {
        let mut wheel = Self::default();
        wheel.reset(seed);
        wheel
    }

    /// Re-seeds both sequences and rewinds the cursor.
    pub fn reset(&mut self, seed: &str) {
        self.display = tokenize(seed);
        self.target = self.display.clone();
        self.cursor = 0;
    }

    /// Replaces the target without touching already displayed tokens.
    ///
    /// Both sequences are padded to a common length and the cursor is wrapped
    /// back into range if the length shrank.
    pub fn set_target(&mut self, tokens: Vec<Token>) {
        self.target = tokens;
        self.pad_to_common_len();
    }

    /// Overwrites `words` display slots with their target tokens and advances
    /// the cursor. A count of zero behaves like one.
    pub fn step(&mut self, words: usize) -> String {
        let max_len = self.pad_to_common_len();
        if max_len == 0 {
            return String::new();
        }

        let words = words.max(1);
        // Past one full lap every slot already holds its target token.
        for offset in 0..words.min(max_len) {
            let index = (self.cursor + offset) % max_len;
            self.display[index].clone_from(&self.target[index]);
        }
        self.cursor = (self.cursor + words % max_len) % max_len;

        self.display_text()
    }

    pub fn display_text(&self) -> String {
        detokenize(&self.display)
    }

    pub fn target_text(&self) -> String {
        detokenize(&self.target)
    }

    pub fn display(&self) -> &[Token] {
        &self.display
    }

    pub fn target(&self) -> &[Token] {
        &self.target
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.display.len().max(self.target.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_converged(&self) -> bool {
        self.display == self.target
    }

    fn pad_to_common_len(&mut self) -> usize {
        let max_len = self.len();
        self.display.resize(max_len, Token::new());
        self.target.resize(max_len, Token::new());
        self.cursor = if max_len == 0 { 0 } else { self.cursor % max_len };
        max_len
    }
}
