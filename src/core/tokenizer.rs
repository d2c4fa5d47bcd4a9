//! Word-fragment tokenizer.
//!
//! A token is one run of non-whitespace characters plus the whitespace that
//! immediately follows it. Whitespace before the first word has nothing to
//! attach to and becomes a token of its own, so rejoining the tokens always
//! reproduces the input byte for byte.

pub type Token = String;

pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev_whitespace = false;

    for (index, ch) in text.char_indices() {
        let whitespace = ch.is_whitespace();
        if !whitespace && prev_whitespace {
            tokens.push(text[start..index].to_owned());
            start = index;
        }
        prev_whitespace = whitespace;
    }

    if start < text.len() {
        tokens.push(text[start..].to_owned());
    }

    tokens
}

pub fn detokenize<S: AsRef<str>>(tokens: &[S]) -> String {
    let capacity = tokens.iter().map(|token| token.as_ref().len()).sum();
    let mut text = String::with_capacity(capacity);
    for token in tokens {
        text.push_str(token.as_ref());
    }
    text
}
