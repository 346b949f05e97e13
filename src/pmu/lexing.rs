//! Tokenization of PMU logs
//!
//!     This is the entry point where source strings become token streams, using the logos
//!     lexer library. The token set is deliberately small:
//!
//!     - `Int`: an unsigned decimal literal. Samples, parameters and markers are all ints;
//!       telling them apart is the grammar's job, since the marker values are configurable.
//!     - `Colon`: terminates every footer label (`ECG Freq Per:`).
//!     - `Word`: any other run of non-space characters. Footer labels and the text inside
//!       info regions.
//!
//!     Whitespace, newlines included, is skipped. Every token keeps its byte range, which
//!     is how the raw text of an info region is recovered verbatim later on.

use logos::Logos;
use std::fmt;
use std::ops::Range;

use crate::pmu::error::SyntaxError;

/// Token paired with its byte range in the source
pub type TokenSpan = (Token, Range<usize>);

/// All possible tokens in a PMU log
#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"\s+")]
pub enum Token {
    // Literals too large for i64 fail to lex
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[token(":")]
    Colon,

    #[regex(r"[^\s:0-9][^\s:]*", |lex| lex.slice().to_string())]
    Word(String),
}

impl Token {
    /// Check if this token is the given word
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Word(w) if w == word)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(value) => write!(f, "{}", value),
            Token::Colon => write!(f, ":"),
            Token::Word(word) => write!(f, "{}", word),
        }
    }
}

/// Tokenize source text with location information
///
/// Unlike a best-effort lexer this stops at the first slice logos cannot match; the only
/// way to get there is an integer literal that overflows `i64`.
pub fn tokenize(source: &str) -> Result<Vec<TokenSpan>, SyntaxError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(SyntaxError::new(
                    source,
                    lexer.span(),
                    Some(lexer.slice().to_string()),
                    vec!["an integer that fits in 64 bits".to_string()],
                    Some("integer literal"),
                ))
            }
        }
    }

    log::trace!("tokenized {} bytes into {} tokens", source.len(), tokens.len());
    Ok(tokens)
}
