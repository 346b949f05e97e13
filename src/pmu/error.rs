//! Error types for PMU parsing
//!
//! Two layers can reject a document:
//!
//! - [`SyntaxError`]: the token stream does not fit the grammar (unexpected token, missing
//!   footer, unterminated info region, integer literal out of range).
//! - [`SemanticError`]: the tree parsed but violates a domain rule (wrong number of
//!   integers on a line, mismatched channel pair, missing or duplicated section).
//!
//! Both are terminal. [`ParseError`] unifies them for the public entry points and
//! [`LoadError`] adds I/O failures for the loader adapters.

use std::fmt;
use std::io;
use std::ops::Range;
use std::path::PathBuf;

use crate::pmu::location::{excerpt, Position, SourceLocation};
use crate::pmu::model::Channel;
use crate::pmu::parsing::FooterKind;

/// The token stream does not match the grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Where the offending token starts
    pub position: Position,
    /// Byte range of the offending token; empty at end of input
    pub span: Range<usize>,
    /// The offending token text, `None` at end of input
    pub found: Option<String>,
    /// Shapes that would have been accepted here
    pub expected: Vec<String>,
    /// The grammar rule being parsed, when known
    pub label: Option<&'static str>,
    /// The source line holding the offending token, windowed when long
    pub line_text: String,
}

impl SyntaxError {
    pub fn new(
        source: &str,
        span: Range<usize>,
        found: Option<String>,
        expected: Vec<String>,
        label: Option<&'static str>,
    ) -> Self {
        let location = SourceLocation::new(source);
        let position = location.byte_to_position(span.start);
        Self {
            position,
            line_text: excerpt(location.line_text(position.line), position.column),
            span,
            found,
            expected,
            label,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error at {}", self.position)?;
        if let Some(label) = self.label {
            write!(f, " in {}", label)?;
        }
        let found = match &self.found {
            Some(text) => format!("`{}`", text),
            None => "end of input".to_string(),
        };
        match self.expected.as_slice() {
            [] => write!(f, ": unexpected {}", found)?,
            [only] => write!(f, ": expected {}, found {}", only, found)?,
            [init @ .., last] => write!(
                f,
                ": expected {} or {}, found {}",
                init.join(", "),
                last,
                found
            )?,
        }
        if !self.line_text.is_empty() {
            write!(f, "\n  | {}", self.line_text)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

/// What domain rule a [`SemanticError`] violates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// A `Freq Per` line followed by a stats line of a different channel
    ChannelMismatch { expected: Channel, found: Channel },
    /// A channel line without its partner line
    UnpairedChannelLine { section: FooterKind },
    /// The same footer line appears twice
    DuplicateSection { section: FooterKind },
    /// A required footer line is absent
    MissingSection { section: FooterKind },
    /// A footer line carries the wrong number of integers
    ArityMismatch {
        section: FooterKind,
        expected: usize,
        found: usize,
    },
    /// The data line holds fewer values than the parameter count
    MissingParams { expected: usize, found: usize },
    /// A trigger marker appears before all parameters were read
    ParamsInterrupted { expected: usize, found: usize },
    /// The requested parameter count cannot carry a sampling rate
    UnsupportedParamCount { count: usize },
    /// A clock tick outside one day
    ClockOutOfRange { section: FooterKind, value: i64 },
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticErrorKind::ChannelMismatch { expected, found } => write!(
                f,
                "expected `{} Min Max Avg StdDiff` after `{} Freq Per`, found a {} line",
                expected, expected, found
            ),
            SemanticErrorKind::UnpairedChannelLine { section } => {
                write!(f, "`{}` is not paired with its partner line", section)
            }
            SemanticErrorKind::DuplicateSection { section } => {
                write!(f, "`{}` appears more than once", section)
            }
            SemanticErrorKind::MissingSection { section } => {
                write!(f, "missing required line `{}`", section)
            }
            SemanticErrorKind::ArityMismatch {
                section,
                expected,
                found,
            } => write!(
                f,
                "`{}` expects {} integer(s), found {}",
                section, expected, found
            ),
            SemanticErrorKind::MissingParams { expected, found } => write!(
                f,
                "expected {} parameters on the data line, found {} values",
                expected, found
            ),
            SemanticErrorKind::ParamsInterrupted { expected, found } => write!(
                f,
                "trigger marker after {} of {} parameters",
                found, expected
            ),
            SemanticErrorKind::UnsupportedParamCount { count } => write!(
                f,
                "unsupported parameter count {} (the sampling rate is parameter 3)",
                count
            ),
            SemanticErrorKind::ClockOutOfRange { section, value } => write!(
                f,
                "`{}` value {} is not a time of day in milliseconds",
                section, value
            ),
        }
    }
}

/// The document parsed but breaks a domain rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    /// One-based line of the offending content
    pub line: usize,
    /// The offending source line(s)
    pub text: String,
}

impl SemanticError {
    /// Build an error pointing at the lines covered by `span`.
    pub fn at(
        kind: SemanticErrorKind,
        location: &SourceLocation<'_>,
        span: &Range<usize>,
    ) -> Self {
        Self {
            kind,
            line: location.byte_to_position(span.start).line + 1,
            text: location.lines_of(span),
        }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "semantic error at line {}: {}", self.line, self.kind)?;
        for line in self.text.lines() {
            write!(f, "\n  | {}", line)?;
        }
        Ok(())
    }
}

impl std::error::Error for SemanticError {}

/// Any failure of the core parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Syntax(SyntaxError),
    Semantic(SemanticError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax(err) => write!(f, "{}", err),
            ParseError::Semantic(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Syntax(err) => Some(err),
            ParseError::Semantic(err) => Some(err),
        }
    }
}

impl From<SyntaxError> for ParseError {
    fn from(err: SyntaxError) -> Self {
        ParseError::Syntax(err)
    }
}

impl From<SemanticError> for ParseError {
    fn from(err: SemanticError) -> Self {
        ParseError::Semantic(err)
    }
}

/// Failure of the reader and path adapters
#[derive(Debug)]
pub enum LoadError {
    /// Reading the input failed
    Io {
        path: Option<PathBuf>,
        source: io::Error,
    },
    /// The input was read but did not parse
    Parse {
        path: Option<PathBuf>,
        source: ParseError,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io {
                path: Some(path),
                source,
            } => write!(f, "failed to read {}: {}", path.display(), source),
            LoadError::Io { path: None, source } => write!(f, "failed to read input: {}", source),
            LoadError::Parse {
                path: Some(path),
                source,
            } => write!(f, "{}: {}", path.display(), source),
            LoadError::Parse { path: None, source } => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Parse { source, .. } => Some(source),
        }
    }
}
