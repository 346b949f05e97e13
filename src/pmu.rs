//! Siemens PMU physiological log parsing
//!
//! A PMU log is one long data line followed by a footer:
//!
//!     1 8 20 2 5002 LOGVERSION 102 6002 367 508 5000 520 ... 5003
//!     ECG  Freq Per: 0 0
//!     ECG  Min Max Avg StdDiff: 0 0 0 0
//!     PULS Freq Per: 72 823
//!     ...
//!     LogStopMPCUTime:  39804637
//!     6003
//!
//! Parsing runs in three stages:
//!
//! 1. [`lexing`] turns the text into `(Token, byte range)` pairs.
//! 2. [`parsing`] matches them against the grammar and yields a [`ParseTree`](parsing::ParseTree).
//! 3. [`building`] checks the tree against the domain rules and produces a [`PhysioLog`].
//!
//! The core never touches the file system; [`loader`] wraps it for strings, readers and
//! paths, and [`config`] turns a layered TOML configuration into [`ParseOptions`].

pub mod building;
pub mod config;
pub mod error;
pub mod lexing;
pub mod loader;
pub mod location;
pub mod markers;
pub mod model;
pub mod parsing;

pub use building::ParseOptions;
pub use error::{LoadError, ParseError, SemanticError, SemanticErrorKind, SyntaxError};
pub use markers::{FormatVariant, Markers, TriggerKind};
pub use model::{
    Channel, Clock, Edge, LogTime, MeasurementSummary, NrSummary, PhysioLog, Trigger,
};

/// Parse a PMU log with the Siemens markers and a detected parameter count
pub fn parse(source: &str) -> Result<PhysioLog, ParseError> {
    parse_with(source, &ParseOptions::default())
}

/// Parse a PMU log with explicit options
pub fn parse_with(source: &str, options: &ParseOptions) -> Result<PhysioLog, ParseError> {
    let tree = parsing::parse_tree(source, &options.markers)?;
    let log = building::build(&tree, source, options)?;
    Ok(log)
}
