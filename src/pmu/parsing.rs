//! Grammar for PMU logs
//!
//!     The grammar runs over the `(Token, byte range)` stream produced by
//!     [`tokenize`](crate::pmu::lexing::tokenize) and yields a [`ParseTree`]. It answers
//!     "can this token sequence occur" only; whether the tree means something valid (pairs
//!     of channel lines, the right number of integers) is the builder's concern.
//!
//!     Shape:
//!
//!         document    := data_line footer EOI
//!         data_line   := (info_region | trigger | sample)* FOOTER_OPEN
//!         info_region := INFO_OPEN <any token but INFO_OPEN / INFO_CLOSE>* INFO_CLOSE
//!         footer      := (channel_line | nr_line | time_line)* FOOTER_CLOSE
//!         channel_line:= CHANNEL ("Freq" "Per" | "Min" "Max" "Avg" "StdDiff") ":" int*
//!         nr_line     := "NrTrig" "NrMP" "NrArr" "AcqWin" ":" int*
//!         time_line   := "Log" ("Start" | "Stop") ("MDH" | "MPCU") "Time" ":" int*
//!
//!     The upper-case terminals are integers whose values come from a [`Markers`] table.
//!     Whitespace never reaches the grammar, so an info region may span any number of
//!     lines; its raw text is recovered from the source between the two marker spans.

use chumsky::prelude::*;
use std::fmt;
use std::ops::Range;

use crate::pmu::error::SyntaxError;
use crate::pmu::lexing::{tokenize, Token, TokenSpan};
use crate::pmu::markers::{Markers, TriggerKind};
use crate::pmu::model::{Channel, Clock, Edge};

/// Type alias for parser error
type ParserError = Simple<TokenSpan>;

/// Stands in for "any integer" in expected-token sets; lexed integers are never negative.
const ANY_INT: i64 = -1;

/// Label of the error raised when the input ends inside an info region
const UNTERMINATED_INFO: &str = "unterminated info region";

/// Identifies a footer line by its label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FooterKind {
    /// `<CHANNEL> Freq Per:`
    Rate(Channel),
    /// `<CHANNEL> Min Max Avg StdDiff:`
    Stats(Channel),
    /// `NrTrig NrMP NrArr AcqWin:`
    Nr,
    /// `Log<Edge><Clock>Time:`
    Time(Clock, Edge),
}

impl FooterKind {
    pub const TIMES: [FooterKind; 4] = [
        FooterKind::Time(Clock::Mdh, Edge::Start),
        FooterKind::Time(Clock::Mdh, Edge::Stop),
        FooterKind::Time(Clock::Mpcu, Edge::Start),
        FooterKind::Time(Clock::Mpcu, Edge::Stop),
    ];

    /// How many integers the line must carry
    pub fn arity(&self) -> usize {
        match self {
            FooterKind::Rate(_) => 2,
            FooterKind::Stats(_) | FooterKind::Nr => 4,
            FooterKind::Time(_, _) => 1,
        }
    }
}

impl fmt::Display for FooterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FooterKind::Rate(channel) => write!(f, "{} Freq Per", channel),
            FooterKind::Stats(channel) => write!(f, "{} Min Max Avg StdDiff", channel),
            FooterKind::Nr => write!(f, "NrTrig NrMP NrArr AcqWin"),
            FooterKind::Time(clock, edge) => {
                write!(f, "Log{}{}Time", edge.label(), clock.label())
            }
        }
    }
}

/// A paired open/close marker span whose enclosed text is kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRegion {
    pub open: Range<usize>,
    pub close: Range<usize>,
}

impl InfoRegion {
    /// Raw text between the markers, minus the surrounding whitespace
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source[self.open.end..self.close.start].trim()
    }

    pub fn span(&self) -> Range<usize> {
        self.open.start..self.close.end
    }
}

/// One item of the data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataItem {
    Value(i64, Range<usize>),
    Trigger(TriggerKind, Range<usize>),
    Info(InfoRegion),
}

impl DataItem {
    pub fn span(&self) -> Range<usize> {
        match self {
            DataItem::Value(_, span) | DataItem::Trigger(_, span) => span.clone(),
            DataItem::Info(region) => region.span(),
        }
    }
}

/// A labeled footer line with however many integers followed the colon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterLine {
    pub kind: FooterKind,
    pub values: Vec<i64>,
    /// From the first label token to the last integer
    pub span: Range<usize>,
}

impl FooterLine {
    fn new(
        kind: FooterKind,
        start: usize,
        colon: Range<usize>,
        values: Vec<(i64, Range<usize>)>,
    ) -> Self {
        let end = values.last().map(|(_, span)| span.end).unwrap_or(colon.end);
        Self {
            kind,
            values: values.into_iter().map(|(value, _)| value).collect(),
            span: start..end,
        }
    }
}

/// Intermediate tree of a whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub data: Vec<DataItem>,
    pub footer: Vec<FooterLine>,
    /// Span of the footer close marker
    pub footer_close: Range<usize>,
}

/// Parse source text into a [`ParseTree`]
pub fn parse_tree(source: &str, markers: &Markers) -> Result<ParseTree, SyntaxError> {
    let tokens = tokenize(source)?;
    let tree = document(*markers).parse(tokens).map_err(|errors| {
        match errors.into_iter().next() {
            Some(error) => to_syntax_error(source, markers, error),
            None => SyntaxError::new(source, 0..0, None, Vec::new(), None),
        }
    })?;

    log::debug!(
        "parsed {} data items and {} footer lines",
        tree.data.len(),
        tree.footer.len()
    );
    Ok(tree)
}

/// Parse a whole document
pub fn document(
    markers: Markers,
) -> impl Parser<TokenSpan, ParseTree, Error = ParserError> + Clone {
    data_item(markers)
        .repeated()
        .then_ignore(marker(markers.footer_open))
        .then(footer_line(markers).repeated())
        .then(marker(markers.footer_close))
        .then_ignore(end())
        .map(|((data, footer), footer_close)| ParseTree {
            data,
            footer,
            footer_close,
        })
}

/// Parse one item of the data line
pub(crate) fn data_item(
    markers: Markers,
) -> impl Parser<TokenSpan, DataItem, Error = ParserError> + Clone {
    let trigger = marker(markers.trigger_start)
        .map(|span| DataItem::Trigger(TriggerKind::Start, span))
        .or(marker(markers.trigger_end).map(|span| DataItem::Trigger(TriggerKind::End, span)));

    let sample = int(move |value| !markers.is_reserved(value))
        .map(|(value, span)| DataItem::Value(value, span));

    choice((info_region(markers).map(DataItem::Info), trigger, sample))
}

/// Parse an info region, capturing only the marker spans
///
/// Running out of input inside the region is reported at the opening marker, which is
/// where the reader has to look.
pub(crate) fn info_region(
    markers: Markers,
) -> impl Parser<TokenSpan, InfoRegion, Error = ParserError> + Clone {
    let (open, close) = (markers.info_open, markers.info_close);
    let body = filter(move |(tok, _): &TokenSpan| {
        *tok != Token::Int(open) && *tok != Token::Int(close)
    })
    .repeated();
    let close_or_end = marker(close)
        .map(Some)
        .or(end()
            .to(None)
            .map_err(move |e: ParserError| {
                expected_found(e.span(), vec![Token::Int(close)], e.found().cloned())
            }))
        .labelled("info region");

    marker(open)
        .then_ignore(body)
        .then(close_or_end)
        .try_map(move |(open_span, close_span), span| match close_span {
            Some(close_span) => Ok(InfoRegion {
                open: open_span,
                close: close_span,
            }),
            None => Err(expected_found(
                span,
                vec![Token::Int(close)],
                Some((Token::Int(open), open_span)),
            )
            .with_label(UNTERMINATED_INFO)),
        })
}

/// Parse one labeled footer line
pub(crate) fn footer_line(
    markers: Markers,
) -> impl Parser<TokenSpan, FooterLine, Error = ParserError> + Clone {
    let values = int(move |value| value != markers.footer_close).repeated();

    let rate_tail = word("Freq")
        .ignore_then(word("Per"))
        .ignore_then(colon())
        .then(values.clone())
        .map(|(colon, values)| {
            let kind: fn(Channel) -> FooterKind = FooterKind::Rate;
            (kind, colon, values)
        });
    let stats_tail = word("Min")
        .ignore_then(word("Max"))
        .ignore_then(word("Avg"))
        .ignore_then(word("StdDiff"))
        .ignore_then(colon())
        .then(values.clone())
        .map(|(colon, values)| {
            let kind: fn(Channel) -> FooterKind = FooterKind::Stats;
            (kind, colon, values)
        });

    let channel_line = channel()
        .then(rate_tail.or(stats_tail))
        .map(|((channel, start), (kind, colon, values))| {
            FooterLine::new(kind(channel), start.start, colon, values)
        });

    let nr_line = word("NrTrig")
        .then_ignore(word("NrMP"))
        .then_ignore(word("NrArr"))
        .then_ignore(word("AcqWin"))
        .then(colon())
        .then(values.clone())
        .map(|((start, colon), values)| {
            FooterLine::new(FooterKind::Nr, start.start, colon, values)
        });

    let time_line = time_label()
        .then(colon())
        .then(values)
        .map(|(((kind, start), colon), values)| {
            FooterLine::new(kind, start.start, colon, values)
        });

    choice((channel_line, nr_line, time_line))
}

fn expected_found(
    span: Range<usize>,
    wanted: Vec<Token>,
    found: Option<TokenSpan>,
) -> ParserError {
    Simple::expected_input_found(span, wanted.into_iter().map(|t| Some((t, 0..0))), found)
}

/// `filter_map` reports an empty expected set at end of input; name `wanted` there too.
fn expecting<P, O>(
    parser: P,
    wanted: Vec<Token>,
) -> impl Parser<TokenSpan, O, Error = ParserError> + Clone
where
    P: Parser<TokenSpan, O, Error = ParserError> + Clone,
{
    parser.map_err(move |e: ParserError| match e.found() {
        Some(_) => e,
        None => expected_found(e.span(), wanted.clone(), None),
    })
}

/// Match the integer `value` and return its span
fn marker(value: i64) -> impl Parser<TokenSpan, Range<usize>, Error = ParserError> + Clone {
    let wanted = vec![Token::Int(value)];
    let matcher = filter_map(move |span, (tok, range): TokenSpan| {
        if tok == Token::Int(value) {
            Ok(range)
        } else {
            Err(expected_found(span, vec![Token::Int(value)], Some((tok, range))))
        }
    });
    expecting(matcher, wanted)
}

/// Match any integer accepted by `keep`
fn int<F>(keep: F) -> impl Parser<TokenSpan, (i64, Range<usize>), Error = ParserError> + Clone
where
    F: Fn(i64) -> bool + Clone,
{
    let matcher = filter_map(move |span, (tok, range): TokenSpan| match tok {
        Token::Int(value) if keep(value) => Ok((value, range)),
        tok => Err(expected_found(span, vec![Token::Int(ANY_INT)], Some((tok, range)))),
    });
    expecting(matcher, vec![Token::Int(ANY_INT)])
}

fn word(
    expected: &'static str,
) -> impl Parser<TokenSpan, Range<usize>, Error = ParserError> + Clone {
    let wanted = vec![Token::Word(expected.to_string())];
    let matcher = filter_map(move |span, (tok, range): TokenSpan| {
        if tok.is_word(expected) {
            Ok(range)
        } else {
            let wanted = vec![Token::Word(expected.to_string())];
            Err(expected_found(span, wanted, Some((tok, range))))
        }
    });
    expecting(matcher, wanted)
}

fn colon() -> impl Parser<TokenSpan, Range<usize>, Error = ParserError> + Clone {
    let matcher = filter_map(move |span, (tok, range): TokenSpan| match tok {
        Token::Colon => Ok(range),
        tok => Err(expected_found(span, vec![Token::Colon], Some((tok, range)))),
    });
    expecting(matcher, vec![Token::Colon])
}

fn channel_labels() -> Vec<Token> {
    Channel::ALL
        .iter()
        .map(|c| Token::Word(c.label().to_string()))
        .collect()
}

fn channel() -> impl Parser<TokenSpan, (Channel, Range<usize>), Error = ParserError> + Clone {
    let matcher = filter_map(move |span, (tok, range): TokenSpan| {
        let found = match &tok {
            Token::Word(label) => Channel::from_label(label),
            _ => None,
        };
        found
            .map(|c| (c, range.clone()))
            .ok_or_else(|| expected_found(span, channel_labels(), Some((tok, range))))
    });
    expecting(matcher, channel_labels())
}

fn time_labels() -> Vec<Token> {
    FooterKind::TIMES
        .iter()
        .map(|kind| Token::Word(kind.to_string()))
        .collect()
}

fn time_label(
) -> impl Parser<TokenSpan, (FooterKind, Range<usize>), Error = ParserError> + Clone {
    let matcher = filter_map(move |span, (tok, range): TokenSpan| {
        let found = match &tok {
            Token::Word(label) => FooterKind::TIMES
                .into_iter()
                .find(|kind| kind.to_string() == *label),
            _ => None,
        };
        found
            .map(|kind| (kind, range.clone()))
            .ok_or_else(|| expected_found(span, time_labels(), Some((tok, range))))
    });
    expecting(matcher, time_labels())
}

/// Render an expected token for a diagnostic
fn describe_expected(expected: Option<&TokenSpan>, markers: &Markers) -> String {
    match expected {
        None => "end of input".to_string(),
        Some((Token::Int(value), _)) => match markers.describe(*value) {
            Some(name) => format!("`{}` ({})", value, name),
            None => "an integer".to_string(),
        },
        Some((token, _)) => format!("`{}`", token),
    }
}

fn to_syntax_error(source: &str, markers: &Markers, error: ParserError) -> SyntaxError {
    let (span, found) = match (error.label(), error.found()) {
        // The region ran to end of input; point at its opening marker
        (Some(UNTERMINATED_INFO), Some((_, range))) => (range.clone(), None),
        (_, Some((token, range))) => (range.clone(), Some(token.to_string())),
        // End of input: point just past the last token rather than at trailing whitespace
        (_, None) => {
            let end = source.trim_end().len();
            (end..end, None)
        }
    };
    let mut expected: Vec<String> = error
        .expected()
        .map(|e| describe_expected(e.as_ref(), markers))
        .collect();
    expected.sort();
    expected.dedup();

    SyntaxError::new(source, span, found, expected, error.label())
}
