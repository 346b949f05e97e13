//! Semantic builder: parse tree to [`PhysioLog`]
//!
//!     The grammar accepts any token sequence of the right shape. This pass decides whether
//!     it means something: it splits the data line into parameters and samples, records
//!     trigger positions, pairs channel lines, and checks that every required footer line
//!     is present exactly once with the right number of integers.
//!
//!     Data Line:
//!         The leading values are the acquisition parameters. How many there are depends on
//!         the [`FormatVariant`], unless [`ParseOptions::param_count`] pins it. Info regions
//!         may sit between parameters; a trigger may not. Everything after the parameters is
//!         the time series, with trigger markers recorded by position instead of kept as
//!         samples.
//!
//!     Footer:
//!         Channel summaries come as a `Freq Per` line immediately followed by the
//!         `Min Max Avg StdDiff` line of the same channel. EXT2 is the only optional
//!         channel.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use crate::pmu::error::{SemanticError, SemanticErrorKind};
use crate::pmu::location::SourceLocation;
use crate::pmu::markers::{FormatVariant, Markers, RATE_PARAM_INDEX};
use crate::pmu::model::{
    Channel, Clock, Edge, LogTime, MeasurementSummary, NrSummary, PhysioLog, Trigger, MS_PER_DAY,
};
use crate::pmu::parsing::{DataItem, FooterKind, FooterLine, ParseTree};

/// Knobs for a single parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Marker values recognised on the data line and around the footer
    pub markers: Markers,
    /// Number of leading parameters; detected from the data line when `None`
    pub param_count: Option<usize>,
}

impl ParseOptions {
    pub fn with_param_count(mut self, count: usize) -> Self {
        self.param_count = Some(count);
        self
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }
}

struct DataLine {
    format: FormatVariant,
    params: Vec<i64>,
    ts: Vec<i64>,
    info: Vec<String>,
    triggers: Vec<Trigger>,
}

struct Footer {
    summaries: BTreeMap<Channel, MeasurementSummary>,
    nr: NrSummary,
    times: HashMap<(Clock, Edge), i64>,
}

/// Build the typed log from a parse tree of `source`
pub fn build(
    tree: &ParseTree,
    source: &str,
    options: &ParseOptions,
) -> Result<PhysioLog, SemanticError> {
    let location = SourceLocation::new(source);
    let data = build_data_line(&tree.data, source, &location, options)?;
    let mut footer = build_footer(tree, &location)?;

    let mut summary = |channel: Channel| footer.summaries.remove(&channel).unwrap_or_default();
    let (ecg, puls, resp, ext) = (
        summary(Channel::Ecg),
        summary(Channel::Puls),
        summary(Channel::Resp),
        summary(Channel::Ext),
    );
    let ext2 = footer.summaries.remove(&Channel::Ext2);
    let time = |clock: Clock, edge: Edge| {
        footer
            .times
            .get(&(clock, edge))
            .copied()
            .unwrap_or_default()
    };

    Ok(PhysioLog {
        format: data.format,
        rate: data.params[RATE_PARAM_INDEX],
        params: data.params,
        info: data.info,
        ts: data.ts,
        triggers: data.triggers,
        ecg,
        puls,
        resp,
        ext,
        ext2,
        nr: footer.nr,
        mdh: LogTime::new(time(Clock::Mdh, Edge::Start), time(Clock::Mdh, Edge::Stop)),
        mpcu: LogTime::new(time(Clock::Mpcu, Edge::Start), time(Clock::Mpcu, Edge::Stop)),
    })
}

fn data_line_span(items: &[DataItem]) -> Range<usize> {
    match (items.first(), items.last()) {
        (Some(first), Some(last)) => first.span().start..last.span().end,
        _ => 0..0,
    }
}

fn build_data_line(
    items: &[DataItem],
    source: &str,
    location: &SourceLocation<'_>,
    options: &ParseOptions,
) -> Result<DataLine, SemanticError> {
    let leading = items
        .iter()
        .take_while(|item| matches!(item, DataItem::Value(..)))
        .count();
    let followed_by_info = matches!(items.get(leading), Some(DataItem::Info(_)));
    let format = FormatVariant::detect(leading, followed_by_info);
    let param_count = options.param_count.unwrap_or(format.param_count());
    log::debug!("data line layout {:?}, {} parameters", format, param_count);

    if param_count <= RATE_PARAM_INDEX {
        return Err(SemanticError::at(
            SemanticErrorKind::UnsupportedParamCount { count: param_count },
            location,
            &data_line_span(items),
        ));
    }

    let mut params = Vec::with_capacity(param_count);
    let mut ts = Vec::new();
    let mut info = Vec::new();
    let mut triggers = Vec::new();

    for item in items {
        match item {
            DataItem::Value(value, _) if params.len() < param_count => params.push(*value),
            DataItem::Value(value, _) => ts.push(*value),
            DataItem::Trigger(_, span) if params.len() < param_count => {
                return Err(SemanticError::at(
                    SemanticErrorKind::ParamsInterrupted {
                        expected: param_count,
                        found: params.len(),
                    },
                    location,
                    span,
                ));
            }
            DataItem::Trigger(kind, _) => triggers.push(Trigger {
                kind: *kind,
                sample: ts.len(),
            }),
            DataItem::Info(region) => info.push(region.text(source).to_string()),
        }
    }

    if params.len() < param_count {
        return Err(SemanticError::at(
            SemanticErrorKind::MissingParams {
                expected: param_count,
                found: params.len(),
            },
            location,
            &data_line_span(items),
        ));
    }

    log::debug!(
        "{} samples, {} triggers, {} info regions",
        ts.len(),
        triggers.len(),
        info.len()
    );
    Ok(DataLine {
        format,
        params,
        ts,
        info,
        triggers,
    })
}

fn check_arity(line: &FooterLine, location: &SourceLocation<'_>) -> Result<(), SemanticError> {
    if line.values.len() == line.kind.arity() {
        Ok(())
    } else {
        Err(SemanticError::at(
            SemanticErrorKind::ArityMismatch {
                section: line.kind,
                expected: line.kind.arity(),
                found: line.values.len(),
            },
            location,
            &line.span,
        ))
    }
}

fn build_footer(tree: &ParseTree, location: &SourceLocation<'_>) -> Result<Footer, SemanticError> {
    let mut seen = HashSet::new();
    let mut summaries = BTreeMap::new();
    let mut nr = None;
    let mut times = HashMap::new();

    let mut mark_seen = |line: &FooterLine| -> Result<(), SemanticError> {
        check_arity(line, location)?;
        if seen.insert(line.kind) {
            Ok(())
        } else {
            Err(SemanticError::at(
                SemanticErrorKind::DuplicateSection { section: line.kind },
                location,
                &line.span,
            ))
        }
    };

    let mut lines = tree.footer.iter();
    while let Some(line) = lines.next() {
        mark_seen(line)?;
        match line.kind {
            FooterKind::Rate(channel) => {
                let stats = match lines.next() {
                    Some(next) if next.kind == FooterKind::Stats(channel) => next,
                    Some(FooterLine {
                        kind: FooterKind::Stats(found),
                        span,
                        ..
                    }) => {
                        return Err(SemanticError::at(
                            SemanticErrorKind::ChannelMismatch {
                                expected: channel,
                                found: *found,
                            },
                            location,
                            span,
                        ))
                    }
                    _ => {
                        return Err(SemanticError::at(
                            SemanticErrorKind::UnpairedChannelLine { section: line.kind },
                            location,
                            &line.span,
                        ))
                    }
                };
                mark_seen(stats)?;
                let (rate, stats) = (&line.values, &stats.values);
                summaries.insert(
                    channel,
                    MeasurementSummary {
                        freq: rate[0],
                        per: rate[1],
                        min: stats[0],
                        max: stats[1],
                        avg: stats[2],
                        std_diff: stats[3],
                    },
                );
            }
            FooterKind::Stats(_) => {
                return Err(SemanticError::at(
                    SemanticErrorKind::UnpairedChannelLine { section: line.kind },
                    location,
                    &line.span,
                ))
            }
            FooterKind::Nr => {
                let v = &line.values;
                nr = Some(NrSummary {
                    nr_trig: v[0],
                    nr_m_p: v[1],
                    nr_arr: v[2],
                    acq_win: v[3],
                });
            }
            FooterKind::Time(clock, edge) => {
                let value = line.values[0];
                if !(0..MS_PER_DAY).contains(&value) {
                    return Err(SemanticError::at(
                        SemanticErrorKind::ClockOutOfRange {
                            section: line.kind,
                            value,
                        },
                        location,
                        &line.span,
                    ));
                }
                times.insert((clock, edge), value);
            }
        }
    }

    let missing = |section: FooterKind| {
        SemanticError::at(
            SemanticErrorKind::MissingSection { section },
            location,
            &tree.footer_close,
        )
    };
    for channel in Channel::ALL.into_iter().filter(Channel::is_required) {
        if !summaries.contains_key(&channel) {
            return Err(missing(FooterKind::Rate(channel)));
        }
    }
    let nr = nr.ok_or_else(|| missing(FooterKind::Nr))?;
    for kind in FooterKind::TIMES {
        if let FooterKind::Time(clock, edge) = kind {
            if !times.contains_key(&(clock, edge)) {
                return Err(missing(kind));
            }
        }
    }

    Ok(Footer {
        summaries,
        nr,
        times,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pmu::parsing::parse_tree;

    const FOOTER: &str = "5003
ECG  Freq Per: 0 0
ECG  Min Max Avg StdDiff: 0 0 0 0
PULS Freq Per: 72 823
PULS Min Max Avg StdDiff: 355 1646 795 5
RESP Freq Per: 0 0
RESP Min Max Avg StdDiff: 0 0 0 0
EXT  Freq Per: 0 0
EXT  Min Max Avg StdDiff: 0 0 0 0
NrTrig NrMP NrArr AcqWin: 0 0 0 0
LogStartMDHTime:  36632877
LogStopMDHTime:   39805825
LogStartMPCUTime: 36632400
LogStopMPCUTime:  39804637
6003
";

    fn build_with(source: &str, options: ParseOptions) -> Result<PhysioLog, SemanticError> {
        let tree = parse_tree(source, &options.markers).expect("source to parse");
        build(&tree, source, &options)
    }

    fn build_str(source: &str) -> Result<PhysioLog, SemanticError> {
        build_with(source, ParseOptions::default())
    }

    #[test]
    fn test_basic_layout() {
        let log = build_str(&format!("1 8 20 2 367 508 5000 520 {}", FOOTER)).unwrap();
        assert_eq!(log.format(), FormatVariant::Basic);
        assert_eq!(log.params(), &[1, 8, 20, 2]);
        assert_eq!(log.rate(), 20);
        assert_eq!(log.ts(), &[367, 508, 520]);
        assert_eq!(
            log.triggers(),
            &[Trigger {
                kind: crate::pmu::markers::TriggerKind::Start,
                sample: 2
            }]
        );
    }

    #[test]
    fn test_annotated_five_params() {
        let source = format!("1 2 40 280 7 5002 LOGVERSION 102 6002 9 10 {}", FOOTER);
        let log = build_str(&source).unwrap();
        assert_eq!(log.format(), FormatVariant::Annotated5);
        assert_eq!(log.params(), &[1, 2, 40, 280, 7]);
        assert_eq!(log.rate(), 40);
        assert_eq!(log.info(), &["LOGVERSION 102".to_string()]);
        assert_eq!(log.ts(), &[9, 10]);
    }

    #[test]
    fn test_explicit_param_count_overrides_detection() {
        let options = ParseOptions::default().with_param_count(5);
        let log = build_with(&format!("1 8 20 2 367 508 520 {}", FOOTER), options).unwrap();
        assert_eq!(log.format(), FormatVariant::Basic);
        assert_eq!(log.params(), &[1, 8, 20, 2, 367]);
        assert_eq!(log.ts(), &[508, 520]);
    }

    #[test]
    fn test_info_between_params_is_allowed() {
        let options = ParseOptions::default().with_param_count(5);
        let source = format!("1 8 20 2 5002 LOGVERSION 102 6002 367 508 {}", FOOTER);
        let log = build_with(&source, options).unwrap();
        assert_eq!(log.params(), &[1, 8, 20, 2, 367]);
        assert_eq!(log.ts(), &[508]);
    }

    #[test]
    fn test_trigger_inside_params_is_rejected() {
        let err = build_str(&format!("1 8 5000 20 2 367 {}", FOOTER)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::ParamsInterrupted {
                expected: 4,
                found: 2
            }
        );
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_too_few_params() {
        let err = build_str(&format!("1 8 20 {}", FOOTER)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::MissingParams {
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_param_count_without_rate() {
        let options = ParseOptions::default().with_param_count(2);
        let err = build_with(&format!("1 8 20 {}", FOOTER), options).unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::UnsupportedParamCount { count: 2 });
    }

    #[test]
    fn test_summaries() {
        let log = build_str(&format!("1 8 20 2 {}", FOOTER)).unwrap();
        assert_eq!(
            *log.puls(),
            MeasurementSummary {
                freq: 72,
                per: 823,
                min: 355,
                max: 1646,
                avg: 795,
                std_diff: 5
            }
        );
        assert_eq!(*log.ecg(), MeasurementSummary::default());
        assert_eq!(log.ext2(), None);
        assert_eq!(*log.nr(), NrSummary::default());
        assert_eq!(*log.mdh(), LogTime::new(36632877, 39805825));
        assert_eq!(*log.mpcu(), LogTime::new(36632400, 39804637));
    }

    #[test]
    fn test_ext2_is_optional_but_parsed() {
        let footer = FOOTER.replace(
            "NrTrig",
            "EXT2 Freq Per: 1 2\nEXT2 Min Max Avg StdDiff: 3 4 5 6\nNrTrig",
        );
        let log = build_str(&format!("1 8 20 2 {}", footer)).unwrap();
        assert_eq!(
            log.ext2(),
            Some(&MeasurementSummary {
                freq: 1,
                per: 2,
                min: 3,
                max: 4,
                avg: 5,
                std_diff: 6
            })
        );
    }

    #[test]
    fn test_wrong_arity() {
        let footer = FOOTER.replace("355 1646 795 5", "355 1646 795");
        let err = build_str(&format!("1 8 20 2 {}", footer)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::ArityMismatch {
                section: FooterKind::Stats(Channel::Puls),
                expected: 4,
                found: 3
            }
        );
        assert_eq!(err.line, 5);
        assert_eq!(err.text, "PULS Min Max Avg StdDiff: 355 1646 795");
    }

    #[test]
    fn test_channel_mismatch() {
        let footer = FOOTER.replace("PULS Min", "RESP Min");
        let err = build_str(&format!("1 8 20 2 {}", footer)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::ChannelMismatch {
                expected: Channel::Puls,
                found: Channel::Resp
            }
        );
    }

    #[test]
    fn test_unpaired_stats_line() {
        let footer = FOOTER.replace("ECG  Freq Per: 0 0\n", "");
        let err = build_str(&format!("1 8 20 2 {}", footer)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::UnpairedChannelLine {
                section: FooterKind::Stats(Channel::Ecg)
            }
        );
    }

    #[test]
    fn test_missing_channel() {
        let footer = FOOTER.replace(
            "EXT  Freq Per: 0 0\nEXT  Min Max Avg StdDiff: 0 0 0 0\n",
            "",
        );
        let err = build_str(&format!("1 8 20 2 {}", footer)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::MissingSection {
                section: FooterKind::Rate(Channel::Ext)
            }
        );
        assert_eq!(err.text, "6003");
    }

    #[test]
    fn test_missing_time_line() {
        let footer = FOOTER.replace("LogStopMPCUTime:  39804637\n", "");
        let err = build_str(&format!("1 8 20 2 {}", footer)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::MissingSection {
                section: FooterKind::Time(Clock::Mpcu, Edge::Stop)
            }
        );
    }

    #[test]
    fn test_duplicate_nr_line() {
        let footer = FOOTER.replace(
            "NrTrig NrMP NrArr AcqWin: 0 0 0 0\n",
            "NrTrig NrMP NrArr AcqWin: 0 0 0 0\nNrTrig NrMP NrArr AcqWin: 1 1 1 1\n",
        );
        let err = build_str(&format!("1 8 20 2 {}", footer)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::DuplicateSection {
                section: FooterKind::Nr
            }
        );
    }

    #[test]
    fn test_clock_out_of_range() {
        let footer = FOOTER.replace("36632877", "86400000");
        let err = build_str(&format!("1 8 20 2 {}", footer)).unwrap_err();
        assert_eq!(
            err.kind,
            SemanticErrorKind::ClockOutOfRange {
                section: FooterKind::Time(Clock::Mdh, Edge::Start),
                value: 86_400_000
            }
        );
    }
}
