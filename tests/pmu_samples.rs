//! Parsing the sample PMU logs under tests/fixtures
//!
//! `sample_basic.puls` is an older four-parameter log without info regions;
//! `sample_with_ext2.puls` carries info regions (one spanning two lines), both trigger
//! markers, and the optional EXT2 channel.

use chrono::NaiveTime;
use pmu_log::pmu::{
    self, loader, Channel, Clock, FormatVariant, LogTime, MeasurementSummary, NrSummary,
    ParseOptions, PhysioLog, SemanticErrorKind, Trigger, TriggerKind,
};
use rstest::{fixture, rstest};
use std::fs;

const BASIC: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/sample_basic.puls");
const WITH_EXT2: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/sample_with_ext2.puls"
);

fn summary(
    freq: i64,
    per: i64,
    min: i64,
    max: i64,
    avg: i64,
    std_diff: i64,
) -> MeasurementSummary {
    MeasurementSummary {
        freq,
        per,
        min,
        max,
        avg,
        std_diff,
    }
}

fn hms_milli(h: u32, m: u32, s: u32, ms: u32) -> NaiveTime {
    NaiveTime::from_hms_milli_opt(h, m, s, ms).unwrap()
}

#[fixture]
fn basic_source() -> String {
    fs::read_to_string(BASIC).expect("Failed to read sample_basic.puls")
}

#[fixture]
fn basic() -> PhysioLog {
    loader::from_path(BASIC).expect("sample_basic.puls to parse")
}

#[fixture]
fn with_ext2() -> PhysioLog {
    loader::from_path(WITH_EXT2).expect("sample_with_ext2.puls to parse")
}

#[rstest]
fn test_basic_data_line(basic: PhysioLog) {
    assert_eq!(basic.format(), FormatVariant::Basic);
    assert_eq!(basic.params(), &[1, 8, 20, 2]);
    assert_eq!(basic.rate(), 20);
    assert_eq!(
        basic.ts(),
        &[367, 508, 520, 532, 638, 708, 790, 814, 1037, 1108, 1072, 1190, 1413]
    );
    assert!(basic.info().is_empty());
    assert_eq!(
        basic.triggers(),
        &[Trigger {
            kind: TriggerKind::Start,
            sample: 7
        }]
    );
    assert_eq!(basic.data().count(), basic.params().len() + basic.ts().len());
}

#[rstest]
#[case(Channel::Ecg, summary(0, 0, 0, 0, 0, 0))]
#[case(Channel::Puls, summary(72, 823, 355, 1646, 795, 5))]
#[case(Channel::Resp, summary(0, 0, 0, 0, 0, 0))]
#[case(Channel::Ext, summary(0, 0, 0, 0, 0, 0))]
fn test_basic_channel_summaries(
    basic: PhysioLog,
    #[case] channel: Channel,
    #[case] expected: MeasurementSummary,
) {
    assert_eq!(basic.channel(channel), Some(&expected));
}

#[rstest]
fn test_basic_footer(basic: PhysioLog) {
    assert_eq!(basic.ext2(), None);
    assert_eq!(basic.channel(Channel::Ext2), None);
    assert_eq!(*basic.nr(), NrSummary::default());
    assert_eq!(*basic.mdh(), LogTime::new(36632877, 39805825));
    assert_eq!(*basic.mpcu(), LogTime::new(36632400, 39804637));
}

#[rstest]
#[case(Clock::Mdh, hms_milli(10, 10, 32, 877), hms_milli(11, 3, 25, 825))]
#[case(Clock::Mpcu, hms_milli(10, 10, 32, 400), hms_milli(11, 3, 24, 637))]
fn test_basic_wall_clock(
    basic: PhysioLog,
    #[case] clock: Clock,
    #[case] start: NaiveTime,
    #[case] stop: NaiveTime,
) {
    assert_eq!(basic.clock(clock).start_time(), Some(start));
    assert_eq!(basic.clock(clock).stop_time(), Some(stop));
}

#[rstest]
fn test_explicit_five_params(basic_source: String) {
    let options = ParseOptions::default().with_param_count(5);
    let log = pmu::parse_with(&basic_source, &options).unwrap();
    assert_eq!(log.params(), &[1, 8, 20, 2, 367]);
    assert_eq!(log.rate(), 20);
    assert_eq!(log.ts().first(), Some(&508));
    assert_eq!(log.ts().len(), 12);
    assert_eq!(log.triggers()[0].sample, 6);
}

#[rstest]
fn test_from_str_matches_loader(basic_source: String, basic: PhysioLog) {
    let parsed: PhysioLog = basic_source.parse().unwrap();
    assert_eq!(parsed, basic);
}

#[rstest]
fn test_annotated_data_line(with_ext2: PhysioLog) {
    assert_eq!(with_ext2.format(), FormatVariant::Annotated4);
    assert_eq!(with_ext2.params(), &[1, 2, 40, 280]);
    assert_eq!(with_ext2.rate(), 40);
    assert_eq!(
        with_ext2.ts(),
        &[1653, 1654, 1655, 1660, 1670, 1680, 1690, 1700]
    );
    assert_eq!(
        with_ext2.triggers(),
        &[
            Trigger {
                kind: TriggerKind::Start,
                sample: 3
            },
            Trigger {
                kind: TriggerKind::End,
                sample: 6
            },
        ]
    );
}

#[rstest]
fn test_info_regions_keep_their_text(with_ext2: PhysioLog) {
    assert_eq!(
        with_ext2.info(),
        &[
            "LOGVERSION_PULS 3".to_string(),
            "TRIGGER_METHOD_PULS 1".to_string(),
            "MSGTYPE 103".to_string(),
            "Multi-line note\nwritten by the console: see protocol".to_string(),
        ]
    );
}

#[rstest]
fn test_ext2_footer(with_ext2: PhysioLog) {
    assert_eq!(with_ext2.ext2(), Some(&summary(12, 5000, 1, 2, 3, 4)));
    assert_eq!(*with_ext2.puls(), summary(64, 926, 589, 1089, 931, 2));
    assert_eq!(
        *with_ext2.nr(),
        NrSummary {
            nr_trig: 2,
            nr_m_p: 1,
            nr_arr: 0,
            acq_win: 3
        }
    );
    assert_eq!(with_ext2.mdh().start_time(), Some(hms_milli(13, 3, 49, 710)));
}

#[rstest]
#[case::short_stats_line(
    "355 1646 795 5",
    "355 1646 795",
    SemanticErrorKind::ArityMismatch {
        section: pmu::parsing::FooterKind::Stats(Channel::Puls),
        expected: 4,
        found: 3
    }
)]
#[case::long_rate_line(
    "PULS Freq Per: 72 823",
    "PULS Freq Per: 72 823 1",
    SemanticErrorKind::ArityMismatch {
        section: pmu::parsing::FooterKind::Rate(Channel::Puls),
        expected: 2,
        found: 3
    }
)]
#[case::swapped_channel(
    "RESP Min",
    "EXT  Min",
    SemanticErrorKind::ChannelMismatch {
        expected: Channel::Resp,
        found: Channel::Ext
    }
)]
#[case::clock_past_midnight(
    "LogStopMPCUTime:  39804637",
    "LogStopMPCUTime:  99804637",
    SemanticErrorKind::ClockOutOfRange {
        section: pmu::parsing::FooterKind::Time(Clock::Mpcu, pmu::Edge::Stop),
        value: 99804637
    }
)]
#[case::missing_nr_line(
    "NrTrig NrMP NrArr AcqWin: 0 0 0 0\n",
    "",
    SemanticErrorKind::MissingSection {
        section: pmu::parsing::FooterKind::Nr
    }
)]
fn test_malformed_footer(
    basic_source: String,
    #[case] from: &str,
    #[case] to: &str,
    #[case] expected: SemanticErrorKind,
) {
    let source = basic_source.replace(from, to);
    match pmu::parse(&source) {
        Err(pmu::ParseError::Semantic(err)) => assert_eq!(err.kind, expected),
        other => panic!("expected a semantic error, got {:?}", other),
    }
}

#[rstest]
#[case::unterminated_info(
    "1 8 20 2 ",
    "1 8 20 2 5002 LOGVERSION 102 ",
    (1, 10),
    None,
    "`6002` (info region end)"
)]
#[case::missing_footer_close("6003\n", "", (14, 27), None, "`6003` (footer end)")]
#[case::unknown_label("NrTrig", "NrTrigs", (10, 1), Some("NrTrigs"), "`NrTrig`")]
#[case::trailing_garbage("6003\n", "6003\n7\n", (16, 1), Some("7"), "end of input")]
#[case::missing_colon("PULS Freq Per:", "PULS Freq Per", (4, 15), Some("72"), "`:`")]
fn test_malformed_syntax(
    basic_source: String,
    #[case] from: &str,
    #[case] to: &str,
    #[case] at: (usize, usize),
    #[case] found: Option<&str>,
    #[case] expected: &str,
) {
    let source = basic_source.replacen(from, to, 1);
    let err = match pmu::parse(&source) {
        Err(pmu::ParseError::Syntax(err)) => err,
        other => panic!("expected a syntax error, got {:?}", other),
    };
    assert_eq!(err.position.to_string(), format!("{}:{}", at.0, at.1));
    assert_eq!(err.found.as_deref(), found);
    assert!(
        err.expected.iter().any(|e| e == expected),
        "{expected} missing from {:?}",
        err.expected
    );
}

#[rstest]
fn test_crlf_line_endings(basic_source: String, basic: PhysioLog) {
    let crlf = basic_source.replace('\n', "\r\n");
    assert_eq!(pmu::parse(&crlf).unwrap(), basic);
}

#[rstest]
fn test_json_output(basic: PhysioLog) {
    let json = serde_json::to_value(&basic).unwrap();
    assert_eq!(json["format"], "basic");
    assert_eq!(json["rate"], 20);
    assert_eq!(json["puls"]["std_diff"], 5);
    assert_eq!(json["ext2"], serde_json::Value::Null);
    assert_eq!(json["mdh"]["start_time"], "10:10:32.877");
    assert_eq!(json["triggers"][0]["kind"], "start");
}
