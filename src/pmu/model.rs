//! The typed model of a PMU log
//!
//!     [`PhysioLog`] is the root aggregate produced by the semantic builder. It owns every
//!     sub-record and is never mutated after construction; callers read it through
//!     accessors.
//!
//!     Clock Ticks:
//!         `LogStart*Time` / `LogStop*Time` values count milliseconds since midnight. The
//!         reference session logs `LogStartMDHTime: 36632877`, which the scanner console
//!         shows as 10:10:32.877; 36632877 ms is exactly 10 h 10 min 32 s 877 ms.

use chrono::NaiveTime;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::pmu::error::ParseError;
use crate::pmu::markers::{FormatVariant, TriggerKind};

/// Milliseconds in one day; clock ticks must stay below this.
pub const MS_PER_DAY: i64 = 86_400_000;

/// A measurement channel with its own summary statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Ecg,
    Puls,
    Resp,
    Ext,
    Ext2,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Ecg,
        Channel::Puls,
        Channel::Resp,
        Channel::Ext,
        Channel::Ext2,
    ];

    /// The label used on footer lines
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Ecg => "ECG",
            Channel::Puls => "PULS",
            Channel::Resp => "RESP",
            Channel::Ext => "EXT",
            Channel::Ext2 => "EXT2",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Every channel except EXT2 must be summarised in a log.
    pub fn is_required(&self) -> bool {
        !matches!(self, Channel::Ext2)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// The two clocks that stamp a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Clock {
    /// Measurement data header clock
    Mdh,
    /// Measurement and physiological control unit clock
    Mpcu,
}

impl Clock {
    pub fn label(&self) -> &'static str {
        match self {
            Clock::Mdh => "MDH",
            Clock::Mpcu => "MPCU",
        }
    }
}

/// Start or stop of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Edge {
    Start,
    Stop,
}

impl Edge {
    pub fn label(&self) -> &'static str {
        match self {
            Edge::Start => "Start",
            Edge::Stop => "Stop",
        }
    }
}

/// Per-channel summary statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MeasurementSummary {
    pub freq: i64,
    pub per: i64,
    pub min: i64,
    pub max: i64,
    pub avg: i64,
    pub std_diff: i64,
}

/// Trigger counters from the `NrTrig NrMP NrArr AcqWin` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NrSummary {
    pub nr_trig: i64,
    pub nr_m_p: i64,
    pub nr_arr: i64,
    pub acq_win: i64,
}

/// Start and stop ticks of one clock, in milliseconds since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LogTime {
    pub start: i64,
    pub stop: i64,
}

impl LogTime {
    pub fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        ticks_to_time(self.start)
    }

    pub fn stop_time(&self) -> Option<NaiveTime> {
        ticks_to_time(self.stop)
    }
}

impl Serialize for LogTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LogTime", 4)?;
        state.serialize_field("start", &self.start)?;
        state.serialize_field("stop", &self.stop)?;
        state.serialize_field("start_time", &self.start_time())?;
        state.serialize_field("stop_time", &self.stop_time())?;
        state.end()
    }
}

/// Convert milliseconds since midnight into a wall-clock time.
///
/// Returns `None` for negative ticks or ticks of a day or more.
pub fn ticks_to_time(ticks: i64) -> Option<NaiveTime> {
    if !(0..MS_PER_DAY).contains(&ticks) {
        return None;
    }
    let secs = (ticks / 1000) as u32;
    let nanos = ((ticks % 1000) * 1_000_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

/// A trigger marker found on the data line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    /// Index into `ts` of the first sample after the marker
    pub sample: usize,
}

/// A fully parsed PMU log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysioLog {
    pub(crate) format: FormatVariant,
    pub(crate) params: Vec<i64>,
    pub(crate) rate: i64,
    pub(crate) info: Vec<String>,
    pub(crate) ts: Vec<i64>,
    pub(crate) triggers: Vec<Trigger>,
    pub(crate) ecg: MeasurementSummary,
    pub(crate) puls: MeasurementSummary,
    pub(crate) resp: MeasurementSummary,
    pub(crate) ext: MeasurementSummary,
    pub(crate) ext2: Option<MeasurementSummary>,
    pub(crate) nr: NrSummary,
    pub(crate) mdh: LogTime,
    pub(crate) mpcu: LogTime,
}

impl PhysioLog {
    /// The detected data-line layout
    pub fn format(&self) -> FormatVariant {
        self.format
    }

    /// Leading acquisition parameters
    pub fn params(&self) -> &[i64] {
        &self.params
    }

    /// Sampling rate, the third parameter
    pub fn rate(&self) -> i64 {
        self.rate
    }

    /// Free text of each info region, in order
    pub fn info(&self) -> &[String] {
        &self.info
    }

    /// Samples following the parameters, markers removed
    pub fn ts(&self) -> &[i64] {
        &self.ts
    }

    /// Parameters followed by samples: every integer of the data line that is neither a
    /// marker nor inside an info region.
    pub fn data(&self) -> impl Iterator<Item = i64> + '_ {
        self.params.iter().chain(self.ts.iter()).copied()
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn ecg(&self) -> &MeasurementSummary {
        &self.ecg
    }

    pub fn puls(&self) -> &MeasurementSummary {
        &self.puls
    }

    pub fn resp(&self) -> &MeasurementSummary {
        &self.resp
    }

    pub fn ext(&self) -> &MeasurementSummary {
        &self.ext
    }

    /// Only newer systems record a second external channel.
    pub fn ext2(&self) -> Option<&MeasurementSummary> {
        self.ext2.as_ref()
    }

    /// Summary of any channel; `None` only for an absent EXT2.
    pub fn channel(&self, channel: Channel) -> Option<&MeasurementSummary> {
        match channel {
            Channel::Ecg => Some(&self.ecg),
            Channel::Puls => Some(&self.puls),
            Channel::Resp => Some(&self.resp),
            Channel::Ext => Some(&self.ext),
            Channel::Ext2 => self.ext2.as_ref(),
        }
    }

    pub fn nr(&self) -> &NrSummary {
        &self.nr
    }

    pub fn mdh(&self) -> &LogTime {
        &self.mdh
    }

    pub fn mpcu(&self) -> &LogTime {
        &self.mpcu
    }

    pub fn clock(&self, clock: Clock) -> &LogTime {
        match clock {
            Clock::Mdh => &self.mdh,
            Clock::Mpcu => &self.mpcu,
        }
    }
}

impl FromStr for PhysioLog {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        crate::pmu::parse(source)
    }
}
