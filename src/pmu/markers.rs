//! Sentinel markers and format variants
//!
//!     The PMU data line is a flat run of integers. A handful of reserved values act as
//!     markers rather than samples: they delimit info regions, flag triggers, and open and
//!     close the footer. The values below are the ones written by Siemens VB/VD/VE systems.
//!     They are collected in [`Markers`] so the grammar and the builder never compare against
//!     bare literals, and so a configuration file can override them.
//!
//!     Format Variants:
//!         Older files start straight away with four acquisition parameters followed by data.
//!         Newer files follow the parameters with one or more info regions (`5002 LOGVERSION
//!         102 6002`), and some of those carry five parameters. The variant is detected from
//!         the position of the first info region, see [`FormatVariant::detect`].

use serde::{Deserialize, Serialize};

/// A trigger was detected at this point of the waveform.
pub const TRIGGER_START: i64 = 5000;
/// End of a trigger segment.
pub const TRIGGER_END: i64 = 6000;
/// Opens an info region; raw text follows until [`INFO_CLOSE`].
pub const INFO_OPEN: i64 = 5002;
/// Closes an info region.
pub const INFO_CLOSE: i64 = 6002;
/// Ends the data line and opens the footer.
pub const FOOTER_OPEN: i64 = 5003;
/// Closes the footer; nothing may follow it.
pub const FOOTER_CLOSE: i64 = 6003;

/// Index into the parameter tuple holding the sampling rate.
pub const RATE_PARAM_INDEX: usize = 2;

/// The full table of reserved marker values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Markers {
    pub trigger_start: i64,
    pub trigger_end: i64,
    pub info_open: i64,
    pub info_close: i64,
    pub footer_open: i64,
    pub footer_close: i64,
}

impl Markers {
    /// The values written by Siemens scanners.
    pub const SIEMENS: Markers = Markers {
        trigger_start: TRIGGER_START,
        trigger_end: TRIGGER_END,
        info_open: INFO_OPEN,
        info_close: INFO_CLOSE,
        footer_open: FOOTER_OPEN,
        footer_close: FOOTER_CLOSE,
    };

    pub fn values(&self) -> [i64; 6] {
        [
            self.trigger_start,
            self.trigger_end,
            self.info_open,
            self.info_close,
            self.footer_open,
            self.footer_close,
        ]
    }

    /// True if `value` is one of the markers and therefore never a sample.
    pub fn is_reserved(&self, value: i64) -> bool {
        self.values().contains(&value)
    }

    /// The first value assigned to more than one marker, if any.
    ///
    /// A table with a repeated value is ambiguous: the grammar could not tell, say, a
    /// trigger from the end of the data line.
    pub fn duplicate(&self) -> Option<i64> {
        let values = self.values();
        values
            .iter()
            .enumerate()
            .find(|(i, value)| values[..*i].contains(value))
            .map(|(_, value)| *value)
    }

    pub fn trigger_kind(&self, value: i64) -> Option<TriggerKind> {
        if value == self.trigger_start {
            Some(TriggerKind::Start)
        } else if value == self.trigger_end {
            Some(TriggerKind::End)
        } else {
            None
        }
    }

    /// Human-readable role of a marker value, for diagnostics.
    pub fn describe(&self, value: i64) -> Option<&'static str> {
        if value == self.trigger_start {
            Some("trigger start")
        } else if value == self.trigger_end {
            Some("trigger end")
        } else if value == self.info_open {
            Some("info region start")
        } else if value == self.info_close {
            Some("info region end")
        } else if value == self.footer_open {
            Some("footer start")
        } else if value == self.footer_close {
            Some("footer end")
        } else {
            None
        }
    }

    pub fn value_of(&self, kind: TriggerKind) -> i64 {
        match kind {
            TriggerKind::Start => self.trigger_start,
            TriggerKind::End => self.trigger_end,
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::SIEMENS
    }
}

/// Which trigger marker was seen on the data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    Start,
    End,
}

/// The closed set of data-line layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatVariant {
    /// Four parameters, no info region directly after them.
    Basic,
    /// Four parameters immediately followed by an info region.
    Annotated4,
    /// Five parameters immediately followed by an info region.
    Annotated5,
}

impl FormatVariant {
    pub fn param_count(&self) -> usize {
        match self {
            FormatVariant::Basic | FormatVariant::Annotated4 => 4,
            FormatVariant::Annotated5 => 5,
        }
    }

    /// Detect the variant from the leading shape of the data line.
    ///
    /// `leading_values` is the number of values before the first non-value item, and
    /// `followed_by_info` tells whether that item is an info region.
    pub fn detect(leading_values: usize, followed_by_info: bool) -> Self {
        match (leading_values, followed_by_info) {
            (4, true) => FormatVariant::Annotated4,
            (5, true) => FormatVariant::Annotated5,
            _ => FormatVariant::Basic,
        }
    }
}
