//! # pmu-log
//!
//! A parser for Siemens Physiological Monitoring Unit (PMU) logs: the `.puls`, `.resp`,
//! `.ecg` and `.ext` files written next to MRI acquisitions.
//!
//! ```text
//! let log: pmu_log::PhysioLog = std::fs::read_to_string("scan.puls")?.parse()?;
//! println!("{} samples at rate {}", log.ts().len(), log.rate());
//! ```
//!
//! See the [`pmu`] module for the grammar and the semantic rules.

pub mod pmu;

pub use pmu::{parse, parse_with, LoadError, ParseError, ParseOptions, PhysioLog};
