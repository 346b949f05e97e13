//! Entry points that fetch the text before parsing it
//!
//! The parser itself is pure; these adapters read from a string, any [`Read`] or a
//! path and attach the path to whatever goes wrong.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::pmu::building::ParseOptions;
use crate::pmu::error::LoadError;
use crate::pmu::model::PhysioLog;

pub fn from_str(source: &str) -> Result<PhysioLog, LoadError> {
    from_str_with(source, &ParseOptions::default())
}

pub fn from_str_with(source: &str, options: &ParseOptions) -> Result<PhysioLog, LoadError> {
    crate::pmu::parse_with(source, options)
        .map_err(|source| LoadError::Parse { path: None, source })
}

pub fn from_reader<R: Read>(reader: R) -> Result<PhysioLog, LoadError> {
    from_reader_with(reader, &ParseOptions::default())
}

/// Read the whole input, then parse it. The input must be UTF-8.
pub fn from_reader_with<R: Read>(
    mut reader: R,
    options: &ParseOptions,
) -> Result<PhysioLog, LoadError> {
    let mut source = String::new();
    reader
        .read_to_string(&mut source)
        .map_err(|source| LoadError::Io { path: None, source })?;
    from_str_with(&source, options)
}

pub fn from_path<P: AsRef<Path>>(path: P) -> Result<PhysioLog, LoadError> {
    from_path_with(path, &ParseOptions::default())
}

pub fn from_path_with<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> Result<PhysioLog, LoadError> {
    let path = path.as_ref();
    log::debug!("loading {}", path.display());
    let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: Some(path.to_path_buf()),
        source,
    })?;
    crate::pmu::parse_with(&source, options).map_err(|source| LoadError::Parse {
        path: Some(path.to_path_buf()),
        source,
    })
}
