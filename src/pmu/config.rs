//! Layered configuration for PMU parsing and the CLI.
//!
//! `defaults/pmu.default.toml` is embedded into the binary so the documented defaults and
//! the runtime behavior stay in sync. Callers layer user files and single-key overrides on
//! top of it via [`Loader`] before deserializing into [`PmuConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

use crate::pmu::building::ParseOptions;
use crate::pmu::markers::Markers;

const DEFAULT_TOML: &str = include_str!("../../defaults/pmu.default.toml");

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PmuConfig {
    pub markers: Markers,
    #[serde(default)]
    pub parsing: ParsingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ParsingConfig {
    #[serde(default)]
    pub param_count: Option<usize>,
}

/// How the CLI renders a parsed log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Json,
    Summary,
}

impl PmuConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            markers: self.markers,
            param_count: self.parsing.param_count,
        }
    }
}

impl From<&PmuConfig> for ParseOptions {
    fn from(config: &PmuConfig) -> Self {
        config.parse_options()
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. `parsing.param_count` from the command line.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    ///
    /// Fails if two markers end up with the same value.
    pub fn build(self) -> Result<PmuConfig, ConfigError> {
        let config: PmuConfig = self.builder.build()?.try_deserialize()?;
        if let Some(value) = config.markers.duplicate() {
            return Err(ConfigError::Message(format!(
                "marker value {} is assigned to more than one marker",
                value
            )));
        }
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<PmuConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.markers, Markers::SIEMENS);
        assert_eq!(config.parsing.param_count, None);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.pretty);
        assert_eq!(config.parse_options(), ParseOptions::default());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("parsing.param_count", 5_i64)
            .expect("override to apply")
            .set_override("output.format", "summary")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.parsing.param_count, Some(5));
        assert_eq!(config.output.format, OutputFormat::Summary);
        assert_eq!(ParseOptions::from(&config).param_count, Some(5));
    }

    #[test]
    fn user_file_overrides_markers() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[markers]\nfooter_open = 7003").unwrap();

        let config = Loader::new().with_file(file.path()).build().unwrap();
        assert_eq!(config.markers.footer_open, 7003);
        assert_eq!(config.markers.footer_close, 6003);
    }

    #[test]
    fn rejects_duplicate_marker_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[markers]\nfooter_open = 5000").unwrap();

        let err = Loader::new().with_file(file.path()).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "marker value 5000 is assigned to more than one marker"
        );
    }

    #[test]
    fn rejects_duplicate_marker_override() {
        let result = Loader::new()
            .set_override("markers.info_close", 6003_i64)
            .expect("override to apply")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = Loader::new()
            .with_optional_file(dir.path().join("absent.toml"))
            .build()
            .unwrap();
        assert_eq!(config, load_defaults().unwrap());
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Loader::new()
            .with_file(dir.path().join("absent.toml"))
            .build()
            .is_err());
    }
}
