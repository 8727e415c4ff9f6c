//! Scanner options and their TOML form.
//!
//! ```toml
//! enabled = true
//! min_length = 3
//! max_delay_ms = 100
//! terminators = ["Enter"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default minimum burst length honoured by a terminator.
pub const DEFAULT_MIN_LENGTH: usize = 3;

/// Default maximum gap between two characters of one burst.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(100);

/// Errors loading or validating scanner options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scanner config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scanner config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid scanner option: {0}")]
    Invalid(String),
}

/// Classifier configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerOptions {
    /// When false, no event is intercepted at all.
    pub enabled: bool,
    /// Characters a burst needs before a terminator completes it.
    pub min_length: usize,
    /// Largest gap between consecutive characters of one burst.
    pub max_delay: Duration,
    /// Keys that end a burst (the scanner's suffix).
    pub terminators: Vec<String>,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            min_length: DEFAULT_MIN_LENGTH,
            max_delay: DEFAULT_MAX_DELAY,
            terminators: vec!["Enter".to_string()],
        }
    }
}

impl ScannerOptions {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_terminators<I, S>(mut self, terminators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminators = terminators.into_iter().map(Into::into).collect();
        self
    }

    /// How long an unterminated burst survives after its last character.
    pub fn idle_timeout(&self) -> Duration {
        self.max_delay * 2
    }

    pub fn is_terminator(&self, key: &str) -> bool {
        self.terminators.iter().any(|t| t == key)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length == 0 {
            return Err(ConfigError::Invalid("min_length must be at least 1".into()));
        }
        if self.max_delay.is_zero() {
            return Err(ConfigError::Invalid("max_delay must be greater than zero".into()));
        }
        if self.terminators.iter().all(|t| t.is_empty()) {
            return Err(ConfigError::Invalid("at least one terminator key is required".into()));
        }
        Ok(())
    }

    /// Parse and validate options from TOML. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: OptionsFile = toml::from_str(source)?;
        let options = Self::from(file);
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionsFile {
    enabled: bool,
    min_length: usize,
    max_delay_ms: u64,
    terminators: Vec<String>,
}

impl Default for OptionsFile {
    fn default() -> Self {
        let defaults = ScannerOptions::default();
        Self {
            enabled: defaults.enabled,
            min_length: defaults.min_length,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            terminators: defaults.terminators,
        }
    }
}

impl From<OptionsFile> for ScannerOptions {
    fn from(file: OptionsFile) -> Self {
        Self {
            enabled: file.enabled,
            min_length: file.min_length,
            max_delay: Duration::from_millis(file.max_delay_ms),
            terminators: file.terminators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let options = ScannerOptions::default();
        assert!(options.enabled);
        assert_eq!(options.min_length, 3);
        assert_eq!(options.max_delay, Duration::from_millis(100));
        assert_eq!(options.idle_timeout(), Duration::from_millis(200));
        assert!(options.is_terminator("Enter"));
        assert!(!options.is_terminator("Tab"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let options = ScannerOptions::from_toml_str("").unwrap();
        assert_eq!(options, ScannerOptions::default());
    }

    #[test]
    fn test_full_toml() {
        let options = ScannerOptions::from_toml_str(
            r#"
            enabled = false
            min_length = 8
            max_delay_ms = 40
            terminators = ["Enter", "Tab"]
            "#,
        )
        .unwrap();

        assert!(!options.enabled);
        assert_eq!(options.min_length, 8);
        assert_eq!(options.max_delay, Duration::from_millis(40));
        assert!(options.is_terminator("Tab"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ScannerOptions::from_toml_str("max_delay = 100").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for source in [
            "min_length = 0",
            "max_delay_ms = 0",
            "terminators = []",
        ] {
            let err = ScannerOptions::from_toml_str(source).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{source}");
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_length = 5").unwrap();

        let options = ScannerOptions::load(file.path()).unwrap();
        assert_eq!(options.min_length, 5);
        assert_eq!(options.max_delay, DEFAULT_MAX_DELAY);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScannerOptions::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
