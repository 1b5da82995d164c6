//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, StorageMode};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError::InvalidValue`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_observer(config, &mut result);
        Self::validate_probe(config, &mut result);
        Self::validate_storage(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_observer(config: &Config, result: &mut ValidationResult) {
        let observer = &config.observer;

        if observer.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "observer.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }

        if observer.debounce_ms < observer.poll_interval_ms {
            result.add_error(ValidationError::new(
                "observer.debounce_ms",
                "debounce_ms must not be shorter than poll_interval_ms",
            ));
        }

        if observer.max_wait_ms <= observer.debounce_ms {
            result.add_error(ValidationError::new(
                "observer.max_wait_ms",
                "max_wait_ms must be longer than debounce_ms",
            ));
        }

        if observer.min_response_chars == 0 {
            result.add_warning(ValidationWarning::new(
                "observer.min_response_chars",
                "min_response_chars is 0, empty responses will be saved while still streaming",
            ));
        }

        if observer.allow_global_scan {
            result.add_warning(ValidationWarning::new(
                "observer.allow_global_scan",
                "global response scan is enabled, older history may be paired with new prompts",
            ));
        }
    }

    fn validate_probe(config: &Config, result: &mut ValidationResult) {
        let probe = &config.probe;

        if probe.attachment_min_size == 0 {
            result.add_error(ValidationError::new(
                "probe.attachment_min_size",
                "attachment_min_size must be greater than 0",
            ));
        }

        if probe.artifact_min_size == 0 {
            result.add_error(ValidationError::new(
                "probe.artifact_min_size",
                "artifact_min_size must be greater than 0",
            ));
        }

        if probe.sibling_scan_limit == 0 && probe.ancestor_scan_depth == 0 {
            result.add_warning(ValidationWarning::new(
                "probe",
                "sibling and ancestor scans are both disabled, responses can only be found by mutation",
            ));
        }
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        let storage = &config.storage;

        if storage.root_folder_name.trim().is_empty() {
            result.add_error(ValidationError::new(
                "storage.root_folder_name",
                "root_folder_name cannot be empty",
            ));
        }

        match storage.mode {
            StorageMode::Folder => {
                let missing = storage
                    .folder
                    .as_deref()
                    .map(|f| f.trim().is_empty())
                    .unwrap_or(true);
                if missing {
                    result.add_error(ValidationError::new(
                        "storage.folder",
                        "folder is required when mode = \"folder\"",
                    ));
                }
            }
            StorageMode::Drive => {
                result.add_warning(ValidationWarning::new(
                    "storage.mode",
                    "drive backend is not configured, saves will fail",
                ));
            }
            StorageMode::Local => {}
        }

        if storage.state_path.trim().is_empty() {
            result.add_error(ValidationError::new(
                "storage.state_path",
                "state_path cannot be empty",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = config.logging.level.to_ascii_lowercase();
        if !valid_levels.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, valid_levels
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
