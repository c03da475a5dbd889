//! Configuration validation.

use pagehand_protocols::ProviderKind;

use crate::schema::Config;

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

        Self::validate_provider(config, &mut result);
        Self::validate_pipeline(config, &mut result);
        Self::validate_rate_limit(config, &mut result);
        Self::validate_session(config, &mut result);

        result
    }

    fn validate_provider(config: &Config, result: &mut ValidationResult) {
        if config.provider.kind.parse::<ProviderKind>().is_err() {
            result.add_error(ValidationError::new(
                "provider.kind",
                format!(
                    "Unknown provider '{}', expected 'claude' or 'openai'",
                    config.provider.kind
                ),
            ));
        }

        if config.provider.api_key.trim().is_empty() {
            result.add_warning(ValidationWarning::new(
                "provider.api_key",
                "API key is empty, model calls will fail until one is set",
            ));
        }

        if let Some(url) = config.provider.base_url() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "provider.base_url",
                    "base_url must start with http:// or https://",
                ));
            }
        }
    }

    fn validate_pipeline(config: &Config, result: &mut ValidationResult) {
        if config.pipeline.max_retries > 10 {
            result.add_warning(ValidationWarning::new(
                "pipeline.max_retries",
                "max_retries is very high (>10), failing commands will take long to settle",
            ));
        }

        if config.pipeline.model_timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "pipeline.model_timeout_seconds",
                "model_timeout_seconds must be greater than 0",
            ));
        }

        if config.pipeline.surface_timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "pipeline.surface_timeout_seconds",
                "surface_timeout_seconds must be greater than 0",
            ));
        }
    }

    fn validate_rate_limit(config: &Config, result: &mut ValidationResult) {
        if config.rate_limit.window_seconds == 0 {
            result.add_error(ValidationError::new(
                "rate_limit.window_seconds",
                "window_seconds must be greater than 0",
            ));
        }

        if config.rate_limit.max_calls == 0 {
            result.add_error(ValidationError::new(
                "rate_limit.max_calls",
                "max_calls must be greater than 0",
            ));
        }
    }

    fn validate_session(config: &Config, result: &mut ValidationResult) {
        if config.session.max_sessions == 0 {
            result.add_error(ValidationError::new(
                "session.max_sessions",
                "max_sessions must be greater than 0",
            ));
        }

        if config.session.max_messages == 0 || config.session.max_actions == 0 {
            result.add_warning(ValidationWarning::new(
                "session",
                "a zero history bound disables conversation context",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
