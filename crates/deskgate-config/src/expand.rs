//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a configuration value.
///
/// Literal strings pass through unchanged. An unset variable without a
/// default produces [`ConfigError::EnvVar`] naming the config field.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    let context = |name: &str| -> Result<Option<String>, ConfigError> {
        let (var, default) = match name.split_once(":-") {
            Some((var, default)) => (var, Some(default)),
            None => (name, None),
        };

        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(std::env::VarError::NotPresent) => match default {
                Some(default) => Ok(Some(default.to_owned())),
                None => Err(ConfigError::EnvVar {
                    field: field.to_owned(),
                    message: format!("${{{var}}} not set"),
                }),
            },
            Err(err) => Err(ConfigError::EnvVar {
                field: field.to_owned(),
                message: err.to_string(),
            }),
        }
    };

    match shellexpand::env_with_context(value, context) {
        Ok(expanded) => Ok(expanded.into_owned()),
        Err(err) => Err(err.cause),
    }
}
