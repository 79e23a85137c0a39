// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::HeraldConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with all collected validation errors (does not fail fast).
pub fn validate_config(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate gateway.host is not empty and looks like an IP or hostname
    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // An empty app_secret is almost certainly a templating mistake;
    // absent is allowed (webhook endpoint rejects everything until set).
    if let Some(secret) = &config.provider.app_secret
        && secret.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "provider.app_secret must not be empty when set".to_string(),
        });
    }

    if let Some(token) = &config.provider.verify_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "provider.verify_token must not be empty when set".to_string(),
        });
    }

    // Validate api_version has the provider's `v<major>.<minor>` shape
    let version = config.provider.api_version.trim();
    let well_formed = version
        .strip_prefix('v')
        .map(|rest| {
            let mut parts = rest.split('.');
            let major_ok = parts
                .next()
                .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
            let minor_ok = parts
                .next()
                .is_none_or(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
            major_ok && minor_ok && parts.next().is_none()
        })
        .unwrap_or(false);
    if !well_formed {
        errors.push(ConfigError::Validation {
            message: format!(
                "provider.api_version `{version}` must look like `v23.0`",
            ),
        });
    }

    if config.ingest.event_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.event_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.ingest.delivery_retention_hours == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.delivery_retention_hours must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = HeraldConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = HeraldConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn empty_app_secret_fails_validation() {
        let mut config = HeraldConfig::default();
        config.provider.app_secret = Some("   ".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("app_secret"))
        ));
    }

    #[test]
    fn absent_app_secret_is_allowed() {
        let config = HeraldConfig::default();
        assert!(config.provider.app_secret.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn malformed_api_version_fails_validation() {
        let mut config = HeraldConfig::default();
        config.provider.api_version = "23.0".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("api_version"))
        ));
    }

    #[test]
    fn major_only_api_version_passes() {
        let mut config = HeraldConfig::default();
        config.provider.api_version = "v23".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_event_timeout_fails_validation() {
        let mut config = HeraldConfig::default();
        config.ingest.event_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("event_timeout_secs"))
        ));
    }
}
