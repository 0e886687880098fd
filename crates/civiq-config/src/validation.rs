// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: a usable mail domain, complete mailbox entries, positive
//! thresholds and intervals.

use crate::diagnostic::ConfigError;
use crate::model::CiviqConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CiviqConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let domain = config.service.domain.trim();
    if domain.is_empty() {
        errors.push(ConfigError::Validation {
            message: "service.domain must not be empty".to_string(),
        });
    } else if domain.contains('@') || domain.contains(char::is_whitespace) {
        errors.push(ConfigError::Validation {
            message: format!("service.domain `{domain}` is not a bare mail domain"),
        });
    }

    if config.requests.overdue_days == 0 {
        errors.push(ConfigError::Validation {
            message: "requests.overdue_days must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.attachments.root_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "attachments.root_dir must not be empty".to_string(),
        });
    }

    if config.attachments.max_filesize == 0 {
        errors.push(ConfigError::Validation {
            message: "attachments.max_filesize must be positive".to_string(),
        });
    }

    if !config.smtp.from_address.contains('@') {
        errors.push(ConfigError::Validation {
            message: format!(
                "smtp.from_address `{}` is not an e-mail address",
                config.smtp.from_address
            ),
        });
    }

    for (name, mailbox) in &config.mailboxes {
        if mailbox.host.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("mailboxes.{name}.host must not be empty"),
            });
        }
        if mailbox.login.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("mailboxes.{name}.login must not be empty"),
            });
        }
    }

    let intervals = [
        ("scheduler.mail_poll_secs", config.scheduler.mail_poll_secs),
        (
            "scheduler.overdue_sweep_secs",
            config.scheduler.overdue_sweep_secs,
        ),
        ("scheduler.notify_secs", config.scheduler.notify_secs),
        (
            "scheduler.fetch_timeout_secs",
            config.scheduler.fetch_timeout_secs,
        ),
    ];
    for (key, value) in intervals {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be positive"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MailboxConfig;

    #[test]
    fn default_config_validates() {
        let config = CiviqConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_domain_fails_validation() {
        let mut config = CiviqConfig::default();
        config.service.domain = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("service.domain"))
        ));
    }

    #[test]
    fn domain_with_at_sign_fails_validation() {
        let mut config = CiviqConfig::default();
        config.service.domain = "info@example.org".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn zero_overdue_days_fails_validation() {
        let mut config = CiviqConfig::default();
        config.requests.overdue_days = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("overdue_days"))
        ));
    }

    #[test]
    fn incomplete_mailbox_fails_validation() {
        let mut config = CiviqConfig::default();
        config.mailboxes.insert(
            "default".to_string(),
            MailboxConfig {
                host: "".to_string(),
                port: 993,
                login: "responses".to_string(),
                password: "secret".to_string(),
                use_ssl: true,
            },
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("mailboxes.default.host"))
        ));
    }

    #[test]
    fn zero_interval_fails_validation() {
        let mut config = CiviqConfig::default();
        config.scheduler.notify_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn info_address_defaults_to_domain() {
        let mut config = CiviqConfig::default();
        config.service.domain = "example.org".to_string();
        assert_eq!(config.service.info_address(), "info@example.org");
        config.service.info_address = Some("desk@example.org".to_string());
        assert_eq!(config.service.info_address(), "desk@example.org");
    }
}
