// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for config loading, layering and diagnostics.

use civiq_config::{CiviqConfig, load_and_validate_str, load_config_from_str};

#[test]
fn empty_input_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    assert_eq!(config.service.name, "civiq");
    assert_eq!(config.service.domain, "localhost");
    assert_eq!(config.requests.overdue_days, 16);
    assert!(config.mailboxes.is_empty());
    assert_eq!(config.scheduler.mail_poll_secs, 600);
}

#[test]
fn full_config_parses() {
    let toml = r#"
[service]
name = "sesame"
domain = "example.org"
log_level = "debug"

[mailboxes.default]
host = "imap.example.org"
login = "responses@example.org"
password = "hunter2"

[mailboxes.legacy]
host = "imap.old.example.org"
port = 143
login = "old"
password = "older"
use_ssl = false

[smtp]
host = "smtp.example.org"
from_address = "requests@example.org"

[requests]
overdue_days = 14

[attachments]
root_dir = "/srv/civiq/attachments"
max_filesize = 10485760

[storage]
database_path = "/srv/civiq/civiq.db"

[scheduler]
mail_poll_secs = 300
"#;
    let config = load_and_validate_str(toml).unwrap();
    assert_eq!(config.service.domain, "example.org");
    assert_eq!(config.mailboxes.len(), 2);

    let default_box = &config.mailboxes["default"];
    assert_eq!(default_box.host, "imap.example.org");
    assert_eq!(default_box.port, 993, "IMAP port should default to 993");
    assert!(default_box.use_ssl, "SSL should default to on");

    let legacy = &config.mailboxes["legacy"];
    assert_eq!(legacy.port, 143);
    assert!(!legacy.use_ssl);

    assert_eq!(config.requests.overdue_days, 14);
    assert_eq!(config.scheduler.mail_poll_secs, 300);
    assert_eq!(config.attachments.max_filesize, 10_485_760);
}

#[test]
fn unknown_key_is_rejected() {
    let toml = r#"
[requests]
overdue_dyas = 16
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(!errors.is_empty());
    let rendered = format!("{}", errors[0]);
    assert!(
        rendered.contains("overdue_dyas"),
        "error should name the bad key: {rendered}"
    );
}

#[test]
fn unknown_mailbox_key_is_rejected() {
    let toml = r#"
[mailboxes.default]
host = "imap.example.org"
login = "x"
password = "y"
use_tls = true
"#;
    assert!(load_and_validate_str(toml).is_err());
}

#[test]
fn invalid_type_is_rejected() {
    let toml = r#"
[requests]
overdue_days = "sixteen"
"#;
    assert!(load_and_validate_str(toml).is_err());
}

#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[service]
domain = "not a domain"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| format!("{e}").contains("service.domain"))
    );
}

#[test]
fn defaults_serialize_and_reload() {
    // The defaults must survive a TOML round trip, otherwise the figment
    // Serialized::defaults layer would diverge from the struct defaults.
    let config = CiviqConfig::default();
    let toml = toml::to_string(&config).unwrap();
    let reloaded = load_config_from_str(&toml).unwrap();
    assert_eq!(reloaded.requests.overdue_days, config.requests.overdue_days);
    assert_eq!(reloaded.service.domain, config.service.domain);
}
