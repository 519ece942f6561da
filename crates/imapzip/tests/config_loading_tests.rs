//! Table-driven tests for configuration loading and validation.

use imapzip::config::{load_config_from_str, validate_config};
use imapzip::{ExtractorError, MailAttachmentExtractor};

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading and validation should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        config_json: r#"{
            "host": "imap.example.com",
            "username": "robot",
            "auth": { "password": "pw" },
            "outputDirectory": "/var/spool/reports"
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_ntlm",
        config_json: r#"{
            "host": "exchange.example.com",
            "port": 1993,
            "username": "robot",
            "auth": { "passwordEnvVar": "PATH" },
            "folder": "Reports",
            "outputDirectory": "/var/spool/reports",
            "ntlm": { "domain": "CORP", "flags": 33285 },
            "debug": true
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "invalid_json",
        config_json: r#"{ "host": "#,
        should_succeed: false,
        expected_error: Some("parse"),
    },
    ConfigTestCase {
        name: "missing_output_directory",
        config_json: r#"{
            "host": "imap.example.com",
            "username": "robot",
            "auth": { "password": "pw" }
        }"#,
        should_succeed: false,
        expected_error: Some("outputDirectory"),
    },
    ConfigTestCase {
        name: "empty_folder",
        config_json: r#"{
            "host": "imap.example.com",
            "username": "robot",
            "auth": { "password": "pw" },
            "folder": "",
            "outputDirectory": "/out"
        }"#,
        should_succeed: false,
        expected_error: Some("folder"),
    },
    ConfigTestCase {
        name: "plaintext_transport",
        config_json: r#"{
            "host": "imap.example.com",
            "username": "robot",
            "auth": { "password": "pw" },
            "useTls": false,
            "outputDirectory": "/out"
        }"#,
        should_succeed: false,
        expected_error: Some("TLS"),
    },
    ConfigTestCase {
        name: "no_password_source",
        config_json: r#"{
            "host": "imap.example.com",
            "username": "robot",
            "auth": {},
            "outputDirectory": "/out"
        }"#,
        should_succeed: false,
        expected_error: Some("password"),
    },
];

#[test]
fn test_json_config_loading() {
    for case in CONFIG_TESTS {
        let result = load_config_from_str(case.config_json)
            .and_then(|config| validate_config(&config).map(|()| config));

        match (&result, case.should_succeed) {
            (Ok(_), true) => {}
            (Err(e), false) => {
                if let Some(expected) = case.expected_error {
                    assert!(
                        e.to_string().to_lowercase().contains(&expected.to_lowercase()),
                        "Test '{}': expected error containing '{}', got '{}'",
                        case.name,
                        expected,
                        e
                    );
                }
            }
            (Ok(_), false) => panic!("Test '{}': expected failure but succeeded", case.name),
            (Err(e), true) => panic!("Test '{}': expected success but got '{}'", case.name, e),
        }
    }
}

#[test]
fn test_constructor_rejects_invalid_config() {
    let result = MailAttachmentExtractor::with_credentials("", "robot", "pw", "INBOX", "/out");
    assert!(matches!(result, Err(ExtractorError::Configuration(_))));
}

#[test]
fn test_constructor_does_not_connect() {
    let extractor = MailAttachmentExtractor::with_ntlm(
        "imap.invalid",
        "robot",
        "pw",
        "INBOX",
        "/out",
        "CORP",
        imapzip::NTLM_DEFAULT_FLAGS,
    )
    .unwrap();
    assert!(!extractor.is_initialized());
    assert_eq!(extractor.folder(), "INBOX");
}
