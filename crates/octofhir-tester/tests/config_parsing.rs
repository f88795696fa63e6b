use std::{env, fs};

use octofhir_tester::config::{ClientAuth, Encoding, loader::load_config};

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("octofhir-tester.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8091
body_limit_bytes = 2048

[client]
base_url = "https://hapi.example.org/baseR4"
timeout_ms = 5000
encoding = "xml"

[client.auth]
type = "bearer"
token = "abc"

[fhir]
extra_resource_types = ["Widget"]

[ui]
debug = true

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8091);
    assert_eq!(cfg.server.body_limit_bytes, 2048);
    assert_eq!(cfg.client.base_url, "https://hapi.example.org/baseR4");
    assert_eq!(cfg.client.timeout_ms, 5000);
    assert_eq!(cfg.client.encoding, Encoding::Xml);
    assert!(matches!(cfg.client.auth, Some(ClientAuth::Bearer { ref token }) if token == "abc"));
    assert_eq!(cfg.fhir.extra_resource_types, vec!["Widget".to_string()]);
    assert!(cfg.ui.debug);
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("OCTOFHIR_TESTER__CLIENT__TIMEOUT_MS", "750");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.client.timeout_ms, 750);
    unsafe {
        env::remove_var("OCTOFHIR_TESTER__CLIENT__TIMEOUT_MS");
    }

    // 3) Invalid base URL should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[client]
base_url = "file:///etc/fhir"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("http or https"));
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");
    let cfg = load_config(path.to_str()).expect("defaults are valid");
    assert_eq!(cfg.client.base_url, "http://localhost:8080/fhir");
    assert!(cfg.client.auth.is_none());
    assert!(!cfg.ui.debug);
}
