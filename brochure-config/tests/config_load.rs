use brochure_common::observability::LogFormat;
use brochure_common::LlmConfig;
use brochure_config::BrochureConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
llm:
  provider: openai
  model: gemini-2.5-flash
  api_key: "${BROCHURE_TEST_GEMINI_KEY}"
server:
  host: 127.0.0.1
  port: 8080
fetch:
  timeout_secs: 5
logging:
  format: json
  emit_stderr: false
  "#;
    let p = write_yaml(&tmp, "brochure.yaml", file_yaml);

    temp_env::with_var("BROCHURE_TEST_GEMINI_KEY", Some("from-env"), || {
        let config = BrochureConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load service config");

        assert_eq!(config.llm.api_key(), "from-env");
        assert!(config.llm.validate().is_ok());
        assert_eq!(config.server.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.logging.emit_stderr);
    });
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "brochure.yaml", "server:\n  port: 8080\n");

    temp_env::with_vars(
        [
            ("BROCHURE__SERVER__PORT", Some("9001")),
            ("BROCHURE__FETCH__USER_AGENT", Some("brochure-test/1.0")),
        ],
        || {
            let config = BrochureConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load service config");

            assert_eq!(config.server.port, 9001);
            assert_eq!(config.fetch.user_agent, "brochure-test/1.0");
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = BrochureConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults load");

    assert_eq!(config.server.port, 8000);
    assert_eq!(config.llm, LlmConfig::default());
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = BrochureConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();

    assert!(result.is_err());
}

#[test]
#[serial]
fn all_digit_env_value_stays_a_string() {
    temp_env::with_vars(
        [
            ("BROCHURE__LLM__PROVIDER", Some("gemini")),
            ("BROCHURE__LLM__API_KEY", Some("1234567890")),
            ("BROCHURE__LLM__TEMPERATURE", Some("0.5")),
            ("BROCHURE__FETCH__TIMEOUT_SECS", Some("25")),
            ("BROCHURE__LOGGING__EMIT_STDERR", Some("false")),
        ],
        || {
            let config = BrochureConfigLoader::new().load().expect("numeric key loads");

            assert_eq!(config.llm.api_key(), "1234567890");
            assert!(matches!(
                config.llm,
                LlmConfig::Gemini { temperature: Some(t), .. } if t == 0.5
            ));
            assert_eq!(config.fetch.timeout_secs, 25);
            assert!(!config.logging.emit_stderr);
        },
    );
}

#[test]
#[serial]
fn cors_origins_accept_comma_separated_env_list() {
    temp_env::with_var(
        "BROCHURE__SERVER__CORS_ORIGINS",
        Some("https://acme.test, https://www.acme.test"),
        || {
            let config = BrochureConfigLoader::new().load().expect("origins load");
            assert_eq!(
                config.server.cors_origins,
                vec!["https://acme.test", "https://www.acme.test"]
            );
        },
    );
}
