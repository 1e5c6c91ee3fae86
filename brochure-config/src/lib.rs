//! Loader for service configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (every section is optional),
//! 2. a YAML file (`brochure.yaml` by convention) or inline YAML,
//! 3. `BROCHURE__`-prefixed environment variables, `__` separating nesting
//!    levels (`BROCHURE__SERVER__PORT=9000`). Values stay strings until the
//!    typed field asks for a number or bool; `BROCHURE__SERVER__CORS_ORIGINS`
//!    takes a comma-separated list.
//!
//! After merging, every string value has `${VAR}` placeholders expanded from
//! the process environment, so `api_key: "${GEMINI_API_KEY}"` resolves at load
//! time.
use brochure_common::observability::LogFormat;
use brochure_common::LlmConfig;
use config::{Config, ConfigError, Environment, File, Source, Value, ValueKind};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_CONFIG_FILE: &str = "brochure.yaml";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36";

#[derive(Debug, Default, Deserialize)]
pub struct BrochureConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins", deserialize_with = "origin_list")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_emit_stderr")]
    pub emit_stderr: bool,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            emit_stderr: default_emit_stderr(),
            filter: default_filter(),
            dir: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://localhost:3001".into(),
    ]
}
/// A YAML sequence, or one comma-separated string from the environment.
fn origin_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Origins {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Origins::deserialize(deserializer)? {
        Origins::List(list) => list,
        Origins::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect(),
    })
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_emit_stderr() -> bool {
    true
}
fn default_filter() -> String {
    "info".into()
}

/// Resolve `${VAR}` placeholders in every string of the merged tree. Values
/// that themselves contain placeholders are expanded again, up to a fixed depth.
fn expand_placeholders(node: &mut Value) {
    match &mut node.kind {
        ValueKind::String(text) if text.contains('$') => *text = expand_string(text),
        ValueKind::Array(items) => items.iter_mut().for_each(expand_placeholders),
        ValueKind::Table(fields) => fields.values_mut().for_each(expand_placeholders),
        _ => {}
    }
}

fn expand_string(raw: &str) -> String {
    let mut current = raw.to_owned();
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        // Unset variables leave the text untouched.
        let Ok(next) = shellexpand::env(&current) else {
            break;
        };
        if next == current {
            break;
        }
        current = next.into_owned();
    }
    current
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct BrochureConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for BrochureConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl BrochureConfigLoader {
    /// Start with no file sources; environment overrides are always applied last.
    ///
    /// ```
    /// use brochure_config::BrochureConfigLoader;
    ///
    /// let config = BrochureConfigLoader::new()
    ///     .with_yaml_str("server:\n  port: 9100")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.server.port, 9100);
    /// assert_eq!(config.fetch.timeout_secs, 10);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when absent, so headless
    /// deployments can rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use brochure_common::LlmConfig;
    /// use brochure_config::BrochureConfigLoader;
    ///
    /// let cfg = BrochureConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// llm:
    ///   provider: gemini
    ///   model: gemini-2.5-flash
    ///   api_key: example
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(matches!(cfg.llm, LlmConfig::Gemini { .. }));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use brochure_config::BrochureConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_LLM_KEY", "injected-from-env"); }
    ///
    /// let config = BrochureConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   provider: openai
    ///   model: gpt-4o-mini
    ///   api_key: "${DOCTEST_LLM_KEY}"
    ///   endpoint: https://api.openai.com/v1/
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.llm.api_key(), "injected-from-env");
    /// assert_eq!(config.llm.model(), "gpt-4o-mini");
    ///
    /// unsafe { std::env::remove_var("DOCTEST_LLM_KEY"); }
    /// ```
    pub fn load(self) -> Result<BrochureConfig, ConfigError> {
        let merged = self
            .builder
            .add_source(Environment::with_prefix("BROCHURE").separator("__"))
            .build()?;

        let mut tree = Value::new(None, ValueKind::Table(merged.collect()?));
        expand_placeholders(&mut tree);
        tree.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    #[test]
    fn api_key_placeholder_resolves_inside_llm_section() {
        temp_env::with_var("BROCHURE_TEST_KEY", Some("sk-live"), || {
            let llm = Map::from([
                ("provider".to_string(), Value::from("gemini")),
                ("api_key".to_string(), Value::from("${BROCHURE_TEST_KEY}")),
            ]);
            let mut tree = Value::from(Map::from([("llm".to_string(), Value::from(llm))]));
            expand_placeholders(&mut tree);

            let cfg: BrochureConfig = tree.try_deserialize().unwrap();
            assert_eq!(cfg.llm.api_key(), "sk-live");
            assert_eq!(cfg.llm.provider_name(), "gemini");
        });
    }

    #[test]
    fn nested_placeholders_expand_until_stable() {
        temp_env::with_vars(
            [
                ("BROCHURE_TEST_REGION", Some("eu")),
                ("BROCHURE_TEST_HOST", Some("${BROCHURE_TEST_REGION}.example.com")),
            ],
            || {
                assert_eq!(
                    expand_string("https://${BROCHURE_TEST_HOST}/v1/"),
                    "https://eu.example.com/v1/"
                );
            },
        );
    }

    #[test]
    fn self_referencing_placeholders_terminate() {
        temp_env::with_vars(
            [("BROCHURE_TEST_A", Some("${BROCHURE_TEST_B}")), ("BROCHURE_TEST_B", Some("${BROCHURE_TEST_A}"))],
            || {
                let out = expand_string("key=${BROCHURE_TEST_A}");
                assert!(out.starts_with("key=${"));
            },
        );
    }

    #[test]
    fn unset_placeholder_is_kept_verbatim() {
        assert_eq!(
            expand_string("${BROCHURE_TEST_NEVER_SET}"),
            "${BROCHURE_TEST_NEVER_SET}"
        );
    }

    #[test]
    fn defaults_cover_every_section() {
        let cfg = BrochureConfig::default();
        assert_eq!(cfg.server.bind_addr(), "0.0.0.0:8000");
        assert_eq!(cfg.fetch.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.server.cors_origins.len(), 2);
        assert!(cfg.logging.emit_stderr);
        assert_eq!(cfg.llm, LlmConfig::default());
    }
}
