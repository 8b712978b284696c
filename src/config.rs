use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::summarization::DEFAULT_API_VERSION;

const DEFAULT_SUMMARY_DIR: &str = "summaries";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_LOCATOR_TTL_MINUTES: i64 = 10;
const DEFAULT_EXTERNAL_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_MAX_POLLS: u32 = 120;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Configuration was already installed in the global cache.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for the summarization server.
pub struct Config {
    /// Azure Storage connection string used for uploaded documents.
    pub storage_connection_string: String,
    /// Blob container receiving canonical documents.
    pub blob_container: String,
    /// Form Recognizer resource endpoint.
    pub formrecognizer_endpoint: String,
    /// Form Recognizer subscription key.
    pub formrecognizer_key: String,
    /// Azure OpenAI resource endpoint.
    pub openai_endpoint: String,
    /// Azure OpenAI API key.
    pub openai_api_key: String,
    /// Chat model deployment name.
    pub openai_deployment: String,
    /// Azure OpenAI REST API version.
    pub openai_api_version: String,
    /// Basic auth user name.
    pub app_username: String,
    /// Basic auth password.
    pub app_password: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Directory receiving run-scoped summary artifacts.
    pub summary_dir: PathBuf,
    /// Parent directory for per-run scratch space; the system temp dir when unset.
    pub work_dir: Option<PathBuf>,
    /// Request body ceiling for uploads.
    pub max_upload_bytes: usize,
    /// Lifetime of blob read locators, in minutes.
    pub locator_ttl_minutes: i64,
    /// Attempts per external call, first attempt included.
    pub external_max_attempts: u32,
    /// Delay between extraction status polls, in milliseconds.
    pub extraction_poll_interval_ms: u64,
    /// Extraction status polls before giving up.
    pub extraction_max_polls: u32,
    /// Optional bound on a whole pipeline run, in seconds.
    pub request_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("blob_container", &self.blob_container)
            .field("formrecognizer_endpoint", &self.formrecognizer_endpoint)
            .field("openai_endpoint", &self.openai_endpoint)
            .field("openai_deployment", &self.openai_deployment)
            .field("openai_api_version", &self.openai_api_version)
            .field("server_port", &self.server_port)
            .field("summary_dir", &self.summary_dir)
            .field("work_dir", &self.work_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("locator_ttl_minutes", &self.locator_ttl_minutes)
            .field("external_max_attempts", &self.external_max_attempts)
            .field("extraction_poll_interval_ms", &self.extraction_poll_interval_ms)
            .field("extraction_max_polls", &self.extraction_max_polls)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };
        Ok(Self {
            storage_connection_string: source.required("AZURE_STORAGE_CONNECTION_STRING")?,
            blob_container: source.required("AZURE_BLOB_CONTAINER")?,
            formrecognizer_endpoint: source.required("AZURE_FORMRECOGNIZER_ENDPOINT")?,
            formrecognizer_key: source.required("AZURE_FORMRECOGNIZER_KEY")?,
            openai_endpoint: source.required("AZURE_OPENAI_ENDPOINT")?,
            openai_api_key: source.required("AZURE_OPENAI_API_KEY")?,
            openai_deployment: source.required("AZURE_OPENAI_DEPLOYMENT")?,
            openai_api_version: source
                .optional("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            app_username: source.required("APP_USERNAME")?,
            app_password: source.required("APP_PASSWORD")?,
            server_port: source.parsed("SERVER_PORT")?,
            summary_dir: source
                .optional("SUMMARY_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_SUMMARY_DIR), PathBuf::from),
            work_dir: source.optional("WORK_DIR").map(PathBuf::from),
            max_upload_bytes: source
                .positive("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            locator_ttl_minutes: source
                .positive("LOCATOR_TTL_MINUTES")?
                .unwrap_or(DEFAULT_LOCATOR_TTL_MINUTES),
            external_max_attempts: source
                .positive("EXTERNAL_MAX_ATTEMPTS")?
                .unwrap_or(DEFAULT_EXTERNAL_MAX_ATTEMPTS),
            extraction_poll_interval_ms: source
                .parsed("EXTRACTION_POLL_INTERVAL_MS")?
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            extraction_max_polls: source
                .positive("EXTRACTION_MAX_POLLS")?
                .unwrap_or(DEFAULT_MAX_POLLS),
            request_timeout_secs: source.positive("REQUEST_TIMEOUT_SECS")?,
        })
    }
}

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.optional(key)
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string()))
            })
            .transpose()
    }

    fn positive<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr + PartialOrd + Default,
    {
        match self.parsed::<T>(key)? {
            Some(value) if value <= T::default() => Err(ConfigError::InvalidValue(key.to_string())),
            other => Ok(other),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Merge `.env` into the process environment, returning the file that was read.
///
/// Must run before anything else reads the environment, tracing setup included. Variables
/// already set in the environment win over the file.
pub fn load_env_file() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Build configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    let config = Config::from_env()?;
    tracing::debug!(
        container = %config.blob_container,
        deployment = %config.openai_deployment,
        api_version = %config.openai_api_version,
        server_port = ?config.server_port,
        summary_dir = %config.summary_dir.display(),
        max_upload_bytes = config.max_upload_bytes,
        "Loaded configuration"
    );
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    Ok(get_config())
}

/// Build a lookup over fixed pairs; used by tests and tools that bypass the environment.
pub fn lookup_from_pairs<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [(&str, &str); 9] = [
        (
            "AZURE_STORAGE_CONNECTION_STRING",
            "AccountName=acme;AccountKey=a2V5",
        ),
        ("AZURE_BLOB_CONTAINER", "legal-docs"),
        ("AZURE_FORMRECOGNIZER_ENDPOINT", "https://fr.example"),
        ("AZURE_FORMRECOGNIZER_KEY", "fr-key"),
        ("AZURE_OPENAI_ENDPOINT", "https://oai.example"),
        ("AZURE_OPENAI_API_KEY", "oai-key"),
        ("AZURE_OPENAI_DEPLOYMENT", "gpt-legal"),
        ("APP_USERNAME", "admin"),
        ("APP_PASSWORD", "hunter2"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Result<Config, ConfigError> {
        let pairs: Vec<(&str, &str)> = REQUIRED.iter().chain(extra).copied().collect();
        Config::from_lookup(lookup_from_pairs(pairs))
    }

    #[test]
    fn applies_defaults_for_optional_values() {
        let config = with(&[]).expect("config");
        assert_eq!(config.openai_api_version, DEFAULT_API_VERSION);
        assert_eq!(config.summary_dir, PathBuf::from("summaries"));
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.locator_ttl_minutes, 10);
        assert_eq!(config.external_max_attempts, 2);
        assert_eq!(config.extraction_max_polls, 120);
        assert!(config.server_port.is_none());
        assert!(config.work_dir.is_none());
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn reports_first_missing_variable() {
        let pairs: Vec<(&str, &str)> = REQUIRED
            .iter()
            .copied()
            .filter(|(key, _)| *key != "APP_PASSWORD")
            .collect();
        let error = Config::from_lookup(lookup_from_pairs(pairs)).expect_err("missing");
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "APP_PASSWORD"));
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let pairs: Vec<(&str, &str)> = REQUIRED
            .iter()
            .copied()
            .map(|(key, value)| if key == "AZURE_BLOB_CONTAINER" { (key, "  ") } else { (key, value) })
            .collect();
        let error = Config::from_lookup(lookup_from_pairs(pairs)).expect_err("blank");
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "AZURE_BLOB_CONTAINER"));
    }

    #[test]
    fn rejects_unparseable_and_zero_limits() {
        let error = with(&[("SERVER_PORT", "eighty")]).expect_err("port");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "SERVER_PORT"));

        let error = with(&[("EXTERNAL_MAX_ATTEMPTS", "0")]).expect_err("attempts");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "EXTERNAL_MAX_ATTEMPTS"));
    }

    #[test]
    fn parses_overrides() {
        let config = with(&[
            ("SERVER_PORT", "8080"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("REQUEST_TIMEOUT_SECS", "90"),
            ("WORK_DIR", "/var/tmp/lexsum"),
        ])
        .expect("config");
        assert_eq!(config.server_port, Some(8080));
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.request_timeout_secs, Some(90));
        assert_eq!(config.work_dir, Some(PathBuf::from("/var/tmp/lexsum")));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?}", with(&[]).expect("config"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("oai-key"));
        assert!(!rendered.contains("a2V5"));
    }
}
