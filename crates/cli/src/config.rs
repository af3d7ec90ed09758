//! `smartbin.toml` loading.
//!
//! Every section has defaults, so an absent file is a valid configuration.
//! After parsing, `SMARTBIN_*` environment variables override individual
//! fields, then `env:VAR` references are resolved.
//!
//! ```toml
//! [inference]
//! api_key = "env:GEMINI_API_KEY"
//! model = "gemini-1.5-flash"
//!
//! [storage]
//! backend = "rest"
//! url = "https://project.supabase.co"
//! api_key = "env:SUPABASE_ANON_KEY"
//!
//! [session]
//! path = ".smartbin/session.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Config file read when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "smartbin.toml";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("failed reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing env var {var} referenced by {field}")]
    MissingEnv { var: String, field: &'static str },

    #[error("missing inference API key (set inference.api_key or SMARTBIN_GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SmartbinConfig {
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub deposit: DepositConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct InferenceConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: smartbin_classify::gemini::DEFAULT_BASE_URL.to_string(),
            model: smartbin_classify::gemini::DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum StorageBackend {
    #[default]
    Memory,
    Rest,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rest" => Ok(StorageBackend::Rest),
            other => Err(ConfigError::Invalid(format!(
                "unknown storage backend '{}' (expected memory or rest)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct StorageConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub bucket: String,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            url: None,
            api_key: None,
            bucket: smartbin_pipeline::DEFAULT_BUCKET.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionConfig {
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".smartbin/session.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DepositConfig {
    /// Quality used when the user supplies only a weight.
    pub quality_percent: u8,
    /// Store samples classified by the offline fallback.
    pub persist_fallbacks: bool,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            quality_percent: 80,
            persist_fallbacks: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub port: u16,
    /// Requests per minute per client IP.
    pub rate_limit: u64,
    /// When set, every route except `/health` requires this key.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            rate_limit: 60,
            api_key: None,
        }
    }
}

impl SmartbinConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] if it exists.
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    pub(crate) fn load_with_env<E>(path: Option<&Path>, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                SmartbinConfig::default()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        cfg.apply_env(&env)?;
        cfg.resolve_refs(&env)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env<E>(&mut self, env: &E) -> Result<(), ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SMARTBIN_GEMINI_API_KEY") {
            self.inference.api_key = Some(v);
        }
        if let Some(v) = var("SMARTBIN_GEMINI_BASE_URL") {
            self.inference.base_url = v;
        }
        if let Some(v) = var("SMARTBIN_GEMINI_MODEL") {
            self.inference.model = v;
        }
        if let Some(v) = var("SMARTBIN_STORAGE_BACKEND") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = var("SMARTBIN_STORAGE_URL") {
            self.storage.url = Some(v);
        }
        if let Some(v) = var("SMARTBIN_STORAGE_KEY") {
            self.storage.api_key = Some(v);
        }
        if let Some(v) = var("SMARTBIN_SESSION_PATH") {
            self.session.path = PathBuf::from(v);
        }
        if let Some(v) = var("SMARTBIN_SERVICE_KEY") {
            self.server.api_key = Some(v);
        }
        if let Some(v) = var("SMARTBIN_RATE_LIMIT") {
            self.server.rate_limit = v.parse().map_err(|_| {
                ConfigError::Invalid(format!("SMARTBIN_RATE_LIMIT must be a number, got '{}'", v))
            })?;
        }
        Ok(())
    }

    fn resolve_refs<E>(&mut self, env: &E) -> Result<(), ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        resolve_opt(&mut self.inference.api_key, "inference.api_key", env)?;
        resolve_opt(&mut self.storage.url, "storage.url", env)?;
        resolve_opt(&mut self.storage.api_key, "storage.api_key", env)?;
        resolve_opt(&mut self.server.api_key, "server.api_key", env)?;
        self.inference.base_url = resolve_env_ref(&self.inference.base_url, "inference.base_url", env)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.inference.timeout_secs == 0 || self.storage.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be > 0".to_string()));
        }
        if self.deposit.quality_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "deposit.quality_percent must be 0..=100, got {}",
                self.deposit.quality_percent
            )));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.bucket must not be empty".to_string()));
        }
        if self.storage.backend == StorageBackend::Rest
            && (self.storage.url.is_none() || self.storage.api_key.is_none())
        {
            return Err(ConfigError::Invalid(
                "storage.backend = \"rest\" needs storage.url and storage.api_key".to_string(),
            ));
        }
        if self.server.rate_limit == 0 {
            return Err(ConfigError::Invalid("server.rate_limit must be > 0".to_string()));
        }
        Ok(())
    }

    /// The inference key, required by every command that calls the model.
    pub(crate) fn inference_api_key(&self) -> Result<&str, ConfigError> {
        self.inference
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub(crate) fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference.timeout_secs)
    }

    pub(crate) fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.timeout_secs)
    }
}

fn resolve_opt<E>(
    value: &mut Option<String>,
    field: &'static str,
    env: &E,
) -> Result<(), ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(v) = value.as_deref() {
        *value = Some(resolve_env_ref(v, field, env)?);
    }
    Ok(())
}

/// Replace an `env:VAR` value with the contents of `VAR`.
pub(crate) fn resolve_env_ref<E>(value: &str, field: &'static str, env: &E) -> Result<String, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    const PREFIX: &str = "env:";
    let Some(var) = value.strip_prefix(PREFIX) else {
        return Ok(value.to_string());
    };
    let var = var.trim();
    if var.is_empty() {
        return Err(ConfigError::Invalid(format!("invalid env ref in {}: {}", field, value)));
    }
    env(var).ok_or_else(|| ConfigError::MissingEnv {
        var: var.to_string(),
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{}", body).unwrap();
        f
    }

    #[test]
    fn absent_default_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("smartbin.toml");
        // An explicit path must exist.
        assert!(matches!(
            SmartbinConfig::load_with_env(Some(&missing), env_of(&[])),
            Err(ConfigError::Io { .. })
        ));

        let cfg = SmartbinConfig::default();
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert_eq!(cfg.storage.bucket, "waste-images");
        assert_eq!(cfg.inference.model, "gemini-1.5-flash");
        assert!(matches!(cfg.inference_api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn env_refs_are_resolved() {
        let f = write_config(
            r#"
[inference]
api_key = "env:MY_GEMINI_KEY"

[storage]
backend = "rest"
url = "https://proj.example.co"
api_key = "env:MY_ANON_KEY"
"#,
        );
        let cfg = SmartbinConfig::load_with_env(
            Some(f.path()),
            env_of(&[("MY_GEMINI_KEY", "g-123"), ("MY_ANON_KEY", "anon-456")]),
        )
        .unwrap();
        assert_eq!(cfg.inference_api_key().unwrap(), "g-123");
        assert_eq!(cfg.storage.api_key.as_deref(), Some("anon-456"));
        assert_eq!(cfg.storage.backend, StorageBackend::Rest);
    }

    #[test]
    fn explicit_env_overrides_file_values() {
        let f = write_config(
            r#"
[inference]
api_key = "env:UNSET_VAR"
model = "gemini-pro-vision"
"#,
        );
        let cfg = SmartbinConfig::load_with_env(
            Some(f.path()),
            env_of(&[
                ("SMARTBIN_GEMINI_API_KEY", "override"),
                ("SMARTBIN_SESSION_PATH", "/tmp/s.json"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.inference_api_key().unwrap(), "override");
        assert_eq!(cfg.inference.model, "gemini-pro-vision");
        assert_eq!(cfg.session.path, PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn missing_env_ref_is_an_error() {
        let f = write_config("[inference]\napi_key = \"env:NOPE\"\n");
        match SmartbinConfig::load_with_env(Some(f.path()), env_of(&[])) {
            Err(ConfigError::MissingEnv { var, field }) => {
                assert_eq!(var, "NOPE");
                assert_eq!(field, "inference.api_key");
            }
            other => panic!("expected MissingEnv, got {:?}", other),
        }
    }

    #[test]
    fn rest_backend_requires_url_and_key() {
        let f = write_config("[storage]\nbackend = \"rest\"\n");
        assert!(matches!(
            SmartbinConfig::load_with_env(Some(f.path()), env_of(&[])),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn quality_above_100_is_rejected() {
        let f = write_config("[deposit]\nquality_percent = 120\n");
        assert!(matches!(
            SmartbinConfig::load_with_env(Some(f.path()), env_of(&[])),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let f = write_config("[inference]\napikey = \"typo\"\n");
        assert!(matches!(
            SmartbinConfig::load_with_env(Some(f.path()), env_of(&[])),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn bad_backend_name_in_env_is_invalid() {
        assert!(matches!(
            SmartbinConfig::load_with_env(None, env_of(&[("SMARTBIN_STORAGE_BACKEND", "s3")])),
            Err(ConfigError::Invalid(_))
        ));
    }
}
