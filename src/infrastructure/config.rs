use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::{BatchOptions, PersistMode, SimilaritySettings};
use crate::domain::imaging::DEFAULT_MAX_SIDE;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub supabase: SupabaseConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub cors: CorsConfig,
    pub pipelines: PipelinesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub bucket: String,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            bucket: "embedded-images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Cohere,
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cohere" => Ok(Self::Cohere),
            _ => Err(ConfigError::Invalid {
                key: "EMBEDDING_PROVIDER",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    /// Bumped whenever stored vectors stop being comparable with new ones.
    pub version: String,
    pub dimension: usize,
    pub api_key: String,
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Cohere,
            model: "embed-english-light-v3.0".to_string(),
            version: "v1".to_string(),
            dimension: 384,
            api_key: String::new(),
            base_url: "https://api.cohere.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub match_count: usize,
    pub resize_to: u32,
    pub max_side: u32,
    pub upload_folder: String,
    pub self_match_epsilon: f64,
    pub persist: PersistMode,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let defaults = SimilaritySettings::default();
        Self {
            match_count: defaults.match_count,
            resize_to: defaults.resize_to,
            max_side: defaults.max_side,
            upload_folder: defaults.upload_folder,
            self_match_epsilon: defaults.self_match_epsilon,
            persist: defaults.persist,
        }
    }
}

impl SearchConfig {
    pub fn settings(&self) -> SimilaritySettings {
        SimilaritySettings {
            match_count: self.match_count,
            resize_to: self.resize_to,
            max_side: self.max_side,
            upload_folder: self.upload_folder.clone(),
            self_match_epsilon: self.self_match_epsilon,
            persist: self.persist,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed in addition to the local development hosts.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub pace_ms: Option<u64>,
    pub error_budget: usize,
    pub show_progress: bool,
}

impl BatchConfig {
    fn new(batch_size: usize, pace_ms: Option<u64>) -> Self {
        Self {
            batch_size,
            pace_ms,
            error_budget: 10,
            show_progress: true,
        }
    }

    pub fn options(&self, name: &str) -> BatchOptions {
        let options = BatchOptions::new(name, self.batch_size, self.error_budget)
            .with_progress(self.show_progress);
        match self.pace_ms {
            Some(ms) => options.with_pace(Duration::from_millis(ms)),
            None => options,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(10, None)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub folder: String,
    pub batch: BatchConfig,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            folder: "v1".to_string(),
            // provider rate limit: 5 images per second
            batch: BatchConfig::new(5, Some(1000)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluateConfig {
    pub top_k: usize,
    pub batch: BatchConfig,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            top_k: 25,
            batch: BatchConfig::new(10, None),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub images_dir: PathBuf,
    pub folder: String,
    pub resize_to: u32,
    pub max_side: u32,
    pub batch: BatchConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("../images"),
            folder: "v1".to_string(),
            resize_to: 224,
            max_side: DEFAULT_MAX_SIDE,
            batch: BatchConfig::new(10, None),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelinesConfig {
    pub seed: SeedConfig,
    pub evaluate: EvaluateConfig,
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Loads `APP_CONFIG` (or `config/app.yaml` when present), then applies
    /// environment overrides. Call `dotenvy::dotenv()` first.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("APP_CONFIG").map(PathBuf::from).or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL") {
            self.supabase.url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup("SUPABASE_KEY") {
            self.supabase.key = key;
        }
        if let Some(key) = lookup("COHERE_API_KEY") {
            self.embedding.api_key = key;
        }
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::Invalid {
                key: "SERVER_PORT",
                value: port,
            })?;
        }
        Ok(())
    }

    /// Settings every external integration needs before startup, plus the
    /// numeric bounds the pipelines rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supabase.url.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_URL"));
        }
        if self.supabase.key.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_KEY"));
        }
        if self.embedding.api_key.is_empty() {
            return Err(ConfigError::Missing("COHERE_API_KEY"));
        }
        if self.http.timeout_seconds == 0 {
            return Err(invalid("http.timeout_seconds", self.http.timeout_seconds));
        }
        check_resize("search", self.search.resize_to, self.search.max_side)?;
        check_resize(
            "pipelines.upload",
            self.pipelines.upload.resize_to,
            self.pipelines.upload.max_side,
        )?;
        Ok(())
    }
}

fn invalid(key: &'static str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

/// The target must be positive and must fit under the side limit.
fn check_resize(section: &'static str, resize_to: u32, max_side: u32) -> Result<(), ConfigError> {
    if resize_to == 0 {
        return Err(invalid(section, format!("resize_to: {resize_to}")));
    }
    if max_side < resize_to {
        return Err(invalid(
            section,
            format!("max_side: {max_side} is below resize_to: {resize_to}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = AppConfig::default();

        assert_eq!(config.search.match_count, 10);
        assert_eq!(config.search.resize_to, 224);
        assert_eq!(config.search.persist, PersistMode::Inline);
        assert_eq!(config.supabase.bucket, "embedded-images");
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.http.timeout(), Duration::from_secs(10));

        let seed = config.pipelines.seed.batch.options("seed");
        assert_eq!(seed.batch_size, 5);
        assert_eq!(seed.pace, Some(Duration::from_secs(1)));
        assert_eq!(seed.error_budget, 10);

        let evaluate = config.pipelines.evaluate.batch.options("evaluate");
        assert_eq!(evaluate.batch_size, 10);
        assert_eq!(evaluate.pace, None);
        assert_eq!(config.pipelines.evaluate.top_k, 25);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = AppConfig::from_yaml(
            r#"
search:
  self_match_epsilon: 0.001
  persist: background
pipelines:
  upload:
    images_dir: /data/images
cors:
  allowed_origins: ["https://demo.example.com"]
"#,
        )
        .unwrap();

        assert_eq!(config.search.self_match_epsilon, 0.001);
        assert_eq!(config.search.persist, PersistMode::Background);
        assert_eq!(config.search.match_count, 10);
        assert_eq!(config.pipelines.upload.images_dir, PathBuf::from("/data/images"));
        assert_eq!(config.pipelines.upload.resize_to, 224);
        assert_eq!(config.cors.allowed_origins, vec!["https://demo.example.com"]);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SUPABASE_URL", "https://abc.supabase.co/"),
            ("SUPABASE_KEY", "service-key"),
            ("COHERE_API_KEY", "co-key"),
            ("SERVER_PORT", "8081"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.supabase.url, "https://abc.supabase.co");
        assert_eq!(config.supabase.key, "service-key");
        assert_eq!(config.embedding.api_key, "co-key");
        assert_eq!(config.server.port, 8081);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_port_and_missing_secrets() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|key| (key == "SERVER_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SERVER_PORT", .. }));

        assert!(matches!(
            AppConfig::default().validate(),
            Err(ConfigError::Missing("SUPABASE_URL"))
        ));
    }

    fn with_secrets(mut config: AppConfig) -> AppConfig {
        config.supabase.url = "https://abc.supabase.co".into();
        config.supabase.key = "service-key".into();
        config.embedding.api_key = "co-key".into();
        config
    }

    #[test]
    fn test_zero_sizes_and_timeouts_rejected() {
        let mut config = with_secrets(AppConfig::default());
        config.search.resize_to = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "search", .. })
        ));

        let mut config = with_secrets(AppConfig::default());
        config.pipelines.upload.resize_to = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "pipelines.upload", .. })
        ));

        let mut config = with_secrets(AppConfig::default());
        config.http.timeout_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "http.timeout_seconds", .. })
        ));
    }

    #[test]
    fn test_max_side_must_fit_the_target() {
        let config = with_secrets(
            AppConfig::from_yaml("search:\n  resize_to: 224\n  max_side: 100\n").unwrap(),
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "search", .. })
        ));

        let config = with_secrets(AppConfig::from_yaml("search:\n  max_side: 2048\n").unwrap());
        assert!(config.validate().is_ok());
        assert_eq!(config.search.settings().max_side, 2048);
        assert_eq!(config.pipelines.upload.max_side, DEFAULT_MAX_SIDE);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!("openai".parse::<EmbeddingProviderKind>().is_err());
        assert_eq!(
            "Cohere".parse::<EmbeddingProviderKind>().unwrap(),
            EmbeddingProviderKind::Cohere
        );
    }
}
