use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection details for the external semantic classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ClassifierSettings {
    /// Overlay `CLASSIFIER_*` environment variables on top of these settings.
    pub fn with_env_overrides(mut self) -> Result<Self, SettingsError> {
        if let Ok(key) = env::var("CLASSIFIER_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(url) = env::var("CLASSIFIER_URL") {
            self.base_url = url;
        }
        if let Ok(model) = env::var("CLASSIFIER_MODEL") {
            self.model = model;
        }
        if let Ok(timeout) = env::var("CLASSIFIER_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.parse().map_err(|_| {
                SettingsError::Invalid("Invalid CLASSIFIER_TIMEOUT_SECONDS value".to_string())
            })?;
        }
        Ok(self)
    }

    /// A blank key counts as no key.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| SettingsError::Invalid(format!("classifier base_url: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SettingsError::Invalid(
                "classifier base_url must start with http or https".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(SettingsError::Invalid("classifier model cannot be empty".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(SettingsError::Invalid("classifier timeout must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Upper bound on posts per classifier call.
    pub max_batch_size: usize,
    pub base_output_tokens: u32,
    pub per_unit_output_tokens: u32,
    pub temperature: f32,
    /// Post text is cut to this many characters before sending; 0 disables the cap.
    pub max_text_chars: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_batch_size: 20,
            base_output_tokens: 500,
            per_unit_output_tokens: 150,
            temperature: 0.1,
            max_text_chars: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub root_selector: String,
    /// Content block selectors, most specific first.
    pub block_selectors: Vec<String>,
    pub text_selectors: Vec<String>,
    pub image_selector: String,
    pub debounce_ms: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            root_selector: "main".to_string(),
            block_selectors: vec![
                r#"article[data-testid="tweet"]"#.to_string(),
                r#"[data-testid="cellInnerDiv"]"#.to_string(),
                "article".to_string(),
            ],
            text_selectors: vec![
                r#"[data-testid="tweetText"]"#.to_string(),
                "div[lang]".to_string(),
                r#"[data-testid="card.wrapper"]"#.to_string(),
            ],
            image_selector: r#"[data-testid="tweetPhoto"] img, img[src*="/media/"]"#.to_string(),
            debounce_ms: 500,
        }
    }
}

/// What to do when a whole batch call fails in transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// One non-filtering "Batch Error" result per post.
    #[default]
    BatchError,
    /// Classify each post of the failed batch with the keyword heuristic.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub classifier: ClassifierSettings,
    pub batch: BatchSettings,
    pub scanner: ScannerSettings,
    pub fallback: FallbackPolicy,
    pub rules_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            classifier: ClassifierSettings::default(),
            batch: BatchSettings::default(),
            scanner: ScannerSettings::default(),
            fallback: FallbackPolicy::default(),
            rules_path: PathBuf::from("filters.json"),
        }
    }
}

impl Settings {
    /// Layer the optional config file, an `APP_ENV` specific file and `APP_` environment
    /// variables (`APP_CLASSIFIER__MODEL=...`), then apply `CLASSIFIER_*` overrides.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false));

        if let Ok(env_name) = env::var("APP_ENV") {
            let stem = path.with_extension("");
            let env_file = format!("{}.{}", stem.display(), env_name);
            builder = builder.add_source(File::with_name(&env_file).required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        let classifier = settings.classifier.clone().with_env_overrides()?;
        let settings = Settings { classifier, ..settings };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.classifier.validate()?;
        if self.batch.max_batch_size == 0 {
            return Err(SettingsError::Invalid("batch max_batch_size must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.batch.temperature) {
            return Err(SettingsError::Invalid("batch temperature must be within 0..=2".to_string()));
        }
        if self.scanner.block_selectors.is_empty() {
            return Err(SettingsError::Invalid("scanner needs at least one block selector".to_string()));
        }
        Ok(())
    }
}
