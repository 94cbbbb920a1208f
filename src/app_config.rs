use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation backend settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Pipeline sizing and progress settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Collections to translate, in processing order
    #[serde(default = "default_collections")]
    pub collections: Vec<CollectionConfig>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend (Ollama) configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Service endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Prompt template
    /// Placeholders: {source_language}, {target_language}, {text}
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            prompt: default_prompt(),
        }
    }
}

/// Pipeline sizing, progress and resume settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Upper bound on parallel execution units
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Hard safety ceiling on documents per batch
    #[serde(default = "default_batch_size_ceiling")]
    pub batch_size_ceiling: usize,

    /// Minimum interval between two progress renders
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,

    /// Fixed worker count instead of the probed one
    #[serde(default)]
    pub worker_override: Option<usize>,

    /// Fixed batch size instead of the probed one (still capped by the ceiling)
    #[serde(default)]
    pub batch_size_override: Option<usize>,

    /// Only enumerate documents that do not carry the marker field yet
    #[serde(default = "default_true")]
    pub skip_translated: bool,

    /// Field stamped with the target language once a document is translated
    #[serde(default = "default_marker_field")]
    pub marker_field: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            batch_size_ceiling: default_batch_size_ceiling(),
            progress_interval_secs: default_progress_interval_secs(),
            worker_override: None,
            batch_size_override: None,
            skip_translated: true,
            marker_field: default_marker_field(),
        }
    }
}

impl PipelineConfig {
    /// Progress throttle interval
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }
}

/// Which fields of a collection carry translatable text
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CollectionConfig {
    /// Collection name in the catalog
    pub name: String,

    /// Top-level text fields
    #[serde(default)]
    pub text_fields: Vec<String>,

    /// Nested list-of-lists structure (e.g. seasons -> episodes)
    #[serde(default)]
    pub nested: Option<NestedTextConfig>,
}

impl CollectionConfig {
    /// A collection with only top-level text fields
    pub fn flat(name: &str, text_fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            text_fields: text_fields.iter().map(|f| f.to_string()).collect(),
            nested: None,
        }
    }

    /// Attach a nested structure
    pub fn with_nested(mut self, nested: NestedTextConfig) -> Self {
        self.nested = Some(nested);
        self
    }
}

/// Shape of a nested structure holding translatable sub-documents
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NestedTextConfig {
    /// Top-level field holding the outer list (e.g. "seasons")
    pub field: String,

    /// Field of each outer element holding the inner list (e.g. "episodes")
    pub items_field: String,

    /// Text fields of each inner element (e.g. "title", "overview")
    pub text_fields: Vec<String>,
}

impl Default for NestedTextConfig {
    fn default() -> Self {
        Self {
            field: "seasons".to_string(),
            items_field: "episodes".to_string(),
            text_fields: vec!["title".to_string(), "overview".to_string()],
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map to the `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_prompt() -> String {
    "Translate the following text from {source_language} to {target_language}. Reply with the translation only.\n\n{text}".to_string()
}

fn default_max_workers() -> usize {
    4
}

fn default_batch_size_ceiling() -> usize {
    20
}

fn default_progress_interval_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_marker_field() -> String {
    "translated_to".to_string()
}

fn default_collections() -> Vec<CollectionConfig> {
    vec![
        CollectionConfig::flat("movies", &["description"]),
        CollectionConfig::flat("series", &["description"]).with_nested(NestedTextConfig::default()),
    ]
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "ru".to_string(),
            provider: ProviderConfig::default(),
            pipeline: PipelineConfig::default(),
            collections: default_collections(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load the configuration file, or write and return the defaults when it
    /// does not exist yet
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let config: Config = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::get_language_name(&self.source_language)?;
        crate::language_utils::get_language_name(&self.target_language)?;
        if crate::language_utils::language_codes_match(&self.source_language, &self.target_language) {
            return Err(anyhow!(
                "Source and target language are the same: {} / {}",
                self.source_language,
                self.target_language
            ));
        }

        if self.collections.is_empty() {
            return Err(anyhow!("At least one collection must be configured"));
        }

        for collection in &self.collections {
            if collection.name.trim().is_empty() {
                return Err(anyhow!("Collection names must not be empty"));
            }
            if collection.text_fields.is_empty() && collection.nested.is_none() {
                return Err(anyhow!(
                    "Collection '{}' has no translatable fields",
                    collection.name
                ));
            }
        }

        if self.pipeline.max_workers == 0 {
            return Err(anyhow!("pipeline.max_workers must be at least 1"));
        }
        if self.pipeline.batch_size_ceiling == 0 {
            return Err(anyhow!("pipeline.batch_size_ceiling must be at least 1"));
        }
        if self.pipeline.marker_field.trim().is_empty() {
            return Err(anyhow!("pipeline.marker_field must not be empty"));
        }

        Ok(())
    }

    /// Restrict the configured collections to the given names, in that order
    pub fn select_collections(&mut self, names: &[String]) -> Result<()> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let collection = self
                .collections
                .iter()
                .find(|c| &c.name == name)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown collection: {}", name))?;
            selected.push(collection);
        }
        self.collections = selected;
        Ok(())
    }
}
