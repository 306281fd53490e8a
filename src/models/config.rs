//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed endpoint and paging behavior
    #[serde(default)]
    pub feed: FeedConfig,

    /// How transport credentials are obtained
    #[serde(default)]
    pub session: SessionConfig,

    /// Chat-completions endpoint used for classification
    #[serde(default)]
    pub llm: LlmConfig,

    /// Enrichment batch settings
    #[serde(default)]
    pub enrich: EnrichConfig,

    /// Database location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        if self.feed.forum.trim().is_empty() {
            return Err(AppError::validation("feed.forum is empty"));
        }
        url::Url::parse(&self.feed.base_url)
            .map_err(|e| AppError::validation(format!("feed.base_url is invalid: {e}")))?;
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        if self.feed.page_size == 0 {
            return Err(AppError::validation("feed.page_size must be > 0"));
        }
        if self.feed.total_posts == 0 {
            return Err(AppError::validation("feed.total_posts must be > 0"));
        }
        if self.session.mode == SessionMode::Warmup {
            url::Url::parse(&self.session.warmup_url).map_err(|e| {
                AppError::validation(format!("session.warmup_url is invalid: {e}"))
            })?;
        }
        if self.llm.model.trim().is_empty() {
            return Err(AppError::validation("llm.model is empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::validation("llm.temperature must be within 0.0..=2.0"));
        }
        if self.llm.max_tokens == 0 {
            return Err(AppError::validation("llm.max_tokens must be > 0"));
        }
        if self.storage.database.as_os_str().is_empty() {
            return Err(AppError::validation("storage.database is empty"));
        }
        Ok(())
    }

    /// Resolve the database path against the storage directory.
    pub fn database_path(&self, storage_dir: &Path) -> PathBuf {
        if self.storage.database.is_absolute() {
            self.storage.database.clone()
        } else {
            storage_dir.join(&self.storage.database)
        }
    }
}

/// Feed endpoint and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// API root, e.g. `https://www.dcard.tw/service/api/v2`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Forum alias the posts are listed under
    #[serde(default = "defaults::forum")]
    pub forum: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Summaries requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Posts to process before a run stops
    #[serde(default = "defaults::total_posts")]
    pub total_posts: usize,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::feed_delay")]
    pub request_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            forum: defaults::forum(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            total_posts: defaults::total_posts(),
            request_delay_ms: defaults::feed_delay(),
        }
    }
}

/// Which bootstrapper produces the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Visit a landing page and keep the cookies it sets
    #[default]
    Warmup,
    /// Use the configured cookies as-is
    Static,
}

/// Session bootstrap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub mode: SessionMode,

    /// Page visited before the feed to obtain cookies
    #[serde(default = "defaults::warmup_url")]
    pub warmup_url: String,

    /// Wait after the warmup request, in milliseconds
    #[serde(default = "defaults::settle_ms")]
    pub settle_ms: u64,

    /// Cookies sent with every feed request (merged over warmup cookies)
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    /// Extra headers sent with every feed request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            warmup_url: defaults::warmup_url(),
            settle_ms: defaults::settle_ms(),
            cookies: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }
}

/// Chat-completions client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, or an Azure OpenAI resource URL
    #[serde(default = "defaults::llm_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "defaults::llm_model")]
    pub model: String,

    /// Azure deployment name (defaults to `model`)
    #[serde(default)]
    pub deployment: Option<String>,

    /// Azure `api-version` query parameter
    #[serde(default = "defaults::api_version")]
    pub api_version: String,

    #[serde(default = "defaults::temperature")]
    pub temperature: f32,

    /// Upper bound on reply length
    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "defaults::llm_timeout")]
    pub timeout_secs: u64,

    /// Overrides the built-in system instruction
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::llm_endpoint(),
            api_key: None,
            model: defaults::llm_model(),
            deployment: None,
            api_version: defaults::api_version(),
            temperature: defaults::temperature(),
            max_tokens: defaults::max_tokens(),
            timeout_secs: defaults::llm_timeout(),
            system_prompt: None,
        }
    }
}

impl LlmConfig {
    /// Azure endpoints are recognised by their host name.
    pub fn is_azure(&self) -> bool {
        self.endpoint.contains("azure")
    }

    pub fn deployment_name(&self) -> &str {
        self.deployment.as_deref().unwrap_or(&self.model)
    }
}

/// Enrichment batch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Delay between classified records in milliseconds
    #[serde(default = "defaults::enrich_delay")]
    pub request_delay_ms: u64,

    /// Content sent to the classifier is cut to this many characters (0 = no limit)
    #[serde(default = "defaults::max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: defaults::enrich_delay(),
            max_content_chars: defaults::max_content_chars(),
        }
    }
}

/// Database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file, relative to the storage directory unless absolute
    #[serde(default = "defaults::database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: defaults::database(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Feed defaults
    pub fn base_url() -> String {
        "https://www.dcard.tw/service/api/v2".into()
    }
    pub fn forum() -> String {
        "house".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/124.0.0.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> usize {
        100
    }
    pub fn total_posts() -> usize {
        1000
    }
    pub fn feed_delay() -> u64 {
        3000
    }

    // Session defaults
    pub fn warmup_url() -> String {
        "https://www.dcard.tw/f/house".into()
    }
    pub fn settle_ms() -> u64 {
        5000
    }

    // LLM defaults
    pub fn llm_endpoint() -> String {
        "https://api.openai.com/v1".into()
    }
    pub fn llm_model() -> String {
        "gpt-3.5-turbo".into()
    }
    pub fn api_version() -> String {
        "2024-12-01-preview".into()
    }
    pub fn temperature() -> f32 {
        0.3
    }
    pub fn max_tokens() -> u32 {
        1000
    }
    pub fn llm_timeout() -> u64 {
        120
    }

    // Enrichment defaults
    pub fn enrich_delay() -> u64 {
        1000
    }
    pub fn max_content_chars() -> usize {
        8000
    }

    // Storage defaults
    pub fn database() -> PathBuf {
        PathBuf::from("posts.sqlite")
    }
}
