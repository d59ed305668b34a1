//! Application configuration for Newsdesk.
//!
//! User config lives at `~/.newsdesk/newsdesk.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{NewsdeskError, Result};
use crate::filter::SortOrder;
use crate::types::{CatalogSource, SourceKind};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "newsdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".newsdesk";

// ---------------------------------------------------------------------------
// Config structs (matching newsdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the ingestion / summary backend lives.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Defaults applied to a fresh session.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Choices offered by the category and tag filters.
    #[serde(default)]
    pub filters: FiltersConfig,

    /// Digest email settings.
    #[serde(default)]
    pub digest: DigestConfig,

    /// Source catalog.
    #[serde(default = "default_catalog")]
    pub sources: Vec<CatalogSource>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            defaults: DefaultsConfig::default(),
            filters: FiltersConfig::default(),
            digest: DigestConfig::default(),
            sources: default_catalog(),
        }
    }
}

/// `[backend]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `http://127.0.0.1:8000`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a full ingestion run. Runs summarize with an LLM and are slow.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Timeout for a single deep summary.
    #[serde(default = "default_summary_timeout")]
    pub summary_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            run_timeout_secs: default_run_timeout(),
            summary_timeout_secs: default_summary_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".into()
}
fn default_run_timeout() -> u64 {
    300
}
fn default_summary_timeout() -> u64 {
    120
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Catalog ids selected for a run when none are given.
    #[serde(default = "default_run_sources")]
    pub sources: Vec<String>,

    /// Initial sort order of the story list.
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sources: default_run_sources(),
            sort_order: SortOrder::default(),
        }
    }
}

fn default_run_sources() -> Vec<String> {
    vec!["reuters".into(), "bbc".into(), "techcrunch".into()]
}

/// `[filters]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            tags: default_tags(),
        }
    }
}

fn default_categories() -> Vec<String> {
    ["Tech", "World", "Business", "Security", "Sports"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_tags() -> Vec<String> {
    [
        "AI",
        "Elections",
        "Cybersecurity",
        "Market",
        "Policy",
        "Startups",
        "Economy",
        "Big Tech",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[digest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Address shown as the digest recipient.
    #[serde(default = "default_recipient")]
    pub recipient: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            recipient: default_recipient(),
        }
    }
}

fn default_recipient() -> String {
    "your.email@company.com".into()
}

/// The sources the backend knows how to ingest.
pub fn default_catalog() -> Vec<CatalogSource> {
    vec![
        CatalogSource::new("reuters", "Reuters", SourceKind::NewsApi),
        CatalogSource::new("bbc", "BBC", SourceKind::Rss),
        CatalogSource::new("techcrunch", "TechCrunch", SourceKind::Rss),
        CatalogSource::new("theverge", "The Verge", SourceKind::Rss),
        CatalogSource::new("arstechnica", "Ars Technica", SourceKind::Rss),
        CatalogSource::new("wired", "Wired", SourceKind::Rss),
        CatalogSource::new("mittechreview", "MIT Technology Review", SourceKind::Rss),
        CatalogSource::new("venturebeat", "VentureBeat", SourceKind::Rss),
        CatalogSource::new("theregister", "The Register", SourceKind::Rss),
        CatalogSource::new("hackernews", "Hacker News", SourceKind::Rss),
    ]
}

impl AppConfig {
    /// Look up a catalog entry by id.
    pub fn source(&self, id: &str) -> Option<&CatalogSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Parsed backend base URL.
    pub fn backend_url(&self) -> Result<Url> {
        let url = Url::parse(&self.backend.base_url).map_err(|e| {
            NewsdeskError::config(format!("invalid backend.base_url '{}': {e}", self.backend.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(NewsdeskError::config(format!(
                "backend.base_url must be http or https, got '{other}'"
            ))),
        }
    }

    /// Check cross-field consistency after loading.
    pub fn validate(&self) -> Result<()> {
        self.backend_url()?;
        for id in &self.defaults.sources {
            if self.source(id).is_none() {
                return Err(NewsdeskError::config(format!(
                    "defaults.sources contains '{id}', which is not in the source catalog"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.newsdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NewsdeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.newsdesk/newsdesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NewsdeskError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        NewsdeskError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NewsdeskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NewsdeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NewsdeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
