//! Configuration for swap-cards

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::swap_cards::normalizer::ProposalStatus;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("swap-cards")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Store-access-to-response budget in milliseconds.
    /// Overruns are reported, never enforced.
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,

    /// Page size used when the request omits `limit`
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u32,

    /// Largest `limit` accepted at the API boundary
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: u32,

    /// Proposal statuses shown as incoming on a swap card
    #[serde(default = "default_visible_statuses")]
    pub visible_proposal_statuses: Vec<String>,

    /// Header carrying the viewer id set by the upstream auth gateway
    #[serde(default = "default_viewer_header")]
    pub viewer_header: String,

    /// Query-only connections available to concurrent aggregations
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: u32,
}

fn default_http_port() -> u16 {
    8095
}

fn default_latency_budget_ms() -> u64 {
    250
}

fn default_page_limit() -> u32 {
    20
}

fn default_max_page_limit() -> u32 {
    100
}

fn default_visible_statuses() -> Vec<String> {
    vec!["pending".to_string()]
}

fn default_viewer_header() -> String {
    "x-viewer-id".to_string()
}

fn default_read_pool_size() -> u32 {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            latency_budget_ms: default_latency_budget_ms(),
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
            visible_proposal_statuses: default_visible_statuses(),
            viewer_header: default_viewer_header(),
            read_pool_size: default_read_pool_size(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get database path
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join("swaps.db")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    /// Reject settings the HTTP boundary and assembler cannot honor
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            return Err(StorageError::Config(format!(
                "default_page_limit must be in 1..={}, got {}",
                self.max_page_limit, self.default_page_limit
            )));
        }
        if self.visible_proposal_statuses.is_empty() {
            return Err(StorageError::Config(
                "visible_proposal_statuses must not be empty".into(),
            ));
        }
        if let Some(unknown) = self
            .visible_proposal_statuses
            .iter()
            .find(|s| ProposalStatus::parse(s).is_none())
        {
            return Err(StorageError::Config(format!(
                "unknown proposal status '{}' in visible_proposal_statuses",
                unknown
            )));
        }
        if self.read_pool_size == 0 {
            return Err(StorageError::Config("read_pool_size must be at least 1".into()));
        }
        if self.viewer_header.trim().is_empty() {
            return Err(StorageError::Config("viewer_header must not be empty".into()));
        }
        Ok(())
    }
}
