use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CourierError, Result};

/// Run configuration, loaded once at startup from a JSON file.
///
/// The `email` and `kindle-address` field names match the configuration
/// file format this tool has always read, so existing files keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sender address (the authenticated Gmail account)
    pub email: String,
    /// Recipient address (the Kindle's receive-by-email address)
    #[serde(rename = "kindle-address")]
    pub kindle_address: String,
    #[serde(default)]
    pub convert: ConvertConfig,
    #[serde(default)]
    pub message: MessageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Directory tree to search for source files
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Flat directory that receives converted files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Extension of files to convert (no leading dot)
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    /// Extension of converted files (no leading dot)
    #[serde(default = "default_target_extension")]
    pub target_extension: String,
    /// External converter invoked as `<command> <source> <destination>`
    #[serde(default = "default_command")]
    pub command: String,
    /// Substrings that exclude a directory (and everything beneath it) from the walk
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            source_extension: default_source_extension(),
            target_extension: default_target_extension(),
            command: default_command(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            body: String::new(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("epubs")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("mobis")
}

fn default_source_extension() -> String {
    "epub".to_string()
}

fn default_target_extension() -> String {
    "mobi".to_string()
}

fn default_command() -> String {
    // From calibre; install via Preferences -> Miscellaneous -> command line tools
    "ebook-convert".to_string()
}

fn default_subject() -> String {
    "Mobi Files".to_string()
}

impl Config {
    /// Load and validate configuration from a JSON file.
    ///
    /// A missing file is a hard failure: without a sender and Kindle
    /// address there is nothing sensible to do.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            CourierError::ConfigError(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| CourierError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CourierError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CourierError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| CourierError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(CourierError::ConfigError(
                "email must be a valid sender address".to_string(),
            ));
        }
        if self.kindle_address.is_empty() || !self.kindle_address.contains('@') {
            return Err(CourierError::ConfigError(
                "kindle-address must be a valid recipient address".to_string(),
            ));
        }

        if self.convert.source_extension.is_empty() || self.convert.source_extension.starts_with('.') {
            return Err(CourierError::ConfigError(
                "convert.source_extension must be non-empty, without a leading dot".to_string(),
            ));
        }
        if self.convert.target_extension.is_empty() || self.convert.target_extension.starts_with('.') {
            return Err(CourierError::ConfigError(
                "convert.target_extension must be non-empty, without a leading dot".to_string(),
            ));
        }
        if self.convert.command.is_empty() {
            return Err(CourierError::ConfigError(
                "convert.command cannot be empty".to_string(),
            ));
        }
        if self.convert.exclude.iter().any(|s| s.is_empty()) {
            // An empty substring would match every path and exclude the whole tree
            return Err(CourierError::ConfigError(
                "convert.exclude cannot contain empty strings".to_string(),
            ));
        }

        if self.message.subject.is_empty() {
            return Err(CourierError::ConfigError(
                "message.subject cannot be empty".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file with placeholder addresses
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self {
            email: "you@gmail.com".to_string(),
            kindle_address: "you_kindle@kindle.com".to_string(),
            convert: ConvertConfig::default(),
            message: MessageConfig::default(),
        };
        config.save(path).await
    }
}
