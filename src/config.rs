use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    #[default]
    Passthrough,
    Facebook,
    Telegram,
}

impl std::fmt::Display for FormatterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatterKind::Passthrough => write!(f, "passthrough"),
            FormatterKind::Facebook => write!(f, "facebook"),
            FormatterKind::Telegram => write!(f, "telegram"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: Option<GeneralConfig>,
    #[serde(default)]
    pub formatters: FormattersConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GeneralConfig {
    /// Default platform filter (e.g. "facebook")
    #[serde(default)]
    pub platform: Option<String>,
}

/// Formatter per platform, keyed by lower-cased platform name
#[derive(Debug, Deserialize, Clone)]
pub struct FormattersConfig {
    #[serde(default)]
    pub default: FormatterKind,
    #[serde(flatten)]
    pub platforms: HashMap<String, FormatterKind>,
}

impl Default for FormattersConfig {
    fn default() -> Self {
        Self {
            default: FormatterKind::Passthrough,
            platforms: HashMap::from([
                ("facebook".to_string(), FormatterKind::Facebook),
                ("telegram".to_string(), FormatterKind::Telegram),
            ]),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
        }
    }
}

fn default_max_message_len() -> usize {
    4096
}

impl Config {
    /// Platform filter from [general], if set and non-empty.
    pub fn platform_filter(&self) -> Option<&str> {
        self.general
            .as_ref()
            .and_then(|g| g.platform.as_deref())
            .filter(|p| !p.is_empty())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;

        config.formatters.platforms = config
            .formatters
            .platforms
            .into_iter()
            .map(|(platform, kind)| (platform.to_lowercase(), kind))
            .collect();

        if config.telegram.max_message_len == 0 {
            anyhow::bail!("telegram.max_message_len must be greater than zero");
        }

        Ok(config)
    }
}
