use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::block::{TextSize, Variant};

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub page: PageConfig,
    pub font: FontConfig,
    pub text: TextConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantName {
    #[default]
    Full,
    Compact,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub variant: VariantName,
    /// Only used by the compact variant.
    pub size: TextSize,
}

impl RenderConfig {
    pub fn variant(&self) -> Variant {
        match self.variant {
            VariantName::Full => Variant::Full,
            VariantName::Compact => Variant::Compact(self.size),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    pub numbers: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FontConfig {
    pub family: Option<String>,
    /// Base text size as a Typst length, e.g. "11pt".
    pub size: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: None,
            size: "11pt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    pub lang: Option<String>,
    pub dir: Direction,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Program and arguments; empty means no generator is configured.
    pub command: Vec<String>,
    pub model: String,
    pub summary_failure: String,
    pub chat_failure: String,
    pub true_label: String,
    pub false_label: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            model: "gemini-2.5-flash".to_string(),
            summary_failure: "Sorry, something went wrong while generating the explanation."
                .to_string(),
            chat_failure: "Sorry, I had trouble processing your request. Please try again."
                .to_string(),
            true_label: "True".to_string(),
            false_label: "False".to_string(),
        }
    }
}

impl Config {
    /// The defaults bundled with the crate.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return defaults if not found or invalid.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::compiled_default()
            }),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no config file, using defaults");
                Self::compiled_default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
