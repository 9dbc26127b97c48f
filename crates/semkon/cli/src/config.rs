//! Configuration for the semkon binary

use semkon_core::DEFAULT_CONCURRENCY;
use semkon_model_anthropic::AnthropicConfig;
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

/// Prefix of environment overrides, e.g. `SEMKON_ANTHROPIC__MAX_RETRIES`.
const ENV_PREFIX: &str = "SEMKON";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Concurrent proof checks
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Report format
    #[serde(default)]
    pub format: OutputFormat,

    /// Gitignore-style patterns excluded from every scan
    #[serde(default)]
    pub filter_paths: Vec<String>,

    /// Anthropic backend settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            format: OutputFormat::default(),
            filter_paths: Vec::new(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl CliConfig {
    /// Load configuration: defaults, then the file (if given), then environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CliConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("filter_paths")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
