use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod validator;
pub mod watcher;

use crate::cli::Cli;
use crate::form::fields::DEFAULT_COLOR_FORMATS;
use crate::schema::DEFAULT_MAX_DEPTH;

/// Default configuration file, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "theme-studio.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub schema: SchemaSettings,
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub editor: EditorSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Where the theme schema document comes from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaSettings {
    /// File path or http(s) URL
    #[serde(default = "default_schema_source")]
    pub source: String,
    /// Clear the cache and reload when the schema file changes
    #[serde(default)]
    pub watch: bool,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            source: default_schema_source(),
            watch: false,
        }
    }
}

fn default_schema_source() -> String {
    "schema/theme-schema.json".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSettings {
    /// Combined `$ref` hop and descent budget per resolution
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorSettings {
    /// String formats rendered as color pickers
    #[serde(default = "default_color_formats")]
    pub color_formats: Vec<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            color_formats: default_color_formats(),
        }
    }
}

fn default_color_formats() -> Vec<String> {
    DEFAULT_COLOR_FORMATS.iter().map(|s| s.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            schema: SchemaSettings::default(),
            resolver: ResolverSettings::default(),
            editor: EditorSettings::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_file(DEFAULT_CONFIG_FILE)
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load(&cli.config)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a file; a missing file yields defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let settings = Self::load(path.as_ref())?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(source) = &cli.schema {
            self.schema.source = source.clone();
        }
        if let Some(watch) = cli.watch {
            self.schema.watch = watch;
        }
        if let Some(max_depth) = cli.max_depth {
            self.resolver.max_depth = max_depth;
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Whether the schema source is a local file that can be watched
    pub fn schema_is_local(&self) -> bool {
        !(self.schema.source.starts_with("http://") || self.schema.source.starts_with("https://"))
    }
}
