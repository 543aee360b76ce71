use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Theme Studio - schema-driven theme editing for Power BI visuals
#[derive(Parser, Debug, Clone)]
#[command(name = "theme-studio", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        env = "THEME_STUDIO_CONFIG",
        default_value = "theme-studio.toml",
        global = true
    )]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "THEME_STUDIO_HOST", global = true)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "THEME_STUDIO_PORT", global = true)]
    pub port: Option<u16>,

    /// Theme schema file path or URL
    #[arg(long, env = "THEME_STUDIO_SCHEMA", global = true)]
    pub schema: Option<String>,

    /// Reload the schema when its file changes
    #[arg(long, env = "THEME_STUDIO_WATCH", num_args = 0..=1, default_missing_value = "true", global = true)]
    pub watch: Option<bool>,

    /// Resolver depth budget
    #[arg(long, env = "THEME_STUDIO_MAX_DEPTH", global = true)]
    pub max_depth: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Print the effective schema at a property path
    Resolve {
        /// Dotted path, e.g. visualStyles.columnChart.*.title
        path: String,
    },
    /// Print the form view for a property path
    Form {
        path: String,
        /// Current value as JSON
        #[arg(long)]
        value: Option<String>,
    },
    /// Print the effective style of a variant from a theme file
    Variant {
        #[arg(long)]
        theme: PathBuf,
        #[arg(long)]
        visual: String,
        #[arg(long, default_value = "*")]
        variant: String,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["theme-studio"]);
        assert_eq!(cli.config, PathBuf::from("theme-studio.toml"));
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.schema.is_none());
        assert!(cli.watch.is_none());
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "theme-studio",
            "--config",
            "custom.toml",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--schema",
            "https://example.com/schema.json",
            "--watch",
            "--max-depth",
            "12",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.host, Some("0.0.0.0".to_string()));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.schema.as_deref(), Some("https://example.com/schema.json"));
        assert_eq!(cli.watch, Some(true));
        assert_eq!(cli.max_depth, Some(12));
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::parse_from(["theme-studio", "resolve", "visualStyles.card.*.title"]);
        assert_eq!(
            cli.command(),
            Command::Resolve {
                path: "visualStyles.card.*.title".to_string()
            }
        );

        let cli = Cli::parse_from([
            "theme-studio",
            "variant",
            "--theme",
            "theme.json",
            "--visual",
            "columnChart",
            "--variant",
            "emphasis",
        ]);
        assert_eq!(
            cli.command(),
            Command::Variant {
                theme: PathBuf::from("theme.json"),
                visual: "columnChart".to_string(),
                variant: "emphasis".to_string(),
            }
        );
    }
}
