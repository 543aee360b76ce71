use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use theme_studio::adapters::api_handler::ApiState;
use theme_studio::cli::{Cli, Command};
use theme_studio::config::{watcher::SchemaWatcher, Settings};
use theme_studio::form::{render, FormFieldResolver};
use theme_studio::schema::{PropertyPath, SchemaResolver, SchemaStore};
use theme_studio::variants::{preview_style, Theme};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;

    match cli.command() {
        Command::Serve => serve(settings).await,
        Command::Resolve { path } => {
            let resolver = load_resolver(&settings).await?;
            let path = PropertyPath::parse(&path);
            let node = resolver
                .resolve_path(&path)
                .with_context(|| format!("No schema at {}", path))?;
            println!("{}", serde_json::to_string_pretty(&node)?);
            Ok(())
        }
        Command::Form { path, value } => {
            let resolver = load_resolver(&settings).await?;
            let fields = FormFieldResolver::new(resolver)
                .with_color_formats(settings.editor.color_formats.clone());
            let path = PropertyPath::parse(&path);
            let node = fields
                .field_at(&path)
                .with_context(|| format!("No schema at {}", path))?;
            let value = value
                .map(|text| serde_json::from_str::<serde_json::Value>(&text))
                .transpose()
                .context("--value is not valid JSON")?;
            let view = render(&fields, &path, &node, value.as_ref());
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }
        Command::Variant {
            theme,
            visual,
            variant,
        } => {
            let text = tokio::fs::read_to_string(&theme)
                .await
                .with_context(|| format!("Cannot read theme {}", theme.display()))?;
            let theme = Theme::from_json(&text).context("Theme is not valid JSON")?;
            let preview = preview_style(&theme.styles(), &visual, &variant);
            if preview.fallback {
                info!(
                    "Variant '{}' not found for {}, showing the default style",
                    variant, visual
                );
            }
            println!("{}", serde_json::to_string_pretty(&preview)?);
            Ok(())
        }
    }
}

async fn load_resolver(settings: &Settings) -> anyhow::Result<SchemaResolver> {
    let store = SchemaStore::from_location(&settings.schema.source);
    let schema = store.initialize().await?;
    Ok(SchemaResolver::new(schema).with_max_depth(settings.resolver.max_depth))
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting Theme Studio on {}:{}", host, port);

    // The schema must load before anything can resolve against it
    let store = Arc::new(SchemaStore::from_location(&settings.schema.source));
    store.initialize().await?;

    // Start schema watcher
    let _watcher = if settings.schema.watch && settings.schema_is_local() {
        let store_for_watcher = store.clone();
        let runtime = tokio::runtime::Handle::current();
        Some(SchemaWatcher::new(&settings.schema.source, move || {
            let store = store_for_watcher.clone();
            runtime.spawn(async move {
                match store.reload().await {
                    Ok(_) => info!("Theme schema reloaded successfully"),
                    Err(e) => error!("Failed to reload theme schema: {}", e),
                }
            });
        })?)
    } else {
        None
    };

    let app = theme_studio::create_app(ApiState::new(settings, store));

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
