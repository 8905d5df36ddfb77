use anyhow::Context;
use grasp::{
    AppState, GraspConfig, GraspConfigManager,
    api::routes::create_app,
    cli::{
        Cli, Commands,
        init::{self, InitConfig, InitResult},
        output::{Output, Status},
    },
};
use std::{path::Path, sync::Arc};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            provider,
            host,
            port,
        }) => {
            let config = InitConfig {
                path,
                force,
                provider,
                host,
                port,
            };
            match init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!(e),
            }
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        None => serve(&cli.config, cli.verbose).await,
    }
}

fn show_config(path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: GraspConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    output.section("Configuration");
    output.field("file", &path.display().to_string());
    output.field("bind", &config.bind_address());
    output.field("database", &config.database.url);
    output.field(
        "vectors",
        config.vector_store.path.as_deref().unwrap_or("in-memory"),
    );
    output.field("default provider", config.chat.default_provider.as_str());
    output.field("embedding model", &config.embeddings.model);

    output.group("Providers");
    for kind in config.providers.configured() {
        if let Some(provider) = config.providers.get(kind) {
            output.item(&format!("{} ({})", kind, provider.model));
        }
    }

    if validate {
        output.blank();
        match config.validate() {
            Ok(()) => output.status(Status::Done, "Configuration is valid"),
            Err(e) => {
                output.status(Status::Fail, &e.to_string());
                anyhow::bail!("invalid configuration");
            }
        }
    }

    Ok(())
}

async fn serve(config_path: &Path, verbose: bool) -> anyhow::Result<()> {
    let config_manager = Arc::new(
        GraspConfigManager::new(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?,
    );
    let config = config_manager.config();

    let default_filter = if verbose {
        "debug".to_string()
    } else {
        format!("{},grasp={}", config.server.log_level, config.server.log_level)
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = config_manager.start_watching() {
        tracing::warn!("Config hot reload disabled: {}", e);
    }

    let state = AppState::from_config(config_manager.clone())
        .await
        .context("Failed to initialize application state")?;
    let app = create_app(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        provider = %config.chat.default_provider,
        "Grasp server listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    config_manager.stop_watching();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
