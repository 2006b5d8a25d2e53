use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use school_health::{
    config::Config,
    database::Database,
    web::{AppState, WebServer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "school-health")]
#[command(version)]
#[command(about = "School health service with spreadsheet enrollment import")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_logging(cli: &Cli) {
    let log_filter = if cli.log_level == "trace" {
        format!("school_health={},tower_http=trace", cli.log_level)
    } else {
        format!("school_health={}", cli.log_level)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    info!("Starting School Health Service v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    info!("Using database: {}", config.database.url);

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let server = WebServer::new(AppState::new(database, config))?;
    info!("Web server configured for {}:{}", server.host(), server.port());

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let serve = tokio::spawn(server.serve_with_signal(ready_tx));

    match ready_rx.await {
        Ok(Ok(())) => info!("School health service ready"),
        Ok(Err(e)) => return Err(e),
        Err(_) => anyhow::bail!("Web server exited before signalling readiness"),
    }

    serve.await.context("Web server task panicked")?
}
