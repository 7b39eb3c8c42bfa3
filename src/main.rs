use anyhow::{Context, Result};
use dbscope::backends::{AnyError, DefaultFactory};
use dbscope::cli::{Cli, Commands};
use dbscope::{Config, ConnectOptions, ConnectionHandler, DatabaseUrl, OptionValue};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

// Allow println in main CLI binary
#[allow(clippy::disallowed_methods)]
fn main() {
    init_logging();

    let cli = Cli::parse();
    tracing::debug!("dbscope CLI initialized");

    let result = match cli.command {
        Some(Commands::Check {
            url,
            connector,
            config,
            options,
        }) => handle_check(url.as_deref(), connector.as_deref(), &config, options),
        Some(Commands::List { config }) => handle_list(&config),
        None => {
            println!("dbscope - Use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::disallowed_methods)]
fn handle_check(
    url: Option<&str>,
    connector: Option<&str>,
    config_path: &Path,
    options: Vec<(String, OptionValue)>,
) -> Result<()> {
    let mut handler = match (url, connector) {
        (Some(url), _) => {
            let url = DatabaseUrl::parse(url).context("Invalid URL")?;
            ConnectionHandler::new(url, DefaultFactory)
        }
        (None, Some(name)) => {
            let config = Config::from_file(config_path)
                .with_context(|| format!("Failed to load {}", config_path.display()))?;
            config.handler(name, DefaultFactory)?
        }
        (None, None) => anyhow::bail!("Either a URL or --connector is required"),
    };

    let mut connect_options = handler.connect_options().clone();
    for (key, value) in options {
        connect_options.insert(key, value);
    }

    let name = handler.name().to_string();
    let target = handler.url().to_string();
    handler.connect_with(connect_options)?.scope(|h| {
        if let Some(connection) = h.connection() {
            connection.ping()?;
        }
        Ok::<_, AnyError>(())
    })?;

    println!("✅ {name}: {target} reachable, connection released");
    Ok(())
}

#[allow(clippy::disallowed_methods)]
fn handle_list(config_path: &Path) -> Result<()> {
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    if config.connectors.is_empty() {
        println!("No connectors configured in {}", config_path.display());
        return Ok(());
    }

    for (name, connector) in &config.connectors {
        let url = connector.resolve_url(name)?;
        let options = describe_options(&connector.options);
        println!("{name}\t{url}\t{options}");
    }
    Ok(())
}

fn describe_options(options: &ConnectOptions) -> String {
    options
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize logging based on environment variables
fn init_logging() {
    // Default to INFO level, can be overridden by RUST_LOG environment variable
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dbscope=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}
