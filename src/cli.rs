use crate::options::{ConnectOptions, OptionValue};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI interface for `dbscope`
#[derive(Parser)]
#[command(name = "dbscope")]
#[command(version = crate::VERSION)]
#[command(about = "dbscope - Scoped database connection checks")]
#[command(
    long_about = "Open a database connection, prove it works, and release the connection and its engine again"
)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Connect, ping and release a database
    Check {
        /// Connection URL, e.g. sqlite:///app.db
        #[arg(value_name = "URL", conflicts_with = "connector")]
        url: Option<String>,
        /// Named connector from the configuration file
        #[arg(long, value_name = "NAME", required_unless_present = "url")]
        connector: Option<String>,
        /// Configuration file path
        #[arg(long, value_name = "FILE", default_value = crate::config::DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Engine option, repeatable
        #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
        options: Vec<(String, OptionValue)>,
    },
    /// List configured connectors
    List {
        /// Configuration file path
        #[arg(long, value_name = "FILE", default_value = crate::config::DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

fn parse_option(raw: &str) -> Result<(String, OptionValue), String> {
    ConnectOptions::parse_pair(raw).map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
