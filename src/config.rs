use crate::database_url::{DatabaseUrl, UrlError};
use crate::handler::ConnectionHandler;
use crate::options::ConnectOptions;
use crate::toolkit::EngineFactory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "dbscope.toml";

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error occurred while reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error occurred
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Connector URL is invalid
    #[error("Connector '{name}': {source}")]
    Url {
        /// Connector name
        name: String,
        /// Underlying URL error
        source: UrlError,
    },

    /// Connector is not configured
    #[error("Connector '{name}' not found in configuration")]
    UnknownConnector {
        /// Requested connector name
        name: String,
    },
}

/// Main configuration structure for dbscope
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Named connectors
    #[serde(default)]
    pub connectors: BTreeMap<String, ConnectorConfig>,
}

/// A named database connector
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectorConfig {
    /// Connection URL, ideally without a password
    pub url: String,
    /// Environment variable containing the password
    pub password_env: Option<String>,
    /// Options used when the engine is built
    #[serde(default)]
    pub options: ConnectOptions,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Look up a connector by name
    pub fn connector(&self, name: &str) -> Result<&ConnectorConfig, ConfigError> {
        self.connectors
            .get(name)
            .ok_or_else(|| ConfigError::UnknownConnector {
                name: name.to_string(),
            })
    }

    /// Build a handler for the named connector
    ///
    /// The handler carries the connector name and its configured options.
    pub fn handler<F: EngineFactory>(
        &self,
        name: &str,
        factory: F,
    ) -> Result<ConnectionHandler<F>, ConfigError> {
        let connector = self.connector(name)?;
        let url = connector.resolve_url(name)?;
        debug!("Connector '{}' resolved to {}", name, url);
        Ok(ConnectionHandler::new(url, factory)
            .with_name(name)
            .with_connect_options(connector.options.clone()))
    }
}

impl ConnectorConfig {
    /// Parse the URL and apply the password from `password_env`
    ///
    /// A missing environment variable leaves the URL unchanged.
    pub fn resolve_url(&self, name: &str) -> Result<DatabaseUrl, ConfigError> {
        let url_error = |source| ConfigError::Url {
            name: name.to_string(),
            source,
        };
        let url = DatabaseUrl::parse(&self.url).map_err(url_error)?;

        let Some(password_env) = &self.password_env else {
            return Ok(url);
        };
        debug!(
            "Reading password from environment variable: {}",
            password_env
        );
        match env::var(password_env) {
            Ok(password) => url.with_password(&password).map_err(url_error),
            Err(_) => {
                warn!(
                    "Environment variable {} not found, using URL credentials as-is",
                    password_env
                );
                Ok(url)
            }
        }
    }
}
