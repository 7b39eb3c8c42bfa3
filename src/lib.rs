//! `dbscope` - Scoped database connection handling
//!
//! A [`ConnectionHandler`] builds an engine lazily for a connection URL, opens a
//! connection on demand, and guarantees that the connection is closed and the
//! engine disposed on every exit path.

#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/// Bundled SQLite and PostgreSQL toolkits
pub mod backends;
/// Command line interface definition
pub mod cli;
/// Configuration management for dbscope
pub mod config;
pub mod controller;
pub mod database_url;
pub mod handler;
pub mod options;
pub mod toolkit;

pub use config::Config;
pub use controller::DbController;
pub use database_url::DatabaseUrl;
pub use handler::ConnectionHandler;
pub use options::{ConnectOptions, OptionValue};
pub use toolkit::{Connection, Engine, EngineFactory};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
