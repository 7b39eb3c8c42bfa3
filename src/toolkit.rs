//! Engine and connection capabilities consumed by [`ConnectionHandler`]
//!
//! A toolkit provides three things: a factory that turns a URL plus options
//! into an [`Engine`], an engine that hands out [`Connection`]s and can be
//! disposed, and connections that can be closed. Closing and disposing take
//! `self`, so a released resource cannot be used again.
//!
//! [`ConnectionHandler`]: crate::ConnectionHandler

use crate::database_url::DatabaseUrl;
use crate::options::ConnectOptions;

/// A single open link to a database
pub trait Connection {
    /// Error raised when closing fails
    type Error;

    /// Close the link and release its resources
    fn close(self) -> Result<(), Self::Error>;
}

/// A factory for connections against one database
pub trait Engine {
    /// Connections produced by this engine
    type Connection: Connection<Error = Self::Error>;
    /// Error type shared by the engine and its connections
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new connection
    fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Release everything the engine holds
    fn dispose(self) -> Result<(), Self::Error>;
}

/// Error type of the engines built by factory `F`
pub type EngineError<F> = <<F as EngineFactory>::Engine as Engine>::Error;

/// Connection type of the engines built by factory `F`
pub type ConnectionOf<F> = <<F as EngineFactory>::Engine as Engine>::Connection;

/// Builds engines from a connection descriptor
pub trait EngineFactory {
    /// Engine type produced by this factory
    type Engine: Engine;

    /// Build an engine for `url`, configured by `options`
    fn create_engine(
        &self,
        url: &DatabaseUrl,
        options: &ConnectOptions,
    ) -> Result<Self::Engine, <Self::Engine as Engine>::Error>;
}

impl<E, F> EngineFactory for F
where
    E: Engine,
    F: Fn(&DatabaseUrl, &ConnectOptions) -> Result<E, E::Error>,
{
    type Engine = E;

    fn create_engine(
        &self,
        url: &DatabaseUrl,
        options: &ConnectOptions,
    ) -> Result<E, E::Error> {
        self(url, options)
    }
}
