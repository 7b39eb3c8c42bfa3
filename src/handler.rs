//! # Scoped Connection Handling
//!
//! [`ConnectionHandler`] owns at most one engine and one connection for a
//! single connection descriptor. The engine is built on first use, the
//! connection on [`connect`](ConnectionHandler::connect), and both are released
//! (connection first, then engine) by [`close`](ConnectionHandler::close), by
//! the end of a [`scope`](ConnectionHandler::scope), or when the handler is
//! dropped.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dbscope::backends::{AnyError, DefaultFactory};
//! use dbscope::{ConnectionHandler, DatabaseUrl};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url: DatabaseUrl = "sqlite:///app.db".parse()?;
//! let mut handler = ConnectionHandler::new(url, DefaultFactory);
//!
//! handler.connect()?.scope(|h| {
//!     if let Some(connection) = h.connection() {
//!         connection.ping()?;
//!     }
//!     Ok::<_, AnyError>(())
//! })?;
//! # Ok(())
//! # }
//! ```

use crate::controller::DbController;
use crate::database_url::DatabaseUrl;
use crate::options::ConnectOptions;
use crate::toolkit::{Connection, ConnectionOf, Engine, EngineError, EngineFactory};
use std::fmt;
use tracing::{debug, info, warn};

/// Scoped owner of an engine and a connection for one database
pub struct ConnectionHandler<F: EngineFactory> {
    url: DatabaseUrl,
    name: String,
    factory: F,
    engine: Option<F::Engine>,
    engine_options: Option<ConnectOptions>,
    connection: Option<ConnectionOf<F>>,
    connect_options: ConnectOptions,
}

impl<F: EngineFactory> ConnectionHandler<F> {
    /// Create a handler for `url`
    ///
    /// Nothing is built or opened until the engine or a connection is needed.
    pub fn new(url: DatabaseUrl, factory: F) -> Self {
        let name = url.drivername().to_string();
        Self {
            url,
            name,
            factory,
            engine: None,
            engine_options: None,
            connection: None,
            connect_options: ConnectOptions::new(),
        }
    }

    /// Set the connector name (defaults to the driver name)
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the options used when the engine is built lazily
    #[must_use]
    pub fn with_connect_options(mut self, options: ConnectOptions) -> Self {
        self.connect_options = options;
        self
    }

    /// Connection descriptor
    pub fn url(&self) -> &DatabaseUrl {
        &self.url
    }

    /// Connector name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options supplied at the last connect
    pub fn connect_options(&self) -> &ConnectOptions {
        &self.connect_options
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Whether an engine is currently held
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// The current connection, `None` before `connect` or after `close`
    pub fn connection(&self) -> Option<&ConnectionOf<F>> {
        self.connection.as_ref()
    }

    /// Mutable access to the current connection
    pub fn connection_mut(&mut self) -> Option<&mut ConnectionOf<F>> {
        self.connection.as_mut()
    }

    /// The engine, built from the URL and the stored options on first access
    ///
    /// Repeated calls return the same engine until it is replaced or the
    /// handler is closed.
    pub fn engine(&mut self) -> Result<&F::Engine, EngineError<F>> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                debug!(
                    connector = %self.name,
                    options = self.connect_options.len(),
                    "Building {} engine",
                    self.url.drivername()
                );
                let engine = self
                    .factory
                    .create_engine(&self.url, &self.connect_options)?;
                self.engine_options = Some(self.connect_options.clone());
                engine
            }
        };
        Ok(&*self.engine.insert(engine))
    }

    /// Replace the engine
    ///
    /// The held connection is closed and the previous engine disposed before
    /// `engine` is stored. The new engine is stored even when that teardown
    /// fails; the teardown error is returned afterwards.
    pub fn set_engine(&mut self, engine: F::Engine) -> Result<(), EngineError<F>> {
        debug!(connector = %self.name, "Replacing {} engine", self.url.drivername());
        let teardown = self.close();
        self.engine = Some(engine);
        self.engine_options = None;
        teardown
    }

    /// Open a connection with the stored options
    ///
    /// Builds the engine if none exists. A connection that is already held is
    /// closed before the new one is opened.
    pub fn connect(&mut self) -> Result<&mut Self, EngineError<F>> {
        if let Some(previous) = self.connection.take() {
            let drivername = self.url.drivername();
            if let Err(e) = previous.close() {
                warn!(connector = %self.name, error = %e, "Failed to close {drivername} connection");
                return Err(e);
            }
            info!(connector = %self.name, "{drivername} connection closed.");
        }

        let connection = self.engine()?.connect()?;
        self.connection = Some(connection);
        info!(connector = %self.name, "{} connected.", self.url.drivername());
        Ok(self)
    }

    /// Open a connection after storing `options`
    ///
    /// When the held engine was built from different options it is torn down
    /// first, so the new options take effect. An engine installed through
    /// [`set_engine`](Self::set_engine) is kept as is.
    pub fn connect_with(&mut self, options: ConnectOptions) -> Result<&mut Self, EngineError<F>> {
        let stale = self
            .engine_options
            .as_ref()
            .is_some_and(|built_with| *built_with != options);
        if stale {
            debug!(
                connector = %self.name,
                "Connect options changed, rebuilding {} engine",
                self.url.drivername()
            );
            self.close()?;
        }
        self.connect_options = options;
        self.connect()
    }

    /// Close the connection, then dispose the engine
    ///
    /// Safe to call any number of times. Both steps are attempted even if the
    /// first fails; the first error is returned.
    pub fn close(&mut self) -> Result<(), EngineError<F>> {
        let drivername = self.url.drivername();
        let mut first_error = None;

        if let Some(connection) = self.connection.take() {
            match connection.close() {
                Ok(()) => info!(connector = %self.name, "{drivername} connection closed."),
                Err(e) => {
                    warn!(connector = %self.name, error = %e, "Failed to close {drivername} connection");
                    first_error = Some(e);
                }
            }
        }

        if let Some(engine) = self.engine.take() {
            self.engine_options = None;
            match engine.dispose() {
                Ok(()) => info!(connector = %self.name, "{drivername} engine disposed."),
                Err(e) => {
                    warn!(connector = %self.name, error = %e, "Failed to dispose {drivername} engine");
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Run `body`, then close the handler exactly once
    ///
    /// An error from `body` is returned unchanged, even when closing also
    /// fails. If only closing fails, that error is returned.
    pub fn scope<T, E, B>(&mut self, body: B) -> Result<T, E>
    where
        B: FnOnce(&mut Self) -> Result<T, E>,
        E: From<EngineError<F>>,
    {
        let outcome = body(self);
        let closed = self.close();

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_error)) => Err(close_error.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_error)) => {
                warn!(
                    connector = %self.name,
                    error = %close_error,
                    "Teardown failed while leaving a failed scope"
                );
                Err(e)
            }
        }
    }
}

impl<F: EngineFactory> DbController for ConnectionHandler<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &DatabaseUrl {
        &self.url
    }
}

impl<F: EngineFactory> Drop for ConnectionHandler<F> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(connector = %self.name, error = %e, "Resources not released cleanly on drop");
        }
    }
}

impl<F: EngineFactory> fmt::Debug for ConnectionHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("has_engine", &self.engine.is_some())
            .field("connected", &self.connection.is_some())
            .field("connect_options", &self.connect_options)
            .finish_non_exhaustive()
    }
}
