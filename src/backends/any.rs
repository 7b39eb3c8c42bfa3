//! Backend selection by driver name

use super::sqlite::{SqliteConnection, SqliteEngine, SqliteError};
#[cfg(feature = "postgres")]
use super::postgres::{PgConnection, PgEngine, PgError};
use crate::database_url::DatabaseUrl;
use crate::options::ConnectOptions;
use crate::toolkit::{Connection, Engine, EngineFactory};
use thiserror::Error;
use tracing::debug;

/// Errors from any bundled backend
#[derive(Debug, Error)]
pub enum AnyError {
    /// SQLite backend error
    #[error(transparent)]
    Sqlite(#[from] SqliteError),

    /// PostgreSQL backend error
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] PgError),

    /// No bundled backend handles this driver
    #[error("Unsupported database driver: {drivername}")]
    UnsupportedDriver {
        /// Driver name that was supplied
        drivername: String,
    },
}

/// Engine of whichever backend the URL selected
#[derive(Debug)]
pub enum AnyEngine {
    /// SQLite engine
    Sqlite(SqliteEngine),
    /// PostgreSQL engine
    #[cfg(feature = "postgres")]
    Postgres(PgEngine),
}

/// Connection of whichever backend the URL selected
#[derive(Debug)]
pub enum AnyConnection {
    /// SQLite connection
    Sqlite(SqliteConnection),
    /// PostgreSQL connection
    #[cfg(feature = "postgres")]
    Postgres(PgConnection),
}

impl AnyConnection {
    /// Round-trip a trivial query on the underlying connection
    pub fn ping(&self) -> Result<(), AnyError> {
        match self {
            Self::Sqlite(conn) => conn.ping()?,
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => conn.ping()?,
        }
        Ok(())
    }
}

impl Connection for AnyConnection {
    type Error = AnyError;

    fn close(self) -> Result<(), AnyError> {
        match self {
            Self::Sqlite(conn) => conn.close()?,
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => conn.close()?,
        }
        Ok(())
    }
}

impl Engine for AnyEngine {
    type Connection = AnyConnection;
    type Error = AnyError;

    fn connect(&self) -> Result<AnyConnection, AnyError> {
        Ok(match self {
            Self::Sqlite(engine) => AnyConnection::Sqlite(engine.connect()?),
            #[cfg(feature = "postgres")]
            Self::Postgres(engine) => AnyConnection::Postgres(engine.connect()?),
        })
    }

    fn dispose(self) -> Result<(), AnyError> {
        match self {
            Self::Sqlite(engine) => engine.dispose()?,
            #[cfg(feature = "postgres")]
            Self::Postgres(engine) => engine.dispose()?,
        }
        Ok(())
    }
}

/// Factory choosing a bundled backend from [`DatabaseUrl::backend`]
///
/// `sqlite` maps to SQLite, `postgres`/`postgresql` to PostgreSQL when the
/// `postgres` feature is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFactory;

impl EngineFactory for DefaultFactory {
    type Engine = AnyEngine;

    fn create_engine(&self, url: &DatabaseUrl, options: &ConnectOptions) -> Result<AnyEngine, AnyError> {
        debug!("Selecting backend for driver {}", url.drivername());
        match url.backend() {
            "sqlite" => Ok(AnyEngine::Sqlite(SqliteEngine::new(url, options)?)),
            #[cfg(feature = "postgres")]
            "postgres" | "postgresql" => Ok(AnyEngine::Postgres(PgEngine::new(url, options)?)),
            _ => Err(AnyError::UnsupportedDriver {
                drivername: url.drivername().to_string(),
            }),
        }
    }
}
