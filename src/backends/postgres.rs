//! PostgreSQL engine backed by a `bb8` pool of `tokio-postgres` clients
//!
//! The engine owns a current-thread Tokio runtime and exposes a blocking
//! facade, so it fits the synchronous [`Engine`] contract. The pool is built
//! lazily: constructing the engine performs no I/O.
//!
//! Supported connect options:
//!
//! | key | type | effect |
//! |---|---|---|
//! | `pool_size` | integer | maximum pooled clients (default 10) |
//! | `connect_timeout` | seconds | TCP connect and pool checkout timeout |
//! | `application_name` | string | reported to the server |

use crate::database_url::DatabaseUrl;
use crate::options::{ConnectOptions, OptionError};
use crate::toolkit::{Connection, Engine};
use bb8::{Pool, PooledConnection, RunError};
use bb8_postgres::PostgresConnectionManager;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio_postgres::NoTls;
use tracing::debug;

const ACCEPTED_OPTIONS: &[&str] = &["pool_size", "connect_timeout", "application_name"];

/// Default maximum pool size
pub const DEFAULT_POOL_SIZE: u32 = 10;

type Manager = PostgresConnectionManager<NoTls>;

/// PostgreSQL backend errors
#[derive(Debug, Error)]
pub enum PgError {
    /// Error reported by the server or the client library
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Pool checkout failed or timed out
    #[error("Connection pool error: {0}")]
    Pool(#[from] RunError<tokio_postgres::Error>),

    /// The private runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    /// Invalid connect option
    #[error(transparent)]
    Option(#[from] OptionError),

    /// URL does not name a PostgreSQL database
    #[error("Not a PostgreSQL URL: {drivername}")]
    WrongBackend {
        /// Driver name that was supplied
        drivername: String,
    },
}

/// Engine producing pooled PostgreSQL connections
pub struct PgEngine {
    pool: Pool<Manager>,
    runtime: Arc<Runtime>,
    pool_size: u32,
}

impl PgEngine {
    /// Build the client configuration and an empty pool
    pub fn new(url: &DatabaseUrl, options: &ConnectOptions) -> Result<Self, PgError> {
        if !matches!(url.backend(), "postgres" | "postgresql") {
            return Err(PgError::WrongBackend {
                drivername: url.drivername().to_string(),
            });
        }
        options.ensure_known(ACCEPTED_OPTIONS)?;

        let mut config: tokio_postgres::Config = normalized(url).parse()?;
        let connect_timeout = options
            .get_f64("connect_timeout")?
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| OptionError::InvalidValue {
                    key: "connect_timeout".to_string(),
                    expected: "a non-negative number of seconds",
                    value: secs.to_string(),
                })
            })
            .transpose()?;
        if let Some(timeout) = connect_timeout {
            config.connect_timeout(timeout);
        }
        if let Some(name) = options.get_str("application_name")? {
            config.application_name(name);
        }
        let pool_size = match options.get_u64("pool_size")? {
            None => DEFAULT_POOL_SIZE,
            Some(size) => u32::try_from(size)
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| OptionError::InvalidValue {
                    key: "pool_size".to_string(),
                    expected: "a positive 32-bit integer",
                    value: size.to_string(),
                })?,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let manager = PostgresConnectionManager::new(config, NoTls);
        let mut builder = Pool::builder().max_size(pool_size);
        if let Some(timeout) = connect_timeout {
            builder = builder.connection_timeout(timeout);
        }
        let pool = {
            let _guard = runtime.enter();
            builder.build_unchecked(manager)
        };

        debug!(
            "PostgreSQL engine ready: host={:?}, database={:?}, pool_size={}",
            url.host(),
            url.database().ok().flatten(),
            pool_size
        );

        Ok(Self {
            pool,
            runtime: Arc::new(runtime),
            pool_size,
        })
    }

    /// Maximum number of pooled clients
    #[must_use]
    pub const fn pool_size(&self) -> u32 {
        self.pool_size
    }
}

/// Rewrite `postgresql+driver://...` to the plain scheme `tokio-postgres` parses
fn normalized(url: &DatabaseUrl) -> String {
    let rest = &url.as_str()[url.drivername().len()..];
    format!("postgresql{rest}")
}

impl Engine for PgEngine {
    type Connection = PgConnection;
    type Error = PgError;

    fn connect(&self) -> Result<PgConnection, PgError> {
        let client = self.runtime.block_on(self.pool.get_owned())?;
        Ok(PgConnection {
            client: Some(client),
            runtime: Arc::clone(&self.runtime),
        })
    }

    fn dispose(self) -> Result<(), PgError> {
        let Self { pool, runtime, .. } = self;
        {
            let _guard = runtime.enter();
            drop(pool);
        }
        match Arc::try_unwrap(runtime) {
            Ok(runtime) => runtime.shutdown_background(),
            Err(_) => debug!("PostgreSQL runtime still shared by open connections"),
        }
        Ok(())
    }
}

impl fmt::Debug for PgEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.pool.state();
        f.debug_struct("PgEngine")
            .field("pool_size", &self.pool_size)
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish_non_exhaustive()
    }
}

/// A pooled PostgreSQL client
///
/// Closing returns the client to the engine's pool.
pub struct PgConnection {
    client: Option<PooledConnection<'static, Manager>>,
    runtime: Arc<Runtime>,
}

impl PgConnection {
    /// Native client
    #[must_use]
    pub fn client(&self) -> Option<&tokio_postgres::Client> {
        self.client.as_deref()
    }

    /// Runtime driving the client, for running its futures to completion
    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Run one or more statements without parameters
    pub fn batch_execute(&self, sql: &str) -> Result<(), PgError> {
        if let Some(client) = self.client() {
            self.runtime.block_on(client.batch_execute(sql))?;
        }
        Ok(())
    }

    /// Round-trip a trivial query
    pub fn ping(&self) -> Result<(), PgError> {
        self.batch_execute("SELECT 1")
    }
}

impl Connection for PgConnection {
    type Error = PgError;

    fn close(self) -> Result<(), PgError> {
        // Returned to the pool by Drop.
        Ok(())
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        let _guard = self.runtime.enter();
        self.client.take();
    }
}

impl fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnection")
            .field("open", &self.client.is_some())
            .finish_non_exhaustive()
    }
}
