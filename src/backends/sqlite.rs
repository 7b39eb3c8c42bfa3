//! SQLite engine backed by `rusqlite`
//!
//! `sqlite:///relative.db`, `sqlite:////absolute.db` and `sqlite://` (in-memory)
//! are accepted. Supported connect options:
//!
//! | key | type | effect |
//! |---|---|---|
//! | `timeout` | seconds | busy timeout |
//! | `read_only` | bool | open without write access |
//! | `foreign_keys` | bool | `PRAGMA foreign_keys` |
//! | `journal_mode` | string | `PRAGMA journal_mode` |

use crate::database_url::{DatabaseUrl, UrlError};
use crate::options::{ConnectOptions, OptionError};
use crate::toolkit::{Connection, Engine};
use rusqlite::OpenFlags;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const ACCEPTED_OPTIONS: &[&str] = &["timeout", "read_only", "foreign_keys", "journal_mode"];

/// SQLite backend errors
#[derive(Debug, Error)]
pub enum SqliteError {
    /// Error reported by SQLite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Invalid connect option
    #[error(transparent)]
    Option(#[from] OptionError),

    /// Database path could not be read from the URL
    #[error(transparent)]
    Url(#[from] UrlError),

    /// URL does not name a SQLite database
    #[error("Not a SQLite URL: {drivername}")]
    WrongBackend {
        /// Driver name that was supplied
        drivername: String,
    },
}

/// Where connections point to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// Private in-memory database per connection
    Memory,
    /// Database file
    File(PathBuf),
}

#[derive(Debug, Clone, Default)]
struct SqliteSettings {
    timeout: Option<Duration>,
    read_only: bool,
    foreign_keys: Option<bool>,
    journal_mode: Option<String>,
}

impl SqliteSettings {
    fn from_options(options: &ConnectOptions) -> Result<Self, OptionError> {
        options.ensure_known(ACCEPTED_OPTIONS)?;

        let timeout = options
            .get_f64("timeout")?
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| OptionError::InvalidValue {
                    key: "timeout".to_string(),
                    expected: "a non-negative number of seconds",
                    value: secs.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            timeout,
            read_only: options.get_bool("read_only")?.unwrap_or(false),
            foreign_keys: options.get_bool("foreign_keys")?,
            journal_mode: options.get_str("journal_mode")?.map(str::to_string),
        })
    }

    fn open_flags(&self) -> OpenFlags {
        if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        }
    }
}

/// Engine producing connections to one SQLite database
#[derive(Debug)]
pub struct SqliteEngine {
    target: SqliteTarget,
    settings: SqliteSettings,
}

impl SqliteEngine {
    /// Validate `options` and resolve the database location
    ///
    /// No file is opened until [`Engine::connect`] is called.
    pub fn new(url: &DatabaseUrl, options: &ConnectOptions) -> Result<Self, SqliteError> {
        if url.backend() != "sqlite" {
            return Err(SqliteError::WrongBackend {
                drivername: url.drivername().to_string(),
            });
        }

        let settings = SqliteSettings::from_options(options)?;
        let target = match url.database()?.as_deref() {
            None | Some(":memory:") => SqliteTarget::Memory,
            Some(path) => SqliteTarget::File(PathBuf::from(path)),
        };
        debug!("SQLite engine ready for {:?}", target);

        Ok(Self { target, settings })
    }

    /// Database location
    #[must_use]
    pub const fn target(&self) -> &SqliteTarget {
        &self.target
    }

    /// Database file, `None` for in-memory engines
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            SqliteTarget::Memory => None,
            SqliteTarget::File(path) => Some(path),
        }
    }

    fn configure(&self, conn: &rusqlite::Connection) -> Result<(), SqliteError> {
        if let Some(timeout) = self.settings.timeout {
            conn.busy_timeout(timeout)?;
        }
        if let Some(enabled) = self.settings.foreign_keys {
            conn.pragma_update(None, "foreign_keys", enabled)?;
        }
        if let Some(mode) = &self.settings.journal_mode {
            let applied: String =
                conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
            debug!("SQLite journal_mode set to {}", applied);
        }
        Ok(())
    }
}

impl Engine for SqliteEngine {
    type Connection = SqliteConnection;
    type Error = SqliteError;

    fn connect(&self) -> Result<SqliteConnection, SqliteError> {
        let flags = self.settings.open_flags();
        let inner = match &self.target {
            SqliteTarget::Memory => rusqlite::Connection::open_in_memory_with_flags(flags)?,
            SqliteTarget::File(path) => rusqlite::Connection::open_with_flags(path, flags)?,
        };
        self.configure(&inner)?;
        Ok(SqliteConnection { inner })
    }

    fn dispose(self) -> Result<(), SqliteError> {
        debug!("SQLite engine for {:?} disposed", self.target);
        Ok(())
    }
}

/// An open SQLite connection
#[derive(Debug)]
pub struct SqliteConnection {
    inner: rusqlite::Connection,
}

impl SqliteConnection {
    /// Native connection
    #[must_use]
    pub const fn inner(&self) -> &rusqlite::Connection {
        &self.inner
    }

    /// Native connection, mutably
    pub fn inner_mut(&mut self) -> &mut rusqlite::Connection {
        &mut self.inner
    }

    /// Round-trip a trivial query
    pub fn ping(&self) -> Result<(), SqliteError> {
        self.inner.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

impl Connection for SqliteConnection {
    type Error = SqliteError;

    fn close(self) -> Result<(), SqliteError> {
        self.inner.close().map_err(|(_, e)| SqliteError::Sqlite(e))
    }
}
