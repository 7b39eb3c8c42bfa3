/// Backend selection by driver name
pub mod any;
/// PostgreSQL backend
#[cfg(feature = "postgres")]
pub mod postgres;
/// SQLite backend
pub mod sqlite;

pub use any::{AnyConnection, AnyEngine, AnyError, DefaultFactory};
#[cfg(feature = "postgres")]
pub use postgres::{PgConnection, PgEngine, PgError};
pub use sqlite::{SqliteConnection, SqliteEngine, SqliteError, SqliteTarget};
