//! Thin, logged access layer over a single SQLite database file.
//!
//! # Intention
//!
//! - Open one connection per handle, run caller-supplied SQL and hand back
//!   owned, name-addressable rows.
//! - Leave a human-readable trail of every connect, query and disconnect in
//!   a log file.
//!
//! # Architectural Boundaries
//!
//! - No pooling, query building, migrations or retries.
//! - Connect failures are logged and swallowed; query failures are returned
//!   to the caller; using a disconnected handle panics.
//!
//! ```no_run
//! use rust_sqlite_handle::Database;
//!
//! let mut db = Database::open("app.db", "app-db.log");
//! db.run_query("CREATE TABLE IF NOT EXISTS files (id INTEGER PRIMARY KEY, data BLOB)")?;
//! db.run_query_insert_blob("INSERT INTO files (data) VALUES (?)", &[b"\x00\x01".as_slice()])?;
//! let id = db.last_row_id();
//! db.close();
//! # Ok::<(), rust_sqlite_handle::DatabaseError>(())
//! ```

pub mod error;
pub mod logger;
pub mod sqlite;

pub use error::{ConnectError, DatabaseError, DatabaseResult};
pub use logger::Logger;
pub use sqlite::{Database, Row, SqliteConfig, Value};
