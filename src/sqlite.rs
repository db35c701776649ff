use crate::error::{error_kind, ConnectError, DatabaseResult};
use crate::logger::Logger;
use rusqlite::hooks::Action;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Batch, Connection, Params, Statement};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::Index;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}

/// Renders the value the way it appears in the result dump of the log.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{:?}", r),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Blob(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                f.write_str("'")
            }
        }
    }
}

/// One fetched result row.
///
/// Fields are addressable by position or by column name. Name lookup
/// ignores ASCII case, like SQLite's own identifier matching. All rows of
/// one result set share a single column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in result order
    pub fn keys(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the first column named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| &self.values[i])
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl Index<&str> for Row {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no column named {:?} in row", name),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str("]")
    }
}

/// Serialized as a map from column name to value, in column order.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Database handle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file, relative paths resolve against the
    /// working directory at open time
    pub db_path: PathBuf,
    /// Path of the operation log
    pub log_path: PathBuf,
}

impl SqliteConfig {
    /// Create a new SQLite config with database and log paths
    pub fn new(db_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            log_path: log_path.into(),
        }
    }
}

/// Logged handle over a single SQLite database file.
///
/// The connection is opened by [`Database::open`] and closed when the
/// handle is dropped or passed to [`Database::close`]. A failed connect is
/// logged and leaves the handle disconnected for good; every query method
/// panics on a disconnected handle. Query errors are returned to the
/// caller untouched.
///
/// Each query holds exactly one statement and is committed as soon as it
/// has run.
#[derive(Debug)]
pub struct Database {
    logger: Logger,
    path: PathBuf,
    conn: Option<Connection>,
    /// Set by the connection's update hook on the first inserted row.
    inserted: Arc<AtomicBool>,
    last_row_id: Option<i64>,
}

impl Database {
    /// Open the database at `db_path`, logging to `log_path`.
    ///
    /// Never fails. Check [`Database::is_connected`] or the log to learn
    /// whether the connection came up.
    pub fn open(db_path: impl AsRef<Path>, log_path: impl AsRef<Path>) -> Self {
        let logger = Logger::new(log_path);
        logger.log("Starting Database");
        let path = absolute_path(db_path.as_ref());

        let mut db = Self {
            logger,
            path,
            conn: None,
            inserted: Arc::new(AtomicBool::new(false)),
            last_row_id: None,
        };
        db.conn = db.connect();
        db
    }

    pub fn from_config(config: &SqliteConfig) -> Self {
        Self::open(&config.db_path, &config.log_path)
    }

    /// Absolute path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Run `query` without parameters and return every row it produced.
    ///
    /// Empty or comment-only text runs nothing and yields no rows. Text
    /// holding more than one statement is rejected with
    /// [`rusqlite::Error::MultipleStatement`] before anything runs.
    pub fn run_query(&mut self, query: &str) -> DatabaseResult<Vec<Row>> {
        self.logger.log(format!("Running query:\n{}", query));
        let rows = self.execute(query, params![])?;
        self.logger.log("Query executed, fetching results");
        self.log_results(&rows);
        Ok(rows)
    }

    /// Run `query` with each blob bound, in order, to `?1..?N`.
    ///
    /// The number of blobs must match the statement's parameter count; a
    /// mismatch is rejected before the statement runs.
    pub fn run_query_insert_blob<B: AsRef<[u8]>>(
        &mut self,
        query: &str,
        blobs: &[B],
    ) -> DatabaseResult<Vec<Row>> {
        self.logger
            .log(format!("Running blobs insert query:\n{}", query));
        let params = params_from_iter(blobs.iter().map(AsRef::<[u8]>::as_ref));
        let rows = self.execute(query, params)?;
        self.logger
            .log("Blobs insert query executed, fetching results");
        self.log_results(&rows);
        Ok(rows)
    }

    /// Row id of the last row inserted through this handle, if any.
    ///
    /// Once a row has been inserted this mirrors SQLite's
    /// `last_insert_rowid` after every statement, so `Some(0)` is a real id.
    pub fn last_row_id(&self) -> Option<i64> {
        assert!(
            self.is_connected(),
            "database handle for {} is not connected",
            self.path.display()
        );
        self.last_row_id
    }

    /// Commit pending work and close the connection.
    pub fn close(self) {
        drop(self);
    }

    fn connection(&self) -> &Connection {
        match &self.conn {
            Some(conn) => conn,
            None => panic!(
                "database handle for {} is not connected",
                self.path.display()
            ),
        }
    }

    fn connect(&self) -> Option<Connection> {
        self.logger.log("Connecting to database");
        match Connection::open(&self.path).map_err(ConnectError::from) {
            Ok(conn) => {
                let inserted = Arc::clone(&self.inserted);
                conn.update_hook(Some(
                    move |action: Action, _db: &str, _table: &str, _row_id: i64| {
                        if matches!(action, Action::SQLITE_INSERT) {
                            inserted.store(true, Ordering::Relaxed);
                        }
                    },
                ));
                self.logger
                    .log(format!("SQLITE version: {}", rusqlite::version()));
                self.logger.log("Successfully connected to database");
                Some(conn)
            }
            Err(e) => {
                self.logger.log(format!("SQLITE ERROR: {}", e));
                self.logger.log("Failed to connect to database");
                None
            }
        }
    }

    fn execute<P: Params>(&mut self, query: &str, params: P) -> DatabaseResult<Vec<Row>> {
        let conn = self.connection();
        let rows = {
            let mut batch = Batch::new(conn, query);
            match batch.next()? {
                None => Vec::new(),
                Some(mut stmt) => {
                    // Trailing whitespace and comments prepare to nothing.
                    if !matches!(batch.next(), Ok(None)) {
                        return Err(rusqlite::Error::MultipleStatement.into());
                    }
                    fetch_rows(&mut stmt, params)?
                }
            }
        };
        let row_id = conn.last_insert_rowid();
        commit(conn)?;

        if self.inserted.load(Ordering::Relaxed) {
            self.last_row_id = Some(row_id);
        }
        Ok(rows)
    }

    fn log_results(&self, rows: &[Row]) {
        let Some(first) = rows.first() else {
            self.logger.log("No results");
            return;
        };
        self.logger
            .log(format!("Result columns:\n{:?}", first.keys()));
        let dump: String = rows.iter().map(|row| format!("{}\n", row)).collect();
        self.logger.log(format!("Results fetched:\n{}", dump));
    }

    fn log_sqlite_error(&self, err: &rusqlite::Error) {
        self.logger
            .log(format!("SQLITE ERROR: {}: {}", error_kind(err), err));
    }

    fn disconnect(&mut self) {
        self.logger.log("Disconnecting from database");
        if let Some(conn) = self.conn.take() {
            if let Err(e) = commit(&conn) {
                self.log_sqlite_error(&e);
            }
            if let Err((_, e)) = conn.close() {
                self.log_sqlite_error(&e);
            }
        }
        self.logger.log("Disconnected from database");
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.disconnect();
        self.logger.log("Ending database");
    }
}

fn fetch_rows<P: Params>(stmt: &mut Statement<'_>, params: P) -> rusqlite::Result<Vec<Row>> {
    let columns: Arc<[String]> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let mut fetched = Vec::new();
    let mut rows = stmt.query(params)?;
    while let Some(row) = rows.next()? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        fetched.push(Row::new(Arc::clone(&columns), values));
    }
    Ok(fetched)
}

/// Commit the transaction left open by the last statement, if any.
fn commit(conn: &Connection) -> rusqlite::Result<()> {
    if !conn.is_autocommit() {
        conn.execute_batch("COMMIT")?;
    }
    Ok(())
}

/// Lexically absolute form of `path`, anchored at the working directory.
fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
