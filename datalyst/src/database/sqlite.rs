//! SQLite database collaborator.
//!
//! Files are opened read-only and connections supplied by the caller are
//! switched to `query_only`, so a statement that slips past the safety gate
//! still cannot write. `rusqlite` also refuses to prepare a string holding
//! more than one statement.
//!
//! All driver calls run on the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Number, Value};
use tracing::{debug, info, instrument};

use super::{ColumnInfo, Database, DatabaseSchema, ResultSet};
use crate::error::{DatabaseError, DatabaseResult};
use crate::telemetry::clip;

/// How long a statement waits on a locked database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`Database`].
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteDatabase {
    /// Open an existing database file read-only.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Connection`] if the file is missing or is
    /// not a SQLite database.
    pub fn open(path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DatabaseError::connection(format!("{}: {e}", path.display())))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        info!(path = %path.display(), "database_opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an already open connection, switching it to `query_only`.
    ///
    /// Used for in-memory fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Query`] if the pragma cannot be set.
    pub fn from_connection(conn: Connection) -> DatabaseResult<Self> {
        conn.execute_batch("PRAGMA query_only = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Path of the underlying file, if opened from one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn with_conn<T, F>(&self, f: F) -> DatabaseResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DatabaseResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| DatabaseError::Lock(e.to_string()))?;
            f(&guard)
        })
        .await?
    }
}

fn run_statement(conn: &Connection, sql: &str) -> DatabaseResult<Option<ResultSet>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(to_json(row.get_ref(i)?));
        }
        out.push(values);
    }

    if columns.is_empty() {
        return Ok(None);
    }
    Ok(Some(ResultSet::new(columns, out)))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

fn read_schema(conn: &Connection) -> DatabaseResult<DatabaseSchema> {
    let mut tables = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = tables
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = conn.prepare(
        "SELECT name, type, \"notnull\" FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let mut schema = DatabaseSchema::new();
    for name in names {
        let cols = columns
            .query_map([name.as_str()], |row| {
                Ok(ColumnInfo::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? == 0,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        schema.insert_table(name, cols);
    }
    Ok(schema)
}

#[async_trait]
impl Database for SqliteDatabase {
    #[instrument(skip(self, sql), fields(sql = %clip(sql, 200)))]
    async fn execute(&self, sql: &str) -> DatabaseResult<Option<ResultSet>> {
        let owned = sql.to_owned();
        let result = self.with_conn(move |conn| run_statement(conn, &owned)).await;

        match &result {
            Ok(Some(rows)) => debug!(rows = rows.len(), columns = ?rows.columns, "query_success"),
            Ok(None) => debug!("query_success_no_rows"),
            Err(e) => debug!(error = %e, "query_error"),
        }
        result
    }

    #[instrument(skip(self))]
    async fn schema(&self) -> DatabaseResult<DatabaseSchema> {
        let schema = self.with_conn(read_schema).await?;
        info!(table_count = schema.len(), "schema_retrieved");
        Ok(schema)
    }
}
