use std::path::{Path, PathBuf};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;
use tracing::debug;

use geosync_core::{BindValue, Statement, StoredValue};

use crate::error::StorageError;
use crate::schema::{configure_connection, DEFAULT_POOL_SIZE};
use crate::traits::{GeometryStore, StoredRow};

fn bind_value(bind: &BindValue) -> Value {
    match bind {
        BindValue::Text(s) => Value::Text(s.clone()),
        BindValue::Integer(n) => Value::Integer(*n),
        BindValue::Float(x) => Value::Real(*x),
    }
}

fn stored_value(value: ValueRef<'_>) -> Result<StoredValue, StorageError> {
    Ok(match value {
        ValueRef::Null => StoredValue::Null,
        ValueRef::Integer(n) => StoredValue::Integer(n),
        ValueRef::Real(x) => StoredValue::Real(x),
        ValueRef::Text(bytes) => StoredValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| StorageError::UnexpectedValue(e.to_string()))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => StoredValue::Blob(bytes.to_vec()),
    })
}

/// SQLite-backed store with an r2d2 connection pool.
///
/// Each statement runs on a connection checked out for its duration and
/// returned to the pool when the guard drops, on success or failure.
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with(path, DEFAULT_POOL_SIZE, |_| Ok(()))
    }

    /// Open a pool whose connections also run `init` after the standard
    /// pragmas. Used to register spatial functions.
    pub fn open_with<F>(
        path: impl AsRef<Path>,
        pool_size: u32,
        init: F,
    ) -> Result<Self, StorageError>
    where
        F: Fn(&Connection) -> Result<(), rusqlite::Error> + Send + Sync + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path).with_init(move |conn| {
            configure_connection(conn)?;
            init(conn)
        });
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        Ok(Self { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        Ok(self.pool.get()?)
    }

    /// Run `f` on a pooled connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let conn = self.conn()?;
        f(&conn)
    }
}

impl GeometryStore for SqliteStore {
    fn table_columns(&self, table: &str) -> Result<Vec<String>, StorageError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
            let columns = stmt
                .query_map(rusqlite::params![table], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            if columns.is_empty() {
                return Err(StorageError::NotFound(format!("table {table}")));
            }
            Ok(columns)
        })
    }

    fn execute(&self, statement: &Statement) -> Result<usize, StorageError> {
        debug!(sql = statement.sql(), binds = statement.binds.len(), "execute");
        self.with_connection(|conn| {
            let params = statement.binds.iter().map(bind_value);
            Ok(conn.execute(statement.sql(), rusqlite::params_from_iter(params))?)
        })
    }

    fn select_value(&self, statement: &Statement) -> Result<Option<String>, StorageError> {
        debug!(sql = statement.sql(), binds = statement.binds.len(), "select value");
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(statement.sql())?;
            let params = statement.binds.iter().map(bind_value);
            let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            match stored_value(row.get_ref(0)?)? {
                StoredValue::Null => Ok(None),
                StoredValue::Text(s) => Ok(Some(s)),
                other => Err(StorageError::UnexpectedValue(format!(
                    "expected text, got {other:?}"
                ))),
            }
        })
    }

    fn select_rows(&self, statement: &Statement) -> Result<Vec<StoredRow>, StorageError> {
        debug!(sql = statement.sql(), binds = statement.binds.len(), "select rows");
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(statement.sql())?;
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let params = statement.binds.iter().map(bind_value);
            let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

            let mut result = Vec::new();
            while let Some(row) = rows.next()? {
                let mut stored = StoredRow::new();
                for (index, name) in names.iter().enumerate() {
                    stored.insert(name.clone(), stored_value(row.get_ref(index)?)?);
                }
                result.push(stored);
            }
            Ok(result)
        })
    }
}
