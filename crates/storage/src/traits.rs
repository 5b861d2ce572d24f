use std::collections::BTreeMap;

use geosync_core::{Statement, StoredValue};

use crate::error::StorageError;

/// One row keyed by column name.
pub type StoredRow = BTreeMap<String, StoredValue>;

/// The statement execution surface geometry synchronization needs.
///
/// Implementations bind every value in `Statement::binds` through the
/// driver; templates are never concatenated with values.
pub trait GeometryStore {
    /// Column names of `table`, in declaration order.
    fn table_columns(&self, table: &str) -> Result<Vec<String>, StorageError>;

    /// Execute a write, returning the number of affected rows.
    fn execute(&self, statement: &Statement) -> Result<usize, StorageError>;

    /// First column of the first row as text. `None` for no row or NULL.
    fn select_value(&self, statement: &Statement) -> Result<Option<String>, StorageError>;

    fn select_rows(&self, statement: &Statement) -> Result<Vec<StoredRow>, StorageError>;
}

impl<S: GeometryStore + ?Sized> GeometryStore for &S {
    fn table_columns(&self, table: &str) -> Result<Vec<String>, StorageError> {
        (**self).table_columns(table)
    }

    fn execute(&self, statement: &Statement) -> Result<usize, StorageError> {
        (**self).execute(statement)
    }

    fn select_value(&self, statement: &Statement) -> Result<Option<String>, StorageError> {
        (**self).select_value(statement)
    }

    fn select_rows(&self, statement: &Statement) -> Result<Vec<StoredRow>, StorageError> {
        (**self).select_rows(statement)
    }
}
