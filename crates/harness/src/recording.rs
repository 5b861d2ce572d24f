use std::sync::Mutex;

use geosync_core::{BindValue, Statement};
use geosync_storage::{GeometryStore, StorageError, StoredRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Execute,
    SelectValue,
    SelectRows,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub kind: StatementKind,
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// Wraps a store and records every statement routed through it.
pub struct RecordingStore<S> {
    inner: S,
    log: Mutex<Vec<RecordedStatement>>,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, kind: StatementKind) -> usize {
        self.statements().iter().filter(|s| s.kind == kind).count()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, kind: StatementKind, statement: &Statement) {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedStatement {
                kind,
                sql: statement.sql().to_string(),
                binds: statement.binds.clone(),
            });
    }
}

impl<S: GeometryStore> GeometryStore for RecordingStore<S> {
    fn table_columns(&self, table: &str) -> Result<Vec<String>, StorageError> {
        self.inner.table_columns(table)
    }

    fn execute(&self, statement: &Statement) -> Result<usize, StorageError> {
        self.record(StatementKind::Execute, statement);
        self.inner.execute(statement)
    }

    fn select_value(&self, statement: &Statement) -> Result<Option<String>, StorageError> {
        self.record(StatementKind::SelectValue, statement);
        self.inner.select_value(statement)
    }

    fn select_rows(&self, statement: &Statement) -> Result<Vec<StoredRow>, StorageError> {
        self.record(StatementKind::SelectRows, statement);
        self.inner.select_rows(statement)
    }
}
