use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected value: {0}")]
    UnexpectedValue(String),

    #[error("core error: {0}")]
    Core(#[from] geosync_core::CoreError),
}
