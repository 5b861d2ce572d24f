use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("can't set geometry on {table} because it lacks a geometry column")]
    MissingGeometryColumn { table: String },

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid simplify tolerance: {0}")]
    InvalidTolerance(f64),
}
