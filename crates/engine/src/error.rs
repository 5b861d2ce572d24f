use geosync_core::{CoreError, RecordId};
use geosync_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("can't set geometry on {table} because it lacks a geometry column")]
    Schema { table: String },

    #[error("{attribute} can't be accessed until the pending geometry has been saved")]
    StaleRead { attribute: &'static str },

    #[error("can't get simplified geojson on {table} id {id:?} until it has been saved")]
    PendingWrite { table: String, id: Option<RecordId> },

    #[error("can't update geometry on {table} without an id")]
    MissingIdentity { table: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("invalid geojson: {0}")]
    InvalidGeoJson(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for GeometryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingGeometryColumn { table } => Self::Schema { table },
            other => Self::Core(other),
        }
    }
}
