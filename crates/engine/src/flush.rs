use tracing::{debug, info, warn};

use geosync_core::{RecordId, SqlBuilder};
use geosync_storage::{GeometryStore, StorageError};

use crate::capability::GeometryHost;
use crate::error::GeometryError;
use crate::reader::PersistedGeometryReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending; no statement ran.
    Clean,
    Flushed { id: RecordId, payload_present: bool },
}

/// Host persistence hook, invoked after every successful save.
pub trait AfterSave<H> {
    fn after_save(&self, entity: &mut H) -> Result<FlushOutcome, GeometryError>;
}

/// Writes a pending geometry change through to the store.
pub struct FlushCoordinator<'a, S> {
    builder: &'a SqlBuilder,
    store: &'a S,
}

impl<'a, S: GeometryStore> FlushCoordinator<'a, S> {
    pub fn new(builder: &'a SqlBuilder, store: &'a S) -> Self {
        Self { builder, store }
    }

    /// Flush `entity` if dirty.
    ///
    /// The state returns to clean only once the UPDATE has succeeded and
    /// touched the row; the entity is then reloaded so its native columns
    /// reflect the store-side reprojection.
    pub fn flush<H: GeometryHost>(&self, entity: &mut H) -> Result<FlushOutcome, GeometryError> {
        let table = self.builder.shape().table();
        let Some(pending) = entity.capability().state().pending() else {
            return Ok(FlushOutcome::Clean);
        };
        let id = entity.id().ok_or_else(|| GeometryError::MissingIdentity {
            table: table.to_string(),
        })?;

        let payload_present = pending.is_some();
        let statement = self.builder.update(id, pending)?;
        debug!(
            table,
            id,
            payload_present,
            payload_bytes = pending.map_or(0, |p| p.len()),
            "flushing pending geometry"
        );

        let affected = match self.store.execute(&statement) {
            Ok(affected) => affected,
            Err(err) => {
                warn!(table, id, error = %err, "geometry update rejected; change kept pending");
                return Err(err.into());
            }
        };
        if affected == 0 {
            warn!(table, id, "geometry update matched no row; change kept pending");
            return Err(StorageError::NotFound(format!("{table} id {id}")).into());
        }

        entity.capability_mut().mark_flushed();
        info!(table, id, payload_present, "geometry flushed");

        PersistedGeometryReader::new(self.builder, self.store).reload(entity)?;
        Ok(FlushOutcome::Flushed { id, payload_present })
    }
}

impl<S: GeometryStore, H: GeometryHost> AfterSave<H> for FlushCoordinator<'_, S> {
    fn after_save(&self, entity: &mut H) -> Result<FlushOutcome, GeometryError> {
        self.flush(entity)
    }
}
