use tracing::debug;

use geosync_core::SqlBuilder;
use geosync_storage::{GeometryStore, StorageError};

use crate::capability::GeometryHost;
use crate::error::GeometryError;

/// Reads geometry from the persisted store for clean entities.
pub struct PersistedGeometryReader<'a, S> {
    builder: &'a SqlBuilder,
    store: &'a S,
}

impl<'a, S: GeometryStore> PersistedGeometryReader<'a, S> {
    pub fn new(builder: &'a SqlBuilder, store: &'a S) -> Self {
        Self { builder, store }
    }

    fn missing_identity(&self) -> GeometryError {
        GeometryError::MissingIdentity {
            table: self.builder.shape().table().to_string(),
        }
    }

    /// Display-SRID GeoJSON for `entity`, optionally simplified.
    ///
    /// Without a tolerance, a preselected value is returned as is. Otherwise
    /// one query is issued, unless the entity has no persisted geometry.
    pub fn read<H: GeometryHost>(
        &self,
        entity: &H,
        simplify: Option<f64>,
    ) -> Result<Option<String>, GeometryError> {
        let capability = entity.capability();
        if capability.is_dirty() {
            return Err(GeometryError::StaleRead { attribute: "geom" });
        }

        if let (None, Some(preselected)) = (simplify, capability.preselected_geojson()) {
            debug!(table = self.builder.shape().table(), id = ?entity.id(), "preselected geojson");
            return Ok(Some(preselected.to_string()));
        }

        if !capability.has_persisted_geometry() {
            return Ok(None);
        }

        let id = entity.id().ok_or_else(|| self.missing_identity())?;
        let statement = self.builder.read_geojson(id, simplify)?;
        debug!(table = self.builder.shape().table(), id, ?simplify, "querying geojson");
        Ok(self.store.select_value(&statement)?)
    }

    /// Re-select every persisted column of `entity` and refresh it.
    pub fn reload<H: GeometryHost>(&self, entity: &mut H) -> Result<(), GeometryError> {
        let id = entity.id().ok_or_else(|| self.missing_identity())?;
        let statement = self.builder.reload(id);
        let row = self
            .store
            .select_rows(&statement)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StorageError::NotFound(format!("{} id {id}", self.builder.shape().table()))
            })?;
        entity
            .capability_mut()
            .load_row(&row, self.builder.config());
        entity.refresh(&row);
        Ok(())
    }
}
