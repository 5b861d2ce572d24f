pub mod capability;
pub mod error;
pub mod flush;
pub mod reader;

pub use capability::{GeometryCapability, GeometryEntity, GeometryHost, NativeGeometry};
pub use error::GeometryError;
pub use flush::{AfterSave, FlushCoordinator, FlushOutcome};
pub use reader::PersistedGeometryReader;

use geosync_core::{
    GeometryColumns, RecordId, SpatialConfig, SqlBuilder, TableShape, TemplateCache,
};
use geosync_storage::GeometryStore;

/// Geometry synchronization for one table.
///
/// Inspects the table's columns once, then owns the statement builder and
/// hands out readers and flush coordinators bound to its store.
pub struct GeometryModel<S> {
    store: S,
    builder: SqlBuilder,
    primary_key: String,
}

impl<S: GeometryStore> GeometryModel<S> {
    pub fn inspect(
        store: S,
        table: &str,
        primary_key: &str,
        config: SpatialConfig,
    ) -> Result<Self, GeometryError> {
        Self::inspect_with_cache(store, table, primary_key, config, TemplateCache::new())
    }

    pub fn inspect_with_cache(
        store: S,
        table: &str,
        primary_key: &str,
        config: SpatialConfig,
        cache: TemplateCache,
    ) -> Result<Self, GeometryError> {
        let columns = GeometryColumns::inspect(&store.table_columns(table)?, &config);
        let shape = TableShape::new(table, primary_key, columns, &config)?;
        Ok(Self {
            store,
            builder: SqlBuilder::with_cache(shape, config, cache),
            primary_key: primary_key.to_string(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn shape(&self) -> &TableShape {
        self.builder.shape()
    }

    pub fn config(&self) -> &SpatialConfig {
        self.builder.config()
    }

    pub fn builder(&self) -> &SqlBuilder {
        &self.builder
    }

    pub fn reader(&self) -> PersistedGeometryReader<'_, S> {
        PersistedGeometryReader::new(&self.builder, &self.store)
    }

    pub fn coordinator(&self) -> FlushCoordinator<'_, S> {
        FlushCoordinator::new(&self.builder, &self.store)
    }

    /// Current geometry as display-SRID GeoJSON text.
    ///
    /// While dirty, returns the pending value; a simplified read is refused
    /// because only the store can simplify persisted geometry.
    pub fn geojson<H: GeometryHost>(
        &self,
        entity: &H,
        simplify: Option<f64>,
    ) -> Result<Option<String>, GeometryError> {
        match entity.capability().state().pending() {
            Some(_) if simplify.is_some() => Err(GeometryError::PendingWrite {
                table: self.shape().table().to_string(),
                id: entity.id(),
            }),
            Some(pending) => Ok(pending.map(|p| p.as_str().to_string())),
            None => self.reader().read(entity, simplify),
        }
    }

    /// [`Self::geojson`] parsed into a JSON value.
    pub fn geometry<H: GeometryHost>(
        &self,
        entity: &H,
        simplify: Option<f64>,
    ) -> Result<Option<serde_json::Value>, GeometryError> {
        match self.geojson(entity, simplify)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn reload<H: GeometryHost>(&self, entity: &mut H) -> Result<(), GeometryError> {
        self.reader().reload(entity)
    }

    pub fn find(&self, id: RecordId) -> Result<Option<GeometryEntity>, GeometryError> {
        let rows = self.store.select_rows(&self.builder.reload(id))?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| GeometryEntity::from_row(row, &self.primary_key, self.config())))
    }

    /// Like [`Self::find`], with the display GeoJSON preselected.
    pub fn find_with_geojson(&self, id: RecordId) -> Result<Option<GeometryEntity>, GeometryError> {
        Ok(self.load_with_geojson(Some(id))?.into_iter().next())
    }

    /// Every row, each with its display GeoJSON preselected.
    pub fn all_with_geojson(&self) -> Result<Vec<GeometryEntity>, GeometryError> {
        self.load_with_geojson(None)
    }

    fn load_with_geojson(
        &self,
        id: Option<RecordId>,
    ) -> Result<Vec<GeometryEntity>, GeometryError> {
        let statement = self.builder.select_with_geojson(id)?;
        Ok(self
            .store
            .select_rows(&statement)?
            .into_iter()
            .map(|row| GeometryEntity::from_row(row, &self.primary_key, self.config()))
            .collect())
    }
}

/// Save hook: flush the entity if it has a pending geometry change.
impl<S: GeometryStore, H: GeometryHost> AfterSave<H> for GeometryModel<S> {
    fn after_save(&self, entity: &mut H) -> Result<FlushOutcome, GeometryError> {
        self.coordinator().flush(entity)
    }
}
