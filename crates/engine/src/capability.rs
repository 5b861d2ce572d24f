use geosync_core::{DirtyState, RecordId, SpatialConfig, StoredValue};
use geosync_storage::StoredRow;

use crate::error::GeometryError;

/// A store-native geometry value. Never decoded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeGeometry(StoredValue);

impl NativeGeometry {
    fn from_stored(value: Option<&StoredValue>) -> Option<Self> {
        match value {
            None | Some(StoredValue::Null) => None,
            Some(v) => Some(Self(v.clone())),
        }
    }

    pub fn as_value(&self) -> &StoredValue {
        &self.0
    }
}

/// Per-instance geometry state attached to a host entity.
#[derive(Debug, Clone, Default)]
pub struct GeometryCapability {
    state: DirtyState,
    geom: Option<NativeGeometry>,
    geom_webmercator: Option<NativeGeometry>,
    preselected: Option<String>,
    /// Set between a confirmed flush and the next reload.
    unloaded: bool,
}

impl GeometryCapability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capability populated from a persisted row.
    pub fn from_row(row: &StoredRow, config: &SpatialConfig) -> Self {
        let mut capability = Self::new();
        capability.load_row(row, config);
        capability
    }

    pub fn state(&self) -> &DirtyState {
        &self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    /// Stage a raw GeoJSON string. Blank or `None` stages a null geometry.
    pub fn assign_geojson(&mut self, raw: Option<&str>) {
        self.state.assign(raw);
    }

    /// Stage a structured GeoJSON value.
    ///
    /// JSON `null`, `{}`, `[]` and blank strings stage a null geometry.
    pub fn assign_geometry(
        &mut self,
        value: Option<&serde_json::Value>,
    ) -> Result<(), GeometryError> {
        match value.filter(|v| !is_blank(v)) {
            None => self.state.assign(None),
            Some(value) => {
                let text = serde_json::to_string(value)?;
                self.state.assign(Some(&text));
            }
        }
        Ok(())
    }

    pub fn geom(&self) -> Result<Option<&NativeGeometry>, GeometryError> {
        if self.is_dirty() || self.unloaded {
            return Err(GeometryError::StaleRead { attribute: "geom" });
        }
        Ok(self.geom.as_ref())
    }

    pub fn geom_webmercator(&self) -> Result<Option<&NativeGeometry>, GeometryError> {
        if self.is_dirty() || self.unloaded {
            return Err(GeometryError::StaleRead {
                attribute: "geom_webmercator",
            });
        }
        Ok(self.geom_webmercator.as_ref())
    }

    /// GeoJSON attached by a bulk select, if any.
    pub fn preselected_geojson(&self) -> Option<&str> {
        self.preselected.as_deref()
    }

    /// Whether the store may hold a geometry for this entity. Unknown
    /// after a flush until the row is reloaded.
    pub(crate) fn has_persisted_geometry(&self) -> bool {
        self.unloaded || self.geom.is_some()
    }

    /// The store accepted the pending change. Persisted values held here
    /// predate it and are dropped until the next reload.
    pub(crate) fn mark_flushed(&mut self) {
        self.state.mark_flushed();
        self.geom = None;
        self.geom_webmercator = None;
        self.preselected = None;
        self.unloaded = true;
    }

    /// Replace persisted attributes from `row`. Dirty state is untouched.
    pub(crate) fn load_row(&mut self, row: &StoredRow, config: &SpatialConfig) {
        self.unloaded = false;
        self.geom = NativeGeometry::from_stored(row.get(&config.geometry_column));
        self.geom_webmercator = NativeGeometry::from_stored(row.get(&config.projected_column));
        self.preselected = row
            .get(&config.preselect_alias)
            .and_then(StoredValue::as_text)
            .map(str::to_string);
    }
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// An entity type that carries a [`GeometryCapability`].
pub trait GeometryHost {
    fn id(&self) -> Option<RecordId>;

    fn capability(&self) -> &GeometryCapability;

    fn capability_mut(&mut self) -> &mut GeometryCapability;

    /// Called with the freshly selected row on reload, after the capability
    /// has been refreshed.
    fn refresh(&mut self, _row: &StoredRow) {}
}

/// A plain row plus its geometry capability.
#[derive(Debug, Clone, Default)]
pub struct GeometryEntity {
    pub id: Option<RecordId>,
    pub attributes: StoredRow,
    pub geometry: GeometryCapability,
}

impl GeometryEntity {
    /// A new, not yet persisted entity.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_row(row: StoredRow, primary_key: &str, config: &SpatialConfig) -> Self {
        let id = row.get(primary_key).and_then(StoredValue::as_integer);
        let geometry = GeometryCapability::from_row(&row, config);
        Self {
            id,
            attributes: row,
            geometry,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&StoredValue> {
        self.attributes.get(name)
    }
}

impl GeometryHost for GeometryEntity {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn capability(&self) -> &GeometryCapability {
        &self.geometry
    }

    fn capability_mut(&mut self) -> &mut GeometryCapability {
        &mut self.geometry
    }

    fn refresh(&mut self, row: &StoredRow) {
        self.attributes = row.clone();
    }
}
