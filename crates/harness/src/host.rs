use geosync_core::{RecordId, StoredValue};
use geosync_engine::{
    AfterSave, FlushOutcome, GeometryCapability, GeometryError, GeometryHost, GeometryModel,
};
use geosync_storage::{SqliteStore, StorageError, StoredRow};

use crate::recording::RecordingStore;

/// Host entity for the `parcels` table.
#[derive(Debug, Clone, Default)]
pub struct Parcel {
    pub id: Option<RecordId>,
    pub name: String,
    pub geometry: GeometryCapability,
}

impl Parcel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl GeometryHost for Parcel {
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
        if let Some(StoredValue::Text(name)) = row.get("name") {
            self.name = name.clone();
        }
    }
}

/// Minimal host persistence for parcels: inserts or updates the plain
/// columns, then fires the geometry save hook.
pub struct Parcels<'a> {
    model: GeometryModel<&'a RecordingStore<SqliteStore>>,
}

impl<'a> Parcels<'a> {
    pub fn new(model: GeometryModel<&'a RecordingStore<SqliteStore>>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &GeometryModel<&'a RecordingStore<SqliteStore>> {
        &self.model
    }

    fn raw(&self) -> &SqliteStore {
        self.model.store().inner()
    }

    pub fn save(&self, parcel: &mut Parcel) -> Result<FlushOutcome, GeometryError> {
        let name = parcel.name.clone();
        match parcel.id {
            None => {
                let id = self.raw().with_connection(|conn| {
                    conn.execute("INSERT INTO parcels (name) VALUES (?1)", [&name])?;
                    Ok(conn.last_insert_rowid())
                })?;
                parcel.id = Some(id);
            }
            Some(id) => {
                self.raw().with_connection(|conn| {
                    conn.execute(
                        "UPDATE parcels SET name = ?1 WHERE id = ?2",
                        rusqlite::params![name, id],
                    )?;
                    Ok(())
                })?;
            }
        }
        self.model.after_save(parcel)
    }

    /// Insert a row whose geometry is stored directly, bypassing the hook.
    /// `stored_geom` uses the `SRID=<n>;<geojson>` column encoding.
    pub fn insert_raw(
        &self,
        id: Option<RecordId>,
        name: &str,
        stored_geom: Option<&str>,
    ) -> Result<RecordId, StorageError> {
        self.raw().with_connection(|conn| {
            conn.execute(
                "INSERT INTO parcels (id, name, geom) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, name, stored_geom],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn delete_raw(&self, id: RecordId) -> Result<(), StorageError> {
        self.raw().with_connection(|conn| {
            conn.execute("DELETE FROM parcels WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn find(&self, id: RecordId) -> Result<Option<Parcel>, GeometryError> {
        let mut parcel = Parcel {
            id: Some(id),
            ..Parcel::default()
        };
        match self.model.reload(&mut parcel) {
            Ok(()) => Ok(Some(parcel)),
            Err(GeometryError::Persistence(StorageError::NotFound(_))) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
