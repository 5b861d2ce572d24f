use geosync_core::config::WGS84;
use geosync_core::SpatialConfig;
use geosync_engine::{GeometryError, GeometryModel};
use geosync_storage::SqliteStore;
use tempfile::TempDir;

use crate::recording::RecordingStore;
use crate::spatial;

pub const PARCELS: &str = "parcels";
pub const ROADS: &str = "roads";

const FIXTURE_POOL_SIZE: u32 = 2;

const FIXTURE_SQL: &str = "
CREATE TABLE parcels (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    geom TEXT,
    geom_webmercator TEXT
);
CREATE TRIGGER parcels_geom_insert AFTER INSERT ON parcels BEGIN
    UPDATE parcels SET geom_webmercator = ST_Transform(NEW.geom, 3857) WHERE id = NEW.id;
END;
CREATE TRIGGER parcels_geom_update AFTER UPDATE OF geom ON parcels BEGIN
    UPDATE parcels SET geom_webmercator = ST_Transform(NEW.geom, 3857) WHERE id = NEW.id;
END;

CREATE TABLE roads (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
";

/// Fixture config: web-mercator in and out, WGS84 in the column.
pub fn fixture_config() -> SpatialConfig {
    SpatialConfig::default().with_store_srid(WGS84)
}

/// A temp-file database with the spatial emulation and fixture tables.
pub struct Fixture {
    store: RecordingStore<SqliteStore>,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = SqliteStore::open_with(
            dir.path().join("fixture.db"),
            FIXTURE_POOL_SIZE,
            spatial::register,
        )?;
        store.with_connection(|conn| Ok(conn.execute_batch(FIXTURE_SQL)?))?;
        Ok(Self {
            store: RecordingStore::new(store),
            _dir: dir,
        })
    }

    pub fn store(&self) -> &RecordingStore<SqliteStore> {
        &self.store
    }

    pub fn model(
        &self,
        table: &str,
    ) -> Result<GeometryModel<&RecordingStore<SqliteStore>>, GeometryError> {
        GeometryModel::inspect(&self.store, table, "id", fixture_config())
    }
}
