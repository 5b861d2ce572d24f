use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::config::SpatialConfig;
use crate::error::CoreError;
use crate::geojson::SanitizedGeoJson;
use crate::schema::{quote_ident, TableShape};
use crate::value::{BindValue, RecordId};

/// The shape a template depends on. Templates never depend on values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    Update {
        has_geometry_column: bool,
        payload_present: bool,
    },
    ReadGeoJson {
        simplified: bool,
    },
    Reload,
    SelectWithGeoJson {
        by_id: bool,
    },
}

/// Memoized statement templates for one table.
///
/// Owned by a [`SqlBuilder`]; a disabled cache rebuilds every template.
#[derive(Debug, Default)]
pub struct TemplateCache {
    disabled: bool,
    entries: Mutex<HashMap<TemplateKey, Arc<str>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            disabled: true,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_build(&self, key: TemplateKey, build: impl FnOnce() -> String) -> Arc<str> {
        if self.disabled {
            return Arc::from(build());
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(key)
            .or_insert_with(|| {
                let sql = build();
                debug!(?key, sql = %sql, "built statement template");
                Arc::from(sql)
            })
            .clone()
    }
}

/// A template plus its ordered bind values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: Arc<str>,
    pub binds: Vec<BindValue>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Builds parameterized geometry statements for one table.
///
/// Templates contain quoted identifiers, integer SRIDs and placeholders
/// only. Payloads, keys and tolerances always travel in `binds`.
#[derive(Debug)]
pub struct SqlBuilder {
    shape: TableShape,
    config: SpatialConfig,
    cache: TemplateCache,
}

impl SqlBuilder {
    pub fn new(shape: TableShape, config: SpatialConfig) -> Self {
        Self::with_cache(shape, config, TemplateCache::new())
    }

    pub fn with_cache(shape: TableShape, config: SpatialConfig, cache: TemplateCache) -> Self {
        Self {
            shape,
            config,
            cache,
        }
    }

    pub fn shape(&self) -> &TableShape {
        &self.shape
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    fn require_geometry(&self) -> Result<(), CoreError> {
        if self.shape.has_geometry() {
            Ok(())
        } else {
            Err(CoreError::MissingGeometryColumn {
                table: self.shape.table().to_string(),
            })
        }
    }

    fn ph(&self, index: usize) -> String {
        self.config.placeholder.render(index)
    }

    /// UPDATE writing `payload` (or NULL) into the geometry column of row `id`.
    ///
    /// The payload is parsed by the store, tagged with the source SRID and
    /// reprojected into the store SRID.
    pub fn update(
        &self,
        id: RecordId,
        payload: Option<&SanitizedGeoJson>,
    ) -> Result<Statement, CoreError> {
        self.require_geometry()?;
        let key = TemplateKey::Update {
            has_geometry_column: true,
            payload_present: payload.is_some(),
        };
        let sql = self.cache.get_or_build(key, || {
            let shape = &self.shape;
            match payload {
                Some(_) => format!(
                    "UPDATE {table} SET {geom} = \
                     ST_Transform(ST_SetSRID(ST_GeomFromGeoJSON({p1}), {source}), {store}) \
                     WHERE {pk} = {p2}",
                    table = shape.quoted_table(),
                    geom = shape.quoted_geometry(),
                    source = self.config.source_srid,
                    store = self.config.store_srid,
                    pk = shape.quoted_primary_key(),
                    p1 = self.ph(1),
                    p2 = self.ph(2),
                ),
                None => format!(
                    "UPDATE {table} SET {geom} = NULL WHERE {pk} = {p1}",
                    table = shape.quoted_table(),
                    geom = shape.quoted_geometry(),
                    pk = shape.quoted_primary_key(),
                    p1 = self.ph(1),
                ),
            }
        });

        let binds = match payload {
            Some(geojson) => vec![
                BindValue::Text(geojson.as_str().to_string()),
                BindValue::Integer(id),
            ],
            None => vec![BindValue::Integer(id)],
        };
        Ok(Statement { sql, binds })
    }

    /// SELECT of row `id`'s geometry as display-SRID GeoJSON, optionally
    /// simplified in the store SRID before reprojection.
    pub fn read_geojson(
        &self,
        id: RecordId,
        simplify: Option<f64>,
    ) -> Result<Statement, CoreError> {
        self.require_geometry()?;
        if let Some(tolerance) = simplify.filter(|t| !t.is_finite()) {
            return Err(CoreError::InvalidTolerance(tolerance));
        }

        let key = TemplateKey::ReadGeoJson {
            simplified: simplify.is_some(),
        };
        let sql = self.cache.get_or_build(key, || {
            let shape = &self.shape;
            let (expr, pk_index) = match simplify {
                Some(_) => (
                    format!(
                        "ST_Simplify({geom}, CAST({p1} AS float))",
                        geom = shape.quoted_geometry(),
                        p1 = self.ph(1),
                    ),
                    2,
                ),
                None => (shape.quoted_geometry().to_string(), 1),
            };
            format!(
                "SELECT ST_AsGeoJSON(ST_Transform({expr}, {display})) \
                 FROM {table} WHERE {pk} = {p} LIMIT 1",
                display = self.config.display_srid,
                table = shape.quoted_table(),
                pk = shape.quoted_primary_key(),
                p = self.ph(pk_index),
            )
        });

        let binds = match simplify {
            Some(tolerance) => vec![BindValue::Float(tolerance), BindValue::Integer(id)],
            None => vec![BindValue::Integer(id)],
        };
        Ok(Statement { sql, binds })
    }

    /// SELECT of every persisted column of row `id`.
    pub fn reload(&self, id: RecordId) -> Statement {
        let sql = self.cache.get_or_build(TemplateKey::Reload, || {
            format!(
                "SELECT * FROM {table} WHERE {pk} = {p1} LIMIT 1",
                table = self.shape.quoted_table(),
                pk = self.shape.quoted_primary_key(),
                p1 = self.ph(1),
            )
        });
        Statement {
            sql,
            binds: vec![BindValue::Integer(id)],
        }
    }

    /// `SELECT *` augmented with the display-SRID GeoJSON under the
    /// preselect alias, for all rows or only row `id`.
    pub fn select_with_geojson(&self, id: Option<RecordId>) -> Result<Statement, CoreError> {
        self.require_geometry()?;
        let alias = quote_ident(&self.config.preselect_alias)?;
        let key = TemplateKey::SelectWithGeoJson { by_id: id.is_some() };
        let sql = self.cache.get_or_build(key, || {
            let shape = &self.shape;
            let mut sql = format!(
                "SELECT *, ST_AsGeoJSON(ST_Transform({geom}, {display})) AS {alias} FROM {table}",
                geom = shape.quoted_geometry(),
                display = self.config.display_srid,
                table = shape.quoted_table(),
            );
            if id.is_some() {
                sql.push_str(&format!(
                    " WHERE {pk} = {p1} LIMIT 1",
                    pk = shape.quoted_primary_key(),
                    p1 = self.ph(1),
                ));
            }
            sql
        });
        let binds = id.map(BindValue::Integer).into_iter().collect();
        Ok(Statement { sql, binds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Placeholder;
    use crate::geojson::sanitize;
    use crate::schema::GeometryColumns;
    use pretty_assertions::assert_eq;

    const POINT: &str = r#"{"type":"Point","coordinates":[-3.19,55.95]}"#;

    fn builder(has_geometry: bool) -> SqlBuilder {
        let config = SpatialConfig::default();
        let columns = GeometryColumns {
            has_geometry,
            has_projected: has_geometry,
        };
        let shape = TableShape::new("parcels", "id", columns, &config).unwrap();
        SqlBuilder::new(shape, config)
    }

    #[test]
    fn update_with_payload_binds_payload_then_id() {
        let payload = sanitize(Some(POINT)).unwrap();
        let stmt = builder(true).update(7, Some(&payload)).unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE \"parcels\" SET \"geom\" = \
             ST_Transform(ST_SetSRID(ST_GeomFromGeoJSON(?1), 3857), 27700) WHERE \"id\" = ?2"
        );
        assert_eq!(stmt.binds, vec![BindValue::Text(POINT.to_string()), BindValue::Integer(7)]);
        assert!(!stmt.sql().contains("coordinates"));
    }

    #[test]
    fn update_without_payload_sets_null() {
        let stmt = builder(true).update(7, None).unwrap();
        assert_eq!(stmt.sql(), "UPDATE \"parcels\" SET \"geom\" = NULL WHERE \"id\" = ?1");
        assert_eq!(stmt.binds, vec![BindValue::Integer(7)]);
    }

    #[test]
    fn update_requires_geometry_column() {
        let err = builder(false).update(7, None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingGeometryColumn { ref table } if table == "parcels"
        ));
    }

    #[test]
    fn payload_with_quotes_stays_out_of_template() {
        let hostile = sanitize(Some("'); DROP TABLE parcels; --")).unwrap();
        let stmt = builder(true).update(1, Some(&hostile)).unwrap();
        assert!(!stmt.sql().contains("DROP"));
        assert_eq!(stmt.binds[0], BindValue::Text("'); DROP TABLE parcels; --".to_string()));
    }

    #[test]
    fn templates_are_cached_per_shape() {
        let b = builder(true);
        let payload = sanitize(Some(POINT)).unwrap();
        let first = b.update(1, Some(&payload)).unwrap();
        let second = b.update(2, Some(&payload)).unwrap();
        assert!(Arc::ptr_eq(&first.sql, &second.sql));
        b.update(3, None).unwrap();
        assert_eq!(b.cache().len(), 2);
    }

    #[test]
    fn disabled_cache_stays_empty() {
        let config = SpatialConfig::default();
        let columns = GeometryColumns {
            has_geometry: true,
            has_projected: false,
        };
        let shape = TableShape::new("parcels", "id", columns, &config).unwrap();
        let b = SqlBuilder::with_cache(shape, config, TemplateCache::disabled());
        b.update(1, None).unwrap();
        assert!(b.cache().is_empty());
    }

    #[test]
    fn read_geojson_plain_and_simplified() {
        let b = builder(true);
        let plain = b.read_geojson(7, None).unwrap();
        assert_eq!(
            plain.sql(),
            "SELECT ST_AsGeoJSON(ST_Transform(\"geom\", 3857)) \
             FROM \"parcels\" WHERE \"id\" = ?1 LIMIT 1"
        );
        assert_eq!(plain.binds, vec![BindValue::Integer(7)]);

        let simplified = b.read_geojson(7, Some(0.5)).unwrap();
        assert_eq!(
            simplified.sql(),
            "SELECT ST_AsGeoJSON(ST_Transform(ST_Simplify(\"geom\", CAST(?1 AS float)), 3857)) \
             FROM \"parcels\" WHERE \"id\" = ?2 LIMIT 1"
        );
        assert_eq!(simplified.binds, vec![BindValue::Float(0.5), BindValue::Integer(7)]);
    }

    #[test]
    fn non_finite_tolerance_rejected() {
        let err = builder(true).read_geojson(7, Some(f64::NAN)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTolerance(_)));
    }

    #[test]
    fn dollar_placeholders() {
        let config = SpatialConfig::default().with_placeholder(Placeholder::Dollar);
        let columns = GeometryColumns {
            has_geometry: true,
            has_projected: true,
        };
        let shape = TableShape::new("parcels", "id", columns, &config).unwrap();
        let b = SqlBuilder::new(shape, config);
        let stmt = b.update(7, None).unwrap();
        assert_eq!(stmt.sql(), "UPDATE \"parcels\" SET \"geom\" = NULL WHERE \"id\" = $1");
    }

    #[test]
    fn select_with_geojson_fragment() {
        let b = builder(true);
        let all = b.select_with_geojson(None).unwrap();
        assert_eq!(
            all.sql(),
            "SELECT *, ST_AsGeoJSON(ST_Transform(\"geom\", 3857)) AS \"geom_geojson\" \
             FROM \"parcels\""
        );
        assert!(all.binds.is_empty());

        let one = b.select_with_geojson(Some(3)).unwrap();
        assert!(one.sql().ends_with("WHERE \"id\" = ?1 LIMIT 1"));
        assert_eq!(one.binds, vec![BindValue::Integer(3)]);
    }
}
