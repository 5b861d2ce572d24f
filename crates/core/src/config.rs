use serde::{Deserialize, Serialize};

pub const WEB_MERCATOR: Srid = Srid(3857);
pub const BRITISH_NATIONAL_GRID: Srid = Srid(27700);
pub const WGS84: Srid = Srid(4326);

pub const DEFAULT_GEOMETRY_COLUMN: &str = "geom";
pub const DEFAULT_PROJECTED_COLUMN: &str = "geom_webmercator";
pub const DEFAULT_PRESELECT_ALIAS: &str = "geom_geojson";

/// Spatial reference identifier as understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Srid(pub i32);

impl std::fmt::Display for Srid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bind placeholder syntax of the execution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    /// `?1`, `?2`, ... (SQLite)
    #[default]
    Numbered,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
}

impl Placeholder {
    pub fn render(&self, index: usize) -> String {
        match self {
            Self::Numbered => format!("?{index}"),
            Self::Dollar => format!("${index}"),
        }
    }
}

/// CRS and column naming shared by every geometry-bearing table.
///
/// Incoming GeoJSON is tagged with `source_srid` and reprojected into
/// `store_srid` on write. Reads reproject into `display_srid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    pub source_srid: Srid,
    pub store_srid: Srid,
    pub display_srid: Srid,
    pub geometry_column: String,
    pub projected_column: String,
    pub preselect_alias: String,
    pub placeholder: Placeholder,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            source_srid: WEB_MERCATOR,
            store_srid: BRITISH_NATIONAL_GRID,
            display_srid: WEB_MERCATOR,
            geometry_column: DEFAULT_GEOMETRY_COLUMN.to_string(),
            projected_column: DEFAULT_PROJECTED_COLUMN.to_string(),
            preselect_alias: DEFAULT_PRESELECT_ALIAS.to_string(),
            placeholder: Placeholder::default(),
        }
    }
}

impl SpatialConfig {
    pub fn with_store_srid(mut self, srid: Srid) -> Self {
        self.store_srid = srid;
        self
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_bng_store() {
        let config = SpatialConfig::default();
        assert_eq!(config.source_srid, Srid(3857));
        assert_eq!(config.store_srid, Srid(27700));
        assert_eq!(config.display_srid, Srid(3857));
        assert_eq!(config.geometry_column, "geom");
    }

    #[test]
    fn placeholder_rendering() {
        assert_eq!(Placeholder::Numbered.render(2), "?2");
        assert_eq!(Placeholder::Dollar.render(1), "$1");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: SpatialConfig = serde_json::from_str(r#"{"store_srid":4326}"#).unwrap();
        assert_eq!(config, SpatialConfig::default().with_store_srid(WGS84));

        let config: SpatialConfig = serde_json::from_str(r#"{"placeholder":"dollar"}"#).unwrap();
        assert_eq!(config.placeholder, Placeholder::Dollar);
        assert_eq!(config.store_srid, BRITISH_NATIONAL_GRID);
        assert_eq!(config.preselect_alias, DEFAULT_PRESELECT_ALIAS);
    }
}
