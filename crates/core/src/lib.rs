pub mod config;
pub mod dirty;
pub mod error;
pub mod geojson;
pub mod schema;
pub mod sql;
pub mod value;

pub use config::{Placeholder, SpatialConfig, Srid};
pub use dirty::DirtyState;
pub use error::CoreError;
pub use geojson::{sanitize, SanitizedGeoJson};
pub use schema::{quote_ident, GeometryColumns, TableShape};
pub use sql::{SqlBuilder, Statement, TemplateCache, TemplateKey};
pub use value::{BindValue, RecordId, StoredValue};
