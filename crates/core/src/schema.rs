use crate::config::SpatialConfig;
use crate::error::CoreError;

/// Double-quote an SQL identifier, doubling any embedded quote.
pub fn quote_ident(ident: &str) -> Result<String, CoreError> {
    if ident.is_empty() || ident.contains('\0') {
        return Err(CoreError::InvalidIdentifier(ident.to_string()));
    }
    Ok(format!("\"{}\"", ident.replace('"', "\"\"")))
}

/// Which geometry columns a table actually has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryColumns {
    pub has_geometry: bool,
    pub has_projected: bool,
}

impl GeometryColumns {
    /// Derive presence facts from a table's column names.
    pub fn inspect<S: AsRef<str>>(columns: &[S], config: &SpatialConfig) -> Self {
        let has = |name: &str| columns.iter().any(|c| c.as_ref() == name);
        Self {
            has_geometry: has(config.geometry_column.as_str()),
            has_projected: has(config.projected_column.as_str()),
        }
    }
}

/// Table identity plus its inspected geometry columns.
///
/// Identifiers are quoted once here and reused verbatim in every template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    table: String,
    quoted_table: String,
    quoted_primary_key: String,
    quoted_geometry: String,
    columns: GeometryColumns,
}

impl TableShape {
    pub fn new(
        table: &str,
        primary_key: &str,
        columns: GeometryColumns,
        config: &SpatialConfig,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            table: table.to_string(),
            quoted_table: quote_ident(table)?,
            quoted_primary_key: quote_ident(primary_key)?,
            quoted_geometry: quote_ident(&config.geometry_column)?,
            columns,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn quoted_table(&self) -> &str {
        &self.quoted_table
    }

    pub fn quoted_primary_key(&self) -> &str {
        &self.quoted_primary_key
    }

    pub fn quoted_geometry(&self) -> &str {
        &self.quoted_geometry
    }

    pub fn columns(&self) -> GeometryColumns {
        self.columns
    }

    pub fn has_geometry(&self) -> bool {
        self.columns.has_geometry
    }

    pub fn has_projected(&self) -> bool {
        self.columns.has_projected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_escapes() {
        assert_eq!(quote_ident("parcels").unwrap(), "\"parcels\"");
        assert_eq!(quote_ident("we\"ird").unwrap(), "\"we\"\"ird\"");
        assert!(matches!(quote_ident(""), Err(CoreError::InvalidIdentifier(_))));
    }

    #[test]
    fn inspect_columns() {
        let config = SpatialConfig::default();
        let cols = GeometryColumns::inspect(&["id", "name", "geom"], &config);
        assert!(cols.has_geometry);
        assert!(!cols.has_projected);

        let cols = GeometryColumns::inspect(&["id", "name"], &config);
        assert_eq!(cols, GeometryColumns::default());
    }
}
