use geosync_core::BindValue;
use geosync_engine::{GeometryError, GeometryHost};
use geosync_harness::{Fixture, Parcel, Parcels, StatementKind, PARCELS};
use pretty_assertions::assert_eq;

const POINT: &str = r#"{"type":"Point","coordinates":[-3.19,55.95]}"#;
// Web-mercator metres; the second vertex is 1m off the line.
const ZIGZAG: &str = r#"{"type":"LineString","coordinates":[[0,0],[1000,1],[2000,0],[3000,3000]]}"#;

fn vertex_count(geojson: &str) -> usize {
    let value: serde_json::Value = serde_json::from_str(geojson).unwrap();
    value["coordinates"].as_array().map_or(0, Vec::len)
}

// ============================================================================
// Reads while dirty
// ============================================================================

#[test]
fn dirty_entity_refuses_native_reads() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);
    let mut parcel = Parcel::new("Pending");
    parcels.save(&mut parcel)?;

    parcel.geometry.assign_geojson(Some(POINT));
    assert!(matches!(
        parcel.geometry.geom(),
        Err(GeometryError::StaleRead { attribute: "geom" })
    ));
    assert!(matches!(
        parcel.geometry.geom_webmercator(),
        Err(GeometryError::StaleRead { attribute: "geom_webmercator" })
    ));
    Ok(())
}

#[test]
fn dirty_entity_refuses_simplified_read() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);
    let mut parcel = Parcel::new("Pending");
    parcels.save(&mut parcel)?;

    parcel.geometry.assign_geojson(Some(ZIGZAG));
    fixture.store().clear();
    let err = parcels.model().geojson(&parcel, Some(1.0)).unwrap_err();
    assert!(matches!(
        err,
        GeometryError::PendingWrite { ref table, id } if table == "parcels" && id == parcel.id
    ));
    assert!(fixture.store().statements().is_empty());
    Ok(())
}

#[test]
fn dirty_entity_returns_pending_value() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);

    let mut parcel = Parcel::new("Pending");
    let padded = format!("  {POINT}\n");
    parcel.geometry.assign_geojson(Some(padded.as_str()));
    assert_eq!(parcels.model().geojson(&parcel, None)?.as_deref(), Some(POINT));

    let value = parcels.model().geometry(&parcel, None)?.expect("geometry");
    assert_eq!(value["type"], "Point");

    parcel.geometry.assign_geojson(None);
    assert_eq!(parcels.model().geojson(&parcel, None)?, None);
    assert!(fixture.store().statements().is_empty());
    Ok(())
}

// ============================================================================
// Persisted reads
// ============================================================================

#[test]
fn no_geometry_means_no_query() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);
    let mut parcel = Parcel::new("Empty");
    parcels.save(&mut parcel)?;

    fixture.store().clear();
    assert_eq!(parcels.model().geojson(&parcel, None)?, None);
    assert_eq!(parcels.model().geojson(&parcel, Some(5.0))?, None);
    assert!(fixture.store().statements().is_empty());
    Ok(())
}

#[test]
fn simplified_read_binds_tolerance() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);
    let mut parcel = Parcel::new("Zigzag");
    parcel.geometry.assign_geojson(Some(ZIGZAG));
    parcels.save(&mut parcel)?;
    let id = parcel.id.expect("saved");

    fixture.store().clear();
    let plain = parcels.model().geojson(&parcel, None)?.expect("plain");
    // Tolerance is in store units (degrees here): 1e-4 is roughly 11m.
    let simplified = parcels.model().geojson(&parcel, Some(1e-4))?.expect("simplified");
    assert_eq!(vertex_count(&plain), 4);
    assert_eq!(vertex_count(&simplified), 3);

    let statements = fixture.store().statements();
    assert_eq!(statements.len(), 2);
    assert!(statements.iter().all(|s| s.kind == StatementKind::SelectValue));
    assert!(statements[1].sql.contains("ST_Simplify(\"geom\", CAST(?1 AS float))"));
    assert_eq!(statements[1].binds, vec![BindValue::Float(1e-4), BindValue::Integer(id)]);
    Ok(())
}

#[test]
fn non_finite_tolerance_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);
    let mut parcel = Parcel::new("Nan");
    parcel.geometry.assign_geojson(Some(POINT));
    parcels.save(&mut parcel)?;

    let err = parcels.model().geojson(&parcel, Some(f64::INFINITY)).unwrap_err();
    assert!(matches!(err, GeometryError::Core(_)));
    Ok(())
}

// ============================================================================
// Bulk select fast path
// ============================================================================

#[test]
fn preselected_geojson_skips_query() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);
    for name in ["a", "b"] {
        let mut parcel = Parcel::new(name);
        parcel.geometry.assign_geojson(Some(POINT));
        parcels.save(&mut parcel)?;
    }
    let mut empty = Parcel::new("empty");
    parcels.save(&mut empty)?;

    fixture.store().clear();
    let all = parcels.model().all_with_geojson()?;
    assert_eq!(all.len(), 3);
    assert_eq!(fixture.store().count(StatementKind::SelectRows), 1);

    fixture.store().clear();
    let with_geometry: Vec<_> = all
        .iter()
        .filter(|e| e.geometry.preselected_geojson().is_some())
        .collect();
    assert_eq!(with_geometry.len(), 2);
    for entity in &with_geometry {
        let geojson = parcels.model().geojson(*entity, None)?.expect("geometry");
        assert_eq!(Some(geojson.as_str()), entity.geometry.preselected_geojson());
    }
    assert!(fixture.store().statements().is_empty());

    // A tolerance bypasses the preselected value.
    parcels.model().geojson(with_geometry[0], Some(1e-6))?;
    assert_eq!(fixture.store().count(StatementKind::SelectValue), 1);
    Ok(())
}

#[test]
fn find_with_geojson_attaches_value() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);
    let mut parcel = Parcel::new("One");
    parcel.geometry.assign_geojson(Some(POINT));
    parcels.save(&mut parcel)?;
    let id = parcel.id.expect("saved");

    let found = parcels.model().find_with_geojson(id)?.expect("row");
    assert_eq!(found.id(), Some(id));
    assert!(found.geometry.preselected_geojson().is_some());
    assert!(parcels.model().find_with_geojson(id + 100)?.is_none());

    // A plain find carries no preselected value; reload drops one.
    let mut plain = parcels.model().find(id)?.expect("row");
    assert!(plain.geometry.preselected_geojson().is_none());
    let mut reloaded = found.clone();
    parcels.model().reload(&mut reloaded)?;
    assert!(reloaded.geometry.preselected_geojson().is_none());
    parcels.model().reload(&mut plain)?;
    assert_eq!(plain.attribute("name").and_then(|v| v.as_text()), Some("One"));
    Ok(())
}

#[test]
fn reload_refreshes_host_attributes() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new()?;
    let parcels = Parcels::new(fixture.model(PARCELS)?);
    let mut parcel = Parcel::new("Before");
    parcels.save(&mut parcel)?;

    let mut copy = parcel.clone();
    copy.name = "After".to_string();
    parcels.save(&mut copy)?;

    parcels.model().reload(&mut parcel)?;
    assert_eq!(parcel.name, "After");
    Ok(())
}
