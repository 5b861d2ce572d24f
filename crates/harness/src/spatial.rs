//! A small emulation of the PostGIS functions the generated SQL calls,
//! registered into SQLite so statements can run end to end.
//!
//! Geometries are stored as `SRID=<n>;<geojson>` text. Parsing and output go
//! through `geojson`, geometry work through `geo`. Only the 4326 and 3857
//! reference systems are understood by `ST_Transform`.

use std::f64::consts::PI;

use geo::{Coord, MapCoords, Simplify};
use geo_types::Geometry;
use geojson::GeoJson;
use rusqlite::Connection;
use rusqlite::functions::{Context, FunctionFlags};

const EARTH_RADIUS: f64 = 6_378_137.0;
const GEOJSON_PRECISION: f64 = 1e9;

#[derive(Debug)]
struct SpatialError(String);

impl std::fmt::Display for SpatialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SpatialError {}

fn fail<T>(msg: impl Into<String>) -> rusqlite::Result<T> {
    Err(rusqlite::Error::UserFunctionError(Box::new(SpatialError(msg.into()))))
}

/// A geometry tagged with its spatial reference id.
struct Tagged {
    srid: i64,
    geometry: Geometry<f64>,
}

impl Tagged {
    fn decode(text: &str) -> rusqlite::Result<Self> {
        let Some((prefix, body)) = text.split_once(';') else {
            return fail("malformed stored geometry");
        };
        let Some(srid) = prefix.strip_prefix("SRID=").and_then(|s| s.parse::<i64>().ok()) else {
            return fail("malformed stored geometry srid");
        };
        Ok(Self { srid, geometry: parse_geometry(body)? })
    }

    fn encode(&self) -> String {
        format!("SRID={};{}", self.srid, to_geojson(&self.geometry))
    }
}

fn parse_geometry(text: &str) -> rusqlite::Result<Geometry<f64>> {
    let Ok(GeoJson::Geometry(geometry)) = text.parse::<GeoJson>() else {
        return fail("invalid GeoJSON representation");
    };
    match Geometry::<f64>::try_from(geometry) {
        Ok(geometry) => Ok(geometry),
        Err(e) => fail(format!("unsupported GeoJSON geometry: {e}")),
    }
}

fn to_geojson(geometry: &Geometry<f64>) -> String {
    geojson::Geometry::new(geojson::Value::from(geometry)).to_string()
}

fn geometry_arg(ctx: &Context<'_>, index: usize) -> rusqlite::Result<Option<Tagged>> {
    ctx.get::<Option<String>>(index)?
        .map(|text| Tagged::decode(&text))
        .transpose()
}

fn geom_from_geojson(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    let Some(text) = ctx.get::<Option<String>>(0)? else {
        return Ok(None);
    };
    let tagged = Tagged { srid: 0, geometry: parse_geometry(&text)? };
    Ok(Some(tagged.encode()))
}

fn set_srid(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    let srid: i64 = ctx.get(1)?;
    Ok(geometry_arg(ctx, 0)?.map(|mut tagged| {
        tagged.srid = srid;
        tagged.encode()
    }))
}

fn to_mercator(Coord { x: lon, y: lat }: Coord<f64>) -> Coord<f64> {
    Coord {
        x: EARTH_RADIUS * lon.to_radians(),
        y: EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln(),
    }
}

fn to_wgs84(Coord { x, y }: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
    }
}

fn transform(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    let target: i64 = ctx.get(1)?;
    let Some(tagged) = geometry_arg(ctx, 0)? else {
        return Ok(None);
    };
    let project: fn(Coord<f64>) -> Coord<f64> = match (tagged.srid, target) {
        (0, _) => return fail("input geometry has unknown (0) SRID"),
        (from, to) if from == to => return Ok(Some(tagged.encode())),
        (4326, 3857) => to_mercator,
        (3857, 4326) => to_wgs84,
        (from, to) => return fail(format!("transform from {from} to {to} not supported")),
    };
    let projected = Tagged { srid: target, geometry: tagged.geometry.map_coords(project) };
    Ok(Some(projected.encode()))
}

/// Ramer-Douglas-Peucker on the linear parts; points pass through.
fn simplify_geometry(geometry: Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match geometry {
        Geometry::LineString(line) => line.simplify(&tolerance).into(),
        Geometry::MultiLineString(lines) => lines.simplify(&tolerance).into(),
        Geometry::Polygon(polygon) => polygon.simplify(&tolerance).into(),
        Geometry::MultiPolygon(polygons) => polygons.simplify(&tolerance).into(),
        other => other,
    }
}

fn simplify(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    let tolerance: f64 = ctx.get(1)?;
    Ok(geometry_arg(ctx, 0)?.map(|tagged| {
        let simplified = Tagged {
            srid: tagged.srid,
            geometry: simplify_geometry(tagged.geometry, tolerance),
        };
        simplified.encode()
    }))
}

fn round_coord(Coord { x, y }: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (x * GEOJSON_PRECISION).round() / GEOJSON_PRECISION,
        y: (y * GEOJSON_PRECISION).round() / GEOJSON_PRECISION,
    }
}

fn as_geojson(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    Ok(geometry_arg(ctx, 0)?.map(|tagged| to_geojson(&tagged.geometry.map_coords(round_coord))))
}

/// Register the emulated spatial functions on `conn`.
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function("ST_GeomFromGeoJSON", 1, flags, geom_from_geojson)?;
    conn.create_scalar_function("ST_SetSRID", 2, flags, set_srid)?;
    conn.create_scalar_function("ST_Transform", 2, flags, transform)?;
    conn.create_scalar_function("ST_Simplify", 2, flags, simplify)?;
    conn.create_scalar_function("ST_AsGeoJSON", 1, flags, as_geojson)?;
    Ok(())
}
