//! Loading admin-level boundary files into `BoundaryLayer`s.

use std::{fs, path::{Path, PathBuf}};

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use polars::{frame::DataFrame, prelude::AnyValue};
use serde_json::Value as Json;
use shapefile::{dbase::FieldValue, PolygonRing, Shape};
use tracing::{debug, warn};

use crate::{config::Config, frame::{cells_to_column, IntoCell}};

use super::BoundaryLayer;

/// Extensions tried, in order, for each admin-level file.
const EXTENSIONS: [&str; 2] = ["geojson", "shp"];

/// Path of the boundary file for (`iso3`, `level`), if one exists.
pub fn layer_path(data_dir: &Path, iso3: &str, level: u8) -> Option<PathBuf> {
    let iso3 = iso3.to_ascii_lowercase();
    EXTENSIONS.iter()
        .map(|ext| data_dir.join(&iso3).join(format!("{iso3}_admin{level}.{ext}")))
        .find(|path| path.is_file())
}

/// Load every admin level of `iso3` up to its configured maximum.
/// Missing levels are skipped.
pub fn load_layers(data_dir: &Path, iso3: &str, config: &Config) -> Result<Vec<BoundaryLayer>> {
    let mut layers = Vec::new();
    for level in 0..=config.max_level(iso3) {
        let Some(path) = layer_path(data_dir, iso3, level) else {
            debug!(iso3, level, "no boundary file");
            continue;
        };
        let layer = match path.extension().and_then(|e| e.to_str()) {
            Some("shp") => read_shapefile(&path, iso3, level)?,
            _ => read_geojson(&path, iso3, level)?,
        };
        debug!(iso3, level, features = layer.len(), path = %path.display(), "loaded layer");
        layers.push(layer);
    }
    Ok(layers)
}

/// Read a GeoJSON FeatureCollection of polygon features.
pub fn read_geojson(path: &Path, iso3: &str, level: u8) -> Result<BoundaryLayer> {
    let bytes = fs::read(path)
        .with_context(|| format!("[layer::read] Failed to open GeoJSON file: {}", path.display()))?;
    let value: Json = serde_json::from_slice(&bytes)
        .with_context(|| format!("[layer::read] Failed to parse GeoJSON from {}", path.display()))?;
    let Some(features) = value["features"].as_array() else {
        bail!("[layer::read] {} is not a FeatureCollection", path.display());
    };

    let mut geoms = Vec::with_capacity(features.len());
    let mut malformed = Vec::with_capacity(features.len());
    let mut records = Vec::with_capacity(features.len());
    for (i, feature) in features.iter().enumerate() {
        let (geom, bad_rings) = parse_geometry(&feature["geometry"]).unwrap_or_else(|| {
            warn!(iso3, level, feature = i, "unsupported or missing geometry, treating as empty");
            (MultiPolygon(Vec::new()), false)
        });
        geoms.push(geom);
        malformed.push(bad_rings);
        let properties: Vec<(String, AnyValue<'static>)> = feature["properties"].as_object()
            .map(|props| props.iter().map(|(k, v)| (k.clone(), json_cell(v))).collect())
            .unwrap_or_default();
        records.push(properties);
    }

    BoundaryLayer::new(iso3, level, geoms, build_frame(records)?)?.with_malformed(malformed)
}

/// Read a polygon Shapefile together with its dBase attributes.
pub fn read_shapefile(path: &Path, iso3: &str, level: u8) -> Result<BoundaryLayer> {
    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("[layer::read] Failed to open shapefile: {}", path.display()))?;

    let mut geoms = Vec::new();
    let mut malformed = Vec::new();
    let mut records = Vec::new();
    for (i, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.context("[layer::read] Error reading shape+record")?;
        let (geom, bad_rings) = match shape {
            Shape::Polygon(p) => rings_to_geo(p.rings(), |pt| (pt.x, pt.y)),
            Shape::PolygonM(p) => rings_to_geo(p.rings(), |pt| (pt.x, pt.y)),
            Shape::PolygonZ(p) => rings_to_geo(p.rings(), |pt| (pt.x, pt.y)),
            _ => {
                warn!(iso3, level, feature = i, "non-polygon shape, treating as empty");
                (MultiPolygon(Vec::new()), false)
            }
        };
        geoms.push(geom);
        malformed.push(bad_rings);
        let mut fields: Vec<(String, AnyValue<'static>)> = record.into_iter()
            .map(|(name, value)| (name, field_cell(value)))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        records.push(fields);
    }

    BoundaryLayer::new(iso3, level, geoms, build_frame(records)?)?.with_malformed(malformed)
}

/// Assemble per-feature attribute lists into a typed DataFrame.
/// Columns appear in first-seen order; absent attributes are null.
fn build_frame(records: Vec<Vec<(String, AnyValue<'static>)>>) -> Result<DataFrame> {
    let mut names: Vec<String> = Vec::new();
    for record in &records {
        for (name, _) in record {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }

    let columns = names.iter().map(|name| {
        let cells: Vec<AnyValue<'static>> = records.iter()
            .map(|record| record.iter().find(|(n, _)| n == name).map_or(AnyValue::Null, |(_, v)| v.clone()))
            .collect();
        cells_to_column(name, &cells)
    }).collect();

    DataFrame::new(columns).context("[layer::read] Failed to build attribute table")
}

fn json_cell(value: &Json) -> AnyValue<'static> {
    match value {
        Json::Null => AnyValue::Null,
        Json::Bool(b) => (*b).into_cell(),
        Json::Number(n) => n.as_i64().map(IntoCell::into_cell).or_else(|| n.as_f64().map(IntoCell::into_cell))
            .unwrap_or(AnyValue::Null),
        Json::String(s) => s.as_str().into_cell(),
        other => other.to_string().into_cell(),
    }
}

fn field_cell(value: FieldValue) -> AnyValue<'static> {
    match value {
        FieldValue::Character(s) => s.into_cell(),
        FieldValue::Memo(s) => s.into_cell(),
        FieldValue::Numeric(x) => x.into_cell(),
        FieldValue::Float(x) => x.map(f64::from).into_cell(),
        FieldValue::Double(x) | FieldValue::Currency(x) => x.into_cell(),
        FieldValue::Integer(x) => (x as i64).into_cell(),
        FieldValue::Logical(b) => b.into_cell(),
        FieldValue::Date(d) => d.map(|d| format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())).into_cell(),
        _ => AnyValue::Null,
    }
}

/// A closed ring needs at least four positions, the last repeating the first.
pub fn is_malformed_ring(ring: &[Coord<f64>]) -> bool {
    ring.len() < 4 || ring.first() != ring.last()
}

/// Parse a GeoJSON `Polygon` or `MultiPolygon` geometry, noting whether any
/// of its source rings was malformed.
fn parse_geometry(geometry: &Json) -> Option<(MultiPolygon<f64>, bool)> {
    let coords = geometry["coordinates"].as_array()?;
    let polygons = match geometry["type"].as_str()? {
        "Polygon" => vec![parse_polygon(coords)?],
        "MultiPolygon" => coords.iter()
            .map(|p| p.as_array().and_then(|p| parse_polygon(p)))
            .collect::<Option<Vec<_>>>()?,
        _ => return None,
    };
    let malformed = polygons.iter().any(|(_, bad)| *bad);
    Some((MultiPolygon(polygons.into_iter().filter_map(|(poly, _)| poly).collect()), malformed))
}

/// Parse `[exterior, hole, hole, ...]`. A polygon without exterior
/// coordinates parses to nothing, so a feature made only of those is empty.
fn parse_polygon(rings: &[Json]) -> Option<(Option<Polygon<f64>>, bool)> {
    let rings = rings.iter()
        .map(|r| r.as_array().and_then(|r| parse_ring(r)))
        .collect::<Option<Vec<_>>>()?;
    let Some((exterior, interiors)) = rings.split_first().filter(|(ext, _)| !ext.is_empty()) else {
        return Some((None, false));
    };
    let malformed = rings.iter().any(|ring| is_malformed_ring(ring));
    let polygon = Polygon::new(
        LineString(exterior.clone()),
        interiors.iter().map(|ring| LineString(ring.clone())).collect(),
    );
    Some((Some(polygon), malformed))
}

/// Parse a ring of `[x, y]` positions.
fn parse_ring(coords: &[Json]) -> Option<Vec<Coord<f64>>> {
    coords.iter()
        .map(|pair| {
            let pair = pair.as_array()?;
            Some(Coord { x: pair.first()?.as_f64()?, y: pair.get(1)?.as_f64()? })
        })
        .collect()
}

/// Convert Shapefile rings (outer ring followed by its holes) into a
/// multipolygon, noting whether any ring was malformed.
fn rings_to_geo<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> (f64, f64)) -> (MultiPolygon<f64>, bool) {
    let to_coords = |points: &[P]| points.iter().map(|p| { let (x, y) = xy(p); Coord { x, y } }).collect::<Vec<_>>();

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes: Vec<LineString<f64>> = Vec::new();
    let mut malformed = false;

    for ring in rings {
        let (points, outer) = match ring {
            PolygonRing::Outer(points) => (to_coords(&points[..]), true),
            PolygonRing::Inner(points) => (to_coords(&points[..]), false),
        };
        malformed |= is_malformed_ring(&points);
        if outer {
            if let Some(ext) = exterior.take() {
                polys.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(LineString(points));
        } else {
            holes.push(LineString(points));
        }
    }
    if let Some(ext) = exterior {
        polys.push(Polygon::new(ext, holes));
    }

    (MultiPolygon(polys), malformed)
}
