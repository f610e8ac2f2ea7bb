use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

/// One polygon feature of a boundary dataset.
#[derive(Debug, Clone)]
pub(crate) struct BoundaryFeature {
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) label: Option<String>,
    pub(crate) boundary: MultiPolygon<f64>,
}

/// Property keys accepted for the feature code and name, in priority order.
const CODE_KEYS: &[&str] = &["code", "code_insee", "insee", "id"];
const NAME_KEYS: &[&str] = &["nom", "name", "libelle"];
const LABEL_KEYS: &[&str] = &["displayName", "label"];

fn first_str<'a>(properties: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| properties.get(*key).and_then(Value::as_str))
}

/// Read a GeoJSON FeatureCollection of Polygon/MultiPolygon features.
/// Features without a code are rejected; features with a null geometry get an empty boundary.
pub(crate) fn read_boundary_features(bytes: &[u8]) -> Result<Vec<BoundaryFeature>> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;

    if value["type"].as_str() != Some("FeatureCollection") {
        bail!("expected a FeatureCollection, got {}", value["type"]);
    }
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("FeatureCollection without a features array"))?;

    features.iter().enumerate().map(|(idx, feature)| {
        let empty = Map::new();
        let properties = feature["properties"].as_object().unwrap_or(&empty);

        let code = first_str(properties, CODE_KEYS)
            .or_else(|| feature["id"].as_str())
            .ok_or_else(|| anyhow!("feature {idx} has no code property"))?;
        let name = first_str(properties, NAME_KEYS).unwrap_or(code);
        let label = first_str(properties, LABEL_KEYS).map(str::to_string);

        let boundary = match &feature["geometry"] {
            Value::Null => MultiPolygon(Vec::new()),
            geometry => parse_geometry(geometry).with_context(|| format!("feature {code}"))?,
        };

        Ok(BoundaryFeature { code: code.to_string(), name: name.to_string(), label, boundary })
    }).collect()
}

/// Parse a GeoJSON Polygon or MultiPolygon geometry object.
fn parse_geometry(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| anyhow!("geometry without coordinates"))?;

    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon(vec![parse_polygon_coords(coords)?])),
        Some("MultiPolygon") => Ok(MultiPolygon(
            coords.iter()
                .map(|polygon| polygon.as_array()
                    .ok_or_else(|| anyhow!("Invalid MultiPolygon: polygon is not an array"))
                    .and_then(|rings| parse_polygon_coords(rings)))
                .collect::<Result<Vec<_>>>()?
        )),
        other => bail!("unsupported geometry type {other:?}"),
    }
}

/// Parse polygon rings: the first ring is the exterior, the rest are holes.
fn parse_polygon_coords(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| ring.as_array()
        .ok_or_else(|| anyhow!("Invalid Polygon: ring is not an array"))
        .and_then(|coords| parse_ring_coords(coords)));

    let exterior = rings.next()
        .ok_or_else(|| anyhow!("Invalid Polygon: missing exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring from GeoJSON coordinates: [[x, y], [x, y], ...]
fn parse_ring_coords(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter().map(|pair| {
        let pair = pair.as_array().ok_or_else(|| anyhow!("Invalid coordinate: not an array"))?;
        let x = pair.first().and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
        let y = pair.get(1).and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
        Ok(Coord { x, y })
    }).collect::<Result<Vec<_>>>()?;

    // Ensure ring is closed (first point == last point)
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first) }
    }

    Ok(LineString(points))
}

/// Convert a MultiPolygon to a GeoJSON geometry value.
pub(crate) fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let ring = |ls: &LineString<f64>| ls.coords().map(|c| json!([c.x, c.y])).collect::<Vec<_>>();
    let polygons: Vec<Value> = mp.0.iter().map(|polygon| {
        let mut rings = vec![json!(ring(polygon.exterior()))];
        rings.extend(polygon.interiors().iter().map(|hole| json!(ring(hole))));
        json!(rings)
    }).collect();

    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

/// Assemble a FeatureCollection from (id, geometry, properties) triples.
pub(crate) fn feature_collection<'a, I>(features: I) -> Value
where I: IntoIterator<Item = (&'a str, &'a MultiPolygon<f64>, Map<String, Value>)> {
    let features: Vec<Value> = features.into_iter().map(|(id, mp, properties)| json!({
        "type": "Feature",
        "id": id,
        "geometry": multipolygon_to_geojson(mp),
        "properties": properties,
    })).collect();

    json!({ "type": "FeatureCollection", "features": features })
}
