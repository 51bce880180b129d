use std::fs;
use std::path::Path;

use geo::Area;
use geo_types::Polygon;
use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::error::Result;

/// One polygon feature with `id` and `area` properties. The ring is emitted
/// in `[x, y]` coordinate order, closed.
fn polygon_feature(id: usize, polygon: &Polygon<f64>) -> Feature {
    let exterior: Vec<Vec<f64>> = polygon
        .exterior()
        .coords()
        .map(|coord| vec![coord.x, coord.y])
        .collect();
    let geometry = Geometry::new(Value::Polygon(vec![exterior]));

    let mut properties = serde_json::Map::new();
    properties.insert("id".to_string(), serde_json::Value::from(id));
    properties.insert(
        "area".to_string(),
        serde_json::Value::from(polygon.unsigned_area()),
    );

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(geojson::feature::Id::Number(serde_json::Number::from(id))),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Persist polygons as a single FeatureCollection. The raster's CRS is
/// recorded as a `crs` member in EPSG URN form when known.
pub fn write_feature_collection(
    path: &Path,
    polygons: &[Polygon<f64>],
    epsg: Option<u32>,
) -> Result<()> {
    let features = polygons
        .iter()
        .enumerate()
        .map(|(id, polygon)| polygon_feature(id, polygon))
        .collect();

    let foreign_members = epsg.map(|code| {
        let mut members = serde_json::Map::new();
        members.insert(
            "crs".to_string(),
            serde_json::json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{code}") }
            }),
        );
        members
    });

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };
    fs::write(path, serde_json::to_string_pretty(&collection)?)?;
    Ok(())
}
