//! Granular geometry buffering.
//!
//! Features carrying a `granularity` (kilometres) are expanded into areas of
//! that radius; bare lines get a thin default buffer so they stay visible.
//! Buffering runs in a local azimuthal equidistant plane so distances are
//! true metres regardless of latitude.
//!
//! Features are processed one at a time in input order and stay raw JSON
//! throughout, so a feature that fails (even one that is not valid GeoJSON)
//! is logged and returned exactly as it came in. Only a collection that
//! cannot be iterated at all yields the empty outcome.

use geo::{Buffer, MapCoords};
use geo_types::{Geometry, MultiPolygon};
use geojson::{JsonObject, JsonValue, Value};
use rand::Rng;
use serde::Serialize;

use crate::config::GranularityConfig;
use crate::error::{GranularityError, Result};
use crate::geometry::{bbox_centre, is_lineal, is_polygonal, kind_name, to_geo};
use crate::pattern::{generate_patterns, PatternBitmap};
use crate::projection::AzimuthalEquidistant;
use crate::{console_error, console_log};

/// Output collection. Features are kept as JSON so untouched and recovered
/// features round-trip byte for byte, foreign members included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedFeatureCollection {
    pub features: Vec<JsonValue>,
}

impl Serialize for BufferedFeatureCollection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("FeatureCollection", 2)?;
        s.serialize_field("type", "FeatureCollection")?;
        s.serialize_field("features", &self.features)?;
        s.end()
    }
}

/// Result of one buffering pass. Both fields are `None` when the input
/// could not be read as a feature collection.
#[derive(Debug, Default)]
pub struct BufferOutcome {
    pub buffered_feature_collection: Option<BufferedFeatureCollection>,
    pub pattern_image_bitmaps: Option<Vec<PatternBitmap>>,
}

/// A geometry after the buffering rule has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedGeometry {
    pub value: Value,
    /// True when an explicit granularity drove the buffering
    pub granular: bool,
}

/// Per-feature result: the processed feature, or the untouched original
/// together with what went wrong.
#[derive(Debug)]
pub enum FeatureResult {
    Processed { feature: JsonValue, granular: bool },
    Recovered { original: JsonValue, error: GranularityError },
}

impl FeatureResult {
    pub fn is_granular(&self) -> bool {
        matches!(self, FeatureResult::Processed { granular: true, .. })
    }
}

/// Granularity in km if the property is a usable positive number. Numeric
/// strings are accepted the way JS coercion would accept them.
pub fn granularity_km(properties: Option<&JsonObject>) -> Option<f64> {
    let value = properties?.get("granularity")?;
    let km = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (km.is_finite() && km > 0.0).then_some(km)
}

/// Buffer a geometry by `distance_km` on the sphere. One resulting polygon
/// comes back as a Polygon, several as a MultiPolygon.
pub fn buffer_geometry(value: &Value, distance_km: f64) -> Result<Value> {
    let geometry = to_geo(value)?;
    let projection = AzimuthalEquidistant::new(bbox_centre(&geometry)?);

    let planar: Geometry<f64> = geometry.map_coords(|c| projection.forward(c));
    let buffered: MultiPolygon<f64> = planar.buffer(distance_km * 1000.0);
    if buffered.0.is_empty() {
        return Err(GranularityError::EmptyBuffer {
            kind: kind_name(value),
            distance_km,
        });
    }

    let mut polygons = buffered.map_coords(|c| projection.inverse(c)).0;
    Ok(if polygons.len() == 1 {
        Value::from(&polygons.remove(0))
    } else {
        Value::from(&MultiPolygon::new(polygons))
    })
}

/// Apply the buffering rule to one geometry, in order:
/// explicit granularity, then default line buffer, then pass-through.
/// Geometry collections apply the rule to each child with the parent's
/// properties and collapse to a MultiPolygon when every child is polygonal.
pub fn process_geometry(
    value: &Value,
    properties: Option<&JsonObject>,
    config: &GranularityConfig,
) -> Result<ProcessedGeometry> {
    if let Value::GeometryCollection(children) = value {
        return process_collection(children, properties, config);
    }

    if let Some(km) = granularity_km(properties) {
        return Ok(ProcessedGeometry {
            value: buffer_geometry(value, km)?,
            granular: true,
        });
    }

    if is_lineal(value) {
        return Ok(ProcessedGeometry {
            value: buffer_geometry(value, config.default_line_buffer_km)?,
            granular: false,
        });
    }

    Ok(ProcessedGeometry { value: value.clone(), granular: false })
}

fn process_collection(
    children: &[geojson::Geometry],
    properties: Option<&JsonObject>,
    config: &GranularityConfig,
) -> Result<ProcessedGeometry> {
    if children.is_empty() {
        return Ok(ProcessedGeometry {
            value: Value::GeometryCollection(Vec::new()),
            granular: false,
        });
    }

    let mut granular = false;
    let mut processed = Vec::with_capacity(children.len());
    for child in children {
        let result = process_geometry(&child.value, properties, config)?;
        granular |= result.granular;
        processed.push(result.value);
    }

    let value = if processed.iter().all(is_polygonal) {
        let polygons = processed
            .into_iter()
            .flat_map(|v| match v {
                Value::Polygon(rings) => vec![rings],
                Value::MultiPolygon(polys) => polys,
                _ => Vec::new(),
            })
            .collect();
        Value::MultiPolygon(polygons)
    } else {
        Value::GeometryCollection(processed.into_iter().map(geojson::Geometry::new).collect())
    };

    Ok(ProcessedGeometry { value, granular })
}

/// Process one raw feature. Geometry-less features pass through; any
/// failure hands back the original JSON.
pub fn process_feature(raw: &JsonValue, config: &GranularityConfig) -> FeatureResult {
    match try_process_feature(raw, config) {
        Ok((feature, granular)) => FeatureResult::Processed { feature, granular },
        Err(error) => FeatureResult::Recovered { original: raw.clone(), error },
    }
}

fn try_process_feature(raw: &JsonValue, config: &GranularityConfig) -> Result<(JsonValue, bool)> {
    let object = raw
        .as_object()
        .filter(|o| o.get("type").and_then(JsonValue::as_str) == Some("Feature"))
        .ok_or_else(|| GranularityError::InvalidFeature("expected a GeoJSON Feature object".to_string()))?;

    let geometry: geojson::Geometry = match object.get("geometry") {
        None | Some(JsonValue::Null) => return Ok((raw.clone(), false)),
        Some(g) => serde_json::from_value(g.clone())?,
    };
    let properties = object.get("properties").and_then(JsonValue::as_object);

    let processed = process_geometry(&geometry.value, properties, config)?;
    if processed.value == geometry.value {
        return Ok((raw.clone(), processed.granular));
    }

    let mut feature = object.clone();
    // The old extent no longer describes the buffered shape
    feature.remove("bbox");
    feature.insert(
        "geometry".to_string(),
        serde_json::to_value(geojson::Geometry::new(processed.value))?,
    );
    Ok((JsonValue::Object(feature), processed.granular))
}

/// A buffered collection and whether any feature was granular.
#[derive(Debug)]
pub struct BufferedCollection {
    pub collection: BufferedFeatureCollection,
    pub granular: bool,
}

/// Buffer every feature of a raw FeatureCollection, strictly in order.
/// Returns `None` when the input has no `features` array to iterate.
pub fn buffer_collection(raw: &JsonValue, config: &GranularityConfig) -> Option<BufferedCollection> {
    let features = match raw.get("features").and_then(JsonValue::as_array) {
        Some(features) => features,
        None => {
            console_error!("Cannot buffer input: expected a FeatureCollection with a features array");
            return None;
        }
    };

    let mut granular = false;
    let mut buffered = Vec::with_capacity(features.len());
    for (index, raw_feature) in features.iter().enumerate() {
        let result = process_feature(raw_feature, config);
        granular |= result.is_granular();
        match result {
            FeatureResult::Processed { feature, .. } => buffered.push(feature),
            FeatureResult::Recovered { original, error } => {
                console_error!("Error processing feature {}: {}", index, error);
                buffered.push(original);
            }
        }
    }

    Some(BufferedCollection {
        collection: BufferedFeatureCollection { features: buffered },
        granular,
    })
}

/// Buffer a raw FeatureCollection and, if any feature was granular,
/// synthesise one fill pattern per colour.
///
/// Pattern synthesis errors are returned to the caller; everything else is
/// absorbed here.
pub fn process_feature_collection<R: Rng + ?Sized>(
    raw: &JsonValue,
    colours: &[String],
    config: &GranularityConfig,
    rng: &mut R,
) -> Result<BufferOutcome> {
    let Some(BufferedCollection { collection, granular }) = buffer_collection(raw, config) else {
        return Ok(BufferOutcome::default());
    };

    let pattern_image_bitmaps = if granular {
        Some(generate_patterns(colours, config.pattern_size, config, rng)?)
    } else {
        None
    };

    console_log!(
        "Buffered {} features (granular: {}, patterns: {})",
        collection.features.len(),
        granular,
        pattern_image_bitmaps.as_ref().map_or(0, Vec::len)
    );

    Ok(BufferOutcome {
        buffered_feature_collection: Some(collection),
        pattern_image_bitmaps,
    })
}
