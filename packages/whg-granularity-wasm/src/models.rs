// Message shapes exchanged with the page that owns the worker
use geojson::JsonValue;
use serde::{Deserialize, Serialize};

use crate::buffer::BufferedFeatureCollection;
use crate::pattern::PatternBitmap;

/// `{ colours, featureCollection }` as posted by the map page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    #[serde(default)]
    pub colours: Vec<String>,
    /// Kept raw so one malformed feature cannot reject the whole message
    pub feature_collection: JsonValue,
}

/// Either `{ patterns, bufferedGeoJSON }` or `{ error }`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WorkerResponse {
    Success {
        patterns: Option<Vec<PatternBitmap>>,
        #[serde(rename = "bufferedGeoJSON")]
        buffered_geo_json: Option<BufferedFeatureCollection>,
    },
    Failure {
        error: String,
    },
}

impl WorkerResponse {
    pub fn failure(error: impl ToString) -> Self {
        WorkerResponse::Failure { error: error.to_string() }
    }
}

// On the worker path bitmaps travel as transferable ImageBitmaps; this form
// only shows up in JSON (logs, tests, the non-worker exports).
impl Serialize for PatternBitmap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("PatternBitmap", 3)?;
        s.serialize_field("width", &self.size)?;
        s.serialize_field("height", &self.size)?;
        s.serialize_field("data", &self.rgba)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_camel_case_keys() {
        let request: WorkerRequest = serde_json::from_value(json!({
            "colours": ["rgba(1,2,3,1)"],
            "featureCollection": { "type": "FeatureCollection", "features": [] }
        }))
        .unwrap();
        assert_eq!(request.colours, vec!["rgba(1,2,3,1)".to_string()]);
        assert_eq!(request.feature_collection["type"], json!("FeatureCollection"));
    }

    #[test]
    fn responses_serialise_to_wire_shapes() {
        let ok = WorkerResponse::Success { patterns: None, buffered_geo_json: None };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "patterns": null, "bufferedGeoJSON": null })
        );
        assert_eq!(
            serde_json::to_value(WorkerResponse::failure("boom")).unwrap(),
            json!({ "error": "boom" })
        );
    }
}
