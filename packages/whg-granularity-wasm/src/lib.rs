use wasm_bindgen::prelude::*;
use js_sys::{Array, Uint8ClampedArray};

// Create a console module for logging
pub mod console;
// Error type shared by every module
pub mod error;
// Worker constants and overrides
pub mod config;
// CSS colour parsing for pattern colours
pub mod colour;
// Local projection used for metric buffering
pub mod projection;
// GeoJSON <-> geo-types conversion
pub mod geometry;
// Mottled fill pattern synthesis
pub mod pattern;
// Granular feature buffering
pub mod buffer;
// Worker message shapes
pub mod models;
// Worker message handler
pub mod worker;

pub use buffer::{process_feature_collection, BufferOutcome, BufferedFeatureCollection};
pub use config::GranularityConfig;
pub use error::GranularityError;
pub use models::{WorkerRequest, WorkerResponse};
pub use pattern::{generate_patterns, PatternBitmap};

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

// Logging macros available to every module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => (crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => (crate::console::warn(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_error {
    ($($t:tt)*) => (crate::console::error(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("Granularity module initialized");
    });
}

fn parse_config(options: Option<String>) -> Result<GranularityConfig, JsValue> {
    GranularityConfig::from_json(options.as_deref().unwrap_or(""))
        .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))
}

// Buffer a FeatureCollection on the calling thread, for pages that do not
// run the worker. Returns GeoJSON text with a top-level "granular" member.
#[wasm_bindgen]
pub fn buffer_feature_collection(geojson_str: &str, options: Option<String>) -> Result<String, JsValue> {
    let config = parse_config(options)?;
    let input: serde_json::Value = serde_json::from_str(geojson_str)
        .map_err(|e| JsValue::from_str(&format!("Invalid GeoJSON: {}", e)))?;

    let buffered = buffer::buffer_collection(&input, &config)
        .ok_or_else(|| JsValue::from_str("Input is not a FeatureCollection"))?;

    let mut collection = serde_json::to_value(&buffered.collection)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize result: {}", e)))?;
    collection["granular"] = serde_json::Value::Bool(buffered.granular);

    Ok(collection.to_string())
}

// Render one RGBA tile per colour; returns an array of Uint8ClampedArray,
// each size*size*4 bytes, ready for `new ImageData(data, size, size)`.
// `options` may override patternCoverage and maxRadiusDivisor.
#[wasm_bindgen]
pub fn generate_pattern_rgba(colours: JsValue, size: u32, options: Option<String>) -> Result<Array, JsValue> {
    let config = parse_config(options)?;
    let colours: Vec<String> = serde_wasm_bindgen::from_value(colours)?;
    let tiles = generate_patterns(&colours, size, &config, &mut rand::thread_rng())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = Array::new();
    for tile in &tiles {
        result.push(&Uint8ClampedArray::from(tile.rgba.as_slice()));
    }
    Ok(result)
}

// Worker message handling for JSON callers (tests, server-side rendering).
// Bad options are reported the same way as a bad message.
#[wasm_bindgen]
pub fn handle_worker_message_json(message: &str, options: Option<String>) -> String {
    let response = match GranularityConfig::from_json(options.as_deref().unwrap_or("")) {
        Ok(config) => worker::handle_json(message, &config, &mut rand::thread_rng()),
        Err(e) => WorkerResponse::failure(format!("invalid options: {}", e)),
    };
    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!("{{\"error\":{:?}}}", e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_worker_entry_reports_errors_as_json() {
        let reply: serde_json::Value = serde_json::from_str(&handle_worker_message_json("not json", None)).unwrap();
        assert!(reply["error"].as_str().unwrap().starts_with("invalid request"));
    }

    #[test]
    fn json_worker_entry_buffers_lines() {
        let message = json!({
            "colours": ["rgba(0,0,0,1)"],
            "featureCollection": {
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "id": 7,
                    "properties": { "src": "tgn" },
                    "geometry": { "type": "LineString", "coordinates": [[0, 0], [0.05, 0.05]] }
                }]
            }
        });
        let reply: serde_json::Value =
            serde_json::from_str(&handle_worker_message_json(&message.to_string(), None)).unwrap();
        assert_eq!(reply["patterns"], json!(null));
        let feature = &reply["bufferedGeoJSON"]["features"][0];
        assert_eq!(feature["id"], json!(7));
        assert_eq!(feature["properties"]["src"], json!("tgn"));
        assert_eq!(feature["geometry"]["type"], json!("Polygon"));
    }

    #[test]
    fn json_worker_entry_applies_options() {
        let message = json!({
            "colours": ["#00ff00", "#0000ff"],
            "featureCollection": {
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": { "granularity": 1 },
                    "geometry": { "type": "Point", "coordinates": [0, 0] }
                }]
            }
        });
        let options = r#"{"patternSize": 16, "patternCoverage": 6, "maxRadiusDivisor": 6}"#;
        let reply: serde_json::Value =
            serde_json::from_str(&handle_worker_message_json(&message.to_string(), Some(options.to_string()))).unwrap();
        let patterns = reply["patterns"].as_array().unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0]["width"], json!(16));
        assert_eq!(patterns[0]["data"].as_array().unwrap().len(), 16 * 16 * 4);

        let reply: serde_json::Value =
            serde_json::from_str(&handle_worker_message_json(&message.to_string(), Some("[1]".to_string()))).unwrap();
        assert!(reply["error"].as_str().unwrap().starts_with("invalid options"));
    }

    #[test]
    fn direct_buffer_export_keeps_unparseable_features() {
        let input = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": ["a", 1] } },
                { "type": "Feature", "properties": { "granularity": 1 }, "geometry": { "type": "Point", "coordinates": [1, 1] } }
            ]
        });
        let output: serde_json::Value =
            serde_json::from_str(&buffer_feature_collection(&input.to_string(), None).unwrap()).unwrap();
        assert_eq!(output["granular"], json!(true));
        assert_eq!(output["features"][0], input["features"][0]);
        assert_eq!(output["features"][1]["geometry"]["type"], json!("Polygon"));
    }
}
