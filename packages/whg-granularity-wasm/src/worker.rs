//! Dedicated worker entry point.
//!
//! The page posts `{ colours, featureCollection }`; the worker buffers the
//! features, renders patterns when needed and posts back exactly one reply.
//! Messages are independent: nothing is retried or cancelled here, and a
//! page that no longer wants a reply simply ignores it.

use rand::Rng;

use crate::buffer::process_feature_collection;
use crate::config::GranularityConfig;
use crate::console_error;
use crate::models::{WorkerRequest, WorkerResponse};

/// Run one request to completion. Pattern size comes from `config`
/// (64 px for the worker).
pub fn handle_request<R: Rng + ?Sized>(
    request: WorkerRequest,
    config: &GranularityConfig,
    rng: &mut R,
) -> WorkerResponse {
    match process_feature_collection(&request.feature_collection, &request.colours, config, rng) {
        Ok(outcome) => WorkerResponse::Success {
            patterns: outcome.pattern_image_bitmaps,
            buffered_geo_json: outcome.buffered_feature_collection,
        },
        Err(e) => {
            console_error!("Error in granularity worker: {}", e);
            WorkerResponse::failure(e)
        }
    }
}

/// Same as [`handle_request`] for a JSON-encoded message.
pub fn handle_json<R: Rng + ?Sized>(json: &str, config: &GranularityConfig, rng: &mut R) -> WorkerResponse {
    match serde_json::from_str::<WorkerRequest>(json) {
        Ok(request) => handle_request(request, config, rng),
        Err(e) => WorkerResponse::failure(format!("invalid request: {}", e)),
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm32 {
    use js_sys::{Array, Object, Reflect};
    use serde::Serialize;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::{Clamped, JsCast};
    use wasm_bindgen_futures::{spawn_local, JsFuture};
    use web_sys::{DedicatedWorkerGlobalScope, ImageBitmap, ImageData, MessageEvent};

    use super::handle_request;
    use crate::buffer::BufferedFeatureCollection;
    use crate::config::GranularityConfig;
    use crate::console_error;
    use crate::models::{WorkerRequest, WorkerResponse};
    use crate::pattern::PatternBitmap;

    /// Install the message handler on the worker's global scope. Call once
    /// after the module has been initialised inside the worker.
    #[wasm_bindgen]
    pub fn start_worker() {
        let global = js_sys::global().unchecked_into::<DedicatedWorkerGlobalScope>();
        let scope = global.clone();

        let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
            let scope = scope.clone();
            spawn_local(async move {
                respond(&scope, event.data()).await;
            });
        }) as Box<dyn FnMut(MessageEvent)>);

        global.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
    }

    async fn respond(scope: &DedicatedWorkerGlobalScope, data: JsValue) {
        let response = match serde_wasm_bindgen::from_value::<WorkerRequest>(data) {
            Ok(request) => handle_request(request, &GranularityConfig::default(), &mut rand::thread_rng()),
            Err(e) => WorkerResponse::failure(format!("invalid request: {}", e)),
        };

        let posted = match response {
            WorkerResponse::Success { patterns, buffered_geo_json } => {
                post_success(scope, patterns, buffered_geo_json).await
            }
            WorkerResponse::Failure { error } => post_error(scope, &error),
        };

        if let Err(e) = posted {
            let message = e.as_string().unwrap_or_else(|| format!("{:?}", e));
            console_error!("Error in granularity worker: {}", message);
            if let Err(e) = post_error(scope, &message) {
                console_error!("Could not report worker error: {:?}", e);
            }
        }
    }

    async fn post_success(
        scope: &DedicatedWorkerGlobalScope,
        patterns: Option<Vec<PatternBitmap>>,
        buffered: Option<BufferedFeatureCollection>,
    ) -> Result<(), JsValue> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let geojson = buffered.serialize(&serializer)?;

        let transfer = Array::new();
        let patterns = match patterns {
            Some(bitmaps) => {
                let images = Array::new();
                // One bitmap at a time keeps the reply order identical to the colour order
                for bitmap in &bitmaps {
                    let image = to_image_bitmap(scope, bitmap).await?;
                    images.push(&image);
                    transfer.push(&image);
                }
                images.into()
            }
            None => JsValue::NULL,
        };

        let message = Object::new();
        Reflect::set(&message, &"patterns".into(), &patterns)?;
        Reflect::set(&message, &"bufferedGeoJSON".into(), &geojson)?;
        scope.post_message_with_transfer(&message, &transfer)
    }

    fn post_error(scope: &DedicatedWorkerGlobalScope, error: &str) -> Result<(), JsValue> {
        let message = Object::new();
        Reflect::set(&message, &"error".into(), &error.into())?;
        scope.post_message(&message)
    }

    async fn to_image_bitmap(
        scope: &DedicatedWorkerGlobalScope,
        bitmap: &PatternBitmap,
    ) -> Result<ImageBitmap, JsValue> {
        let data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(bitmap.rgba.as_slice()),
            bitmap.size,
            bitmap.size,
        )?;
        let promise = scope.create_image_bitmap_with_image_data(&data)?;
        let image = JsFuture::from(promise).await?;
        Ok(image.unchecked_into::<ImageBitmap>())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm32::start_worker;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    #[test]
    fn granular_point_round_trip() {
        let message = json!({
            "colours": ["rgba(255,0,0,1)"],
            "featureCollection": {
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": { "granularity": 5 },
                    "geometry": { "type": "Point", "coordinates": [0, 0] }
                }]
            }
        });

        let response = handle_json(&message.to_string(), &GranularityConfig::default(), &mut rng());
        match response {
            WorkerResponse::Success { patterns, buffered_geo_json } => {
                let patterns = patterns.expect("patterns");
                assert_eq!(patterns.len(), 1);
                assert_eq!(patterns[0].size, 64);
                let fc = buffered_geo_json.expect("collection");
                assert_eq!(fc.features[0]["geometry"]["type"], json!("Polygon"));
                assert_eq!(fc.features[0]["properties"]["granularity"], json!(5));
            }
            WorkerResponse::Failure { error } => panic!("unexpected failure: {}", error),
        }
    }

    #[test]
    fn non_granular_message_has_null_patterns() {
        let message = json!({
            "colours": ["rgba(0,0,255,0.8)", "rgba(0,255,0,0.8)"],
            "featureCollection": {
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": {},
                    "geometry": { "type": "Point", "coordinates": [1, 2] }
                }]
            }
        });
        let response = handle_json(&message.to_string(), &GranularityConfig::default(), &mut rng());
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["patterns"], json!(null));
        assert_eq!(wire["bufferedGeoJSON"]["features"][0]["geometry"]["type"], json!("Point"));
    }

    #[test]
    fn unreadable_collection_gives_null_fields() {
        let message = json!({ "colours": [], "featureCollection": "nope" });
        let response = handle_json(&message.to_string(), &GranularityConfig::default(), &mut rng());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "patterns": null, "bufferedGeoJSON": null })
        );
    }

    #[test]
    fn pattern_failure_becomes_error_reply() {
        let config = GranularityConfig { pattern_size: 0, ..GranularityConfig::default() };
        let message = json!({
            "colours": ["#ff0000"],
            "featureCollection": {
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": { "granularity": 1 },
                    "geometry": { "type": "Point", "coordinates": [0, 0] }
                }]
            }
        });
        let response = handle_json(&message.to_string(), &config, &mut rng());
        let wire = serde_json::to_value(&response).unwrap();
        assert!(wire["error"].as_str().unwrap().contains("pattern size"));
        assert!(wire.get("patterns").is_none());
    }

    #[test]
    fn malformed_message_is_reported() {
        let response = handle_json("{\"colours\": 3}", &GranularityConfig::default(), &mut rng());
        assert!(matches!(response, WorkerResponse::Failure { .. }));
    }
}
