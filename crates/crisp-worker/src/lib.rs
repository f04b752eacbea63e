//! Web worker entry point for crisp image enhancement.
//!
//! This crate compiles to a standalone WASM module that runs inside a
//! `Worker`. It receives image bytes and `EnhancementOptions` via
//! `postMessage`, runs the pipeline, and posts the encoded PNG back.
//!
//! The output image travels as a raw `Uint8Array` rather than JSON.
//! Diagnostics and errors are small JSON strings.
//!
//! Running the pipeline in a worker keeps the browser's main thread
//! free while a large upscale is in progress. The `generation` counter
//! lets the page drop responses to requests it has since superseded.

use crisp_pipeline::diagnostics::{PipelineDiagnostics, WebClock};
use crisp_pipeline::{EncodeSettings, EnhancementOptions, PipelineError, StagedResult, codec};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Message protocol: the main thread sends a JS object with:
/// - `imageBytes`: `Uint8Array` containing the raw image file bytes
/// - `optionsJson`: `String` containing JSON-serialized
///   `EnhancementOptions` (camelCase; missing fields take defaults)
/// - `generation`: `f64` generation counter (passed through to response)
/// - `previewMaxEdge` (optional): `f64` bounding-box edge for a JPEG
///   preview of the source image
///
/// On success the worker responds with a JS object containing:
/// - `generation`: `f64` matching the request generation
/// - `ok`: `true`
/// - `width`, `height`: `f64` output dimensions
/// - `pngBytes`: `Uint8Array` with the encoded PNG
/// - `diagnosticsJson`: `String`, JSON-serialized `PipelineDiagnostics`
/// - `previewBytes`: `Uint8Array` JPEG preview, only when
///   `previewMaxEdge` was sent
///
/// On error the worker responds with:
/// - `generation`: `f64`
/// - `ok`: `false`
/// - `errorJson`: `String`, JSON-serialized `PipelineError`
///
/// # Worker entry point
///
/// Called automatically when the WASM module is instantiated in the
/// worker context.
#[wasm_bindgen(start)]
pub fn worker_main() {
    console_error_panic_hook::set_once();

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not running in a DedicatedWorkerGlobalScope");

    let onmessage =
        Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
            handle_message(event);
        });
    global.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget(); // lives for the worker lifetime
}

/// Handle an incoming message from the main thread.
#[allow(clippy::needless_pass_by_value)]
fn handle_message(event: web_sys::MessageEvent) {
    let data = event.data();

    let image_bytes_val = js_sys::Reflect::get(&data, &JsValue::from_str("imageBytes"))
        .expect_throw("missing imageBytes field");
    let options_json_val = js_sys::Reflect::get(&data, &JsValue::from_str("optionsJson"))
        .expect_throw("missing optionsJson field");
    let generation_val = js_sys::Reflect::get(&data, &JsValue::from_str("generation"))
        .expect_throw("missing generation field");

    let image_bytes_js: js_sys::Uint8Array = image_bytes_val
        .dyn_into()
        .expect_throw("imageBytes is not a Uint8Array");
    let image_bytes = image_bytes_js.to_vec();

    let options_json = options_json_val
        .as_string()
        .expect_throw("optionsJson is not a string");
    let generation = generation_val
        .as_f64()
        .expect_throw("generation is not a number");
    let preview_edge = js_sys::Reflect::get(&data, &JsValue::from_str("previewMaxEdge"))
        .ok()
        .and_then(|v| v.as_f64())
        .map(preview_edge_from_js);

    let options: EnhancementOptions = match serde_json::from_str(&options_json) {
        Ok(o) => o,
        Err(e) => {
            post_error(
                generation,
                &PipelineError::InvalidOptions(format!("failed to parse options: {e}")),
            );
            return;
        }
    };

    // Synchronous: blocks this worker thread only.
    let outcome = crisp_pipeline::diagnostics::enhance_with_diagnostics(
        &image_bytes,
        &options,
        EncodeSettings::default(),
        &WebClock,
    );

    match outcome {
        Ok((staged, diagnostics)) => {
            post_success(generation, &staged, &diagnostics, preview_edge);
        }
        Err(e) => post_error(generation, &e),
    }
}

/// Post a successful result back to the main thread.
fn post_success(
    generation: f64,
    staged: &StagedResult,
    diagnostics: &PipelineDiagnostics,
    preview_edge: Option<u32>,
) {
    // Diagnostics are informational; a serialization failure must not
    // drop the image.
    let diagnostics_json = serde_json::to_string(diagnostics).unwrap_or_else(|_| "null".into());

    let response = js_sys::Object::new();
    let set = |key: &str, val: &JsValue| {
        js_sys::Reflect::set(&response, &JsValue::from_str(key), val)
            .expect_throw("failed to set response field");
    };

    set("generation", &JsValue::from_f64(generation));
    set("ok", &JsValue::from_bool(true));
    set("width", &JsValue::from_f64(f64::from(staged.dimensions.width)));
    set(
        "height",
        &JsValue::from_f64(f64::from(staged.dimensions.height)),
    );
    set(
        "pngBytes",
        &js_sys::Uint8Array::from(staged.encoded.as_slice()),
    );
    set("diagnosticsJson", &JsValue::from_str(&diagnostics_json));

    if let Some(edge) = preview_edge {
        match codec::preview_raster(&staged.original, edge) {
            Ok(jpeg) => set("previewBytes", &js_sys::Uint8Array::from(jpeg.as_slice())),
            // The enhanced image is still delivered without a preview.
            Err(e) => web_sys::console::debug_1(&JsValue::from_str(&format!(
                "crisp: preview skipped: {e}"
            ))),
        }
    }

    web_sys::console::debug_1(&JsValue::from_str(&format!(
        "crisp: generation {generation} -> {}x{} in {:.1}ms",
        staged.dimensions.width,
        staged.dimensions.height,
        diagnostics.total_duration.as_secs_f64() * 1000.0,
    )));

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not in worker scope");
    global
        .post_message(&response)
        .expect_throw("failed to postMessage");
}

/// Clamp a JS number into a preview edge; NaN and negatives become 0,
/// which the codec rejects.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn preview_edge_from_js(value: f64) -> u32 {
    value.clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Post an error response back to the main thread.
fn post_error(generation: f64, error: &PipelineError) {
    let error_json = serde_json::to_string(error)
        .unwrap_or_else(|ser_err| format!("\"serialization error: {ser_err}\""));

    let response = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("generation"),
        &JsValue::from_f64(generation),
    );
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("ok"),
        &JsValue::from_bool(false),
    );
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("errorJson"),
        &JsValue::from_str(&error_json),
    );

    if let Ok(global) = js_sys::global().dyn_into::<web_sys::DedicatedWorkerGlobalScope>() {
        let _ = global.post_message(&response);
    }
}
