//! Per-request detection pipeline.
//!
//! Stages run strictly in order and are never retried: validate, readiness
//! check, decode, infer, render, respond. Any stage failure short-circuits
//! into a typed [`DetectError`]; detections and the annotated image are both
//! present or both absent, never partial.

use detect_runtime::DetectionRuntime;
use tracing::info;

use crate::detect::{
    annotation, codec,
    data::{DetectRequest, DetectionResponse},
    error::DetectError,
    inference::{self, DEFAULT_CONFIDENCE},
    registry::ModelRegistry,
};

/// Execute the detection pipeline for one request.
pub(crate) fn handle_detect(
    registry: &ModelRegistry,
    request: DetectRequest,
) -> Result<DetectionResponse, DetectError> {
    // Validate.
    let payload = request
        .image
        .as_deref()
        .filter(|payload| !payload.is_empty())
        .ok_or_else(|| DetectError::BadRequest("no image data provided".to_string()))?;
    let threshold = request
        .confidence
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    // Readiness.
    if !registry.ai_available() {
        return match registry.simulator() {
            Some(simulator) => simulate_detect(simulator.as_ref(), &request, payload, threshold),
            None => Err(DetectError::ServiceUnavailable(
                "models not loaded".to_string(),
            )),
        };
    }
    let model_used = ModelRegistry::resolve_name(request.model.as_deref());
    let runtime = registry.get(model_used).ok_or_else(|| {
        DetectError::ServiceUnavailable(format!("{model_used} model is not loaded"))
    })?;

    // Decode.
    let image = codec::decode_image(payload)?;

    // Infer. The forward pass runs at the looser of the caller's threshold
    // and the display floor so the renderer can still draw candidates the
    // response list filters out.
    let floor = threshold.min(annotation::DISPLAY_FLOOR);
    let candidates = inference::run_inference(runtime.as_ref(), &image, floor)?;

    // Render. Always attempted: a zero-detection request still returns a
    // freshly re-encoded copy of the image.
    let annotated = annotation::render(&image, &candidates);
    let encoded = codec::encode_image(&annotated)?;

    // Respond. The caller's threshold applies to the list with `>=`
    // semantics; an empty detection set is not an error.
    let detections: Vec<_> = candidates
        .into_iter()
        .filter(|det| det.confidence >= threshold)
        .collect();

    info!(
        "detection complete: found {} weapon(s) with {model_used} model",
        detections.len()
    );

    Ok(DetectionResponse {
        success: true,
        total_detections: detections.len(),
        detections,
        annotated_image: Some(encoded),
        model_used: model_used.to_string(),
        mode: None,
    })
}

/// Simulation collaborator: same request/response shape, randomly generated
/// detections, and the caller's image echoed back unmodified as the
/// "annotated" copy.
fn simulate_detect(
    simulator: &dyn DetectionRuntime,
    request: &DetectRequest,
    payload: &str,
    threshold: f32,
) -> Result<DetectionResponse, DetectError> {
    let image = codec::decode_image(payload)?;
    let detections = inference::run_inference(simulator, &image, threshold)?;
    let model_used = request
        .model
        .clone()
        .unwrap_or_else(|| simulator.name().to_string());

    info!("simulated detection: found {} weapon(s)", detections.len());

    Ok(DetectionResponse {
        success: true,
        total_detections: detections.len(),
        detections,
        annotated_image: Some(payload.to_string()),
        model_used,
        mode: Some("simulation"),
    })
}
