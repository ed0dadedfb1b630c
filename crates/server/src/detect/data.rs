use serde::{Deserialize, Serialize};

/// Body accepted by `POST /api/detect-weapons`.
///
/// `image` is required but modelled as an `Option` so its absence maps to a
/// structured 400 instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub(crate) struct DetectRequest {
    pub(crate) image: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) confidence: Option<f32>,
}

/// Canonical detection reported to callers. Produced once per request,
/// never mutated; order follows the model's native emission order.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Detection {
    pub(crate) class: String,
    pub(crate) confidence: f32,
    /// `[x1, y1, x2, y2]` pixel coordinates in the original image's frame,
    /// with `x1 < x2` and `y1 < y2`.
    pub(crate) bbox: [f32; 4],
}

/// Payload for a completed detection request.
#[derive(Debug, Serialize)]
pub(crate) struct DetectionResponse {
    pub(crate) success: bool,
    pub(crate) detections: Vec<Detection>,
    pub(crate) annotated_image: Option<String>,
    pub(crate) model_used: String,
    pub(crate) total_detections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) mode: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModelsLoaded {
    pub(crate) best_model: bool,
    pub(crate) last_model: bool,
}

/// Payload for `GET /health`.
#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) ai_available: bool,
    pub(crate) models_loaded: ModelsLoaded,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) mode: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModelInfo {
    pub(crate) loaded: bool,
    pub(crate) classes: Vec<String>,
}

/// Payload for `GET /api/models/info`.
#[derive(Debug, Serialize)]
pub(crate) struct ModelsInfoResponse {
    pub(crate) ai_available: bool,
    pub(crate) best_model: ModelInfo,
    pub(crate) last_model: ModelInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) mode: Option<&'static str>,
}
