//! Normalization layer between model runtimes and the response contract.
//!
//! One request, one image, one forward pass. This layer maps class ids to
//! labels, enforces the inclusive confidence boundary, and guarantees box
//! coordinate ordering. It performs no non-maximum suppression beyond what
//! the underlying runtime applies itself, and never retries.

use detect_runtime::DetectionRuntime;
use image::RgbImage;

use crate::detect::{data::Detection, error::DetectError};

/// Request-scoped confidence threshold applied when the caller omits one.
pub(crate) const DEFAULT_CONFIDENCE: f32 = 0.4;

/// Label reported when a model emits a class id outside its class table.
const UNKNOWN_CLASS: &str = "Object";

/// Run one forward pass and normalize its raw output into canonical
/// detections, preserving the model's native emission order.
pub(crate) fn run_inference(
    runtime: &dyn DetectionRuntime,
    image: &RgbImage,
    threshold: f32,
) -> Result<Vec<Detection>, DetectError> {
    let raw = runtime
        .detect(image, threshold)
        .map_err(|err| DetectError::Inference(err.to_string()))?;

    let classes = runtime.class_names();
    let mut detections = Vec::with_capacity(raw.len());
    for candidate in raw {
        // Runtimes already filter with the call-scoped threshold; repeating
        // the inclusive `>=` comparison here keeps the boundary contract
        // independent of any single runtime implementation.
        if candidate.score < threshold {
            continue;
        }

        let class = usize::try_from(candidate.class_id)
            .ok()
            .and_then(|id| classes.get(id))
            .map(|label| label.as_str())
            .unwrap_or(UNKNOWN_CLASS)
            .to_string();

        let [x1, y1, x2, y2] = candidate.bbox;
        detections.push(Detection {
            class,
            confidence: candidate.score,
            bbox: [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
        });
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use detect_runtime::{RawDetection, RuntimeError};

    use super::*;

    struct FixedRuntime {
        classes: Vec<String>,
        raw: Vec<RawDetection>,
    }

    impl DetectionRuntime for FixedRuntime {
        fn name(&self) -> &str {
            "fixed"
        }

        fn class_names(&self) -> &[String] {
            &self.classes
        }

        fn detect(
            &self,
            _image: &RgbImage,
            _confidence: f32,
        ) -> Result<Vec<RawDetection>, RuntimeError> {
            Ok(self.raw.clone())
        }
    }

    fn raw(score: f32, class_id: i64, bbox: [f32; 4]) -> RawDetection {
        RawDetection {
            bbox,
            score,
            class_id,
        }
    }

    fn runtime(raw: Vec<RawDetection>) -> FixedRuntime {
        FixedRuntime {
            classes: vec!["Handgun".to_string(), "Knife".to_string()],
            raw,
        }
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let runtime = runtime(vec![
            raw(0.4, 0, [1.0, 1.0, 5.0, 5.0]),
            raw(0.399, 1, [2.0, 2.0, 6.0, 6.0]),
        ]);
        let image = RgbImage::new(10, 10);

        let detections = run_inference(&runtime, &image, 0.4).expect("inference");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class, "Handgun");
        assert_eq!(detections[0].confidence, 0.4);
    }

    #[test]
    fn emission_order_is_preserved() {
        let runtime = runtime(vec![
            raw(0.5, 1, [1.0, 1.0, 3.0, 3.0]),
            raw(0.9, 0, [4.0, 4.0, 8.0, 8.0]),
            raw(0.6, 1, [2.0, 2.0, 7.0, 7.0]),
        ]);
        let image = RgbImage::new(10, 10);

        let detections = run_inference(&runtime, &image, 0.4).expect("inference");
        let scores: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
        assert_eq!(scores, vec![0.5, 0.9, 0.6]);
    }

    #[test]
    fn unknown_class_ids_get_a_generic_label() {
        let runtime = runtime(vec![raw(0.7, 42, [1.0, 1.0, 5.0, 5.0])]);
        let image = RgbImage::new(10, 10);

        let detections = run_inference(&runtime, &image, 0.4).expect("inference");
        assert_eq!(detections[0].class, "Object");
    }

    #[test]
    fn box_coordinates_are_ordered() {
        let runtime = runtime(vec![raw(0.8, 0, [9.0, 7.0, 2.0, 3.0])]);
        let image = RgbImage::new(10, 10);

        let detections = run_inference(&runtime, &image, 0.4).expect("inference");
        assert_eq!(detections[0].bbox, [2.0, 3.0, 9.0, 7.0]);
    }

    #[test]
    fn runtime_failure_maps_to_inference_error() {
        struct FailingRuntime {
            classes: Vec<String>,
        }
        impl DetectionRuntime for FailingRuntime {
            fn name(&self) -> &str {
                "failing"
            }
            fn class_names(&self) -> &[String] {
                &self.classes
            }
            fn detect(
                &self,
                _image: &RgbImage,
                _confidence: f32,
            ) -> Result<Vec<RawDetection>, RuntimeError> {
                Err(RuntimeError::Inference("backend exploded".to_string()))
            }
        }

        let runtime = FailingRuntime { classes: vec![] };
        let image = RgbImage::new(10, 10);

        let err = run_inference(&runtime, &image, 0.4).unwrap_err();
        assert!(matches!(err, DetectError::Inference(_)));
    }
}
