//! Model-free fallback runtime fabricating random detections.

use image::RgbImage;
use rand::Rng;

use crate::{DetectionRuntime, RawDetection, RuntimeError, weapon_classes};

/// Fallback runtime used when no real model is available.
///
/// Keeps the detection contract intact for downstream consumers by emitting
/// randomly generated candidates from the weapon class table. Output is
/// intentionally non-deterministic: repeated identical requests may yield
/// different counts and classes.
pub struct SimulatedRuntime {
    classes: Vec<String>,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self {
            classes: weapon_classes(),
        }
    }
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionRuntime for SimulatedRuntime {
    fn name(&self) -> &str {
        "simulation"
    }

    fn class_names(&self) -> &[String] {
        &self.classes
    }

    fn detect(
        &self,
        image: &RgbImage,
        confidence: f32,
    ) -> Result<Vec<RawDetection>, RuntimeError> {
        let (width, height) = image.dimensions();
        let mut rng = rand::thread_rng();
        let mut detections = Vec::new();

        // 70% chance of reporting anything at all, then one or two boxes.
        if rng.r#gen::<f32>() > 0.3 {
            let count = rng.gen_range(1..=2);
            for _ in 0..count {
                let score = rng.gen_range(0.5..0.95f32);
                if score < confidence {
                    continue;
                }
                let x1 = rng.gen_range(0.0..(width as f32 * 0.6).max(1.0));
                let y1 = rng.gen_range(0.0..(height as f32 * 0.6).max(1.0));
                let x2 = (x1 + rng.gen_range(1.0..(width as f32 * 0.4).max(2.0)))
                    .min(width.saturating_sub(1) as f32);
                let y2 = (y1 + rng.gen_range(1.0..(height as f32 * 0.4).max(2.0)))
                    .min(height.saturating_sub(1) as f32);
                detections.push(RawDetection {
                    bbox: [x1, y1, x2, y2],
                    score,
                    class_id: rng.gen_range(0..self.classes.len()) as i64,
                });
            }
        }

        Ok(detections)
    }
}
