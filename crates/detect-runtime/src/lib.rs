//! Detection model runtimes for the weapon-detect server.
//!
//! Everything here sits behind a single polymorphic capability,
//! [`DetectionRuntime`], with one implementation per underlying model API:
//! - `torch`: TorchScript modules executed through `tch`. Enable the
//!   `with-tch` feature to pull in libtorch.
//! - `simulate`: a model-free fallback that fabricates random detections so
//!   downstream consumers keep the same wire contract when no real runtime
//!   is available.

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;

pub mod simulate;
#[cfg(feature = "with-tch")]
pub mod torch;

pub use simulate::SimulatedRuntime;
#[cfg(feature = "with-tch")]
pub use torch::TorchRuntime;

#[cfg(feature = "with-tch")]
pub use tch;

/// Failures surfaced by model loading and invocation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("model weights not found at {0}")]
    ModelNotFound(PathBuf),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Raw candidate box emitted by a model, in the original image's pixel frame.
#[derive(Debug, Clone, Default)]
pub struct RawDetection {
    /// `(x1, y1, x2, y2)` pixel coordinates relative to the input raster.
    pub bbox: [f32; 4],
    pub score: f32,
    pub class_id: i64,
}

/// Polymorphic detection capability implemented once per model API.
///
/// The confidence threshold is a call-scoped parameter. Implementations must
/// never stash it on the shared handle: handles are shared read-only across
/// concurrent requests and a per-call field would race.
pub trait DetectionRuntime: Send + Sync {
    /// Short runtime description for logs and the health surface.
    fn name(&self) -> &str;

    /// Class table mapping integer class ids to labels.
    fn class_names(&self) -> &[String];

    /// Run one forward pass over `image` and return every candidate scoring
    /// at least `confidence`, boxes in the original image's coordinate frame.
    fn detect(&self, image: &RgbImage, confidence: f32)
    -> Result<Vec<RawDetection>, RuntimeError>;
}

/// Class labels the bundled weapon models were trained on. Also used as the
/// class table of the simulated runtime.
pub const WEAPON_CLASSES: &[&str] = &[
    "Handgun",
    "Rifle",
    "Knife",
    "Suspicious Object",
    "Explosive Device",
    "Metal Weapon",
    "Pistol",
    "AK-47",
];

/// Owned copy of [`WEAPON_CLASSES`] suitable for a runtime's class table.
pub fn weapon_classes() -> Vec<String> {
    WEAPON_CLASSES.iter().map(|name| name.to_string()).collect()
}
