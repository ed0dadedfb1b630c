//! TorchScript-backed detection runtime.

use std::{convert::TryFrom, path::Path, sync::Mutex};

use image::{RgbImage, imageops::FilterType};
use tch::{CModule, Device, Kind, Tensor};

use crate::{DetectionRuntime, RawDetection, RuntimeError};

/// Upper bound on detections parsed from a single forward pass.
const MAX_DETECTIONS: usize = 512;

/// TorchScript module wrapper.
///
/// The exported module is expected to embed its own non-maximum suppression
/// and emit `[1, N, 6]` rows of `(x1, y1, x2, y2, confidence, class)` in the
/// detector input frame. This wrapper only filters by the call-scoped
/// confidence and rescales boxes back into the request image's frame; it is
/// not a detection algorithm of its own.
pub struct TorchRuntime {
    // `CModule` is not `Sync`; the mutex serializes concurrent forward
    // passes on a handle shared across request workers.
    module: Mutex<CModule>,
    device: Device,
    input_size: (u32, u32),
    classes: Vec<String>,
    name: String,
}

impl TorchRuntime {
    /// Load a TorchScript module and prepare it for execution on `device`.
    ///
    /// A missing weights file reports `ModelNotFound`; every other loader
    /// failure (corrupt weights, incompatible export) is wrapped in
    /// `ModelLoad`. On failure no handle exists, there is no placeholder.
    pub fn load<P: AsRef<Path>>(
        name: &str,
        weights: P,
        device: Device,
        input_size: (u32, u32),
        classes: Vec<String>,
    ) -> Result<Self, RuntimeError> {
        let path = weights.as_ref();
        if !path.exists() {
            return Err(RuntimeError::ModelNotFound(path.to_path_buf()));
        }
        let module = CModule::load_on_device(path, device)
            .map_err(|err| RuntimeError::ModelLoad(err.to_string()))?;
        Ok(Self {
            module: Mutex::new(module),
            device,
            input_size,
            classes,
            name: name.to_string(),
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Convert an RGB raster into a normalized `[1, 3, H, W]` float tensor,
    /// resizing to the detector input size when needed.
    fn rgb_to_tensor(&self, image: &RgbImage) -> Tensor {
        let (in_w, in_h) = self.input_size;
        let resized;
        let raster = if image.dimensions() == (in_w, in_h) {
            image
        } else {
            resized = image::imageops::resize(image, in_w, in_h, FilterType::Triangle);
            &resized
        };

        Tensor::from_slice(raster.as_raw())
            .to_device(self.device)
            .to_kind(Kind::Float)
            .view([1, in_h as i64, in_w as i64, 3])
            .permute([0, 3, 1, 2])
            / 255.0
    }
}

impl DetectionRuntime for TorchRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_names(&self) -> &[String] {
        &self.classes
    }

    fn detect(
        &self,
        image: &RgbImage,
        confidence: f32,
    ) -> Result<Vec<RawDetection>, RuntimeError> {
        let input = self.rgb_to_tensor(image);

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| RuntimeError::Inference("model mutex poisoned".to_string()))?;
            module
                .forward_ts(&[input])
                .map_err(|err| RuntimeError::Inference(err.to_string()))?
        };

        let shape = output.size();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(RuntimeError::Inference(format!(
                "unexpected detector output shape: {shape:?}"
            )));
        }
        if shape[2] < 6 {
            return Err(RuntimeError::Inference(format!(
                "detector output requires at least 6 channels (x1,y1,x2,y2,conf,class), got {}",
                shape[2]
            )));
        }

        let preds = output.to_device(Device::Cpu).squeeze_dim(0).contiguous();
        let rows: Vec<Vec<f32>> = Vec::<Vec<f32>>::try_from(&preds)
            .map_err(|err| RuntimeError::Inference(err.to_string()))?;

        let (width, height) = image.dimensions();
        let scale_x = width as f32 / self.input_size.0 as f32;
        let scale_y = height as f32 / self.input_size.1 as f32;

        let mut detections = Vec::new();
        for row in rows {
            if row.len() < 6 {
                continue;
            }
            let score = row[4];
            if score < confidence {
                continue;
            }
            detections.push(RawDetection {
                bbox: [
                    row[0] * scale_x,
                    row[1] * scale_y,
                    row[2] * scale_x,
                    row[3] * scale_y,
                ],
                score,
                class_id: row[5] as i64,
            });
            if detections.len() >= MAX_DETECTIONS {
                break;
            }
        }

        Ok(detections)
    }
}
