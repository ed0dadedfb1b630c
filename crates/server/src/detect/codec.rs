//! Base64 image codec used on both ends of the detection pipeline.
//!
//! Inbound payloads may carry a browser-style `data:` URI prefix; outbound
//! annotated images always get one so callers can display them directly.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::png::PngEncoder};

use crate::detect::error::DetectError;

/// Marker prepended to every encoded payload.
const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Decode a base64 payload into an RGB raster.
///
/// Anything before and including the first comma is treated as a data-URI
/// marker and stripped. Grayscale and alpha-carrying images are normalized
/// to three channels. Every failure maps to `BadRequest`; this boundary
/// never panics on caller input.
pub(crate) fn decode_image(payload: &str) -> Result<RgbImage, DetectError> {
    let encoded = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|err| DetectError::BadRequest(format!("invalid base64 image payload: {err}")))?;

    let decoded = image::load_from_memory(&bytes)
        .map_err(|err| DetectError::BadRequest(format!("failed to process image data: {err}")))?;

    Ok(decoded.to_rgb8())
}

/// Re-encode an annotated raster as a displayable data URI.
///
/// Always PNG regardless of the inbound container: lossless, and
/// deterministic for callers that cache or diff annotated payloads.
pub(crate) fn encode_image(image: &RgbImage) -> Result<String, DetectError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|err| {
            DetectError::Internal(format!("failed to encode annotated image: {err}"))
        })?;

    Ok(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(&buffer)))
}
