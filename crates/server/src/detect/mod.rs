//! Weapon-detection request pipeline and its HTTP surface.
//!
//! The module is split into focused submodules:
//! - `codec`: base64/data-URI image decode and PNG re-encode.
//! - `registry`: loaded model runtimes keyed by logical name.
//! - `inference`: normalization of raw model output into canonical detections.
//! - `annotation`: bounding-box and label rendering.
//! - `orchestrator`: per-request stage sequencing and error mapping.
//! - `server`: Actix Web endpoints.
//! - `data`: request/response payload types.
//! - `error`: typed failure taxonomy mapped to status codes.
//! - `config`: command-line configuration parsing.
//! - `telemetry`: tracing subscriber setup.

/// Re-export the server entry points so `main` does not reach into
/// submodules for the common path.
pub(crate) use config::ServeConfig;
pub(crate) use server::run;

mod annotation;
mod codec;
mod config;
mod data;
mod error;
mod inference;
mod orchestrator;
pub(crate) mod registry;
mod server;
pub(crate) mod telemetry;
