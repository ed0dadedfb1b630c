//! Registry of loaded detection runtimes keyed by logical model name.
//!
//! The registry is an explicit object threaded into the orchestrator and the
//! HTTP state. Loading happens eagerly at startup so the request path never
//! pays model-load cost; a failed load leaves the slot absent rather than
//! installing a placeholder.

use std::{collections::HashMap, sync::Arc};

use detect_runtime::{DetectionRuntime, SimulatedRuntime};
use tracing::warn;

use crate::detect::config::ServeConfig;

/// Primary model, selected by default.
pub(crate) const BEST_MODEL: &str = "best";
/// Secondary checkpoint model, also the fallback for unrecognized names.
pub(crate) const LAST_MODEL: &str = "last";

pub(crate) struct ModelRegistry {
    models: HashMap<&'static str, Arc<dyn DetectionRuntime>>,
    simulator: Option<Arc<dyn DetectionRuntime>>,
}

impl ModelRegistry {
    pub(crate) fn new() -> Self {
        Self {
            models: HashMap::new(),
            simulator: None,
        }
    }

    /// Register a loaded runtime under a logical name.
    pub(crate) fn insert(&mut self, name: &'static str, runtime: Arc<dyn DetectionRuntime>) {
        self.models.insert(name, runtime);
    }

    /// Switch the registry into simulation mode.
    pub(crate) fn enable_simulation(&mut self) {
        self.simulator = Some(Arc::new(SimulatedRuntime::new()));
    }

    /// Resolve a caller-supplied model name to a logical slot.
    ///
    /// `None` or `"best"` selects the primary model; every other value falls
    /// back to `"last"`. Unrecognized names are an explicit fallback policy,
    /// not an error.
    pub(crate) fn resolve_name(requested: Option<&str>) -> &'static str {
        match requested {
            None | Some(BEST_MODEL) => BEST_MODEL,
            Some(_) => LAST_MODEL,
        }
    }

    /// O(1) lookup of a loaded runtime by logical name.
    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn DetectionRuntime>> {
        self.models.get(name).cloned()
    }

    pub(crate) fn is_ready(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Whether any real (non-simulated) runtime is loaded.
    pub(crate) fn ai_available(&self) -> bool {
        !self.models.is_empty()
    }

    pub(crate) fn simulation_mode(&self) -> bool {
        self.simulator.is_some() && self.models.is_empty()
    }

    pub(crate) fn simulator(&self) -> Option<Arc<dyn DetectionRuntime>> {
        self.simulator.clone()
    }

    /// `(loaded, classes)` for the models-info surface.
    pub(crate) fn info(&self, name: &str) -> (bool, Vec<String>) {
        match self.models.get(name) {
            Some(runtime) => (true, runtime.class_names().to_vec()),
            None => (false, Vec::new()),
        }
    }
}

/// Build the registry from startup configuration.
///
/// With the `with-tch` feature enabled this eagerly loads both TorchScript
/// models, logging and skipping any that fail. Whenever no real runtime is
/// available (feature off, `--simulate`, or every load failed) the registry
/// drops into simulation mode so the API contract keeps working.
pub(crate) fn bootstrap(config: &ServeConfig) -> ModelRegistry {
    let mut registry = ModelRegistry::new();

    if !config.simulate {
        load_models(&mut registry, config);
    }

    if !registry.ai_available() {
        warn!("no detection model available; falling back to simulation mode");
        registry.enable_simulation();
    }

    registry
}

#[cfg(feature = "with-tch")]
fn load_models(registry: &mut ModelRegistry, config: &ServeConfig) {
    use std::time::Instant;

    use detect_runtime::{TorchRuntime, tch::Device, weapon_classes};
    use tracing::info;

    /// Input size the bundled TorchScript exports were traced with.
    const DETECTOR_INPUT: (u32, u32) = (640, 640);

    let device = if config.use_cpu {
        Device::Cpu
    } else {
        Device::cuda_if_available()
    };

    for (name, weights) in [
        (BEST_MODEL, config.best_weights()),
        (LAST_MODEL, config.last_weights()),
    ] {
        let started = Instant::now();
        match TorchRuntime::load(name, &weights, device, DETECTOR_INPUT, weapon_classes()) {
            Ok(runtime) => {
                info!(
                    "loaded {name} model from {} on {device:?} in {:.1}s",
                    weights.display(),
                    started.elapsed().as_secs_f32()
                );
                registry.insert(name, Arc::new(runtime));
            }
            Err(err) => {
                warn!("skipping {name} model: {err}");
            }
        }
    }
}

#[cfg(not(feature = "with-tch"))]
fn load_models(_registry: &mut ModelRegistry, config: &ServeConfig) {
    if config.best_path.is_some() || config.last_path.is_some() {
        warn!("model weights configured but this build lacks the `with-tch` feature");
    }
}

#[cfg(test)]
mod tests {
    use detect_runtime::{RawDetection, RuntimeError};
    use image::RgbImage;

    use super::*;

    struct NamedRuntime {
        name: &'static str,
        classes: Vec<String>,
    }

    impl DetectionRuntime for NamedRuntime {
        fn name(&self) -> &str {
            self.name
        }
        fn class_names(&self) -> &[String] {
            &self.classes
        }
        fn detect(
            &self,
            _image: &RgbImage,
            _confidence: f32,
        ) -> Result<Vec<RawDetection>, RuntimeError> {
            Ok(Vec::new())
        }
    }

    fn registry_with_both() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.insert(
            BEST_MODEL,
            Arc::new(NamedRuntime {
                name: "best",
                classes: vec!["Knife".to_string()],
            }),
        );
        registry.insert(
            LAST_MODEL,
            Arc::new(NamedRuntime {
                name: "last",
                classes: vec!["Rifle".to_string()],
            }),
        );
        registry
    }

    #[test]
    fn default_selection_is_the_best_model() {
        let registry = registry_with_both();
        let name = ModelRegistry::resolve_name(None);
        assert_eq!(name, BEST_MODEL);
        assert_eq!(registry.get(name).expect("best slot").name(), "best");
    }

    #[test]
    fn unrecognized_names_fall_back_to_last() {
        let registry = registry_with_both();
        let name = ModelRegistry::resolve_name(Some("experimental"));
        assert_eq!(name, LAST_MODEL);
        assert_eq!(registry.get(name).expect("last slot").name(), "last");
    }

    #[test]
    fn an_empty_slot_reports_absence() {
        let mut registry = ModelRegistry::new();
        registry.insert(
            BEST_MODEL,
            Arc::new(NamedRuntime {
                name: "best",
                classes: Vec::new(),
            }),
        );
        assert!(registry.get(LAST_MODEL).is_none());
        assert!(registry.is_ready(BEST_MODEL));
        assert!(!registry.is_ready(LAST_MODEL));
    }

    #[test]
    fn empty_registry_bootstraps_into_simulation_mode() {
        let config = ServeConfig::default();
        let registry = bootstrap(&config);
        assert!(!registry.ai_available());
        assert!(registry.simulation_mode());
        assert!(registry.simulator().is_some());
    }

    #[test]
    fn unloadable_weights_fall_back_to_simulation_mode() {
        let config = ServeConfig {
            best_path: Some("/nonexistent/best.torchscript".into()),
            last_path: Some("/nonexistent/last.torchscript".into()),
            use_cpu: true,
            ..ServeConfig::default()
        };
        let registry = bootstrap(&config);
        assert!(!registry.ai_available());
        assert!(!registry.is_ready(BEST_MODEL));
        assert!(registry.simulation_mode());
    }

    #[test]
    fn info_reports_loaded_state_and_classes() {
        let registry = registry_with_both();
        let (loaded, classes) = registry.info(BEST_MODEL);
        assert!(loaded);
        assert_eq!(classes, vec!["Knife".to_string()]);

        let mut empty = ModelRegistry::new();
        empty.enable_simulation();
        let (loaded, classes) = empty.info(BEST_MODEL);
        assert!(!loaded);
        assert!(classes.is_empty());
    }
}
