use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};

const SERVE_USAGE: &str = "Usage: weapon-detect-server [--host <addr>] [--port <port>] \
[--models <dir>] [--best <path>] [--last <path>] [--cpu] [--simulate] [--verbose]\n\n\
Weights default to <models>/best.torchscript and <models>/last.torchscript. When no \
weights can be loaded the server answers with simulated detections.";

/// Startup configuration for the detection server.
#[derive(Clone, Debug)]
pub(crate) struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub best_path: Option<PathBuf>,
    pub last_path: Option<PathBuf>,
    pub use_cpu: bool,
    pub simulate: bool,
    pub verbose: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_dir: PathBuf::from("models"),
            best_path: None,
            last_path: None,
            use_cpu: false,
            simulate: false,
            verbose: false,
        }
    }
}

impl ServeConfig {
    pub(crate) fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Self::default();

        let mut idx = 1;
        while idx < args.len() {
            match args[idx].as_str() {
                "--host" => {
                    idx += 1;
                    config.host = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--host requires a value"))?
                        .clone();
                    idx += 1;
                }
                "--port" => {
                    idx += 1;
                    config.port = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--port requires a value"))?
                        .parse::<u16>()
                        .with_context(|| "--port must be an integer".to_string())?;
                    idx += 1;
                }
                "--models" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--models requires a value"))?;
                    config.model_dir = PathBuf::from(value);
                    idx += 1;
                }
                "--best" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--best requires a value"))?;
                    config.best_path = Some(PathBuf::from(value));
                    idx += 1;
                }
                "--last" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--last requires a value"))?;
                    config.last_path = Some(PathBuf::from(value));
                    idx += 1;
                }
                "--cpu" => {
                    config.use_cpu = true;
                    idx += 1;
                }
                "--simulate" => {
                    config.simulate = true;
                    idx += 1;
                }
                "--verbose" => {
                    config.verbose = true;
                    idx += 1;
                }
                "--help" | "-h" => {
                    bail!(SERVE_USAGE);
                }
                arg => {
                    bail!("Unrecognised flag: {arg}\n\n{SERVE_USAGE}");
                }
            }
        }

        Ok(config)
    }

    #[cfg(feature = "with-tch")]
    pub(crate) fn best_weights(&self) -> PathBuf {
        self.best_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join("best.torchscript"))
    }

    #[cfg(feature = "with-tch")]
    pub(crate) fn last_weights(&self) -> PathBuf {
        self.last_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join("last.torchscript"))
    }
}
