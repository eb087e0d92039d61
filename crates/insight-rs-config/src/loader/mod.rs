//! Layered configuration loader.
//!
//! Layers are read lowest precedence first: system, user, project root,
//! working directory, then any runtime overrides. Each layer is schema
//! checked on its own before being overlaid; the merged result is decoded
//! into an `InsightConfig` and validated once more.

mod layer_io;
mod schema;
mod stack;

#[cfg(test)]
mod tests;

use crate::{ConfigError, InsightConfig};
use log::{debug, info};
use serde_json::Value;
use stack::LayerStack;
use std::path::{Path, PathBuf};

/// File name looked up in every discovered layer directory.
const DEFAULT_CONFIG_FILE: &str = "insight.json5";
/// Directory under the user's home holding the user layer.
const DEFAULT_CONFIG_DIR: &str = ".insight";
/// Entries whose presence marks a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
const SYSTEM_CONFIG_PATH: &str = "/etc/insight/insight.json5";
#[cfg(windows)]
const SYSTEM_CONFIG_PATH: &str = "C:\\ProgramData\\insight\\insight.json5";

/// Effective config together with the layers it was built from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: InsightConfig,
    /// Contributing layers, lowest precedence first.
    pub layers: Vec<LayerInfo>,
}

/// Where a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    System,
    User,
    /// Nearest ancestor of the cwd carrying a project marker.
    Project,
    Cwd,
    /// Explicit override paths; these must exist.
    Runtime,
}

impl LayerKind {
    /// Short name used in error locations.
    pub fn label(self) -> &'static str {
        match self {
            LayerKind::System => "system",
            LayerKind::User => "user",
            LayerKind::Project => "project",
            LayerKind::Cwd => "cwd",
            LayerKind::Runtime => "runtime",
        }
    }
}

/// A layer that contributed to the effective config.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    pub kind: LayerKind,
    pub path: PathBuf,
}

/// Where to look for layers.
#[derive(Debug, Clone)]
pub struct LayerSearch {
    /// Directory the cwd layer is read from and the project root search starts at.
    pub cwd: PathBuf,
    /// `None` skips the system layer.
    pub system_file: Option<PathBuf>,
    /// `None` skips the user layer.
    pub user_file: Option<PathBuf>,
    pub overrides: Vec<PathBuf>,
    pub root_markers: Vec<String>,
}

impl LayerSearch {
    /// Default system and user locations, no runtime overrides.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_file: layer_io::system_file_default(),
            user_file: layer_io::user_file_default(),
            overrides: Vec::new(),
            root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Append a runtime override; later overrides win.
    pub fn with_override(mut self, path: impl AsRef<Path>) -> Self {
        self.overrides.push(path.as_ref().to_path_buf());
        self
    }
}

impl InsightConfig {
    /// Load exactly one file, without layering.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("reading config file {}", path.display());
        let contents = layer_io::read_layer(path)?;
        let value = layer_io::parse_layer(&contents, "config")?;
        config_from_value(value, "config")
    }

    /// Load JSON5 text, without layering.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("parsing inline config ({} bytes)", contents.len());
        let value = layer_io::parse_layer(contents, "config")?;
        config_from_value(value, "config")
    }

    /// Load every default layer that exists for `cwd`.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<ResolvedConfig, ConfigError> {
        info!("resolving config layers from {}", cwd.as_ref().display());
        Self::load_layered_from(LayerSearch::new(cwd))
    }

    /// Load the layers described by `search`.
    ///
    /// Missing discovered layers are skipped; missing runtime layers are errors.
    /// A file reached by two routes (cwd is the project root) is read once.
    pub fn load_layered_from(search: LayerSearch) -> Result<ResolvedConfig, ConfigError> {
        let mut stack = LayerStack::new();
        for (kind, path) in layer_io::discover(&search)? {
            if !stack.claim(&path) {
                debug!("{} layer {} already read", kind.label(), path.display());
                continue;
            }
            if let Some(layer) = layer_io::read_if_present(kind, &path)? {
                stack.push(layer);
            }
        }
        for path in &search.overrides {
            stack.push(layer_io::read_required(LayerKind::Runtime, path)?);
        }

        info!("merged {} config layers", stack.len());
        let (merged, layers) = stack.finish();
        let config = config_from_value(merged, "effective")?;
        Ok(ResolvedConfig { config, layers })
    }

    /// Reject values that deserialize fine but cannot drive a workflow.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let must_be_positive = [
            ("workflow.buffer_capacity", self.workflow.buffer_capacity as u64),
            ("workflow.stream_interval_ms", self.workflow.stream_interval_ms),
            ("anchor.block_spread", self.anchor.block_spread),
        ];
        match must_be_positive.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::Invalid(format!("{name} must be at least 1"))),
            None => Ok(()),
        }
    }
}

/// A layer read from disk, not yet merged.
#[derive(Debug, Clone)]
struct ParsedLayer {
    origin: LayerInfo,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<InsightConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: InsightConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
