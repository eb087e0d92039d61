//! `insight.json5` model and loader.
//!
//! Every section has defaults, so an empty file is a complete config. Files
//! can be loaded alone or stacked as system, user, project, cwd and runtime
//! layers.

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::{LayerInfo, LayerKind, LayerSearch, ResolvedConfig};
pub use model::*;
