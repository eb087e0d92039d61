//! Finding, reading and parsing layer files.

use super::{
    DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LayerInfo, LayerKind, LayerSearch, ParsedLayer,
    SYSTEM_CONFIG_PATH, schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// `None` when the file is absent.
pub(super) fn read_if_present(
    kind: LayerKind,
    path: &Path,
) -> Result<Option<ParsedLayer>, ConfigError> {
    if path.exists() {
        return read_required(kind, path).map(Some);
    }
    debug!("no {} layer at {}", kind.label(), path.display());
    Ok(None)
}

/// Read, parse and schema check one layer. A missing file is an error.
pub(super) fn read_required(kind: LayerKind, path: &Path) -> Result<ParsedLayer, ConfigError> {
    debug!("reading {} layer {}", kind.label(), path.display());
    let label = layer_label(kind, path);
    let value = parse_layer(&read_layer(path)?, &label)?;
    schema::validate_layer_schema(&value, &label)?;
    let origin = LayerInfo {
        kind,
        path: path.to_path_buf(),
    };
    Ok(ParsedLayer { origin, value })
}

/// Read a layer file, keeping the path in the error.
pub(super) fn read_layer(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn parse_layer(contents: &str, label: &str) -> Result<Value, ConfigError> {
    json5::from_str(contents).map_err(|source| ConfigError::ParseFailed {
        layer: label.to_string(),
        source,
    })
}

/// Canonicalize the working directory. A cwd that does not exist yet is used as given.
pub(super) fn resolve_cwd(cwd: &Path) -> Result<PathBuf, ConfigError> {
    match cwd.canonicalize() {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(cwd.to_path_buf()),
        Err(source) => Err(ConfigError::ReadFailed {
            path: cwd.to_path_buf(),
            source,
        }),
    }
}

/// Nearest ancestor of `cwd` (itself included) that holds any marker entry.
pub(super) fn find_project_root(cwd: &Path, markers: &[String]) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

/// `source(path)`, the prefix used for errors raised by one layer.
pub(super) fn layer_label(kind: LayerKind, path: &Path) -> String {
    format!("{}({})", kind.label(), path.display())
}

/// Discovered layer files in precedence order, runtime overrides excluded.
/// The project layer is omitted when no ancestor carries a marker.
pub(super) fn discover(search: &LayerSearch) -> Result<Vec<(LayerKind, PathBuf)>, ConfigError> {
    let cwd = resolve_cwd(&search.cwd)?;
    debug!("config search starts at {}", cwd.display());

    let mut found = Vec::with_capacity(4);
    if let Some(path) = &search.system_file {
        found.push((LayerKind::System, path.clone()));
    }
    if let Some(path) = &search.user_file {
        found.push((LayerKind::User, path.clone()));
    }
    if let Some(root) = find_project_root(&cwd, &search.root_markers) {
        debug!("project root is {}", root.display());
        found.push((LayerKind::Project, root.join(DEFAULT_CONFIG_FILE)));
    }
    found.push((LayerKind::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));
    Ok(found)
}

pub(super) fn system_file_default() -> Option<PathBuf> {
    #[cfg(any(unix, windows))]
    {
        Some(PathBuf::from(SYSTEM_CONFIG_PATH))
    }
    #[cfg(not(any(unix, windows)))]
    {
        None
    }
}

/// `~/.insight/insight.json5`, if a home directory is known.
pub(super) fn user_file_default() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}
