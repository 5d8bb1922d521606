//! Hook definition files
//!
//! A hooks file is YAML (or JSON, which serde_yaml also reads) with a single
//! top-level `hooks` list of handler definitions.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::models::HandlerDefinition;

/// On-disk shape of a hooks file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksFile {
    #[serde(default)]
    pub hooks: Vec<HandlerDefinition>,
}

/// Read one hooks file
pub fn load_hooks_file(path: impl AsRef<Path>) -> Result<HooksFile> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read hooks file {}", path.display()))?;

    let file: HooksFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse hooks file {}", path.display()))?;

    debug!(path = %path.display(), count = file.hooks.len(), "Loaded hooks file");
    Ok(file)
}

/// Read several hooks files in order and concatenate their definitions.
///
/// Missing files are skipped when `skip_missing` is set and are errors
/// otherwise; unreadable or malformed ones are always errors.
pub fn load_hook_files(paths: &[PathBuf], skip_missing: bool) -> Result<Vec<HandlerDefinition>> {
    let mut definitions = Vec::new();
    for path in paths {
        if !path.exists() {
            if !skip_missing {
                bail!("Hooks file not found: {}", path.display());
            }
            debug!(path = %path.display(), "Hooks file not found, skipping");
            continue;
        }
        definitions.extend(load_hooks_file(path)?.hooks);
    }

    info!(files = paths.len(), definitions = definitions.len(), "Loaded hook definitions");
    Ok(definitions)
}
