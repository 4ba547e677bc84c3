//! Loading a plot specification from disk.

use std::path::Path;

use super::SynthError;
use crate::extract::PlotSpec;

/// Read a [`PlotSpec`] from a `.toml` or `.json` file. Other extensions
/// are tried as JSON, then as TOML.
pub fn load_spec_file(path: &Path) -> Result<PlotSpec, SynthError> {
    let content = std::fs::read_to_string(path).map_err(|e| SynthError::SpecFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let parsed = match extension.as_deref() {
        Some("toml") => toml::from_str::<PlotSpec>(&content).map_err(|e| e.to_string()),
        Some("json") => serde_json::from_str::<PlotSpec>(&content).map_err(|e| e.to_string()),
        _ => serde_json::from_str::<PlotSpec>(&content)
            .or_else(|json_err| {
                toml::from_str::<PlotSpec>(&content)
                    .map_err(|toml_err| format!("not JSON ({}) or TOML ({})", json_err, toml_err))
            }),
    };

    let spec = parsed.map_err(|message| SynthError::SpecFile {
        path: path.to_path_buf(),
        message,
    })?;
    if spec.extracts.is_empty() {
        return Err(SynthError::NoExtracts);
    }

    log::info!("loaded plot specification '{}' from {}", spec.title, path.display());
    Ok(spec)
}
