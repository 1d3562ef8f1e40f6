use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::rubric::schema::RubricModel;
use crate::rubric::standard::standard_rubric;

/// Loads a rubric from a `.json` or `.toml` file and validates it.
pub fn load_rubric(path: &Path) -> Result<RubricModel> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading rubric: {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let rubric: RubricModel = match extension.as_deref() {
        Some("json") => serde_json::from_str(&data)
            .with_context(|| format!("failed parsing JSON rubric: {}", path.display()))?,
        Some("toml") => toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML rubric: {}", path.display()))?,
        other => bail!(
            "unsupported rubric format {:?} for {}",
            other.unwrap_or(""),
            path.display()
        ),
    };
    if let Err(err) = rubric.validate() {
        warn!(path = %path.display(), error = %err, "rejecting invalid rubric");
        return Err(err).with_context(|| format!("invalid rubric: {}", path.display()));
    }
    info!(
        path = %path.display(),
        version = %rubric.version,
        "loaded rubric"
    );
    Ok(rubric)
}

/// The configured rubric, or the built-in one when no path is set.
pub fn resolve_rubric(path: Option<&Path>) -> Result<RubricModel> {
    match path {
        Some(path) => load_rubric(path),
        None => Ok(standard_rubric()),
    }
}

pub fn write_rubric_json(rubric: &RubricModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(rubric)?;
    fs::write(path, json).with_context(|| format!("failed writing rubric: {}", path.display()))
}
