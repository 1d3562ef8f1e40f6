use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Parses a JSON document, naming `source` in the error.
pub fn parse_json_input<T: DeserializeOwned>(raw: &str, source: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("failed parsing JSON input: {source}"))
}
