use refwatch_core::types::ModuleReference;
use refwatch_core::{AuditError, Result};
use serde::Deserialize;
use std::path::Path;

/// Module description file.
///
/// ```yaml
/// name: exploit/windows/smb/ms08_067_netapi   # optional
/// references:
///   - { kind: CVE, value: 2008-4250 }
///   - { kind: OSVDB, value: 49243 }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub references: Vec<ManifestReference>,
}

/// `value` is kept exactly as written: YAML plain scalars such as `1.10` or
/// `0x1F` are read as text, never as numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestReference {
    pub kind: String,
    pub value: String,
}

impl Manifest {
    pub fn references(&self) -> Vec<ModuleReference> {
        self.references
            .iter()
            .map(|r| ModuleReference::new(r.kind.clone(), r.value.clone()))
            .collect()
    }
}

pub fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("yml") | Some("yaml")
    )
}

pub fn parse_manifest(path: &Path, content: &str) -> Result<Manifest> {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");

    let parsed = if is_json {
        parse_json(content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| AuditError::ManifestParse {
        file: path.to_path_buf(),
        message,
    })
}

/// JSON integers are exact, so they are turned into text before decoding.
/// Fractional numbers would lose their written form and are rejected.
fn parse_json(content: &str) -> serde_json::Result<Manifest> {
    let mut document: serde_json::Value = serde_json::from_str(content)?;

    if let Some(references) = document.get_mut("references").and_then(|r| r.as_array_mut()) {
        for value in references.iter_mut().filter_map(|r| r.get_mut("value")) {
            if value.is_u64() || value.is_i64() {
                *value = serde_json::Value::String(value.to_string());
            }
        }
    }

    serde_json::from_value(document)
}
