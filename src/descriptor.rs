//! # Module Descriptor Schema and Parsing
//!
//! Every module directory contains an `appspec.yaml` file describing the
//! module. This module defines the parsed form, [`ModuleDescriptor`], and the
//! function that produces it.
//!
//! ```yaml
//! name: app-b
//! build: ./build.sh
//! buildPlatforms:
//!   - linux
//!   - darwin
//! properties:
//!   team: payments
//! dependencies:
//!   - app-a
//! ```
//!
//! Only `name` is required. Keys may be present with an empty value, which is
//! treated the same as leaving them out. Property values may be any YAML
//! scalar; they are converted to strings. Unknown keys are ignored.
//!
//! Dependencies are returned as written; the manifest builder resolves them
//! against module names and paths.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Parsed content of one module descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    /// Module name, unique within a manifest.
    pub name: String,
    /// Repository-relative directory that holds the descriptor.
    pub path: String,
    /// Build executable, relative to `path`.
    pub build: Option<String>,
    /// Platforms the module builds on; empty means all.
    pub build_platforms: Vec<String>,
    /// Opaque key/value pairs handed to the build.
    pub properties: BTreeMap<String, String>,
    /// Raw dependency references, each a module name or path.
    pub dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    name: Option<String>,
    #[serde(default)]
    build: Option<String>,
    #[serde(default)]
    build_platforms: Option<Vec<String>>,
    #[serde(default)]
    properties: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    dependencies: Option<Vec<String>>,
}

/// Parse a descriptor file.
///
/// `module_path` is the directory containing the file and `file` its
/// repository-relative path, used in error messages.
pub fn parse(content: &str, module_path: &str, file: &str) -> Result<ModuleDescriptor> {
    let malformed = |message: String| Error::MalformedDescriptor {
        path: file.to_string(),
        message,
    };

    let raw: RawDescriptor = serde_yaml::from_str(content).map_err(|e| malformed(e.to_string()))?;

    let name = raw
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| malformed("missing required field `name`".to_string()))?;

    let mut properties = BTreeMap::new();
    for (key, value) in raw.properties.unwrap_or_default() {
        let value = scalar_to_string(&value).ok_or_else(|| {
            malformed(format!("property `{}` must be a scalar value", key))
        })?;
        properties.insert(key, value);
    }

    Ok(ModuleDescriptor {
        name,
        path: module_path.to_string(),
        build: raw
            .build
            .map(|build| build.trim().to_string())
            .filter(|build| !build.is_empty()),
        build_platforms: raw.build_platforms.unwrap_or_default(),
        properties,
        dependencies: raw.dependencies.unwrap_or_default(),
    })
}

/// Parse a descriptor from raw file bytes.
pub fn parse_bytes(content: &[u8], module_path: &str, file: &str) -> Result<ModuleDescriptor> {
    let content = std::str::from_utf8(content).map_err(|_| Error::MalformedDescriptor {
        path: file.to_string(),
        message: "descriptor is not valid UTF-8".to_string(),
    })?;
    parse(content, module_path, file)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
