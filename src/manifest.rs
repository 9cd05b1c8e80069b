//! Package metadata read from the primary manifest.
//!
//! `.json` manifests (`package.json`, `bower.json`) and `.toml` manifests are
//! supported. TOML manifests may keep `name`/`version` at the top level or in a
//! `[package]` table.

use std::fs;
use std::path::Path;

use semver::Version;
use serde::Deserialize;

use crate::domain::parse_version;
use crate::error::{PipelineError, Result};

/// Name and current version of the package being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: Version,
}

#[derive(Deserialize)]
struct RawFields {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Deserialize)]
struct RawToml {
    #[serde(flatten)]
    top: RawFields,
    package: Option<RawFields>,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        PackageMetadata {
            name: name.into(),
            version,
        }
    }

    /// Load metadata from a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("Cannot read manifest {}: {}", path.display(), e))
        })?;

        let fields = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let raw: RawToml = toml::from_str(&text).map_err(|e| {
                    PipelineError::config(format!("{}: {}", path.display(), e))
                })?;
                match raw.package {
                    Some(package) if package.version.is_some() => package,
                    _ => raw.top,
                }
            }
            _ => serde_json::from_str::<RawFields>(&text)
                .map_err(|e| PipelineError::config(format!("{}: {}", path.display(), e)))?,
        };

        let name = fields.name.ok_or_else(|| {
            PipelineError::config(format!("{} has no \"name\" field", path.display()))
        })?;
        let version = fields.version.ok_or_else(|| {
            PipelineError::config(format!("{} has no \"version\" field", path.display()))
        })?;

        Ok(PackageMetadata {
            name,
            version: parse_version(&version)?,
        })
    }
}
