// Wed Jan 15 2026 - Alex

pub mod names;

use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OffsetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Offset document must be a JSON object")]
    NotAnObject,
}

/// Fields the published documents do not reliably carry.
const DEFAULTS: &[(&str, u64)] = &[
    (names::CLASS_DESCRIPTOR_TO_PROPERTY_DESCRIPTOR, 0x9C0),
    (names::CLASS_DESCRIPTOR_TO_EVENT_DESCRIPTOR, 0xA68),
    (names::CLASS_DESCRIPTOR_TO_BOUND_FUNCTION, 0xB10),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStatus {
    Matching,
    Mismatch,
    /// The document carries no version entry.
    Unknown,
}

/// Named field offsets, loaded once per session.
#[derive(Debug, Clone, Default)]
pub struct OffsetTable {
    offsets: IndexMap<String, u64>,
    versions: Vec<String>,
    // keys whose value is not an offset, e.g. dump metadata
    skipped: Vec<String>,
}

impl OffsetTable {
    pub fn new() -> Self {
        Self::with_defaults(IndexMap::new(), Vec::new())
    }

    fn with_defaults(mut offsets: IndexMap<String, u64>, versions: Vec<String>) -> Self {
        for (name, value) in DEFAULTS {
            offsets.entry((*name).to_string()).or_insert(*value);
        }
        Self {
            offsets,
            versions,
            skipped: Vec::new(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OffsetError> {
        let content = fs::read_to_string(path.as_ref())?;
        let table = Self::from_json_str(&content)?;
        log::info!("loaded {} offsets from {}", table.len(), path.as_ref().display());
        Ok(table)
    }

    pub fn from_json_str(json: &str) -> Result<Self, OffsetError> {
        let document: Value = serde_json::from_str(json)?;
        let Value::Object(entries) = document else {
            return Err(OffsetError::NotAnObject);
        };

        let mut offsets = IndexMap::with_capacity(entries.len());
        let mut versions = Vec::new();
        let mut skipped = Vec::new();
        for (name, value) in entries {
            if name == names::ROBLOX_VERSION {
                versions = parse_versions(&value);
                continue;
            }
            match parse_offset(&value) {
                Some(offset) => {
                    offsets.insert(name, offset);
                }
                None => {
                    log::warn!("ignoring '{}': {} is not an offset", name, value);
                    skipped.push(name);
                }
            }
        }
        let mut table = Self::with_defaults(offsets, versions);
        table.skipped = skipped;
        Ok(table)
    }

    /// A missing key means the dependent feature is unsupported, never a fault.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.offsets.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.offsets.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: u64) {
        self.offsets.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.offsets.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    /// Keys present in the document whose value could not be read as an offset.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Compares the directory the executable lives in (the client build tag)
    /// against the versions the document was generated for.
    pub fn version_status(&self, executable: &Path) -> VersionStatus {
        if self.versions.is_empty() {
            return VersionStatus::Unknown;
        }
        let build = executable
            .parent()
            .and_then(|dir| dir.file_name())
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if !build.is_empty() && self.versions.iter().any(|v| v.contains(build)) {
            VersionStatus::Matching
        } else {
            log::warn!("offset document targets {:?}, running build is '{}'", self.versions, build);
            VersionStatus::Mismatch
        }
    }
}

fn parse_offset(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn parse_versions(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(String::from)).collect(),
        _ => Vec::new(),
    }
}
