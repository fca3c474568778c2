//! Pipeline stages and the per-file record shared by every artifact

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::DigestedFile;

/// Position of a file in the ingest pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Bytes as fetched from the source.
    Raw,
    /// Normalised into the pipeline's canonical schema.
    Canonical,
    /// Computed from canonical data.
    Derived,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Canonical => "canonical",
            Self::Derived => "derived",
        }
    }

    pub fn all() -> &'static [Stage] {
        &[Self::Raw, Self::Canonical, Self::Derived]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// One file's entry in a digest list, tree result, or manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Relative, `/`-separated.
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
    /// Present in manifests only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl FileRecord {
    pub fn from_digested(d: &DigestedFile, stage: Option<Stage>) -> Self {
        Self {
            path: d.file.relative.clone(),
            sha256: d.sha256.clone(),
            size_bytes: d.file.size_bytes,
            stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_and_parse() {
        for s in Stage::all() {
            assert_eq!(s.to_string().parse::<Stage>().unwrap(), *s);
        }
        assert!("staging".parse::<Stage>().is_err());
    }

    #[test]
    fn record_omits_stage_when_absent() {
        let rec = FileRecord {
            path: "2026-02/se3.json".into(),
            sha256: "ab".into(),
            size_bytes: 12,
            stage: None,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"path":"2026-02/se3.json","sha256":"ab","size_bytes":12}"#);
    }

    #[test]
    fn record_with_stage_roundtrip() {
        let json = r#"{"path":"a.json","sha256":"cd","size_bytes":3,"stage":"canonical"}"#;
        let rec: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.stage, Some(Stage::Canonical));
        assert_eq!(serde_json::to_string(&rec).unwrap(), json);
    }
}
