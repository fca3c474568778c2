//! Data-source catalog: name → landing URL and license

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProvenanceError, Result};

/// Where a dataset comes from and under which terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub url: String,
    pub license: String,
}

impl SourceMetadata {
    pub fn new(url: impl Into<String>, license: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            license: license.into(),
        }
    }
}

/// Immutable lookup table of known sources.
///
/// Built once from configuration and handed to the manifest builder;
/// there is no global registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCatalog {
    sources: BTreeMap<String, SourceMetadata>,
}

impl SourceCatalog {
    pub fn new(sources: BTreeMap<String, SourceMetadata>) -> Self {
        Self { sources }
    }

    /// Sources the evidence pipeline ingests out of the box.
    pub fn builtin() -> Self {
        let eurostat = || {
            SourceMetadata::new(
                "https://ec.europa.eu/eurostat/",
                "Eurostat Copyright/CC BY 4.0",
            )
        };
        let sources = BTreeMap::from([
            (
                "entsoe_day_ahead".to_string(),
                SourceMetadata::new("https://transparency.entsoe.eu/", "ENTSO-E Open Data"),
            ),
            ("eurostat_hdd".to_string(), eurostat()),
            ("eurostat_price_components".to_string(), eurostat()),
            (
                "smhi_temperature".to_string(),
                SourceMetadata::new("https://opendata.smhi.se/", "CC BY 4.0"),
            ),
            (
                "copernicus_temperature".to_string(),
                SourceMetadata::new("https://climate.copernicus.eu/", "Copernicus Open Access"),
            ),
            (
                "building_profiles".to_string(),
                SourceMetadata::new(
                    "https://elekto.se/docs/assumptions",
                    "MIT (curated by ELEKTO EU)",
                ),
            ),
        ]);
        Self { sources }
    }

    /// New catalog with `overrides` added on top (same name replaces).
    pub fn merged(&self, overrides: &BTreeMap<String, SourceMetadata>) -> Self {
        let mut sources = self.sources.clone();
        sources.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { sources }
    }

    pub fn resolve(&self, name: &str) -> Result<&SourceMetadata> {
        self.sources
            .get(name)
            .ok_or_else(|| ProvenanceError::UnknownSource {
                name: name.to_string(),
                known: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceMetadata)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
