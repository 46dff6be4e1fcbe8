//! Disease label to medical specialty mapping, loaded once from JSON.

use std::{collections::HashMap, path::Path};

use anyhow::Context;
use tracing::{info, instrument};

use super::{prompts::DEFAULT_SPECIALTY, types::Res};

/// Immutable disease label to specialty lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialtyMap {
    specialties: HashMap<String, String>,
}

impl SpecialtyMap {
    pub fn new<I, L, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (L, S)>,
        L: Into<String>,
        S: Into<String>,
    {
        let specialties = entries.into_iter().map(|(label, specialty)| (label.into(), specialty.into())).collect();

        Self { specialties }
    }

    /// Parse a JSON object of `{ "<label>": "<specialty>" }`.
    pub fn from_json(json: &str) -> Res<Self> {
        let specialties: HashMap<String, String> = serde_json::from_str(json).context("Specialty mapping must be a JSON object of string values")?;

        Ok(Self { specialties })
    }

    /// Read and parse the mapping file.
    #[instrument(name = "SpecialtyMap::load", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Res<Self> {
        let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read specialty mapping `{}`", path.display()))?;
        let map = Self::from_json(&json).with_context(|| format!("Malformed specialty mapping `{}`", path.display()))?;

        info!("Loaded {} specialty mappings.", map.len());

        Ok(map)
    }

    /// Specialty for `label`, if the mapping has one.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.specialties.get(label).map(String::as_str)
    }

    /// Specialty for `label`, falling back to the general physician.
    pub fn specialty_or_default(&self, label: &str) -> &str {
        self.get(label).unwrap_or(DEFAULT_SPECIALTY)
    }

    pub fn len(&self) -> usize {
        self.specialties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specialties.is_empty()
    }
}
