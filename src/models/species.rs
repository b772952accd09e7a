use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::NsvbError;

/// Hardwood/softwood classification of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WoodClass {
    Hardwood,
    Softwood,
}

impl std::fmt::Display for WoodClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WoodClass::Hardwood => write!(f, "Hardwood"),
            WoodClass::Softwood => write!(f, "Softwood"),
        }
    }
}

impl std::str::FromStr for WoodClass {
    type Err = NsvbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h" | "hardwood" => Ok(WoodClass::Hardwood),
            "s" | "softwood" => Ok(WoodClass::Softwood),
            _ => Err(NsvbError::ParseError(format!(
                "Unknown hardwood/softwood flag: '{s}'"
            ))),
        }
    }
}

/// Live-wood carbon fraction for species missing from the carbon table.
pub const DEFAULT_CARBON_FRACTION: f64 = 0.5;

/// Per-species physical constants from the reference species table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    /// FIA species code
    pub species_id: u32,
    /// Jenkins taxonomic group code
    pub group_id: u32,
    /// Wood specific gravity (green volume, oven-dry weight)
    pub wood_specific_gravity: f64,
    pub wood_class: WoodClass,
    /// Bark specific gravity (green volume, oven-dry weight), when published
    pub bark_specific_gravity: Option<f64>,
    /// Live-tree wood carbon fraction
    pub carbon_fraction: f64,
}

impl SpeciesRecord {
    pub fn new(
        species_id: u32,
        group_id: u32,
        wood_specific_gravity: f64,
        wood_class: WoodClass,
    ) -> Self {
        Self {
            species_id,
            group_id,
            wood_specific_gravity,
            wood_class,
            bark_specific_gravity: None,
            carbon_fraction: DEFAULT_CARBON_FRACTION,
        }
    }

    pub fn with_carbon_fraction(mut self, fraction: f64) -> Self {
        self.carbon_fraction = fraction;
        self
    }

    pub fn with_bark_specific_gravity(mut self, gravity: f64) -> Self {
        self.bark_specific_gravity = Some(gravity);
        self
    }
}

/// Immutable lookup from species code to its reference record.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    species: HashMap<u32, SpeciesRecord>,
}

impl ReferenceIndex {
    /// Build the index. A species listed twice keeps its last record.
    pub fn new(records: impl IntoIterator<Item = SpeciesRecord>) -> Self {
        let mut species = HashMap::new();
        for record in records {
            if let Some(previous) = species.insert(record.species_id, record) {
                tracing::warn!(
                    species_id = previous.species_id,
                    "duplicate reference species record, keeping the later one"
                );
            }
        }
        Self { species }
    }

    /// Look up a species, failing with `UnknownSpecies` when absent.
    pub fn lookup(&self, species_id: u32) -> Result<&SpeciesRecord, NsvbError> {
        self.species
            .get(&species_id)
            .ok_or(NsvbError::UnknownSpecies(species_id))
    }

    pub fn contains(&self, species_id: u32) -> bool {
        self.species.contains_key(&species_id)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Species records sorted by species code.
    pub fn records(&self) -> Vec<&SpeciesRecord> {
        let mut records: Vec<&SpeciesRecord> = self.species.values().collect();
        records.sort_by_key(|r| r.species_id);
        records
    }
}

impl FromIterator<SpeciesRecord> for ReferenceIndex {
    fn from_iter<I: IntoIterator<Item = SpeciesRecord>>(iter: I) -> Self {
        Self::new(iter)
    }
}
