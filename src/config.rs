use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NsvbError;
use crate::models::{Component, ProfileModel, SegmentThresholds};

/// File names of the species-keyed and group-keyed tables for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentFiles {
    pub species: String,
    pub group: String,
}

impl ComponentFiles {
    fn new(species: &str, group: &str) -> Self {
        Self {
            species: species.to_string(),
            group: group.to_string(),
        }
    }
}

/// Reference data file names, relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataFiles {
    pub reference_species: String,
    /// Live-tree carbon percentages by species. Optional on disk.
    pub carbon_fractions: String,
    pub stem_wood_volume: ComponentFiles,
    pub bark_volume: ComponentFiles,
    /// Optional on disk, like the profile tables.
    pub stem_total_volume: ComponentFiles,
    pub bark_weight: ComponentFiles,
    pub branch_weight: ComponentFiles,
    pub total_biomass: ComponentFiles,
    pub foliage_weight: ComponentFiles,
    pub total_volume_ratio: ComponentFiles,
    pub wood_volume_ratio: ComponentFiles,
    pub height_diameter: ComponentFiles,
}

impl Default for DataFiles {
    fn default() -> Self {
        Self {
            reference_species: "REF_SPECIES.csv".to_string(),
            carbon_fractions: "Table S10a_fia_wood_c_frac_live.csv".to_string(),
            stem_wood_volume: ComponentFiles::new(
                "Table S1a_volib_coefs_spcd.csv",
                "Table S1b_volib_coefs_jenkins.csv",
            ),
            bark_volume: ComponentFiles::new(
                "Table S2a_volbk_coefs_spcd.csv",
                "Table S2b_volbk_coefs_jenkins.csv",
            ),
            stem_total_volume: ComponentFiles::new(
                "Table S3a_volob_coefs_spcd.csv",
                "Table S3b_volob_coefs_jenkins.csv",
            ),
            bark_weight: ComponentFiles::new(
                "Table S6a_bark_biomass_coefs_spcd.csv",
                "Table S6b_bark_biomass_coefs_jenkins.csv",
            ),
            branch_weight: ComponentFiles::new(
                "Table S7a_branch_biomass_coefs_spcd.csv",
                "Table S7b_branch_biomass_coefs_jenkins.csv",
            ),
            total_biomass: ComponentFiles::new(
                "Table S8a_total_biomass_coefs_spcd.csv",
                "Table S8b_total_biomass_coefs_jenkins.csv",
            ),
            foliage_weight: ComponentFiles::new(
                "Table S9a_foliage_coefs_spcd.csv",
                "Table S9b_foliage_coefs_jenkins.csv",
            ),
            total_volume_ratio: ComponentFiles::new(
                "Table S4a_rcumob_coefs_spcd.csv",
                "Table S4b_rcumob_coefs_jenkins.csv",
            ),
            wood_volume_ratio: ComponentFiles::new(
                "Table S5a_rcumib_coefs_spcd.csv",
                "Table S5b_rcumib_coefs_jenkins.csv",
            ),
            height_diameter: ComponentFiles::new("hd_spcd.csv", "hd_jenkins.csv"),
        }
    }
}

impl DataFiles {
    pub fn component(&self, component: Component) -> &ComponentFiles {
        match component {
            Component::StemWoodVolume => &self.stem_wood_volume,
            Component::BarkVolume => &self.bark_volume,
            Component::StemTotalVolume => &self.stem_total_volume,
            Component::BarkWeight => &self.bark_weight,
            Component::BranchWeight => &self.branch_weight,
            Component::TotalBiomass => &self.total_biomass,
            Component::FoliageWeight => &self.foliage_weight,
        }
    }

    pub fn profile(&self, model: ProfileModel) -> &ComponentFiles {
        match model {
            ProfileModel::TotalVolumeRatio => &self.total_volume_ratio,
            ProfileModel::WoodVolumeRatio => &self.wood_volume_ratio,
            ProfileModel::HeightDiameter => &self.height_diameter,
        }
    }
}

/// Engine configuration, normally read from a TOML file.
///
/// ```toml
/// [thresholds]
/// softwood = 9.0
/// hardwood = 11.0
///
/// [files]
/// reference_species = "REF_SPECIES.csv"
/// carbon_fractions = "Table S10a_fia_wood_c_frac_live.csv"
///
/// [files.height_diameter]
/// species = "hd_spcd.csv"
/// group = "hd_jenkins.csv"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub thresholds: SegmentThresholds,
    pub files: DataFiles,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, NsvbError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NsvbError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), NsvbError> {
        let SegmentThresholds { softwood, hardwood } = self.thresholds;
        for (name, value) in [("softwood", softwood), ("hardwood", hardwood)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(NsvbError::Config(format!(
                    "{name} threshold must be a positive diameter, got {value}"
                )));
            }
        }
        let names = [
            ("reference_species", &self.files.reference_species),
            ("carbon_fractions", &self.files.carbon_fractions),
        ];
        for (name, value) in names {
            if value.trim().is_empty() {
                return Err(NsvbError::Config(format!("{name} file name is empty")));
            }
        }
        Ok(())
    }
}
