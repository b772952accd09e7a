use serde::{Deserialize, Serialize};

use super::decay::DecayClass;
use crate::error::NsvbError;

/// Field measurements for a single tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeObservation {
    /// FIA species code
    #[serde(rename = "spcd")]
    pub species_id: u32,
    /// Diameter at breast height in inches
    #[serde(rename = "dia")]
    pub dbh: f64,
    /// Total height in feet
    #[serde(rename = "ht")]
    pub height: f64,
    /// Ecological division code; empty when unknown
    #[serde(default)]
    pub division: String,
    /// Rotten and missing cull, percent of gross volume (0 - 100)
    #[serde(rename = "cull", default)]
    pub cull_percent: f64,
    /// Decay class of a standing dead tree; 0 or absent for live trees
    #[serde(default)]
    pub decay_class: Option<u8>,
    /// Actual height in feet when the top is broken
    #[serde(rename = "actual_ht", default)]
    pub actual_height: Option<f64>,
    /// Observed crown ratio (0.0 - 1.0), relative to the actual height
    #[serde(default)]
    pub crown_ratio: Option<f64>,
}

impl TreeObservation {
    pub fn new(species_id: u32, dbh: f64, height: f64, division: impl Into<String>) -> Self {
        Self {
            species_id,
            dbh,
            height,
            division: division.into(),
            cull_percent: 0.0,
            decay_class: None,
            actual_height: None,
            crown_ratio: None,
        }
    }

    pub fn with_cull(mut self, cull_percent: f64) -> Self {
        self.cull_percent = cull_percent;
        self
    }

    pub fn with_decay_class(mut self, decay_class: u8) -> Self {
        self.decay_class = Some(decay_class);
        self
    }

    pub fn with_actual_height(mut self, actual_height: f64) -> Self {
        self.actual_height = Some(actual_height);
        self
    }

    pub fn with_crown_ratio(mut self, crown_ratio: f64) -> Self {
        self.crown_ratio = Some(crown_ratio);
        self
    }

    /// Decay class, or `None` for a live tree.
    pub fn decay(&self) -> Result<Option<DecayClass>, NsvbError> {
        match self.decay_class {
            Some(code) => DecayClass::from_code(code),
            None => Ok(None),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.decay_class, None | Some(0))
    }

    /// Actual height when it is below total height.
    pub fn broken_top_height(&self) -> Option<f64> {
        self.actual_height.filter(|&ah| ah < self.height)
    }

    /// Validate measurements. Returns `NsvbError::ValidationError` on failure.
    pub fn validate(&self) -> Result<(), NsvbError> {
        let id = self.species_id;
        if !(self.dbh > 0.0) {
            return Err(NsvbError::ValidationError(format!(
                "Species {id}: diameter must be positive, got {}",
                self.dbh
            )));
        }
        if !(self.height > 0.0) {
            return Err(NsvbError::ValidationError(format!(
                "Species {id}: height must be positive, got {}",
                self.height
            )));
        }
        if !(0.0..=100.0).contains(&self.cull_percent) {
            return Err(NsvbError::ValidationError(format!(
                "Species {id}: cull must be in 0..=100, got {}",
                self.cull_percent
            )));
        }
        self.decay()?;
        if let Some(ah) = self.actual_height {
            if !(ah > 0.0) {
                return Err(NsvbError::ValidationError(format!(
                    "Species {id}: actual height must be positive, got {ah}"
                )));
            }
        }
        if let Some(cr) = self.crown_ratio {
            if !(0.0..=1.0).contains(&cr) {
                return Err(NsvbError::ValidationError(format!(
                    "Species {id}: crown_ratio must be in 0.0..=1.0, got {cr}"
                )));
            }
        }
        Ok(())
    }
}
