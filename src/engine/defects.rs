//! Weight reductions for dead trees and broken tops.

use serde::{Deserialize, Serialize};

use super::WATER_WEIGHT_LB_PER_CUFT;
use crate::models::{DecayClass, SpeciesRecord, TreeObservation};

/// Share of stem wood and bark still attached below a broken top, from the
/// cumulative volume ratios at `actual height / height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StemRemaining {
    pub wood: f64,
    pub bark: f64,
}

impl StemRemaining {
    pub const INTACT: StemRemaining = StemRemaining {
        wood: 1.0,
        bark: 1.0,
    };

    fn is_reduced(&self) -> bool {
        self.wood < 1.0 || self.bark < 1.0
    }
}

impl Default for StemRemaining {
    fn default() -> Self {
        Self::INTACT
    }
}

/// Component weights after decay and broken-top reductions (lb).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedWeights {
    pub stem_wood_weight: f64,
    pub bark_weight: f64,
    pub branch_weight: f64,
    pub foliage_weight: f64,
    pub total_biomass: f64,
}

/// Unreduced stage outputs the adjustments start from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrossWeights {
    pub stem_wood_volume: f64,
    /// Stem wood weight with the live-tree cull reduction
    pub stem_wood_weight: f64,
    pub bark_weight: f64,
    pub branch_weight: f64,
    pub total_biomass: f64,
    pub foliage_weight: f64,
}

/// Proportion of the crown still attached after a broken top.
///
/// The observed crown ratio is measured against the actual height, so it is
/// first restated against total height. Returns 1.0 when the top is intact or
/// no crown ratio was observed.
pub fn branch_remaining(height: f64, actual_height: Option<f64>, crown_ratio: Option<f64>) -> f64 {
    let (Some(ah), Some(cr)) = (actual_height.filter(|&ah| ah < height), crown_ratio) else {
        return 1.0;
    };
    let crown_ratio_total = (height - ah * (1.0 - cr)) / height;
    if crown_ratio_total <= 0.0 {
        return 0.0;
    }
    let remaining = (ah - height * (1.0 - crown_ratio_total)) / (height * crown_ratio_total);
    remaining.clamp(0.0, 1.0)
}

pub(crate) fn adjust(
    observation: &TreeObservation,
    species: &SpeciesRecord,
    decay: Option<DecayClass>,
    gross: &GrossWeights,
    stem: StemRemaining,
) -> AdjustedWeights {
    let branch_rem = branch_remaining(
        observation.height,
        observation.actual_height,
        observation.crown_ratio,
    );
    if observation.broken_top_height().is_some() && observation.crown_ratio.is_none() {
        tracing::debug!(
            species_id = species.species_id,
            "broken top without an observed crown ratio; branches and foliage not reduced"
        );
    }

    let wdsg = species.wood_specific_gravity;
    let (stem_wood_weight, bark_weight, branch_weight, foliage_weight) = match decay {
        None => (
            gross.stem_wood_weight * stem.wood,
            gross.bark_weight * stem.bark,
            gross.branch_weight * branch_rem,
            gross.foliage_weight * branch_rem,
        ),
        // Cull is already reflected in the dead-tree density reduction.
        Some(class) => {
            let p = class.properties(species.wood_class);
            (
                gross.stem_wood_volume * wdsg * p.wood_density * WATER_WEIGHT_LB_PER_CUFT
                    * stem.wood,
                gross.bark_weight * p.wood_density * p.bark_remaining * stem.bark,
                gross.branch_weight * p.wood_density * p.branch_remaining * branch_rem,
                0.0,
            )
        }
    };

    let reduced = decay.is_some()
        || observation.cull_percent > 0.0
        || branch_rem < 1.0
        || stem.is_reduced();
    let total_biomass = if reduced {
        let sound = gross.stem_wood_volume * wdsg * WATER_WEIGHT_LB_PER_CUFT
            + gross.bark_weight
            + gross.branch_weight;
        if sound > 0.0 {
            gross.total_biomass * (stem_wood_weight + bark_weight + branch_weight) / sound
        } else {
            gross.total_biomass
        }
    } else {
        gross.total_biomass
    };

    AdjustedWeights {
        stem_wood_weight,
        bark_weight,
        branch_weight,
        foliage_weight,
        total_biomass,
    }
}

/// Carbon in adjusted aboveground biomass (lb).
pub(crate) fn carbon(
    species: &SpeciesRecord,
    decay: Option<DecayClass>,
    adjusted: &AdjustedWeights,
) -> f64 {
    match decay {
        None => adjusted.total_biomass * species.carbon_fraction,
        Some(class) => {
            let percent = class.properties(species.wood_class).carbon_percent;
            adjusted.total_biomass * percent / 100.0
        }
    }
}
