mod defects;
mod equations;
mod estimator;
mod profile;
mod resolver;
mod table;

pub use defects::{branch_remaining, AdjustedWeights, StemRemaining};
pub use equations::{
    continuously_variable, evaluate, modified_wiley, schumacher_hall, segmented,
    wood_density_scaled,
};
pub use estimator::{stem_wood_dry_weight, ComponentResults, Estimator};
pub use profile::{
    dbh_from_stump_diameter, diameter_at_height, find_lri, height, height_at_diameter,
    height_lri, volume_ratio, BASAL_AREA_FACTOR,
};
pub use resolver::{ProfileResolution, Resolution, ResolutionTier, Resolver};
pub use table::{CoefficientStore, CoefficientTable, ProfileTable};

/// Weight of one cubic foot of water (lb).
pub const WATER_WEIGHT_LB_PER_CUFT: f64 = 62.4;
