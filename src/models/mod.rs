mod coefficients;
mod decay;
mod observation;
mod profile;
mod species;

pub use coefficients::{
    CoefficientRecord, CoefficientRow, Component, FormKind, GroupCoefficientRow, GroupRecord,
    ModelForm, RawTable, RawTables, SegmentThresholds, SpeciesCoefficientRow,
};
pub use decay::{DecayClass, DecayProperties};
pub use observation::TreeObservation;
pub use profile::{
    HeightDiameter, ProfileCoefficients, ProfileModel, ProfileRow, RawProfileTables, VolumeRatio,
};
pub use species::{ReferenceIndex, SpeciesRecord, WoodClass, DEFAULT_CARBON_FRACTION};
