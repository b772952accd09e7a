use serde::{Deserialize, Serialize};

use super::table::{CoefficientTable, Hit, ProfileTable};
use crate::error::NsvbError;
use crate::models::{CoefficientRecord, ProfileCoefficients, ReferenceIndex, SegmentThresholds};

/// Which lookup tier produced a coefficient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionTier {
    /// Exact species and division match
    SpeciesDivision,
    /// Species row without a division restriction
    SpeciesDefault,
    /// Taxonomic group row, bound to the species
    Group,
}

impl std::fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionTier::SpeciesDivision => write!(f, "species/division"),
            ResolutionTier::SpeciesDefault => write!(f, "species default"),
            ResolutionTier::Group => write!(f, "taxonomic group"),
        }
    }
}

/// A resolved record tagged with its tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub record: CoefficientRecord,
    pub tier: ResolutionTier,
}

/// A resolved stem-profile record tagged with its tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileResolution<T> {
    pub record: T,
    pub tier: ResolutionTier,
}

/// Selects coefficients for a species and division.
///
/// Tiers are tried in order and the first hit wins:
/// 1. `(species, division)`
/// 2. `(species, "")`
/// 3. the species' taxonomic group, with `wdsg` and `k` taken from the species
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    reference: &'a ReferenceIndex,
    thresholds: &'a SegmentThresholds,
}

impl<'a> Resolver<'a> {
    pub fn new(reference: &'a ReferenceIndex, thresholds: &'a SegmentThresholds) -> Self {
        Self {
            reference,
            thresholds,
        }
    }

    pub fn resolve(
        &self,
        table: &CoefficientTable,
        species_id: u32,
        division: &str,
    ) -> Result<Resolution, NsvbError> {
        let species = self.reference.lookup(species_id)?;

        let resolution = match table.find(species, division) {
            Some(Hit::Species(record, tier)) => Resolution {
                record: *record,
                tier,
            },
            Some(Hit::Group(group)) => Resolution {
                record: group.bind(species, self.thresholds),
                tier: ResolutionTier::Group,
            },
            None => {
                tracing::warn!(
                    component = %table.component(),
                    species_id,
                    group_id = species.group_id,
                    "no coefficients at any tier; reference data is incomplete"
                );
                return Err(NsvbError::NoCoefficients {
                    component: table.component(),
                    species_id,
                });
            }
        };

        tracing::trace!(
            component = %table.component(),
            species_id,
            division,
            tier = %resolution.tier,
            form = resolution.record.kind().id(),
            "resolved coefficients"
        );
        Ok(resolution)
    }

    /// Same tiers as [`Resolver::resolve`] over a stem-profile table. Group
    /// rows are species-independent, so no binding happens.
    pub fn resolve_profile<T: ProfileCoefficients>(
        &self,
        table: &ProfileTable<T>,
        species_id: u32,
        division: &str,
    ) -> Result<ProfileResolution<T>, NsvbError> {
        let species = self.reference.lookup(species_id)?;
        let (record, tier) = match table.find(species, division) {
            Some(Hit::Species(record, tier)) => (*record, tier),
            Some(Hit::Group(record)) => (*record, ResolutionTier::Group),
            None => {
                tracing::debug!(
                    table = %table.model(),
                    species_id,
                    group_id = species.group_id,
                    "no profile coefficients at any tier"
                );
                return Err(NsvbError::NoProfileCoefficients {
                    table: table.model(),
                    species_id,
                });
            }
        };
        tracing::trace!(table = %table.model(), species_id, division, %tier, "resolved profile");
        Ok(ProfileResolution { record, tier })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CoefficientRow, Component, FormKind, ModelForm, ProfileModel, ProfileRow, RawTable,
        SpeciesRecord, VolumeRatio, WoodClass,
    };

    fn reference() -> ReferenceIndex {
        ReferenceIndex::new(vec![
            SpeciesRecord::new(202, 2, 0.45, WoodClass::Softwood),
            SpeciesRecord::new(316, 7, 0.49, WoodClass::Hardwood),
            SpeciesRecord::new(631, 8, 0.58, WoodClass::Hardwood),
            SpeciesRecord::new(999, 42, 0.5, WoodClass::Hardwood),
        ])
    }

    fn table(thresholds: &SegmentThresholds) -> CoefficientTable {
        let raw = RawTable::default()
            .species_row(202, "240", CoefficientRow::abc(1, 1.0, 1.0, 1.0))
            .species_row(202, "", CoefficientRow::abc(1, 2.0, 1.0, 1.0))
            .species_row(316, "", CoefficientRow::abc(1, 3.0, 1.0, 1.0))
            .group_row(2, CoefficientRow::abc(1, 4.0, 1.0, 1.0))
            .group_row(7, CoefficientRow::abc(1, 5.0, 1.0, 1.0))
            .group_row(8, CoefficientRow::abc(5, 6.0, 1.0, 1.0));
        CoefficientTable::build(Component::BranchWeight, raw, &reference(), thresholds).unwrap()
    }

    fn a_of(resolution: &Resolution) -> f64 {
        match resolution.record.form {
            ModelForm::SchumacherHall { a, .. } | ModelForm::WoodDensityScaled { a, .. } => a,
            other => panic!("unexpected form {other:?}"),
        }
    }

    #[test]
    fn test_exact_division_wins() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let r = resolver.resolve(&table(&thresholds), 202, "240").unwrap();
        assert_eq!(r.tier, ResolutionTier::SpeciesDivision);
        assert_eq!(a_of(&r), 1.0);
    }

    #[test]
    fn test_species_default_before_group() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let table = table(&thresholds);
        for division in ["M330", "", "240 ", "anything"] {
            let r = resolver.resolve(&table, 202, division).unwrap();
            assert_eq!(r.tier, ResolutionTier::SpeciesDefault, "division {division:?}");
            assert_eq!(a_of(&r), 2.0);
        }
    }

    #[test]
    fn test_species_with_only_default_row() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let r = resolver.resolve(&table(&thresholds), 316, "M210").unwrap();
        assert_eq!(r.tier, ResolutionTier::SpeciesDefault);
        assert_eq!(a_of(&r), 3.0);
    }

    #[test]
    fn test_group_fallback_injects_wood_density() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let r = resolver.resolve(&table(&thresholds), 631, "M240").unwrap();
        assert_eq!(r.tier, ResolutionTier::Group);
        assert_eq!(r.record.kind(), FormKind::WoodDensityScaled);
        match r.record.form {
            ModelForm::WoodDensityScaled { a, wdsg, .. } => {
                assert_eq!(a, 6.0);
                assert_eq!(wdsg, 0.58);
            }
            other => panic!("unexpected form {other:?}"),
        }
    }

    #[test]
    fn test_unknown_species() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let err = resolver
            .resolve(&table(&thresholds), 123, "240")
            .unwrap_err();
        assert!(matches!(err, NsvbError::UnknownSpecies(123)));
    }

    #[test]
    fn test_no_coefficients_when_group_missing() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let err = resolver
            .resolve(&table(&thresholds), 999, "240")
            .unwrap_err();
        match err {
            NsvbError::NoCoefficients {
                component,
                species_id,
            } => {
                assert_eq!(component, Component::BranchWeight);
                assert_eq!(species_id, 999);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let table = table(&thresholds);
        let first = resolver.resolve(&table, 631, "M240").unwrap();
        let second = resolver.resolve(&table, 631, "M240").unwrap();
        assert_eq!(first, second);
    }

    fn ratio_table() -> ProfileTable<VolumeRatio> {
        let raw = RawTable::default()
            .species_row(202, "240", ProfileRow::volume_ratio(1.1, 1.0))
            .species_row(316, "", ProfileRow::volume_ratio(1.2, 1.0))
            .group_row(2, ProfileRow::volume_ratio(1.3, 1.0))
            .group_row(8, ProfileRow::volume_ratio(1.4, 1.0));
        ProfileTable::build(ProfileModel::TotalVolumeRatio, raw, &reference()).unwrap()
    }

    #[test]
    fn test_profile_tiers() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let table = ratio_table();

        let exact = resolver.resolve_profile(&table, 202, "240").unwrap();
        assert_eq!(exact.tier, ResolutionTier::SpeciesDivision);
        assert_eq!(exact.record.alpha, 1.1);

        let other_division = resolver.resolve_profile(&table, 202, "M330").unwrap();
        assert_eq!(other_division.tier, ResolutionTier::Group);
        assert_eq!(other_division.record.alpha, 1.3);

        let default = resolver.resolve_profile(&table, 316, "M210").unwrap();
        assert_eq!(default.tier, ResolutionTier::SpeciesDefault);
        assert_eq!(default.record.alpha, 1.2);

        let group = resolver.resolve_profile(&table, 631, "").unwrap();
        assert_eq!(group.tier, ResolutionTier::Group);
        assert_eq!(group.record.alpha, 1.4);
    }

    #[test]
    fn test_profile_missing_at_every_tier() {
        let thresholds = SegmentThresholds::default();
        let reference = reference();
        let resolver = Resolver::new(&reference, &thresholds);
        let err = resolver.resolve_profile(&ratio_table(), 999, "240").unwrap_err();
        match err {
            NsvbError::NoProfileCoefficients { table, species_id } => {
                assert_eq!(table, ProfileModel::TotalVolumeRatio);
                assert_eq!(species_id, 999);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            resolver.resolve_profile(&ratio_table(), 123, "240"),
            Err(NsvbError::UnknownSpecies(123))
        ));
    }
}
