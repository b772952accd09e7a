use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::defects::{self, AdjustedWeights, GrossWeights, StemRemaining};
use super::equations;
use super::profile;
use super::resolver::{ProfileResolution, Resolution, Resolver};
use super::table::{CoefficientStore, CoefficientTable, ProfileTable};
use super::WATER_WEIGHT_LB_PER_CUFT;
use crate::error::NsvbError;
use crate::models::{
    Component, DecayClass, HeightDiameter, ProfileCoefficients, RawTables, ReferenceIndex,
    SegmentThresholds, SpeciesRecord, TreeObservation, VolumeRatio,
};

/// Every component estimate for one tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentResults {
    /// Gross inside-bark stem wood volume (cu ft)
    pub stem_wood_volume: f64,
    /// Gross stem bark volume (cu ft)
    pub bark_volume: f64,
    /// Gross outside-bark stem volume (cu ft)
    pub total_volume: f64,
    /// Stem wood dry weight after cull (lb)
    pub stem_wood_weight: f64,
    pub bark_weight: f64,
    pub branch_weight: f64,
    /// Total aboveground biomass, foliage excluded (lb)
    pub total_biomass: f64,
    pub foliage_weight: f64,
    /// Weights after decay and broken-top reductions
    pub adjusted: AdjustedWeights,
    /// Carbon in adjusted aboveground biomass (lb)
    pub carbon: f64,
}

/// Stem wood dry weight (lb) from inside-bark volume.
///
/// Cull is assumed to be rotten wood that still carries weight at the
/// density of decay class 3.
pub fn stem_wood_dry_weight(volume: f64, species: &SpeciesRecord, cull_percent: f64) -> f64 {
    let wdsg = species.wood_specific_gravity;
    if cull_percent > 0.0 {
        let density_proportion = DecayClass::CULL.properties(species.wood_class).wood_density;
        volume
            * (1.0 - cull_percent / 100.0 * (1.0 - density_proportion))
            * wdsg
            * WATER_WEIGHT_LB_PER_CUFT
    } else {
        volume * wdsg * WATER_WEIGHT_LB_PER_CUFT
    }
}

/// Volume and biomass estimator over immutable reference data.
///
/// Built once; every method is a pure function of its arguments, so one
/// estimator can be shared across threads.
#[derive(Debug, Clone)]
pub struct Estimator {
    reference: ReferenceIndex,
    store: CoefficientStore,
    thresholds: SegmentThresholds,
}

impl Estimator {
    /// Index the raw coefficient tables against the reference species.
    pub fn build(
        reference: ReferenceIndex,
        raw: RawTables,
        thresholds: SegmentThresholds,
    ) -> Result<Self, NsvbError> {
        let store = CoefficientStore::build(raw, &reference, &thresholds)?;
        tracing::info!(species = reference.len(), "estimator ready");
        Ok(Self {
            reference,
            store,
            thresholds,
        })
    }

    pub fn reference(&self) -> &ReferenceIndex {
        &self.reference
    }

    pub fn thresholds(&self) -> &SegmentThresholds {
        &self.thresholds
    }

    pub fn table(&self, component: Component) -> &CoefficientTable {
        self.store.table(component)
    }

    /// Coefficients that apply to a species in a division, tagged with their tier.
    pub fn resolve(
        &self,
        component: Component,
        species_id: u32,
        division: &str,
    ) -> Result<Resolution, NsvbError> {
        Resolver::new(&self.reference, &self.thresholds).resolve(
            self.store.table(component),
            species_id,
            division,
        )
    }

    fn predict(&self, component: Component, tree: &TreeObservation) -> Result<f64, NsvbError> {
        let resolution = self.resolve(component, tree.species_id, &tree.division)?;
        equations::evaluate(&resolution.record, tree.dbh, tree.height)
    }

    /// Gross inside-bark stem wood volume (cu ft).
    pub fn stem_wood_volume(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        self.predict(Component::StemWoodVolume, tree)
    }

    /// Gross stem bark volume (cu ft).
    pub fn bark_volume(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        self.predict(Component::BarkVolume, tree)
    }

    /// Gross outside-bark volume: wood plus bark (cu ft).
    pub fn total_volume(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        Ok(self.stem_wood_volume(tree)? + self.bark_volume(tree)?)
    }

    /// Stem wood dry weight with the cull reduction (lb).
    pub fn stem_wood_weight(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        let species = self.reference.lookup(tree.species_id)?;
        let volume = self.stem_wood_volume(tree)?;
        Ok(stem_wood_dry_weight(volume, species, tree.cull_percent))
    }

    pub fn bark_weight(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        self.predict(Component::BarkWeight, tree)
    }

    pub fn branch_weight(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        self.predict(Component::BranchWeight, tree)
    }

    /// Total aboveground biomass from its own regression (lb).
    pub fn total_biomass(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        self.predict(Component::TotalBiomass, tree)
    }

    pub fn foliage_weight(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        self.predict(Component::FoliageWeight, tree)
    }

    /// Total outside-bark stem volume from its own regression (cu ft).
    pub fn stem_total_volume(&self, tree: &TreeObservation) -> Result<f64, NsvbError> {
        self.predict(Component::StemTotalVolume, tree)
    }

    fn resolve_in<T: ProfileCoefficients>(
        &self,
        table: &ProfileTable<T>,
        species_id: u32,
        division: &str,
    ) -> Result<ProfileResolution<T>, NsvbError> {
        Resolver::new(&self.reference, &self.thresholds).resolve_profile(table, species_id, division)
    }

    pub fn resolve_total_volume_ratio(
        &self,
        species_id: u32,
        division: &str,
    ) -> Result<ProfileResolution<VolumeRatio>, NsvbError> {
        self.resolve_in(self.store.total_volume_ratio(), species_id, division)
    }

    pub fn resolve_wood_volume_ratio(
        &self,
        species_id: u32,
        division: &str,
    ) -> Result<ProfileResolution<VolumeRatio>, NsvbError> {
        self.resolve_in(self.store.wood_volume_ratio(), species_id, division)
    }

    pub fn resolve_height_diameter(
        &self,
        species_id: u32,
        division: &str,
    ) -> Result<ProfileResolution<HeightDiameter>, NsvbError> {
        self.resolve_in(self.store.height_diameter(), species_id, division)
    }

    /// Share of outside-bark stem volume below `ht_ratio` of total height.
    pub fn total_volume_ratio(
        &self,
        species_id: u32,
        division: &str,
        ht_ratio: f64,
    ) -> Result<f64, NsvbError> {
        let ratio = self.resolve_total_volume_ratio(species_id, division)?.record;
        profile::volume_ratio(ht_ratio, &ratio)
    }

    /// Share of inside-bark stem volume below `ht_ratio` of total height.
    pub fn wood_volume_ratio(
        &self,
        species_id: u32,
        division: &str,
        ht_ratio: f64,
    ) -> Result<f64, NsvbError> {
        let ratio = self.resolve_wood_volume_ratio(species_id, division)?.record;
        profile::volume_ratio(ht_ratio, &ratio)
    }

    /// Outside-bark diameter (in) at `hi` feet up the stem.
    pub fn diameter_at_height(&self, tree: &TreeObservation, hi: f64) -> Result<f64, NsvbError> {
        let volume = self.stem_total_volume(tree)?;
        let ratio = self
            .resolve_total_volume_ratio(tree.species_id, &tree.division)?
            .record;
        profile::diameter_at_height(volume, tree.height, hi, &ratio)
    }

    /// Height (ft) at which the stem narrows to `top_diameter` inches.
    pub fn height_at_diameter(
        &self,
        tree: &TreeObservation,
        top_diameter: f64,
    ) -> Result<f64, NsvbError> {
        let volume = self.stem_total_volume(tree)?;
        let ratio = self
            .resolve_total_volume_ratio(tree.species_id, &tree.division)?
            .record;
        profile::height_at_diameter(volume, tree.height, top_diameter, &ratio)
    }

    /// Expected height (ft) for a diameter.
    pub fn height(&self, species_id: u32, division: &str, dbh: f64) -> Result<f64, NsvbError> {
        let curve = self.resolve_height_diameter(species_id, division)?.record;
        profile::height(dbh, &curve)
    }

    /// Height (ft) for a diameter under light resource index `lri`.
    pub fn height_lri(
        &self,
        species_id: u32,
        division: &str,
        dbh: f64,
        lri: f64,
    ) -> Result<f64, NsvbError> {
        let curve = self.resolve_height_diameter(species_id, division)?.record;
        profile::height_lri(dbh, lri, &curve)
    }

    /// Light resource index that gives `target_height` for `dbh`.
    pub fn find_lri(
        &self,
        species_id: u32,
        division: &str,
        dbh: f64,
        target_height: f64,
    ) -> Result<f64, NsvbError> {
        let curve = self.resolve_height_diameter(species_id, division)?.record;
        profile::find_lri(dbh, target_height, &curve)
    }

    /// Breast-height diameter (in) from a stump diameter measured at `stump_height`.
    pub fn dbh_from_stump_diameter(
        &self,
        species_id: u32,
        division: &str,
        stump_diameter: f64,
        stump_height: f64,
    ) -> Result<f64, NsvbError> {
        let volume = self.resolve(Component::StemTotalVolume, species_id, division)?;
        let ratio = self.resolve_total_volume_ratio(species_id, division)?.record;
        let curve = self.resolve_height_diameter(species_id, division)?.record;
        profile::dbh_from_stump_diameter(stump_diameter, stump_height, &ratio, &curve, |dbh, ht| {
            equations::evaluate(&volume.record, dbh, ht)
        })
    }

    /// Published bark specific gravity, if the reference table carries one.
    pub fn bark_specific_gravity(&self, species_id: u32) -> Result<Option<f64>, NsvbError> {
        Ok(self.reference.lookup(species_id)?.bark_specific_gravity)
    }

    /// Stem wood and bark left below a broken top. Species without profile
    /// coefficients keep the whole stem.
    fn stem_remaining(&self, tree: &TreeObservation) -> Result<StemRemaining, NsvbError> {
        let Some(actual_height) = tree.broken_top_height() else {
            return Ok(StemRemaining::INTACT);
        };
        let ht_ratio = actual_height / tree.height;
        let or_intact = |result: Result<f64, NsvbError>| match result {
            Err(NsvbError::NoProfileCoefficients { table, .. }) => {
                tracing::debug!(
                    species_id = tree.species_id,
                    %table,
                    "broken top without profile coefficients; stem not reduced"
                );
                Ok(1.0)
            }
            other => other,
        };
        Ok(StemRemaining {
            wood: or_intact(self.wood_volume_ratio(tree.species_id, &tree.division, ht_ratio))?,
            bark: or_intact(self.total_volume_ratio(tree.species_id, &tree.division, ht_ratio))?,
        })
    }

    /// Run every stage for one tree. Fails as a whole if any stage fails.
    pub fn estimate(&self, tree: &TreeObservation) -> Result<ComponentResults, NsvbError> {
        let species = self.reference.lookup(tree.species_id)?;
        let decay = tree.decay()?;

        let stem_wood_volume = self.stem_wood_volume(tree)?;
        let bark_volume = self.bark_volume(tree)?;
        let total_volume = stem_wood_volume + bark_volume;
        let stem_wood_weight = stem_wood_dry_weight(stem_wood_volume, species, tree.cull_percent);
        let bark_weight = self.bark_weight(tree)?;
        let branch_weight = self.branch_weight(tree)?;
        let total_biomass = self.total_biomass(tree)?;
        let foliage_weight = self.foliage_weight(tree)?;

        let gross = GrossWeights {
            stem_wood_volume,
            stem_wood_weight,
            bark_weight,
            branch_weight,
            total_biomass,
            foliage_weight,
        };
        let stem = self.stem_remaining(tree)?;
        let adjusted = defects::adjust(tree, species, decay, &gross, stem);
        let carbon = defects::carbon(species, decay, &adjusted);

        tracing::debug!(
            species_id = tree.species_id,
            dbh = tree.dbh,
            height = tree.height,
            division = %tree.division,
            stem_wood_volume,
            total_biomass,
            "estimated tree"
        );

        Ok(ComponentResults {
            stem_wood_volume,
            bark_volume,
            total_volume,
            stem_wood_weight,
            bark_weight,
            branch_weight,
            total_biomass,
            foliage_weight,
            adjusted,
            carbon,
        })
    }

    /// Estimate many trees in parallel. Results keep the input order.
    pub fn estimate_batch(
        &self,
        trees: &[TreeObservation],
    ) -> Vec<Result<ComponentResults, NsvbError>> {
        trees.par_iter().map(|tree| self.estimate(tree)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CoefficientRow, ProfileModel, ProfileRow, RawTable, WoodClass};
    use assert_approx_eq::assert_approx_eq;

    fn rel_close(actual: f64, expected: f64, tol: f64) {
        let rel = ((actual - expected) / expected).abs();
        assert!(rel < tol, "{actual} vs {expected} (relative error {rel})");
    }

    fn segmented(a: f64, b: f64, b1: f64, c: f64) -> CoefficientRow {
        CoefficientRow {
            b1: Some(b1),
            ..CoefficientRow::abc(2, a, b, c)
        }
    }

    /// Douglas-fir (202) and red maple (316) rows plus group rows for both.
    fn estimator() -> Estimator {
        let reference = ReferenceIndex::new(vec![
            SpeciesRecord::new(202, 2, 0.45, WoodClass::Softwood),
            SpeciesRecord::new(316, 7, 0.49, WoodClass::Hardwood),
            SpeciesRecord::new(318, 7, 0.56, WoodClass::Hardwood),
        ]);
        let groups = |table: RawTable| {
            table
                .group_row(2, CoefficientRow::abc(1, 0.002, 1.9, 1.0))
                .group_row(7, CoefficientRow::abc(5, 0.4, 2.1, 0.7))
        };
        let raw = RawTables {
            stem_wood_volume: groups(
                RawTable::default()
                    .species_row(
                        202,
                        "240",
                        segmented(0.001929099661, 2.162413104203, 1.690400253097, 0.985444005253),
                    )
                    .species_row(
                        316,
                        "",
                        CoefficientRow::abc(1, 0.001983918881, 1.810559393287, 1.129417635145),
                    ),
            ),
            bark_volume: groups(
                RawTable::default()
                    .species_row(
                        202,
                        "240",
                        CoefficientRow::abc(1, 0.000031886237, 1.21260513951, 1.978577263767),
                    )
                    .species_row(
                        316,
                        "",
                        segmented(0.003743084443, 2.226890355309, 1.685993125661, 0.275066356213),
                    ),
            ),
            bark_weight: groups(RawTable::default().species_row(
                316,
                "",
                CoefficientRow::abc(1, 0.061595466174, 1.818642599217, 0.654020672095),
            )),
            branch_weight: groups(RawTable::default().species_row(
                316,
                "",
                CoefficientRow::abc(1, 0.011144618401, 3.269520661293, 0.421304343724),
            )),
            total_biomass: groups(RawTable::default().species_row(
                316,
                "",
                CoefficientRow {
                    b1: Some(-0.024745684975),
                    ..CoefficientRow::abc(4, 0.31573027567, 1.853839844372, 0.740557378679)
                },
            )),
            foliage_weight: groups(RawTable::default().species_row(
                316,
                "",
                CoefficientRow::abc(1, 0.850316556558, 1.998961809584, -0.418446486365),
            )),
            ..RawTables::default()
        };
        Estimator::build(reference, raw, SegmentThresholds::default()).unwrap()
    }

    /// [`estimator`] plus profile tables for group 7 only.
    fn profiled_estimator() -> Estimator {
        let reference = ReferenceIndex::new(vec![
            SpeciesRecord::new(202, 2, 0.45, WoodClass::Softwood),
            SpeciesRecord::new(316, 7, 0.49, WoodClass::Hardwood),
        ]);
        let mut raw = RawTables::default();
        for component in Component::ALL {
            raw[component] = RawTable::default()
                .group_row(2, CoefficientRow::abc(1, 0.002, 2.0, 1.0))
                .group_row(7, CoefficientRow::abc(1, 0.003, 2.0, 1.0));
        }
        raw.profiles[ProfileModel::TotalVolumeRatio] =
            RawTable::default().group_row(7, ProfileRow::volume_ratio(2.0, 1.0));
        raw.profiles[ProfileModel::WoodVolumeRatio] =
            RawTable::default().group_row(7, ProfileRow::volume_ratio(2.2, 1.0));
        raw.profiles[ProfileModel::HeightDiameter] = RawTable::default().group_row(
            7,
            ProfileRow::height_diameter((1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (5.0, 1.0)),
        );
        Estimator::build(reference, raw, SegmentThresholds::default()).unwrap()
    }

    #[test]
    fn test_douglas_fir_volume_and_weight() {
        let est = estimator();
        let tree = TreeObservation::new(202, 20.0, 110.0, "240");
        rel_close(est.stem_wood_volume(&tree).unwrap(), 88.45229093648126, 1e-6);
        rel_close(est.stem_wood_weight(&tree).unwrap(), 2483.7403294963938, 1e-6);
    }

    #[test]
    fn test_red_maple_species_default_with_cull() {
        let est = estimator();
        let tree = TreeObservation::new(316, 11.1, 38.0, "M210");
        assert_eq!(
            est.resolve(Component::StemWoodVolume, 316, "M210")
                .unwrap()
                .tier,
            crate::engine::ResolutionTier::SpeciesDefault
        );
        rel_close(est.stem_wood_volume(&tree).unwrap(), 9.42711333158677, 1e-6);
        let culled = tree.clone().with_cull(3.0);
        rel_close(est.stem_wood_weight(&culled).unwrap(), 284.26565806887004, 1e-6);
    }

    #[test]
    fn test_estimate_matches_individual_stages() {
        let est = estimator();
        let tree = TreeObservation::new(316, 11.1, 38.0, "M210").with_cull(3.0);
        let r = est.estimate(&tree).unwrap();
        assert_eq!(r.stem_wood_volume, est.stem_wood_volume(&tree).unwrap());
        assert_eq!(r.bark_volume, est.bark_volume(&tree).unwrap());
        assert_eq!(r.total_volume, est.total_volume(&tree).unwrap());
        assert_eq!(r.stem_wood_weight, est.stem_wood_weight(&tree).unwrap());
        assert_eq!(r.bark_weight, est.bark_weight(&tree).unwrap());
        assert_eq!(r.branch_weight, est.branch_weight(&tree).unwrap());
        assert_eq!(r.total_biomass, est.total_biomass(&tree).unwrap());
        assert_eq!(r.foliage_weight, est.foliage_weight(&tree).unwrap());
        rel_close(r.total_biomass, 532.5847988200422, 1e-12);
    }

    #[test]
    fn test_total_volume_is_exact_sum() {
        let est = estimator();
        let r = est
            .estimate(&TreeObservation::new(202, 20.0, 110.0, "240"))
            .unwrap();
        assert_eq!(r.total_volume, r.stem_wood_volume + r.bark_volume);
    }

    #[test]
    fn test_group_tier_uses_species_wood_density() {
        let est = estimator();
        // 318 has no species rows; group 7 model 5 scales by its own wdsg
        let tree = TreeObservation::new(318, 10.0, 50.0, "M210");
        let v = est.stem_wood_volume(&tree).unwrap();
        let expected = 0.4 * 10f64.powf(2.1) * 50f64.powf(0.7) * 0.56;
        assert_eq!(v, expected);
    }

    #[test]
    fn test_unknown_species_fails_whole_estimate() {
        let est = estimator();
        let err = est
            .estimate(&TreeObservation::new(9999, 10.0, 50.0, ""))
            .unwrap_err();
        assert!(matches!(err, NsvbError::UnknownSpecies(9999)));
    }

    #[test]
    fn test_domain_error_fails_whole_estimate() {
        let est = estimator();
        let err = est
            .estimate(&TreeObservation::new(316, -11.1, 38.0, "M210"))
            .unwrap_err();
        assert!(matches!(err, NsvbError::DomainError(_)));
    }

    #[test]
    fn test_invalid_decay_class_rejected() {
        let est = estimator();
        let tree = TreeObservation::new(316, 11.1, 38.0, "M210").with_decay_class(9);
        assert!(matches!(
            est.estimate(&tree),
            Err(NsvbError::ValidationError(_))
        ));
    }

    #[test]
    fn test_cull_reduction_factor() {
        let species = SpeciesRecord::new(316, 7, 0.49, WoodClass::Hardwood);
        let full = stem_wood_dry_weight(10.0, &species, 0.0);
        let culled = stem_wood_dry_weight(10.0, &species, 100.0);
        assert!((culled / full - 0.54).abs() < 1e-12);

        let softwood = SpeciesRecord::new(202, 2, 0.45, WoodClass::Softwood);
        let full = stem_wood_dry_weight(10.0, &softwood, 0.0);
        let culled = stem_wood_dry_weight(10.0, &softwood, 100.0);
        assert!((culled / full - 0.92).abs() < 1e-12);
    }

    #[test]
    fn test_live_tree_adjusted_matches_gross_without_defects() {
        let est = estimator();
        let r = est
            .estimate(&TreeObservation::new(316, 11.1, 38.0, "M210"))
            .unwrap();
        assert_eq!(r.adjusted.stem_wood_weight, r.stem_wood_weight);
        assert_eq!(r.adjusted.total_biomass, r.total_biomass);
        assert_eq!(r.adjusted.foliage_weight, r.foliage_weight);
    }

    #[test]
    fn test_live_tree_without_carbon_row_uses_default_fraction() {
        let est = estimator();
        let r = est
            .estimate(&TreeObservation::new(316, 11.1, 38.0, "M210"))
            .unwrap();
        assert_approx_eq!(r.carbon, r.adjusted.total_biomass * 0.5, 1e-9);
    }

    #[test]
    fn test_broken_top_without_profile_keeps_stem() {
        let est = estimator();
        let tree = TreeObservation::new(316, 11.1, 38.0, "M210").with_actual_height(30.0);
        let r = est.estimate(&tree).unwrap();
        assert_eq!(r.adjusted.stem_wood_weight, r.stem_wood_weight);
        assert_eq!(r.adjusted.bark_weight, r.bark_weight);
    }

    #[test]
    fn test_broken_top_reduces_stem_by_profile() {
        let est = profiled_estimator();
        let tree = TreeObservation::new(316, 12.0, 60.0, "M210").with_actual_height(45.0);
        let r = est.estimate(&tree).unwrap();
        // 1 − 0.25^alpha
        let wood = 1.0 - 0.25f64.powf(2.2);
        let bark = 1.0 - 0.25f64.powf(2.0);
        assert_approx_eq!(r.adjusted.stem_wood_weight, r.stem_wood_weight * wood, 1e-9);
        assert_approx_eq!(r.adjusted.bark_weight, r.bark_weight * bark, 1e-9);
        assert!(r.adjusted.total_biomass < r.total_biomass);
    }

    #[test]
    fn test_profile_queries_need_profile_rows() {
        let est = profiled_estimator();
        let tree = TreeObservation::new(202, 12.0, 60.0, "240");
        assert!(matches!(
            est.diameter_at_height(&tree, 10.0),
            Err(NsvbError::NoProfileCoefficients {
                table: ProfileModel::TotalVolumeRatio,
                species_id: 202
            })
        ));
        assert!(matches!(
            est.height(202, "", 12.0),
            Err(NsvbError::NoProfileCoefficients { .. })
        ));
    }

    #[test]
    fn test_diameter_and_height_along_stem_agree() {
        let est = profiled_estimator();
        let tree = TreeObservation::new(316, 12.0, 60.0, "M210");
        assert!(est.stem_total_volume(&tree).unwrap() > 0.0);
        let d = est.diameter_at_height(&tree, 30.0).unwrap();
        assert!(d > 0.0 && d < 12.5, "{d}");
        let hi = est.height_at_diameter(&tree, d).unwrap();
        assert_approx_eq!(hi, 30.0, 0.05);
        assert_approx_eq!(est.total_volume_ratio(316, "M210", 1.0).unwrap(), 1.0, 1e-12);
    }

    #[test]
    fn test_height_models() {
        let est = profiled_estimator();
        assert_approx_eq!(est.height(316, "M210", 12.0).unwrap(), 60.0, 1e-9);
        let ht = est.height_lri(316, "M210", 20.0, 0.25).unwrap();
        assert_approx_eq!(ht, 50.0, 1e-9);
        assert_approx_eq!(est.find_lri(316, "M210", 20.0, ht).unwrap(), 0.25, 0.01);
    }

    #[test]
    fn test_dbh_from_stump_diameter_round_trip() {
        let est = profiled_estimator();
        let tree = TreeObservation::new(316, 12.0, 60.0, "M210");
        let stump = est.diameter_at_height(&tree, 1.0).unwrap();
        assert!(stump > 12.0, "{stump}");
        let dbh = est.dbh_from_stump_diameter(316, "M210", stump, 1.0).unwrap();
        assert_approx_eq!(dbh, 12.0, 0.005);
    }

    #[test]
    fn test_bark_specific_gravity_lookup() {
        let est = estimator();
        assert_eq!(est.bark_specific_gravity(316).unwrap(), None);
        assert!(matches!(
            est.bark_specific_gravity(9999),
            Err(NsvbError::UnknownSpecies(9999))
        ));
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let est = estimator();
        let trees = vec![
            TreeObservation::new(202, 20.0, 110.0, "240"),
            TreeObservation::new(9999, 10.0, 50.0, ""),
            TreeObservation::new(316, 11.1, 38.0, "M210"),
        ];
        let results = est.estimate_batch(&trees);
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &est.estimate(&trees[0]).unwrap()
        );
        assert!(results[1].is_err());
        assert_eq!(
            results[2].as_ref().unwrap(),
            &est.estimate(&trees[2]).unwrap()
        );
    }

    #[test]
    fn test_estimator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Estimator>();
    }
}
