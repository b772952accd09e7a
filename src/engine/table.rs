use std::collections::HashMap;

use super::resolver::ResolutionTier;
use crate::error::NsvbError;
use crate::models::{
    CoefficientRecord, CoefficientRow, Component, GroupRecord, HeightDiameter, ProfileCoefficients,
    ProfileModel, ProfileRow, RawTable, RawTables, ReferenceIndex, SegmentThresholds,
    SpeciesRecord, VolumeRatio,
};

/// species id -> division ("" = any division) -> record, plus group id -> record.
#[derive(Debug, Clone)]
struct Keyed<S, G> {
    by_species: HashMap<u32, HashMap<String, S>>,
    by_group: HashMap<u32, G>,
}

/// Record found by the tiered lookup, before any group binding.
pub(crate) enum Hit<'t, S, G> {
    Species(&'t S, ResolutionTier),
    Group(&'t G),
}

impl<S, G> Keyed<S, G> {
    fn species(&self, species_id: u32, division: &str) -> Option<&S> {
        self.by_species.get(&species_id)?.get(division)
    }

    fn species_count(&self) -> usize {
        self.by_species.values().map(HashMap::len).sum()
    }

    /// Exact division, then the species default row, then the group row.
    fn find(&self, species: &SpeciesRecord, division: &str) -> Option<Hit<'_, S, G>> {
        if !division.is_empty() {
            if let Some(record) = self.species(species.species_id, division) {
                return Some(Hit::Species(record, ResolutionTier::SpeciesDivision));
            }
        }
        if let Some(record) = self.species(species.species_id, "") {
            return Some(Hit::Species(record, ResolutionTier::SpeciesDefault));
        }
        self.by_group.get(&species.group_id).map(Hit::Group)
    }
}

/// Index the rows of one raw table. Rows naming a species missing from the
/// reference index are skipped; a repeated key keeps the later row. Errors
/// carry the offending row's key and the reason.
fn index_rows<R, S, G>(
    table: &str,
    raw: RawTable<R>,
    reference: &ReferenceIndex,
    mut species_record: impl FnMut(R, &SpeciesRecord) -> Result<S, String>,
    mut group_record: impl FnMut(R) -> Result<G, String>,
) -> Result<Keyed<S, G>, (String, String)> {
    let mut by_species: HashMap<u32, HashMap<String, S>> = HashMap::new();
    let mut skipped = 0usize;
    for row in raw.species_rows {
        let key = format!("species {}, division '{}'", row.species_id, row.division);
        let Ok(species) = reference.lookup(row.species_id) else {
            tracing::warn!(
                table,
                species_id = row.species_id,
                "coefficient row names a species missing from the reference index"
            );
            skipped += 1;
            continue;
        };
        let record = species_record(row.coefficients, species).map_err(|r| (key.clone(), r))?;
        let divisions = by_species.entry(row.species_id).or_default();
        if divisions.insert(row.division, record).is_some() {
            tracing::warn!(table, %key, "duplicate key, keeping the later row");
        }
    }

    let mut by_group = HashMap::new();
    for row in raw.group_rows {
        let key = format!("group {}", row.group_id);
        let record = group_record(row.coefficients).map_err(|r| (key.clone(), r))?;
        if by_group.insert(row.group_id, record).is_some() {
            tracing::warn!(table, %key, "duplicate key, keeping the later row");
        }
    }

    tracing::debug!(
        table,
        species = by_species.len(),
        groups = by_group.len(),
        skipped,
        "indexed coefficient table"
    );
    Ok(Keyed {
        by_species,
        by_group,
    })
}

/// Indexed coefficients for one component.
#[derive(Debug, Clone)]
pub struct CoefficientTable {
    component: Component,
    records: Keyed<CoefficientRecord, GroupRecord>,
}

impl CoefficientTable {
    /// Index both raw sources, validating every row against its model form.
    ///
    /// Species rows are bound to their reference record here, so a row naming
    /// a species missing from the reference index can never resolve; those
    /// rows are skipped with a warning.
    pub fn build(
        component: Component,
        raw: RawTable,
        reference: &ReferenceIndex,
        thresholds: &SegmentThresholds,
    ) -> Result<Self, NsvbError> {
        let records = index_rows(
            component.label(),
            raw,
            reference,
            |row: CoefficientRow, species| row.into_species_record(species, thresholds),
            CoefficientRow::into_group_record,
        )
        .map_err(|(key, reason)| NsvbError::MalformedCoefficientRow {
            table: component,
            key,
            reason,
        })?;
        Ok(Self { component, records })
    }

    pub fn component(&self) -> Component {
        self.component
    }

    /// Species-keyed record for an exact division ("" for the species default).
    pub fn species_record(&self, species_id: u32, division: &str) -> Option<&CoefficientRecord> {
        self.records.species(species_id, division)
    }

    pub fn group_record(&self, group_id: u32) -> Option<&GroupRecord> {
        self.records.by_group.get(&group_id)
    }

    pub(crate) fn find(
        &self,
        species: &SpeciesRecord,
        division: &str,
    ) -> Option<Hit<'_, CoefficientRecord, GroupRecord>> {
        self.records.find(species, division)
    }

    /// Number of species/division rows.
    pub fn species_row_count(&self) -> usize {
        self.records.species_count()
    }

    pub fn group_row_count(&self) -> usize {
        self.records.by_group.len()
    }
}

/// Indexed stem-profile coefficients. Group rows need no species binding.
#[derive(Debug, Clone)]
pub struct ProfileTable<T> {
    model: ProfileModel,
    records: Keyed<T, T>,
}

impl<T: ProfileCoefficients> ProfileTable<T> {
    pub fn build(
        model: ProfileModel,
        raw: RawTable<ProfileRow>,
        reference: &ReferenceIndex,
    ) -> Result<Self, NsvbError> {
        let records = index_rows(
            model.label(),
            raw,
            reference,
            |row: ProfileRow, _| T::from_row(&row),
            |row: ProfileRow| T::from_row(&row),
        )
        .map_err(|(key, reason)| NsvbError::MalformedProfileRow {
            table: model,
            key,
            reason,
        })?;
        Ok(Self { model, records })
    }

    pub fn model(&self) -> ProfileModel {
        self.model
    }

    pub fn species_record(&self, species_id: u32, division: &str) -> Option<&T> {
        self.records.species(species_id, division)
    }

    pub(crate) fn find(&self, species: &SpeciesRecord, division: &str) -> Option<Hit<'_, T, T>> {
        self.records.find(species, division)
    }

    pub fn species_row_count(&self) -> usize {
        self.records.species_count()
    }

    pub fn group_row_count(&self) -> usize {
        self.records.by_group.len()
    }
}

/// Every coefficient table the estimator reads.
#[derive(Debug, Clone)]
pub struct CoefficientStore {
    stem_wood_volume: CoefficientTable,
    bark_volume: CoefficientTable,
    stem_total_volume: CoefficientTable,
    bark_weight: CoefficientTable,
    branch_weight: CoefficientTable,
    total_biomass: CoefficientTable,
    foliage_weight: CoefficientTable,
    total_volume_ratio: ProfileTable<VolumeRatio>,
    wood_volume_ratio: ProfileTable<VolumeRatio>,
    height_diameter: ProfileTable<HeightDiameter>,
}

impl CoefficientStore {
    pub fn build(
        mut raw: RawTables,
        reference: &ReferenceIndex,
        thresholds: &SegmentThresholds,
    ) -> Result<Self, NsvbError> {
        let mut build = |component: Component| {
            let table = std::mem::take(&mut raw[component]);
            CoefficientTable::build(component, table, reference, thresholds)
        };
        let stem_wood_volume = build(Component::StemWoodVolume)?;
        let bark_volume = build(Component::BarkVolume)?;
        let stem_total_volume = build(Component::StemTotalVolume)?;
        let bark_weight = build(Component::BarkWeight)?;
        let branch_weight = build(Component::BranchWeight)?;
        let total_biomass = build(Component::TotalBiomass)?;
        let foliage_weight = build(Component::FoliageWeight)?;

        let mut profiles = raw.profiles;
        let mut take = |model: ProfileModel| std::mem::take(&mut profiles[model]);
        Ok(Self {
            stem_wood_volume,
            bark_volume,
            stem_total_volume,
            bark_weight,
            branch_weight,
            total_biomass,
            foliage_weight,
            total_volume_ratio: ProfileTable::build(
                ProfileModel::TotalVolumeRatio,
                take(ProfileModel::TotalVolumeRatio),
                reference,
            )?,
            wood_volume_ratio: ProfileTable::build(
                ProfileModel::WoodVolumeRatio,
                take(ProfileModel::WoodVolumeRatio),
                reference,
            )?,
            height_diameter: ProfileTable::build(
                ProfileModel::HeightDiameter,
                take(ProfileModel::HeightDiameter),
                reference,
            )?,
        })
    }

    pub fn table(&self, component: Component) -> &CoefficientTable {
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

    /// Cumulative outside-bark volume ratios.
    pub fn total_volume_ratio(&self) -> &ProfileTable<VolumeRatio> {
        &self.total_volume_ratio
    }

    /// Cumulative inside-bark volume ratios.
    pub fn wood_volume_ratio(&self) -> &ProfileTable<VolumeRatio> {
        &self.wood_volume_ratio
    }

    pub fn height_diameter(&self) -> &ProfileTable<HeightDiameter> {
        &self.height_diameter
    }
}
