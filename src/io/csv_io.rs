use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::ComponentResults;
use crate::error::NsvbError;
use crate::models::{
    CoefficientRow, GroupCoefficientRow, ProfileRow, SpeciesCoefficientRow, SpeciesRecord,
    TreeObservation, WoodClass,
};

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

/// Integer code that may have been exported as a float ("202" or "202.0").
fn de_code<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_code(&raw).map_err(serde::de::Error::custom)
}

/// Like [`de_code`], but blank and `NA` cells are `None`.
fn de_optional_code<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() && !raw.trim().eq_ignore_ascii_case("na") => {
            parse_code(&raw).map(Some).map_err(serde::de::Error::custom)
        }
        _ => Ok(None),
    }
}

fn parse_code(raw: &str) -> Result<u32, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid code '{raw}'"))?;
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(format!("invalid code '{raw}'"));
    }
    Ok(value as u32)
}

/// Blank and `NA` cells both mean "no division restriction".
fn normalize_division(raw: Option<String>) -> String {
    match raw {
        Some(d) if !d.eq_ignore_ascii_case("na") => d,
        _ => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    #[serde(rename = "SPCD", deserialize_with = "de_code")]
    species_id: u32,
    #[serde(rename = "JENKINS_SPGRPCD", default, deserialize_with = "de_optional_code")]
    group_id: Option<u32>,
    #[serde(rename = "WOOD_SPGR_GREENVOL_DRYWT")]
    wood_specific_gravity: f64,
    #[serde(rename = "BARK_SPGR_GREENVOL_DRYWT", default)]
    bark_specific_gravity: Option<f64>,
    #[serde(rename = "SFTWD_HRDWD")]
    wood_class: String,
}

/// Highest domestic species code.
const MAX_DOMESTIC_SPECIES: u32 = 999;
/// Jenkins group of the woodland species, which have no NSVB coefficients.
const WOODLAND_GROUP: u32 = 10;

#[derive(Debug, Deserialize)]
struct CarbonRow {
    #[serde(rename = "SPCD", deserialize_with = "de_code")]
    species_id: u32,
    /// Percent of dry weight
    #[serde(rename = "fia.wood.c")]
    carbon_percent: f64,
}

/// Coefficient cells shared by both table layouts. Component tables fill
/// `a` through `e`; profile tables fill `alpha` through `ols_b`.
macro_rules! coefficient_columns {
    ($(#[$meta:meta])* struct $name:ident { $($key:tt)* }) => {
        $(#[$meta])*
        struct $name {
            $($key)*
            #[serde(alias = "equation")]
            model: String,
            a: Option<f64>,
            a1: Option<f64>,
            b: Option<f64>,
            b1: Option<f64>,
            c: Option<f64>,
            c1: Option<f64>,
            wdsg: Option<f64>,
            e: Option<f64>,
            alpha: Option<f64>,
            beta: Option<f64>,
            p05_a: Option<f64>,
            p05_b: Option<f64>,
            p50_a: Option<f64>,
            p50_b: Option<f64>,
            p95_a: Option<f64>,
            p95_b: Option<f64>,
            ols_a: Option<f64>,
            ols_b: Option<f64>,
        }

        impl $name {
            fn model_number(&self) -> Result<u8, NsvbError> {
                parse_code(&self.model)
                    .ok()
                    .and_then(|m| u8::try_from(m).ok())
                    .ok_or_else(|| {
                        NsvbError::ParseError(format!("invalid model number '{}'", self.model))
                    })
            }

            fn coefficients(&self) -> Result<CoefficientRow, NsvbError> {
                Ok(CoefficientRow {
                    model: self.model_number()?,
                    a: self.a,
                    a1: self.a1,
                    b: self.b,
                    b1: self.b1,
                    c: self.c,
                    c1: self.c1,
                    wdsg: self.wdsg,
                    e: self.e,
                })
            }

            fn profile(&self) -> Result<ProfileRow, NsvbError> {
                Ok(ProfileRow {
                    model: self.model_number()?,
                    alpha: self.alpha,
                    beta: self.beta,
                    p05_a: self.p05_a,
                    p05_b: self.p05_b,
                    p50_a: self.p50_a,
                    p50_b: self.p50_b,
                    p95_a: self.p95_a,
                    p95_b: self.p95_b,
                    ols_a: self.ols_a,
                    ols_b: self.ols_b,
                })
            }
        }
    };
}

coefficient_columns! {
    #[derive(Debug, Deserialize)]
    struct SpeciesCoefficientColumns {
        #[serde(rename = "SPCD", deserialize_with = "de_code")]
        species_id: u32,
        #[serde(rename = "DIVISION", default)]
        division: Option<String>,
        /// Stand origin: 0 natural, 1 planted. Absent means natural.
        #[serde(rename = "STDORGCD", default, deserialize_with = "de_optional_code")]
        stand_origin: Option<u32>,
    }
}

coefficient_columns! {
    #[derive(Debug, Deserialize)]
    struct GroupCoefficientColumns {
        #[serde(rename = "JENKINS_SPGRPCD", deserialize_with = "de_code")]
        group_id: u32,
    }
}

fn parse_reference<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<SpeciesRecord>, NsvbError> {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize() {
        let row: ReferenceRow = result?;
        let group_id = match row.group_id {
            Some(group) if group != WOODLAND_GROUP && row.species_id <= MAX_DOMESTIC_SPECIES => {
                group
            }
            group => {
                tracing::debug!(
                    species_id = row.species_id,
                    group_id = ?group,
                    "species outside the NSVB scope"
                );
                skipped += 1;
                continue;
            }
        };
        let wood_class: WoodClass = row.wood_class.parse()?;
        let mut record = SpeciesRecord::new(
            row.species_id,
            group_id,
            row.wood_specific_gravity,
            wood_class,
        );
        if let Some(gravity) = row.bark_specific_gravity {
            record = record.with_bark_specific_gravity(gravity);
        }
        records.push(record);
    }
    if skipped > 0 {
        tracing::warn!(
            skipped,
            "skipped non-domestic, woodland and ungrouped reference species"
        );
    }
    Ok(records)
}

/// Read the reference species table.
pub fn read_reference_species(path: impl AsRef<Path>) -> Result<Vec<SpeciesRecord>, NsvbError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_reference(&mut rdr)
}

/// Read the reference species table from CSV bytes.
pub fn read_reference_species_from_bytes(data: &[u8]) -> Result<Vec<SpeciesRecord>, NsvbError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_reference(&mut rdr)
}

fn parse_carbon<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<(u32, f64)>, NsvbError> {
    let mut fractions = Vec::new();
    for result in rdr.deserialize() {
        let row: CarbonRow = result?;
        if !(0.0..=100.0).contains(&row.carbon_percent) {
            return Err(NsvbError::ValidationError(format!(
                "Carbon percent for species {} must be between 0 and 100, got {}",
                row.species_id, row.carbon_percent
            )));
        }
        fractions.push((row.species_id, row.carbon_percent / 100.0));
    }
    Ok(fractions)
}

/// Read live-tree wood carbon as `(species, fraction)` pairs. The file
/// stores percentages.
pub fn read_carbon_fractions(path: impl AsRef<Path>) -> Result<Vec<(u32, f64)>, NsvbError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_carbon(&mut rdr)
}

pub fn read_carbon_fractions_from_bytes(data: &[u8]) -> Result<Vec<(u32, f64)>, NsvbError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_carbon(&mut rdr)
}

fn parse_species_rows<R: Read, T>(
    rdr: &mut csv::Reader<R>,
    convert: fn(&SpeciesCoefficientColumns) -> Result<T, NsvbError>,
) -> Result<Vec<SpeciesCoefficientRow<T>>, NsvbError> {
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: SpeciesCoefficientColumns = result?;
        if row.stand_origin.is_some_and(|origin| origin != 0) {
            tracing::debug!(
                species_id = row.species_id,
                stand_origin = ?row.stand_origin,
                "skipping planted-stand coefficients"
            );
            continue;
        }
        let coefficients = convert(&row)?;
        rows.push(SpeciesCoefficientRow {
            species_id: row.species_id,
            division: normalize_division(row.division),
            coefficients,
        });
    }
    Ok(rows)
}

fn parse_group_rows<R: Read, T>(
    rdr: &mut csv::Reader<R>,
    convert: fn(&GroupCoefficientColumns) -> Result<T, NsvbError>,
) -> Result<Vec<GroupCoefficientRow<T>>, NsvbError> {
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: GroupCoefficientColumns = result?;
        rows.push(GroupCoefficientRow {
            group_id: row.group_id,
            coefficients: convert(&row)?,
        });
    }
    Ok(rows)
}

/// Read a species/division-keyed coefficient table. Planted-stand rows
/// (`STDORGCD` other than 0) are skipped.
pub fn read_species_coefficients(
    path: impl AsRef<Path>,
) -> Result<Vec<SpeciesCoefficientRow>, NsvbError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_species_rows(&mut rdr, SpeciesCoefficientColumns::coefficients)
}

pub fn read_species_coefficients_from_bytes(
    data: &[u8],
) -> Result<Vec<SpeciesCoefficientRow>, NsvbError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_species_rows(&mut rdr, SpeciesCoefficientColumns::coefficients)
}

/// Read a taxonomic-group-keyed coefficient table.
pub fn read_group_coefficients(
    path: impl AsRef<Path>,
) -> Result<Vec<GroupCoefficientRow>, NsvbError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_group_rows(&mut rdr, GroupCoefficientColumns::coefficients)
}

pub fn read_group_coefficients_from_bytes(
    data: &[u8],
) -> Result<Vec<GroupCoefficientRow>, NsvbError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_group_rows(&mut rdr, GroupCoefficientColumns::coefficients)
}

/// Read a species-keyed stem-profile or height-diameter table.
pub fn read_species_profiles(
    path: impl AsRef<Path>,
) -> Result<Vec<SpeciesCoefficientRow<ProfileRow>>, NsvbError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_species_rows(&mut rdr, SpeciesCoefficientColumns::profile)
}

pub fn read_species_profiles_from_bytes(
    data: &[u8],
) -> Result<Vec<SpeciesCoefficientRow<ProfileRow>>, NsvbError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_species_rows(&mut rdr, SpeciesCoefficientColumns::profile)
}

/// Read a group-keyed stem-profile or height-diameter table.
pub fn read_group_profiles(
    path: impl AsRef<Path>,
) -> Result<Vec<GroupCoefficientRow<ProfileRow>>, NsvbError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_group_rows(&mut rdr, GroupCoefficientColumns::profile)
}

pub fn read_group_profiles_from_bytes(
    data: &[u8],
) -> Result<Vec<GroupCoefficientRow<ProfileRow>>, NsvbError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_group_rows(&mut rdr, GroupCoefficientColumns::profile)
}

/// Observation CSV row. Blank decay class means live.
#[derive(Debug, Deserialize)]
struct ObservationRow {
    #[serde(deserialize_with = "de_code")]
    spcd: u32,
    dia: f64,
    ht: f64,
    #[serde(default)]
    division: Option<String>,
    #[serde(default)]
    cull: Option<f64>,
    #[serde(default)]
    decay_class: Option<u8>,
    #[serde(default)]
    actual_ht: Option<f64>,
    #[serde(default)]
    crown_ratio: Option<f64>,
}

fn parse_observations<R: Read>(
    rdr: &mut csv::Reader<R>,
) -> Result<Vec<TreeObservation>, NsvbError> {
    let mut trees = Vec::new();
    for result in rdr.deserialize() {
        let row: ObservationRow = result?;
        let tree = TreeObservation {
            species_id: row.spcd,
            dbh: row.dia,
            height: row.ht,
            division: normalize_division(row.division),
            cull_percent: row.cull.unwrap_or(0.0),
            decay_class: row.decay_class,
            actual_height: row.actual_ht,
            crown_ratio: row.crown_ratio,
        };
        tree.validate()?;
        trees.push(tree);
    }
    Ok(trees)
}

/// Read tree observations from a CSV file.
pub fn read_observations_csv(path: impl AsRef<Path>) -> Result<Vec<TreeObservation>, NsvbError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_observations(&mut rdr)
}

pub fn read_observations_csv_from_bytes(data: &[u8]) -> Result<Vec<TreeObservation>, NsvbError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_observations(&mut rdr)
}

/// One output row: the observation, its estimates, or the reason it failed.
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    spcd: u32,
    dia: f64,
    ht: f64,
    division: &'a str,
    stem_wood_volume: Option<f64>,
    bark_volume: Option<f64>,
    total_volume: Option<f64>,
    stem_wood_weight: Option<f64>,
    bark_weight: Option<f64>,
    branch_weight: Option<f64>,
    total_biomass: Option<f64>,
    foliage_weight: Option<f64>,
    adjusted_stem_wood_weight: Option<f64>,
    adjusted_bark_weight: Option<f64>,
    adjusted_branch_weight: Option<f64>,
    adjusted_foliage_weight: Option<f64>,
    adjusted_total_biomass: Option<f64>,
    carbon: Option<f64>,
    error: Option<String>,
}

impl<'a> ResultRow<'a> {
    fn new(tree: &'a TreeObservation, result: &Result<ComponentResults, NsvbError>) -> Self {
        let ok = result.as_ref().ok();
        let pick = |f: fn(&ComponentResults) -> f64| ok.map(f);
        Self {
            spcd: tree.species_id,
            dia: tree.dbh,
            ht: tree.height,
            division: &tree.division,
            stem_wood_volume: pick(|r| r.stem_wood_volume),
            bark_volume: pick(|r| r.bark_volume),
            total_volume: pick(|r| r.total_volume),
            stem_wood_weight: pick(|r| r.stem_wood_weight),
            bark_weight: pick(|r| r.bark_weight),
            branch_weight: pick(|r| r.branch_weight),
            total_biomass: pick(|r| r.total_biomass),
            foliage_weight: pick(|r| r.foliage_weight),
            adjusted_stem_wood_weight: pick(|r| r.adjusted.stem_wood_weight),
            adjusted_bark_weight: pick(|r| r.adjusted.bark_weight),
            adjusted_branch_weight: pick(|r| r.adjusted.branch_weight),
            adjusted_foliage_weight: pick(|r| r.adjusted.foliage_weight),
            adjusted_total_biomass: pick(|r| r.adjusted.total_biomass),
            carbon: pick(|r| r.carbon),
            error: result.as_ref().err().map(ToString::to_string),
        }
    }
}

/// Write per-tree results to a CSV file, one row per observation in input order.
pub fn write_results_csv(
    trees: &[TreeObservation],
    results: &[Result<ComponentResults, NsvbError>],
    path: impl AsRef<Path>,
) -> Result<(), NsvbError> {
    if trees.len() != results.len() {
        return Err(NsvbError::ValidationError(format!(
            "{} observations but {} results",
            trees.len(),
            results.len()
        )));
    }
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for (tree, result) in trees.iter().zip(results) {
        wtr.serialize(ResultRow::new(tree, result))?;
    }
    wtr.flush()?;
    Ok(())
}
