mod csv_io;
mod json_io;

use std::collections::HashMap;
use std::path::Path;

use crate::config::EngineConfig;
use crate::engine::{ComponentResults, Estimator};
use crate::error::NsvbError;
use crate::models::{
    Component, ProfileModel, RawTable, RawTables, ReferenceIndex, TreeObservation,
    DEFAULT_CARBON_FRACTION,
};

pub use csv_io::{
    read_carbon_fractions, read_carbon_fractions_from_bytes, read_group_coefficients,
    read_group_coefficients_from_bytes, read_group_profiles, read_group_profiles_from_bytes,
    read_observations_csv, read_observations_csv_from_bytes, read_reference_species,
    read_reference_species_from_bytes, read_species_coefficients,
    read_species_coefficients_from_bytes, read_species_profiles,
    read_species_profiles_from_bytes, write_results_csv,
};
pub use json_io::{read_observations_json, read_observations_json_from_bytes, write_results_json};

/// Read a table that may be absent from the data directory; a missing file
/// reads as empty.
fn read_optional<T: Default>(
    path: &Path,
    read: impl FnOnce(&Path) -> Result<T, NsvbError>,
) -> Result<T, NsvbError> {
    if path.exists() {
        read(path)
    } else {
        tracing::warn!(path = %path.display(), "optional table not found; treating as empty");
        Ok(T::default())
    }
}

/// Read the reference species table and attach live carbon fractions.
/// Species missing from the carbon table get [`DEFAULT_CARBON_FRACTION`].
pub fn load_reference(
    data_dir: impl AsRef<Path>,
    config: &EngineConfig,
) -> Result<ReferenceIndex, NsvbError> {
    let data_dir = data_dir.as_ref();
    let mut records = read_reference_species(data_dir.join(&config.files.reference_species))?;

    let carbon_path = data_dir.join(&config.files.carbon_fractions);
    let fractions: HashMap<u32, f64> = read_optional(&carbon_path, |p| read_carbon_fractions(p))?
        .into_iter()
        .collect();
    let mut defaulted = 0usize;
    for record in &mut records {
        record.carbon_fraction = match fractions.get(&record.species_id) {
            Some(&fraction) => fraction,
            None => {
                defaulted += 1;
                DEFAULT_CARBON_FRACTION
            }
        };
    }
    tracing::debug!(defaulted, "attached live carbon fractions");

    Ok(ReferenceIndex::new(records))
}

/// Read every coefficient table named in the configuration.
pub fn load_raw_tables(
    data_dir: impl AsRef<Path>,
    config: &EngineConfig,
) -> Result<RawTables, NsvbError> {
    let data_dir = data_dir.as_ref();
    let mut raw = RawTables::default();
    for component in Component::ALL {
        let files = config.files.component(component);
        let species = data_dir.join(&files.species);
        let group = data_dir.join(&files.group);
        raw[component] = if component.is_optional() {
            RawTable {
                species_rows: read_optional(&species, |p| read_species_coefficients(p))?,
                group_rows: read_optional(&group, |p| read_group_coefficients(p))?,
            }
        } else {
            RawTable {
                species_rows: read_species_coefficients(&species)?,
                group_rows: read_group_coefficients(&group)?,
            }
        };
        tracing::debug!(
            %component,
            species_rows = raw[component].species_rows.len(),
            group_rows = raw[component].group_rows.len(),
            "read coefficient files"
        );
    }
    for model in ProfileModel::ALL {
        let files = config.files.profile(model);
        raw.profiles[model] = RawTable {
            species_rows: read_optional(&data_dir.join(&files.species), |p| {
                read_species_profiles(p)
            })?,
            group_rows: read_optional(&data_dir.join(&files.group), |p| read_group_profiles(p))?,
        };
        tracing::debug!(
            table = %model,
            species_rows = raw.profiles[model].species_rows.len(),
            group_rows = raw.profiles[model].group_rows.len(),
            "read profile files"
        );
    }
    Ok(raw)
}

/// Read all reference data from `data_dir` and build the estimator.
pub fn load_engine(
    data_dir: impl AsRef<Path>,
    config: &EngineConfig,
) -> Result<Estimator, NsvbError> {
    let data_dir = data_dir.as_ref();
    tracing::info!(data_dir = %data_dir.display(), "loading reference data");
    let reference = load_reference(data_dir, config)?;
    let raw = load_raw_tables(data_dir, config)?;
    Estimator::build(reference, raw, config.thresholds)
}

/// Input format for tree observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationFormat {
    Csv,
    Json,
}

impl ObservationFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, NsvbError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            other => Err(NsvbError::ParseError(format!(
                "Unsupported file format: {}",
                other.unwrap_or("(none)")
            ))),
        }
    }
}

/// Read observations in the format implied by the file extension.
pub fn read_observations(path: impl AsRef<Path>) -> Result<Vec<TreeObservation>, NsvbError> {
    let path = path.as_ref();
    match ObservationFormat::from_path(path)? {
        ObservationFormat::Csv => read_observations_csv(path),
        ObservationFormat::Json => read_observations_json(path),
    }
}

/// Write results in the format implied by the file extension.
pub fn write_results(
    trees: &[TreeObservation],
    results: &[Result<ComponentResults, NsvbError>],
    path: impl AsRef<Path>,
) -> Result<(), NsvbError> {
    let path = path.as_ref();
    match ObservationFormat::from_path(path)? {
        ObservationFormat::Csv => write_results_csv(trees, results, path),
        ObservationFormat::Json => write_results_json(trees, results, path, true),
    }
}
