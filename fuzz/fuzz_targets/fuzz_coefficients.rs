#![no_main]

use libfuzzer_sys::fuzz_target;
use nsvb_estimator::models::{RawTable, RawTables, ReferenceIndex, SegmentThresholds, SpeciesRecord, WoodClass};
use nsvb_estimator::Estimator;

fuzz_target!(|data: &[u8]| {
    let Ok(species_rows) = nsvb_estimator::io::read_species_coefficients_from_bytes(data) else {
        return;
    };
    let reference: ReferenceIndex = species_rows
        .iter()
        .map(|row| SpeciesRecord::new(row.species_id, 1, 0.5, WoodClass::Hardwood))
        .collect();
    let mut raw = RawTables::default();
    raw.stem_wood_volume = RawTable {
        species_rows,
        group_rows: Vec::new(),
    };
    // Malformed rows must surface as errors, never panics
    let _ = Estimator::build(reference, raw, SegmentThresholds::default());
});
