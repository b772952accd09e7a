#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = nsvb_estimator::io::read_observations_csv_from_bytes(data);
    let _ = nsvb_estimator::io::read_observations_json_from_bytes(data);
});
