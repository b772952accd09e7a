mod tables;
mod charts;

pub use tables::{
    format_results, print_results,
    format_resolutions, print_resolutions,
    format_batch_summary, print_batch_summary,
    format_measurements, print_measurements, Measurement,
};
pub use charts::{format_biomass_breakdown, print_biomass_breakdown};
