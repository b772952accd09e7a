use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::engine::{ComponentResults, Resolution};
use crate::error::NsvbError;
use crate::models::{Component, ModelForm, TreeObservation};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn describe_tree(tree: &TreeObservation) -> String {
    let division = if tree.division.is_empty() {
        "any division"
    } else {
        tree.division.as_str()
    };
    format!(
        "Species {} | DBH {:.1}\" | Height {:.1} ft | {}",
        tree.species_id, tree.dbh, tree.height, division
    )
}

/// Format the estimates for one tree as a string.
pub fn format_results(tree: &TreeObservation, results: &ComponentResults) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Tree Estimates".bold().green()));
    output.push_str(&format!("{}\n", describe_tree(tree).dimmed()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let mut table = new_table(vec!["Component", "Gross", "Adjusted", "Unit"]);
    let rows: [(&str, f64, Option<f64>, &str); 8] = [
        ("Stem wood volume", results.stem_wood_volume, None, "cu ft"),
        ("Bark volume", results.bark_volume, None, "cu ft"),
        ("Total stem volume", results.total_volume, None, "cu ft"),
        (
            "Stem wood weight",
            results.stem_wood_weight,
            Some(results.adjusted.stem_wood_weight),
            "lb",
        ),
        (
            "Bark weight",
            results.bark_weight,
            Some(results.adjusted.bark_weight),
            "lb",
        ),
        (
            "Branch weight",
            results.branch_weight,
            Some(results.adjusted.branch_weight),
            "lb",
        ),
        (
            "Aboveground biomass",
            results.total_biomass,
            Some(results.adjusted.total_biomass),
            "lb",
        ),
        (
            "Foliage weight",
            results.foliage_weight,
            Some(results.adjusted.foliage_weight),
            "lb",
        ),
    ];
    for (name, gross, adjusted, unit) in rows {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{gross:.3}")),
            Cell::new(adjusted.map(|v| format!("{v:.3}")).unwrap_or_default()),
            Cell::new(unit),
        ]);
    }
    table.add_row(vec![
        Cell::new("Carbon"),
        Cell::new(""),
        Cell::new(format!("{:.3}", results.carbon)),
        Cell::new("lb"),
    ]);

    output.push_str(&format!("{table}"));
    output
}

/// Print the estimates for one tree.
pub fn print_results(tree: &TreeObservation, results: &ComponentResults) {
    print!("{}", format_results(tree, results));
}

fn form_coefficients(form: &ModelForm) -> String {
    match *form {
        ModelForm::SchumacherHall { a, b, c } => format!("a={a} b={b} c={c}"),
        ModelForm::Segmented { a, b, b1, c, k } => {
            format!("a={a} b={b} b1={b1} c={c} k={k}")
        }
        ModelForm::ContinuouslyVariable { a, a1, b, c, c1 } => {
            format!("a={a} a1={a1} b={b} c={c} c1={c1}")
        }
        ModelForm::ModifiedWiley { a, b, b1, c } => format!("a={a} b={b} b1={b1} c={c}"),
        ModelForm::WoodDensityScaled { a, b, c, wdsg } => {
            format!("a={a} b={b} c={c} wdsg={wdsg}")
        }
    }
}

/// Format per-component coefficient resolutions as a string.
pub fn format_resolutions(
    species_id: u32,
    division: &str,
    resolutions: &[(Component, Result<Resolution, NsvbError>)],
) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Coefficient Resolution".bold().green()));
    output.push_str(&format!(
        "{}\n",
        format!("Species {species_id} | Division '{division}'").dimmed()
    ));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let mut table = new_table(vec!["Component", "Tier", "Model", "Coefficients"]);
    for (component, resolution) in resolutions {
        match resolution {
            Ok(r) => {
                let mut coefficients = form_coefficients(&r.record.form);
                if r.record.constant != 0.0 {
                    coefficients.push_str(&format!(" e={}", r.record.constant));
                }
                table.add_row(vec![
                    Cell::new(component.label()),
                    Cell::new(r.tier.to_string()),
                    Cell::new(r.record.kind().to_string()),
                    Cell::new(coefficients),
                ]);
            }
            Err(e) => {
                table.add_row(vec![
                    Cell::new(component.label()),
                    Cell::new("unresolved"),
                    Cell::new(""),
                    Cell::new(e.to_string()),
                ]);
            }
        }
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print per-component coefficient resolutions.
pub fn print_resolutions(
    species_id: u32,
    division: &str,
    resolutions: &[(Component, Result<Resolution, NsvbError>)],
) {
    print!("{}", format_resolutions(species_id, division, resolutions));
}

/// One derived quantity for [`format_measurements`].
pub struct Measurement {
    pub label: String,
    pub value: Result<f64, NsvbError>,
    pub unit: &'static str,
}

impl Measurement {
    pub fn new(label: impl Into<String>, value: Result<f64, NsvbError>, unit: &'static str) -> Self {
        Self {
            label: label.into(),
            value,
            unit,
        }
    }
}

/// Format stem-profile and height queries as a string. Failed queries show
/// their error in place of a value.
pub fn format_measurements(title: &str, subtitle: &str, measurements: &[Measurement]) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", title.bold().green()));
    output.push_str(&format!("{}\n", subtitle.dimmed()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let mut table = new_table(vec!["Quantity", "Value", "Unit"]);
    for m in measurements {
        let value = match &m.value {
            Ok(v) => format!("{v:.3}"),
            Err(e) => format!("unavailable: {e}"),
        };
        table.add_row(vec![Cell::new(&m.label), Cell::new(value), Cell::new(m.unit)]);
    }
    output.push_str(&format!("{table}"));
    output
}

pub fn print_measurements(title: &str, subtitle: &str, measurements: &[Measurement]) {
    print!("{}", format_measurements(title, subtitle, measurements));
}

/// Format a batch run summary as a string.
pub fn format_batch_summary(results: &[Result<ComponentResults, NsvbError>]) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Batch Summary".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(50)));

    let succeeded: Vec<&ComponentResults> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let failed = results.len() - succeeded.len();
    let sum = |f: fn(&ComponentResults) -> f64| succeeded.iter().map(|r| f(r)).sum::<f64>();

    let mut table = new_table(vec!["Metric", "Value", "Unit"]);
    table.add_row(vec![
        Cell::new("Trees"),
        Cell::new(results.len()),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Estimated"),
        Cell::new(succeeded.len()),
        Cell::new(""),
    ]);
    table.add_row(vec![Cell::new("Failed"), Cell::new(failed), Cell::new("")]);
    table.add_row(vec![
        Cell::new("Total stem volume"),
        Cell::new(format!("{:.1}", sum(|r| r.total_volume))),
        Cell::new("cu ft"),
    ]);
    table.add_row(vec![
        Cell::new("Aboveground biomass"),
        Cell::new(format!("{:.1}", sum(|r| r.adjusted.total_biomass))),
        Cell::new("lb"),
    ]);
    table.add_row(vec![
        Cell::new("Carbon"),
        Cell::new(format!("{:.1}", sum(|r| r.carbon))),
        Cell::new("lb"),
    ]);

    output.push_str(&format!("{table}"));
    if failed > 0 {
        output.push_str(&format!(
            "\n{}\n",
            format!("{failed} tree(s) could not be estimated; see the error column").yellow()
        ));
    }
    output
}

/// Print a batch run summary.
pub fn print_batch_summary(results: &[Result<ComponentResults, NsvbError>]) {
    print!("{}", format_batch_summary(results));
}
