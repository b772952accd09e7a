use colored::Colorize;

use crate::engine::ComponentResults;

/// Format a text bar chart of adjusted aboveground biomass by component.
pub fn format_biomass_breakdown(results: &ComponentResults) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Biomass Breakdown".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let adjusted = &results.adjusted;
    let parts = [
        ("Stem wood", adjusted.stem_wood_weight),
        ("Bark", adjusted.bark_weight),
        ("Branches", adjusted.branch_weight),
        ("Foliage", adjusted.foliage_weight),
    ];
    let total: f64 = parts.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        output.push_str("  No biomass to show.\n");
        return output;
    }

    let max = parts.iter().map(|(_, w)| *w).fold(0.0f64, f64::max);
    let bar_width = 40;

    output.push_str(&format!(
        "  {:<10}  {:>10}  {:>6}  Share\n",
        "Component", "lb", "%"
    ));
    output.push_str(&format!("  {}\n", "-".repeat(70)));

    for (name, weight) in parts {
        let bar_len = ((weight / max) * bar_width as f64).round() as usize;
        let bar = "\u{2588}".repeat(bar_len);
        output.push_str(&format!(
            "  {:<10}  {:>10.1}  {:>5.1}%  {}\n",
            name,
            weight,
            weight / total * 100.0,
            bar.green()
        ));
    }

    output.push('\n');
    output
}

/// Print a text bar chart of adjusted biomass by component.
pub fn print_biomass_breakdown(results: &ComponentResults) {
    print!("{}", format_biomass_breakdown(results));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AdjustedWeights;

    fn results(adjusted: AdjustedWeights) -> ComponentResults {
        ComponentResults {
            stem_wood_volume: 0.0,
            bark_volume: 0.0,
            total_volume: 0.0,
            stem_wood_weight: 0.0,
            bark_weight: 0.0,
            branch_weight: 0.0,
            total_biomass: 0.0,
            foliage_weight: 0.0,
            adjusted,
            carbon: 0.0,
        }
    }

    #[test]
    fn test_breakdown_empty() {
        let output = format_biomass_breakdown(&results(AdjustedWeights {
            stem_wood_weight: 0.0,
            bark_weight: 0.0,
            branch_weight: 0.0,
            foliage_weight: 0.0,
            total_biomass: 0.0,
        }));
        assert!(output.contains("No biomass to show."));
    }

    #[test]
    fn test_breakdown_shares() {
        let output = format_biomass_breakdown(&results(AdjustedWeights {
            stem_wood_weight: 600.0,
            bark_weight: 100.0,
            branch_weight: 200.0,
            foliage_weight: 100.0,
            total_biomass: 900.0,
        }));
        assert!(output.contains("Biomass Breakdown"));
        assert!(output.contains("Stem wood"));
        assert!(output.contains("60.0%"));
        assert!(output.contains("20.0%"));
        assert!(output.contains("\u{2588}"));
    }
}
