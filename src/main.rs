use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use nsvb_estimator::{
    io,
    visualization::{
        print_batch_summary, print_biomass_breakdown, print_measurements, print_resolutions,
        print_results, Measurement,
    },
    Component, EngineConfig, Estimator, TreeObservation,
};

#[derive(Parser)]
#[command(
    name = "nsvb",
    about = "Tree volume and biomass estimation with hierarchical coefficient lookup",
    version,
    author
)]
struct Cli {
    /// Directory holding the reference species and coefficient tables
    #[arg(short, long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// TOML configuration file (thresholds, data file names)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate volume and biomass for one tree
    Estimate {
        /// FIA species code
        #[arg(short, long)]
        species: u32,

        /// Diameter at breast height (inches)
        #[arg(long)]
        dbh: f64,

        /// Total height (feet)
        #[arg(long)]
        height: f64,

        /// Ecological division code
        #[arg(long, default_value = "")]
        division: String,

        /// Rotten and missing cull (percent)
        #[arg(long, default_value = "0.0")]
        cull: f64,

        /// Decay class of a standing dead tree (1-5)
        #[arg(long)]
        decay_class: Option<u8>,

        /// Actual height of a broken-top tree (feet)
        #[arg(long)]
        actual_height: Option<f64>,

        /// Observed crown ratio (0.0-1.0)
        #[arg(long)]
        crown_ratio: Option<f64>,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate every tree in a CSV or JSON file
    Batch {
        /// Input observations (CSV or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (CSV or JSON)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show which coefficients apply to a species and division
    Resolve {
        /// FIA species code
        #[arg(short, long)]
        species: u32,

        /// Ecological division code
        #[arg(long, default_value = "")]
        division: String,

        /// Restrict to one component (e.g. "stem wood volume", "bark-weight")
        #[arg(long)]
        component: Option<Component>,
    },

    /// Stem profile queries: diameter at a height, height to a top diameter
    Profile {
        /// FIA species code
        #[arg(short, long)]
        species: u32,

        /// Diameter at breast height (inches)
        #[arg(long)]
        dbh: f64,

        /// Total height (feet)
        #[arg(long)]
        height: f64,

        /// Ecological division code
        #[arg(long, default_value = "")]
        division: String,

        /// Height along the stem (feet); repeatable
        #[arg(long = "at-height")]
        at_height: Vec<f64>,

        /// Top diameter to locate on the stem (inches)
        #[arg(long)]
        top_diameter: Option<f64>,
    },

    /// Height from diameter, optionally under a light resource index
    Height {
        /// FIA species code
        #[arg(short, long)]
        species: u32,

        /// Diameter at breast height (inches)
        #[arg(long)]
        dbh: f64,

        /// Ecological division code
        #[arg(long, default_value = "")]
        division: String,

        /// Light resource index (0.0-1.0)
        #[arg(long)]
        lri: Option<f64>,

        /// Observed height to convert into a light resource index (feet)
        #[arg(long)]
        target_height: Option<f64>,
    },

    /// Breast-height diameter from a stump measurement
    Stump {
        /// FIA species code
        #[arg(short, long)]
        species: u32,

        /// Stump diameter (inches)
        #[arg(long)]
        stump_diameter: f64,

        /// Height of the stump measurement (feet)
        #[arg(long, default_value = "1.0")]
        stump_height: f64,

        /// Ecological division code
        #[arg(long, default_value = "")]
        division: String,
    },
}

fn load_estimator(data_dir: &Path, config: Option<&Path>) -> Result<Estimator> {
    let config = match config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if !data_dir.is_dir() {
        anyhow::bail!("Data directory not found: {}", data_dir.display());
    }
    Ok(io::load_engine(data_dir, &config)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let estimator = load_estimator(&cli.data_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::Estimate {
            species,
            dbh,
            height,
            division,
            cull,
            decay_class,
            actual_height,
            crown_ratio,
            json,
        } => {
            let mut tree = TreeObservation::new(species, dbh, height, division).with_cull(cull);
            if let Some(code) = decay_class {
                tree = tree.with_decay_class(code);
            }
            if let Some(ah) = actual_height {
                tree = tree.with_actual_height(ah);
            }
            if let Some(cr) = crown_ratio {
                tree = tree.with_crown_ratio(cr);
            }
            tree.validate()?;

            let results = estimator.estimate(&tree)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&tree, &results);
                println!();
                print_biomass_breakdown(&results);
            }
        }

        Commands::Batch { input, output } => {
            println!(
                "\n{}",
                format!("Batch Estimation: {}", input.display()).bold().cyan()
            );

            let trees = io::read_observations(&input)?;
            println!("  Loaded {} trees", trees.len());

            let results = estimator.estimate_batch(&trees);
            io::write_results(&trees, &results, &output)?;
            print_batch_summary(&results);

            println!(
                "\n{} Wrote {}",
                "Success:".green().bold(),
                output.display()
            );
        }

        Commands::Resolve {
            species,
            division,
            component,
        } => {
            estimator.reference().lookup(species)?;
            let components = match component {
                Some(c) => vec![c],
                None => Component::ALL.to_vec(),
            };
            let resolutions: Vec<_> = components
                .into_iter()
                .map(|c| (c, estimator.resolve(c, species, &division)))
                .collect();
            print_resolutions(species, &division, &resolutions);
            if let Some(gravity) = estimator.bark_specific_gravity(species)? {
                println!("  Bark specific gravity: {gravity}");
            }
            println!();
        }

        Commands::Profile {
            species,
            dbh,
            height,
            division,
            at_height,
            top_diameter,
        } => {
            let tree = TreeObservation::new(species, dbh, height, division);
            tree.validate()?;
            let mut measurements = vec![Measurement::new(
                "Total stem volume",
                estimator.stem_total_volume(&tree),
                "cu ft",
            )];
            for hi in at_height {
                measurements.push(Measurement::new(
                    format!("Diameter at {hi} ft"),
                    estimator.diameter_at_height(&tree, hi),
                    "in",
                ));
                let ratio = hi / tree.height;
                measurements.push(Measurement::new(
                    format!("Volume below {hi} ft, outside bark"),
                    estimator.total_volume_ratio(species, &tree.division, ratio),
                    "share",
                ));
                measurements.push(Measurement::new(
                    format!("Volume below {hi} ft, inside bark"),
                    estimator.wood_volume_ratio(species, &tree.division, ratio),
                    "share",
                ));
            }
            if let Some(di) = top_diameter {
                measurements.push(Measurement::new(
                    format!("Height to {di}\" top"),
                    estimator.height_at_diameter(&tree, di),
                    "ft",
                ));
            }
            let subtitle = format!("Species {species} | DBH {dbh:.1}\" | Height {height:.1} ft");
            print_measurements("Stem Profile", &subtitle, &measurements);
            println!();
        }

        Commands::Height {
            species,
            dbh,
            division,
            lri,
            target_height,
        } => {
            estimator.reference().lookup(species)?;
            let mut measurements = vec![Measurement::new(
                "Height",
                estimator.height(species, &division, dbh),
                "ft",
            )];
            if let Some(lri) = lri {
                measurements.push(Measurement::new(
                    format!("Height at LRI {lri}"),
                    estimator.height_lri(species, &division, dbh, lri),
                    "ft",
                ));
            }
            if let Some(target) = target_height {
                measurements.push(Measurement::new(
                    format!("LRI for {target} ft"),
                    estimator.find_lri(species, &division, dbh, target),
                    "index",
                ));
            }
            let subtitle = format!("Species {species} | DBH {dbh:.1}\"");
            print_measurements("Height-Diameter", &subtitle, &measurements);
            println!();
        }

        Commands::Stump {
            species,
            stump_diameter,
            stump_height,
            division,
        } => {
            if !(stump_diameter > 0.0 && stump_height > 0.0) {
                anyhow::bail!("Stump diameter and height must be positive");
            }
            let dbh =
                estimator.dbh_from_stump_diameter(species, &division, stump_diameter, stump_height)?;
            let subtitle = format!(
                "Species {species} | Stump {stump_diameter:.1}\" at {stump_height:.1} ft"
            );
            print_measurements(
                "Stump Reconstruction",
                &subtitle,
                &[Measurement::new("Diameter at breast height", Ok(dbh), "in")],
            );
            println!();
        }
    }

    Ok(())
}
