pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod models;
pub mod visualization;

pub use config::EngineConfig;
pub use engine::{ComponentResults, Estimator, Resolution, ResolutionTier};
pub use error::NsvbError;
pub use io::load_engine;
pub use models::{Component, DecayClass, ReferenceIndex, SpeciesRecord, TreeObservation, WoodClass};
