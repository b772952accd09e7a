use serde::{Deserialize, Serialize};

use super::species::WoodClass;
use crate::error::NsvbError;

/// Standing dead tree decay class (1 = least decayed, 5 = most).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DecayClass {
    One,
    Two,
    Three,
    Four,
    Five,
}

/// Structural and density proportions retained by a dead tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayProperties {
    /// Wood density relative to a live tree
    pub wood_density: f64,
    /// Proportion of bark remaining
    pub bark_remaining: f64,
    /// Proportion of branches remaining
    pub branch_remaining: f64,
    /// Carbon content in percent of dry weight
    pub carbon_percent: f64,
}

const fn props(wood_density: f64, bark: f64, branch: f64, carbon: f64) -> DecayProperties {
    DecayProperties {
        wood_density,
        bark_remaining: bark,
        branch_remaining: branch,
        carbon_percent: carbon,
    }
}

// Harmon et al. (2011)
const SOFTWOOD: [DecayProperties; 5] = [
    props(0.97, 1.0, 1.0, 50.1),
    props(1.0, 0.8, 0.5, 50.4),
    props(0.92, 0.5, 0.1, 50.6),
    props(0.55, 0.2, 0.0, 52.0),
    props(0.55, 0.0, 0.0, 52.7),
];

const HARDWOOD: [DecayProperties; 5] = [
    props(0.99, 1.0, 1.0, 47.0),
    props(0.8, 0.8, 0.5, 47.3),
    props(0.54, 0.5, 0.1, 48.1),
    props(0.43, 0.2, 0.0, 48.0),
    props(0.43, 0.0, 0.0, 47.2),
];

impl DecayClass {
    /// Cull volume is treated as wood of this decay class.
    pub const CULL: DecayClass = DecayClass::Three;

    pub fn code(self) -> u8 {
        match self {
            DecayClass::One => 1,
            DecayClass::Two => 2,
            DecayClass::Three => 3,
            DecayClass::Four => 4,
            DecayClass::Five => 5,
        }
    }

    /// Interpret a field decay code; 0 marks a live tree.
    pub fn from_code(code: u8) -> Result<Option<DecayClass>, NsvbError> {
        match code {
            0 => Ok(None),
            _ => DecayClass::try_from(code).map(Some),
        }
    }

    pub fn properties(self, wood_class: WoodClass) -> DecayProperties {
        let table = match wood_class {
            WoodClass::Softwood => &SOFTWOOD,
            WoodClass::Hardwood => &HARDWOOD,
        };
        table[usize::from(self.code() - 1)]
    }
}

impl TryFrom<u8> for DecayClass {
    type Error = NsvbError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(DecayClass::One),
            2 => Ok(DecayClass::Two),
            3 => Ok(DecayClass::Three),
            4 => Ok(DecayClass::Four),
            5 => Ok(DecayClass::Five),
            _ => Err(NsvbError::ValidationError(format!(
                "decay class must be in 1..=5, got {code}"
            ))),
        }
    }
}

impl From<DecayClass> for u8 {
    fn from(class: DecayClass) -> u8 {
        class.code()
    }
}

impl std::fmt::Display for DecayClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DC{}", self.code())
    }
}
