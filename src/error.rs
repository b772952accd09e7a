use thiserror::Error;

use crate::models::{Component, ProfileModel};

/// Errors that can occur while building the estimator or estimating a tree.
#[derive(Error, Debug)]
pub enum NsvbError {
    #[error("Unknown species code: {0}")]
    UnknownSpecies(u32),

    #[error("Malformed coefficient row ({table}, {key}): {reason}")]
    MalformedCoefficientRow {
        table: Component,
        key: String,
        reason: String,
    },

    #[error("No coefficients for species {species_id} in the {component} table")]
    NoCoefficients { component: Component, species_id: u32 },

    #[error("Malformed profile row ({table}, {key}): {reason}")]
    MalformedProfileRow {
        table: ProfileModel,
        key: String,
        reason: String,
    },

    #[error("No {table} coefficients for species {species_id}")]
    NoProfileCoefficients { table: ProfileModel, species_id: u32 },

    #[error("Domain error: {0}")]
    DomainError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_species_display() {
        let err = NsvbError::UnknownSpecies(9999);
        assert_eq!(err.to_string(), "Unknown species code: 9999");
    }

    #[test]
    fn test_malformed_row_display() {
        let err = NsvbError::MalformedCoefficientRow {
            table: Component::StemWoodVolume,
            key: "202/240".to_string(),
            reason: "model 2 requires b1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("stem wood volume"));
        assert!(msg.contains("202/240"));
        assert!(msg.contains("requires b1"));
    }

    #[test]
    fn test_no_coefficients_display() {
        let err = NsvbError::NoCoefficients {
            component: Component::FoliageWeight,
            species_id: 631,
        };
        assert_eq!(
            err.to_string(),
            "No coefficients for species 631 in the foliage weight table"
        );
    }

    #[test]
    fn test_profile_errors_display() {
        let err = NsvbError::NoProfileCoefficients {
            table: ProfileModel::WoodVolumeRatio,
            species_id: 802,
        };
        assert_eq!(
            err.to_string(),
            "No inside-bark volume ratio coefficients for species 802"
        );
        let err = NsvbError::MalformedProfileRow {
            table: ProfileModel::HeightDiameter,
            key: "group 9".to_string(),
            reason: "model 11 requires ols_b".to_string(),
        };
        assert!(err.to_string().contains("height-diameter"));
    }

    #[test]
    fn test_domain_error_display() {
        let err = NsvbError::DomainError("negative diameter".to_string());
        assert_eq!(err.to_string(), "Domain error: negative diameter");
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: NsvbError = io_err.into();
        assert!(matches!(err, NsvbError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_from_conversion() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("not valid json{{{");
        let err: NsvbError = result.unwrap_err().into();
        assert!(matches!(err, NsvbError::Json(_)));
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_toml_error_from_conversion() {
        let result: Result<toml::Table, _> = toml::from_str("= broken");
        let err: NsvbError = result.unwrap_err().into();
        assert!(matches!(err, NsvbError::Toml(_)));
    }

    #[test]
    fn test_error_is_debug() {
        let err = NsvbError::ParseError("test".to_string());
        assert!(format!("{:?}", err).contains("ParseError"));
    }
}
