use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::coefficients::RawTable;
use crate::error::NsvbError;

/// Stem-profile and height tables, resolved like the component tables but
/// holding shape parameters instead of a diameter-height regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileModel {
    /// Cumulative outside-bark volume ratio
    TotalVolumeRatio,
    /// Cumulative inside-bark volume ratio
    WoodVolumeRatio,
    /// Height from diameter, with light-resource quantiles
    HeightDiameter,
}

impl ProfileModel {
    pub const ALL: [ProfileModel; 3] = [
        ProfileModel::TotalVolumeRatio,
        ProfileModel::WoodVolumeRatio,
        ProfileModel::HeightDiameter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProfileModel::TotalVolumeRatio => "outside-bark volume ratio",
            ProfileModel::WoodVolumeRatio => "inside-bark volume ratio",
            ProfileModel::HeightDiameter => "height-diameter",
        }
    }
}

impl std::fmt::Display for ProfileModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A profile coefficient set that can be built from a raw row.
pub trait ProfileCoefficients: Copy + std::fmt::Debug + PartialEq {
    /// Model number carried in the source table's `model` column.
    const MODEL: u8;

    fn from_row(row: &ProfileRow) -> Result<Self, String>;
}

/// Cumulative volume ratio `(1 − (1 − h/H)^alpha)^beta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRatio {
    pub alpha: f64,
    pub beta: f64,
}

impl ProfileCoefficients for VolumeRatio {
    const MODEL: u8 = 6;

    fn from_row(row: &ProfileRow) -> Result<Self, String> {
        row.check_shape(Self::MODEL, &["alpha", "beta"])?;
        Ok(Self {
            alpha: need(row.alpha, "alpha")?,
            beta: need(row.beta, "beta")?,
        })
    }
}

/// Height-diameter curves: 5th, 50th and 95th percentile fits plus the
/// least-squares fit, each `a · D^b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightDiameter {
    pub p05_a: f64,
    pub p05_b: f64,
    pub p50_a: f64,
    pub p50_b: f64,
    pub p95_a: f64,
    pub p95_b: f64,
    pub ols_a: f64,
    pub ols_b: f64,
}

impl ProfileCoefficients for HeightDiameter {
    const MODEL: u8 = 11;

    fn from_row(row: &ProfileRow) -> Result<Self, String> {
        row.check_shape(
            Self::MODEL,
            &["p05_a", "p05_b", "p50_a", "p50_b", "p95_a", "p95_b", "ols_a", "ols_b"],
        )?;
        Ok(Self {
            p05_a: need(row.p05_a, "p05_a")?,
            p05_b: need(row.p05_b, "p05_b")?,
            p50_a: need(row.p50_a, "p50_a")?,
            p50_b: need(row.p50_b, "p50_b")?,
            p95_a: need(row.p95_a, "p95_a")?,
            p95_b: need(row.p95_b, "p95_b")?,
            ols_a: need(row.ols_a, "ols_a")?,
            ols_b: need(row.ols_b, "ols_b")?,
        })
    }
}

/// Raw profile row as supplied by a data loader. Absent cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub model: u8,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub p05_a: Option<f64>,
    pub p05_b: Option<f64>,
    pub p50_a: Option<f64>,
    pub p50_b: Option<f64>,
    pub p95_a: Option<f64>,
    pub p95_b: Option<f64>,
    pub ols_a: Option<f64>,
    pub ols_b: Option<f64>,
}

impl ProfileRow {
    /// Model 6 row.
    pub fn volume_ratio(alpha: f64, beta: f64) -> Self {
        Self {
            model: VolumeRatio::MODEL,
            alpha: Some(alpha),
            beta: Some(beta),
            ..Self::default()
        }
    }

    /// Model 11 row from `(a, b)` pairs for p05, p50, p95 and ols.
    pub fn height_diameter(p05: (f64, f64), p50: (f64, f64), p95: (f64, f64), ols: (f64, f64)) -> Self {
        Self {
            model: HeightDiameter::MODEL,
            p05_a: Some(p05.0),
            p05_b: Some(p05.1),
            p50_a: Some(p50.0),
            p50_b: Some(p50.1),
            p95_a: Some(p95.0),
            p95_b: Some(p95.1),
            ols_a: Some(ols.0),
            ols_b: Some(ols.1),
            ..Self::default()
        }
    }

    fn named(&self) -> [(&'static str, Option<f64>); 10] {
        [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("p05_a", self.p05_a),
            ("p05_b", self.p05_b),
            ("p50_a", self.p50_a),
            ("p50_b", self.p50_b),
            ("p95_a", self.p95_a),
            ("p95_b", self.p95_b),
            ("ols_a", self.ols_a),
            ("ols_b", self.ols_b),
        ]
    }

    fn check_shape(&self, model: u8, required: &[&str]) -> Result<(), String> {
        if self.model != model {
            return Err(format!("expected model {model}, got model {}", self.model));
        }
        let named = self.named();
        let missing: Vec<&str> = named
            .iter()
            .filter(|(name, value)| value.is_none() && required.contains(name))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(format!("model {model} requires {}", missing.join(", ")));
        }
        let extra: Vec<&str> = named
            .iter()
            .filter(|(name, value)| value.is_some() && !required.contains(name))
            .map(|(name, _)| *name)
            .collect();
        if !extra.is_empty() {
            return Err(format!("model {model} does not use {}", extra.join(", ")));
        }
        if let Some((name, value)) = named
            .into_iter()
            .find(|(_, v)| v.is_some_and(|v| !v.is_finite()))
        {
            return Err(format!("coefficient {name} is not finite: {value:?}"));
        }
        Ok(())
    }
}

fn need(value: Option<f64>, name: &str) -> Result<f64, String> {
    value.ok_or_else(|| format!("missing coefficient {name}"))
}

/// Raw sources for the three profile tables, indexable by [`ProfileModel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProfileTables {
    pub total_volume_ratio: RawTable<ProfileRow>,
    pub wood_volume_ratio: RawTable<ProfileRow>,
    pub height_diameter: RawTable<ProfileRow>,
}

impl Index<ProfileModel> for RawProfileTables {
    type Output = RawTable<ProfileRow>;

    fn index(&self, model: ProfileModel) -> &RawTable<ProfileRow> {
        match model {
            ProfileModel::TotalVolumeRatio => &self.total_volume_ratio,
            ProfileModel::WoodVolumeRatio => &self.wood_volume_ratio,
            ProfileModel::HeightDiameter => &self.height_diameter,
        }
    }
}

impl IndexMut<ProfileModel> for RawProfileTables {
    fn index_mut(&mut self, model: ProfileModel) -> &mut RawTable<ProfileRow> {
        match model {
            ProfileModel::TotalVolumeRatio => &mut self.total_volume_ratio,
            ProfileModel::WoodVolumeRatio => &mut self.wood_volume_ratio,
            ProfileModel::HeightDiameter => &mut self.height_diameter,
        }
    }
}

impl std::str::FromStr for ProfileModel {
    type Err = NsvbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-").replace(' ', "-");
        ProfileModel::ALL
            .into_iter()
            .find(|m| m.label().replace(' ', "-") == normalized)
            .ok_or_else(|| NsvbError::ParseError(format!("Unknown profile table: '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_ratio_from_row() {
        let ratio = VolumeRatio::from_row(&ProfileRow::volume_ratio(1.8, 0.9)).unwrap();
        assert_eq!(ratio, VolumeRatio { alpha: 1.8, beta: 0.9 });
    }

    #[test]
    fn test_volume_ratio_wrong_model() {
        let row = ProfileRow {
            model: 1,
            ..ProfileRow::volume_ratio(1.8, 0.9)
        };
        let err = VolumeRatio::from_row(&row).unwrap_err();
        assert!(err.contains("expected model 6"), "{err}");
    }

    #[test]
    fn test_volume_ratio_missing_beta() {
        let row = ProfileRow {
            beta: None,
            ..ProfileRow::volume_ratio(1.8, 0.9)
        };
        let err = VolumeRatio::from_row(&row).unwrap_err();
        assert!(err.contains("requires beta"), "{err}");
    }

    #[test]
    fn test_height_diameter_rejects_ratio_cells() {
        let row = ProfileRow {
            alpha: Some(1.0),
            ..ProfileRow::height_diameter((1.0, 0.5), (2.0, 0.5), (3.0, 0.5), (2.0, 0.5))
        };
        let err = HeightDiameter::from_row(&row).unwrap_err();
        assert!(err.contains("does not use alpha"), "{err}");
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = VolumeRatio::from_row(&ProfileRow::volume_ratio(f64::INFINITY, 0.9)).unwrap_err();
        assert!(err.contains("not finite"), "{err}");
    }

    #[test]
    fn test_profile_model_parse() {
        assert_eq!(
            "height_diameter".parse::<ProfileModel>().unwrap(),
            ProfileModel::HeightDiameter
        );
        assert_eq!(
            "outside-bark volume ratio".parse::<ProfileModel>().unwrap(),
            ProfileModel::TotalVolumeRatio
        );
        assert!("taper".parse::<ProfileModel>().is_err());
    }

    #[test]
    fn test_raw_profile_tables_index() {
        let mut tables = RawProfileTables::default();
        tables[ProfileModel::WoodVolumeRatio] =
            RawTable::default().group_row(2, ProfileRow::volume_ratio(1.5, 1.0));
        assert_eq!(tables.wood_volume_ratio.group_rows.len(), 1);
        assert!(tables[ProfileModel::TotalVolumeRatio].group_rows.is_empty());
    }
}
