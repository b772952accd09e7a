use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::profile::RawProfileTables;
use super::species::{SpeciesRecord, WoodClass};
use crate::error::NsvbError;

/// Output quantity with its own coefficient table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Inside-bark stem wood volume (ft³)
    StemWoodVolume,
    /// Stem bark volume (ft³)
    BarkVolume,
    /// Outside-bark stem volume from its own regression (ft³)
    StemTotalVolume,
    /// Stem bark dry weight (lb)
    BarkWeight,
    /// Branch dry weight (lb)
    BranchWeight,
    /// Total aboveground dry biomass (lb)
    TotalBiomass,
    /// Foliage dry weight (lb)
    FoliageWeight,
}

impl Component {
    pub const ALL: [Component; 7] = [
        Component::StemWoodVolume,
        Component::BarkVolume,
        Component::StemTotalVolume,
        Component::BarkWeight,
        Component::BranchWeight,
        Component::TotalBiomass,
        Component::FoliageWeight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Component::StemWoodVolume => "stem wood volume",
            Component::BarkVolume => "bark volume",
            Component::StemTotalVolume => "total stem volume",
            Component::BarkWeight => "bark weight",
            Component::BranchWeight => "branch weight",
            Component::TotalBiomass => "total biomass",
            Component::FoliageWeight => "foliage weight",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Component::StemWoodVolume | Component::BarkVolume | Component::StemTotalVolume => {
                "cu ft"
            }
            _ => "lb",
        }
    }

    /// Tables the estimation stages do not read. A data directory may omit them.
    pub fn is_optional(self) -> bool {
        matches!(self, Component::StemTotalVolume)
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Component {
    type Err = NsvbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        Component::ALL
            .into_iter()
            .find(|c| c.label() == normalized)
            .ok_or_else(|| NsvbError::ParseError(format!("Unknown component: '{s}'")))
    }
}

/// Identifier of one of the five regression forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormKind {
    SchumacherHall,
    Segmented,
    ContinuouslyVariable,
    ModifiedWiley,
    WoodDensityScaled,
}

impl FormKind {
    pub fn id(self) -> u8 {
        match self {
            FormKind::SchumacherHall => 1,
            FormKind::Segmented => 2,
            FormKind::ContinuouslyVariable => 3,
            FormKind::ModifiedWiley => 4,
            FormKind::WoodDensityScaled => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FormKind::SchumacherHall => "Schumacher-Hall",
            FormKind::Segmented => "Segmented",
            FormKind::ContinuouslyVariable => "Continuously variable",
            FormKind::ModifiedWiley => "Modified Wiley",
            FormKind::WoodDensityScaled => "Modified Schumacher-Hall",
        }
    }

    /// Coefficients a row must carry for this form. `k` is never read
    /// from a row.
    fn row_coefficients(self) -> &'static [&'static str] {
        match self {
            FormKind::SchumacherHall => &["a", "b", "c"],
            FormKind::Segmented => &["a", "b", "b1", "c"],
            FormKind::ContinuouslyVariable => &["a", "a1", "b", "c", "c1"],
            FormKind::ModifiedWiley => &["a", "b", "b1", "c"],
            FormKind::WoodDensityScaled => &["a", "b", "c"],
        }
    }

    /// Coefficients a row may carry to override the species default.
    /// Only species-keyed form 5 rows may pin their own `wdsg`.
    fn optional_coefficients(self, source: RowSource) -> &'static [&'static str] {
        match (self, source) {
            (FormKind::WoodDensityScaled, RowSource::Species) => &["wdsg"],
            _ => &[],
        }
    }
}

impl TryFrom<u8> for FormKind {
    type Error = NsvbError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(FormKind::SchumacherHall),
            2 => Ok(FormKind::Segmented),
            3 => Ok(FormKind::ContinuouslyVariable),
            4 => Ok(FormKind::ModifiedWiley),
            5 => Ok(FormKind::WoodDensityScaled),
            _ => Err(NsvbError::ParseError(format!("Unknown model form: {id}"))),
        }
    }
}

impl std::fmt::Display for FormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id(), self.name())
    }
}

/// Diameter break point of the segmented form, by wood class (inches).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmentThresholds {
    pub softwood: f64,
    pub hardwood: f64,
}

impl SegmentThresholds {
    pub fn for_class(&self, wood_class: WoodClass) -> f64 {
        match wood_class {
            WoodClass::Softwood => self.softwood,
            WoodClass::Hardwood => self.hardwood,
        }
    }
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            softwood: 9.0,
            hardwood: 11.0,
        }
    }
}

/// A regression form together with exactly the coefficients it uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModelForm {
    /// `a · D^b · H^c`
    SchumacherHall { a: f64, b: f64, c: f64 },
    /// `a · D^b · H^c` below `k`, `a · k^(b−b1) · D^b1 · H^c` from `k` up
    Segmented { a: f64, b: f64, b1: f64, c: f64, k: f64 },
    /// `a · (a1 · (1 − exp(−b·D))^c1) · H^c`
    ContinuouslyVariable { a: f64, a1: f64, b: f64, c: f64, c1: f64 },
    /// `a · D^b · H^c · exp(−b1·D)`
    ModifiedWiley { a: f64, b: f64, b1: f64, c: f64 },
    /// `a · D^b · H^c · wdsg`
    WoodDensityScaled { a: f64, b: f64, c: f64, wdsg: f64 },
}

impl ModelForm {
    pub fn kind(&self) -> FormKind {
        match self {
            ModelForm::SchumacherHall { .. } => FormKind::SchumacherHall,
            ModelForm::Segmented { .. } => FormKind::Segmented,
            ModelForm::ContinuouslyVariable { .. } => FormKind::ContinuouslyVariable,
            ModelForm::ModifiedWiley { .. } => FormKind::ModifiedWiley,
            ModelForm::WoodDensityScaled { .. } => FormKind::WoodDensityScaled,
        }
    }
}

/// Fully bound coefficients for one (component, species) evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRecord {
    pub form: ModelForm,
    /// Additive constant `e`
    pub constant: f64,
}

impl CoefficientRecord {
    pub fn new(form: ModelForm) -> Self {
        Self {
            form,
            constant: 0.0,
        }
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = constant;
        self
    }

    pub fn kind(&self) -> FormKind {
        self.form.kind()
    }
}

/// Group-level form. Species terms (`k`, `wdsg`) are bound on lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
enum GroupForm {
    SchumacherHall { a: f64, b: f64, c: f64 },
    Segmented { a: f64, b: f64, b1: f64, c: f64 },
    ContinuouslyVariable { a: f64, a1: f64, b: f64, c: f64, c1: f64 },
    ModifiedWiley { a: f64, b: f64, b1: f64, c: f64 },
    WoodDensityScaled { a: f64, b: f64, c: f64 },
}

/// Coefficients keyed by taxonomic group, shared by every species in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupRecord {
    form: GroupForm,
    constant: f64,
}

impl GroupRecord {
    pub fn kind(&self) -> FormKind {
        match self.form {
            GroupForm::SchumacherHall { .. } => FormKind::SchumacherHall,
            GroupForm::Segmented { .. } => FormKind::Segmented,
            GroupForm::ContinuouslyVariable { .. } => FormKind::ContinuouslyVariable,
            GroupForm::ModifiedWiley { .. } => FormKind::ModifiedWiley,
            GroupForm::WoodDensityScaled { .. } => FormKind::WoodDensityScaled,
        }
    }

    /// Specialize the group row for one species.
    pub fn bind(&self, species: &SpeciesRecord, thresholds: &SegmentThresholds) -> CoefficientRecord {
        let form = match self.form {
            GroupForm::SchumacherHall { a, b, c } => ModelForm::SchumacherHall { a, b, c },
            GroupForm::Segmented { a, b, b1, c } => ModelForm::Segmented {
                a,
                b,
                b1,
                c,
                k: thresholds.for_class(species.wood_class),
            },
            GroupForm::ContinuouslyVariable { a, a1, b, c, c1 } => {
                ModelForm::ContinuouslyVariable { a, a1, b, c, c1 }
            }
            GroupForm::ModifiedWiley { a, b, b1, c } => ModelForm::ModifiedWiley { a, b, b1, c },
            GroupForm::WoodDensityScaled { a, b, c } => ModelForm::WoodDensityScaled {
                a,
                b,
                c,
                wdsg: species.wood_specific_gravity,
            },
        };
        CoefficientRecord {
            form,
            constant: self.constant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowSource {
    Species,
    Group,
}

/// Raw coefficient row as supplied by a data loader. Absent cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    /// Model form number (1-5)
    pub model: u8,
    pub a: Option<f64>,
    pub a1: Option<f64>,
    pub b: Option<f64>,
    pub b1: Option<f64>,
    pub c: Option<f64>,
    pub c1: Option<f64>,
    pub wdsg: Option<f64>,
    pub e: Option<f64>,
}

impl CoefficientRow {
    /// Row of form `model` with `a`, `b`, `c` set.
    pub fn abc(model: u8, a: f64, b: f64, c: f64) -> Self {
        Self {
            model,
            a: Some(a),
            b: Some(b),
            c: Some(c),
            ..Self::default()
        }
    }

    fn named(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("a", self.a),
            ("a1", self.a1),
            ("b", self.b),
            ("b1", self.b1),
            ("c", self.c),
            ("c1", self.c1),
            ("wdsg", self.wdsg),
        ]
    }

    /// Check that the present coefficients are exactly those the form needs.
    fn check_shape(&self, source: RowSource) -> Result<FormKind, String> {
        let kind = FormKind::try_from(self.model).map_err(|e| e.to_string())?;
        let required = kind.row_coefficients();
        let optional = kind.optional_coefficients(source);

        let missing: Vec<&str> = self
            .named()
            .iter()
            .filter(|(name, value)| value.is_none() && required.contains(name))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(format!("model {} requires {}", kind.id(), missing.join(", ")));
        }

        let extra: Vec<&str> = self
            .named()
            .iter()
            .filter(|(name, value)| {
                value.is_some() && !required.contains(name) && !optional.contains(name)
            })
            .map(|(name, _)| *name)
            .collect();
        if !extra.is_empty() {
            return Err(format!(
                "model {} does not use {}",
                kind.id(),
                extra.join(", ")
            ));
        }

        if let Some((name, value)) = self
            .named()
            .into_iter()
            .chain(std::iter::once(("e", self.e)))
            .find(|(_, v)| v.is_some_and(|v| !v.is_finite()))
        {
            return Err(format!("coefficient {name} is not finite: {value:?}"));
        }

        Ok(kind)
    }

    /// Bind a species-keyed row to its species: `k` comes from the species'
    /// wood class and a blank `wdsg` from its reference wood density.
    pub(crate) fn into_species_record(
        self,
        species: &SpeciesRecord,
        thresholds: &SegmentThresholds,
    ) -> Result<CoefficientRecord, String> {
        let kind = self.check_shape(RowSource::Species)?;
        let form = match kind {
            FormKind::SchumacherHall => ModelForm::SchumacherHall {
                a: need(self.a, "a")?,
                b: need(self.b, "b")?,
                c: need(self.c, "c")?,
            },
            FormKind::Segmented => ModelForm::Segmented {
                a: need(self.a, "a")?,
                b: need(self.b, "b")?,
                b1: need(self.b1, "b1")?,
                c: need(self.c, "c")?,
                k: thresholds.for_class(species.wood_class),
            },
            FormKind::ContinuouslyVariable => ModelForm::ContinuouslyVariable {
                a: need(self.a, "a")?,
                a1: need(self.a1, "a1")?,
                b: need(self.b, "b")?,
                c: need(self.c, "c")?,
                c1: need(self.c1, "c1")?,
            },
            FormKind::ModifiedWiley => ModelForm::ModifiedWiley {
                a: need(self.a, "a")?,
                b: need(self.b, "b")?,
                b1: need(self.b1, "b1")?,
                c: need(self.c, "c")?,
            },
            FormKind::WoodDensityScaled => ModelForm::WoodDensityScaled {
                a: need(self.a, "a")?,
                b: need(self.b, "b")?,
                c: need(self.c, "c")?,
                wdsg: self.wdsg.unwrap_or(species.wood_specific_gravity),
            },
        };
        Ok(CoefficientRecord {
            form,
            constant: self.e.unwrap_or(0.0),
        })
    }

    pub(crate) fn into_group_record(self) -> Result<GroupRecord, String> {
        let kind = self.check_shape(RowSource::Group)?;
        let form = match kind {
            FormKind::SchumacherHall => GroupForm::SchumacherHall {
                a: need(self.a, "a")?,
                b: need(self.b, "b")?,
                c: need(self.c, "c")?,
            },
            FormKind::Segmented => GroupForm::Segmented {
                a: need(self.a, "a")?,
                b: need(self.b, "b")?,
                b1: need(self.b1, "b1")?,
                c: need(self.c, "c")?,
            },
            FormKind::ContinuouslyVariable => GroupForm::ContinuouslyVariable {
                a: need(self.a, "a")?,
                a1: need(self.a1, "a1")?,
                b: need(self.b, "b")?,
                c: need(self.c, "c")?,
                c1: need(self.c1, "c1")?,
            },
            FormKind::ModifiedWiley => GroupForm::ModifiedWiley {
                a: need(self.a, "a")?,
                b: need(self.b, "b")?,
                b1: need(self.b1, "b1")?,
                c: need(self.c, "c")?,
            },
            FormKind::WoodDensityScaled => GroupForm::WoodDensityScaled {
                a: need(self.a, "a")?,
                b: need(self.b, "b")?,
                c: need(self.c, "c")?,
            },
        };
        Ok(GroupRecord {
            form,
            constant: self.e.unwrap_or(0.0),
        })
    }
}

fn need(value: Option<f64>, name: &str) -> Result<f64, String> {
    value.ok_or_else(|| format!("missing coefficient {name}"))
}

/// Species/division-keyed source row. An empty division applies to all divisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCoefficientRow<R = CoefficientRow> {
    pub species_id: u32,
    pub division: String,
    pub coefficients: R,
}

/// Taxonomic-group-keyed source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCoefficientRow<R = CoefficientRow> {
    pub group_id: u32,
    pub coefficients: R,
}

/// Both raw sources for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable<R = CoefficientRow> {
    pub species_rows: Vec<SpeciesCoefficientRow<R>>,
    pub group_rows: Vec<GroupCoefficientRow<R>>,
}

impl<R> Default for RawTable<R> {
    fn default() -> Self {
        Self {
            species_rows: Vec::new(),
            group_rows: Vec::new(),
        }
    }
}

impl<R> RawTable<R> {
    pub fn species_row(mut self, species_id: u32, division: &str, row: R) -> Self {
        self.species_rows.push(SpeciesCoefficientRow {
            species_id,
            division: division.to_string(),
            coefficients: row,
        });
        self
    }

    pub fn group_row(mut self, group_id: u32, row: R) -> Self {
        self.group_rows.push(GroupCoefficientRow {
            group_id,
            coefficients: row,
        });
        self
    }
}

/// Raw sources for every component, indexable by [`Component`], plus the
/// stem-profile tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTables {
    pub stem_wood_volume: RawTable,
    pub bark_volume: RawTable,
    pub stem_total_volume: RawTable,
    pub bark_weight: RawTable,
    pub branch_weight: RawTable,
    pub total_biomass: RawTable,
    pub foliage_weight: RawTable,
    pub profiles: RawProfileTables,
}

impl Index<Component> for RawTables {
    type Output = RawTable;

    fn index(&self, component: Component) -> &RawTable {
        match component {
            Component::StemWoodVolume => &self.stem_wood_volume,
            Component::BarkVolume => &self.bark_volume,
            Component::StemTotalVolume => &self.stem_total_volume,
            Component::BarkWeight => &self.bark_weight,
            Component::BranchWeight => &self.branch_weight,
            Component::TotalBiomass => &self.total_biomass,
            Component::FoliageWeight => &self.foliage_weight,
        }
    }
}

impl IndexMut<Component> for RawTables {
    fn index_mut(&mut self, component: Component) -> &mut RawTable {
        match component {
            Component::StemWoodVolume => &mut self.stem_wood_volume,
            Component::BarkVolume => &mut self.bark_volume,
            Component::StemTotalVolume => &mut self.stem_total_volume,
            Component::BarkWeight => &mut self.bark_weight,
            Component::BranchWeight => &mut self.branch_weight,
            Component::TotalBiomass => &mut self.total_biomass,
            Component::FoliageWeight => &mut self.foliage_weight,
        }
    }
}
