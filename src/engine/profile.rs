//! Stem profile and height-diameter curves.
//!
//! The profile of a stem is recovered from its total outside-bark volume and
//! a cumulative volume ratio curve. The inverse problems (height at a given
//! diameter, breast-height diameter from a stump, light index from a height)
//! have no closed form and are solved by bisection.

use super::equations::pow;
use crate::error::NsvbError;
use crate::models::{HeightDiameter, VolumeRatio};

/// Square feet of cross-section per square inch of diameter, `π / 576`.
pub const BASAL_AREA_FACTOR: f64 = 0.005454154;

/// Bracket width and early-exit tolerance for the diameter searches.
pub const DIAMETER_TOLERANCE: f64 = 0.001;
/// Same, for the light resource index search.
pub const LRI_TOLERANCE: f64 = 0.01;

/// How the searched function moves as its argument grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slope {
    Increasing,
    Decreasing,
}

/// Halve `[low, high]` until it is narrower than `tolerance` or `f` lands
/// within `tolerance` of `target`. Returns the last midpoint.
fn bisect(
    mut low: f64,
    mut high: f64,
    tolerance: f64,
    target: f64,
    slope: Slope,
    mut f: impl FnMut(f64) -> Result<f64, NsvbError>,
) -> Result<f64, NsvbError> {
    let mut mid = (low + high) / 2.0;
    while high - low > tolerance {
        mid = (low + high) / 2.0;
        let value = f(mid)?;
        if (value - target).abs() < tolerance {
            return Ok(mid);
        }
        match (value > target, slope) {
            (true, Slope::Decreasing) | (false, Slope::Increasing) => low = mid,
            (true, Slope::Increasing) | (false, Slope::Decreasing) => high = mid,
        }
    }
    Ok(mid)
}

/// Share of total stem volume below `ht_ratio` of total height:
/// `(1 − (1 − r)^α)^β`.
pub fn volume_ratio(ht_ratio: f64, ratio: &VolumeRatio) -> Result<f64, NsvbError> {
    if !(0.0..=1.0).contains(&ht_ratio) {
        return Err(NsvbError::DomainError(format!(
            "height ratio {ht_ratio} is outside [0, 1]"
        )));
    }
    let remaining = pow(1.0 - ht_ratio, ratio.alpha, "1 - h/H")?;
    pow(1.0 - remaining, ratio.beta, "1 - (1 - h/H)^alpha")
}

/// Outside-bark diameter (in) at height `hi` (ft) on a stem of total height
/// `ht` and total outside-bark volume `total_volume_ob` (cu ft).
pub fn diameter_at_height(
    total_volume_ob: f64,
    ht: f64,
    hi: f64,
    ratio: &VolumeRatio,
) -> Result<f64, NsvbError> {
    if ht <= 0.0 {
        return Err(NsvbError::DomainError(format!(
            "total height {ht} must be positive"
        )));
    }
    if !(0.0..=ht).contains(&hi) {
        return Err(NsvbError::DomainError(format!(
            "height {hi} is outside the stem [0, {ht}]"
        )));
    }
    let z = (1.0 - hi / ht).abs();
    let scale = total_volume_ob / BASAL_AREA_FACTOR / ht * ratio.alpha * ratio.beta;
    let lower = pow(z, ratio.alpha - 1.0, "1 - h/H")?;
    let upper = pow(
        1.0 - pow(z, ratio.alpha, "1 - h/H")?,
        ratio.beta - 1.0,
        "1 - (1 - h/H)^alpha",
    )?;
    Ok((scale * lower * upper).sqrt())
}

/// Height (ft) at which the stem narrows to `top_diameter` (in).
pub fn height_at_diameter(
    total_volume_ob: f64,
    ht: f64,
    top_diameter: f64,
    ratio: &VolumeRatio,
) -> Result<f64, NsvbError> {
    bisect(
        0.0,
        ht,
        DIAMETER_TOLERANCE,
        top_diameter,
        Slope::Decreasing,
        |hi| diameter_at_height(total_volume_ob, ht, hi, ratio),
    )
}

/// Least-squares height (ft) for a breast-height diameter.
pub fn height(dbh: f64, curve: &HeightDiameter) -> Result<f64, NsvbError> {
    Ok(curve.ols_a * pow(dbh, curve.ols_b, "diameter")?)
}

/// Height (ft) interpolated between the 95th (`lri = 0`) and 5th (`lri = 1`)
/// percentile curves.
pub fn height_lri(dbh: f64, lri: f64, curve: &HeightDiameter) -> Result<f64, NsvbError> {
    if !(0.0..=1.0).contains(&lri) {
        return Err(NsvbError::DomainError(format!(
            "light resource index {lri} is outside [0, 1]"
        )));
    }
    let a = curve.p05_a * lri + curve.p95_a * (1.0 - lri);
    let b = curve.p05_b * lri + curve.p95_b * (1.0 - lri);
    Ok(a * pow(dbh, b, "diameter")?)
}

/// Light resource index that reproduces `target_height` for `dbh`.
pub fn find_lri(dbh: f64, target_height: f64, curve: &HeightDiameter) -> Result<f64, NsvbError> {
    bisect(
        0.0,
        1.0,
        LRI_TOLERANCE,
        target_height,
        Slope::Decreasing,
        |lri| height_lri(dbh, lri, curve),
    )
}

/// Breast-height diameter (in) of a tree whose stump measures `stump_diameter`
/// (in) at `stump_height` (ft). `stem_total_volume` maps `(dbh, ht)` to total
/// outside-bark volume; height comes from the least-squares curve.
pub fn dbh_from_stump_diameter(
    stump_diameter: f64,
    stump_height: f64,
    ratio: &VolumeRatio,
    curve: &HeightDiameter,
    mut stem_total_volume: impl FnMut(f64, f64) -> Result<f64, NsvbError>,
) -> Result<f64, NsvbError> {
    bisect(
        0.0,
        stump_diameter,
        DIAMETER_TOLERANCE,
        stump_diameter,
        Slope::Increasing,
        |dbh| {
            let ht = height(dbh, curve)?;
            let volume = stem_total_volume(dbh, ht)?;
            diameter_at_height(volume, ht, stump_height, ratio)
        },
    )
}
