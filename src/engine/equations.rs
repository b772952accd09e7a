//! Closed-form volume and biomass regressions.
//!
//! Each form is evaluated left to right exactly as published so results
//! reproduce the reference tables to full double precision.

use crate::error::NsvbError;
use crate::models::{CoefficientRecord, ModelForm};

/// `base^exponent`, refusing a negative base with a fractional exponent.
pub(crate) fn pow(base: f64, exponent: f64, term: &str) -> Result<f64, NsvbError> {
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(NsvbError::DomainError(format!(
            "{term} = {base} cannot be raised to non-integral exponent {exponent}"
        )));
    }
    Ok(base.powf(exponent))
}

/// Model 1: `a · D^b · H^c`
pub fn schumacher_hall(dbh: f64, ht: f64, a: f64, b: f64, c: f64) -> Result<f64, NsvbError> {
    Ok(a * pow(dbh, b, "diameter")? * pow(ht, c, "height")?)
}

/// Model 2. Diameters at or above `k` use the upper segment.
pub fn segmented(
    dbh: f64,
    ht: f64,
    a: f64,
    b: f64,
    b1: f64,
    c: f64,
    k: f64,
) -> Result<f64, NsvbError> {
    if dbh < k {
        Ok(a * pow(dbh, b, "diameter")? * pow(ht, c, "height")?)
    } else {
        Ok(a * pow(k, b - b1, "threshold")? * pow(dbh, b1, "diameter")? * pow(ht, c, "height")?)
    }
}

/// Model 3: `a · (a1 · (1 − exp(−b·D))^c1) · H^c`
pub fn continuously_variable(
    dbh: f64,
    ht: f64,
    a: f64,
    a1: f64,
    b: f64,
    c: f64,
    c1: f64,
) -> Result<f64, NsvbError> {
    let saturation = 1.0 - (-b * dbh).exp();
    Ok(a * (a1 * pow(saturation, c1, "1 - exp(-b*D)")?) * pow(ht, c, "height")?)
}

/// Model 4: `a · D^b · H^c · exp(−b1·D)`
pub fn modified_wiley(dbh: f64, ht: f64, a: f64, b: f64, b1: f64, c: f64) -> Result<f64, NsvbError> {
    Ok(a * pow(dbh, b, "diameter")? * pow(ht, c, "height")? * (-(b1 * dbh)).exp())
}

/// Model 5: `a · D^b · H^c · wdsg`
pub fn wood_density_scaled(
    dbh: f64,
    ht: f64,
    a: f64,
    b: f64,
    c: f64,
    wdsg: f64,
) -> Result<f64, NsvbError> {
    Ok(a * pow(dbh, b, "diameter")? * pow(ht, c, "height")? * wdsg)
}

/// Evaluate a bound coefficient record for one tree, adding its constant.
pub fn evaluate(record: &CoefficientRecord, dbh: f64, ht: f64) -> Result<f64, NsvbError> {
    let value = match record.form {
        ModelForm::SchumacherHall { a, b, c } => schumacher_hall(dbh, ht, a, b, c)?,
        ModelForm::Segmented { a, b, b1, c, k } => segmented(dbh, ht, a, b, b1, c, k)?,
        ModelForm::ContinuouslyVariable { a, a1, b, c, c1 } => {
            continuously_variable(dbh, ht, a, a1, b, c, c1)?
        }
        ModelForm::ModifiedWiley { a, b, b1, c } => modified_wiley(dbh, ht, a, b, b1, c)?,
        ModelForm::WoodDensityScaled { a, b, c, wdsg } => {
            wood_density_scaled(dbh, ht, a, b, c, wdsg)?
        }
    };
    Ok(value + record.constant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn rel_close(actual: f64, expected: f64, tol: f64) {
        let rel = ((actual - expected) / expected).abs();
        assert!(rel < tol, "{actual} vs {expected} (relative error {rel})");
    }

    #[test]
    fn test_schumacher_hall() {
        // Red maple inside-bark volume, D = 11.1, H = 38
        let v = schumacher_hall(11.1, 38.0, 0.001983918881, 1.810559393287, 1.129417635145)
            .unwrap();
        rel_close(v, 9.42711277761147, 1e-12);
    }

    #[test]
    fn test_segmented_upper_branch() {
        // Douglas-fir inside-bark volume, D = 20 above k = 9
        let v = segmented(
            20.0,
            110.0,
            0.001929099661,
            2.162413104203,
            1.690400253097,
            0.985444005253,
            9.0,
        )
        .unwrap();
        rel_close(v, 88.45227554428763, 1e-12);
    }

    #[test]
    fn test_segmented_lower_branch_matches_model_one() {
        let lower = segmented(8.0, 60.0, 0.0019, 2.16, 1.69, 0.98, 9.0).unwrap();
        let plain = schumacher_hall(8.0, 60.0, 0.0019, 2.16, 0.98).unwrap();
        assert_eq!(lower, plain);
    }

    #[test]
    fn test_segmented_tie_uses_upper_branch() {
        let (a, b, b1, c, k) = (0.0019, 2.16, 1.69, 0.98, 9.0);
        let at_k = segmented(k, 60.0, a, b, b1, c, k).unwrap();
        let upper = a * k.powf(b - b1) * k.powf(b1) * 60f64.powf(c);
        let lower = a * k.powf(b) * 60f64.powf(c);
        assert_eq!(at_k, upper);
        // The two branches agree only up to rounding; the tie must take the upper one.
        assert_approx_eq!(at_k, lower, 1e-9);
    }

    #[test]
    fn test_segmented_continuous_at_threshold() {
        let (a, b, b1, c, k) = (0.002020025979, 1.957775262905, 1.618455676343, 0.677, 11.0);
        let below = segmented(k - 1e-9, 65.0, a, b, b1, c, k).unwrap();
        let at = segmented(k, 65.0, a, b, b1, c, k).unwrap();
        assert_approx_eq!(below, at, 1e-6);
    }

    #[test]
    fn test_continuously_variable() {
        let v = continuously_variable(10.0, 50.0, 2.0, 1.5, 0.1, 0.5, 2.0).unwrap();
        let expected = 2.0 * (1.5 * (1.0 - (-0.1f64 * 10.0).exp()).powf(2.0)) * 50f64.powf(0.5);
        assert_eq!(v, expected);
    }

    #[test]
    fn test_modified_wiley() {
        // Red maple total biomass, D = 11.1, H = 38
        let v = modified_wiley(
            11.1,
            38.0,
            0.31573027567,
            1.853839844372,
            -0.024745684975,
            0.740557378679,
        )
        .unwrap();
        rel_close(v, 532.5847988200422, 1e-12);
    }

    #[test]
    fn test_wood_density_scaled() {
        // Tanoak branch weight from group coefficients, D = 11.3, H = 28
        let v = wood_density_scaled(
            11.3,
            28.0,
            0.798604849948,
            2.969162133333,
            -0.301902411279,
            0.58,
        )
        .unwrap();
        rel_close(v, 226.78800234897548, 1e-12);
    }

    #[test]
    fn test_evaluate_adds_constant() {
        let record = CoefficientRecord::new(ModelForm::SchumacherHall {
            a: 1.0,
            b: 2.0,
            c: 1.0,
        })
        .with_constant(0.25);
        assert_eq!(evaluate(&record, 3.0, 2.0).unwrap(), 18.25);
    }

    #[test]
    fn test_negative_diameter_fractional_exponent() {
        let err = schumacher_hall(-2.0, 10.0, 1.0, 1.5, 1.0).unwrap_err();
        assert!(matches!(err, NsvbError::DomainError(_)));
    }

    #[test]
    fn test_negative_diameter_integral_exponent() {
        let v = schumacher_hall(-2.0, 10.0, 1.0, 2.0, 1.0).unwrap();
        assert_eq!(v, 40.0);
    }

    #[test]
    fn test_continuously_variable_negative_diameter() {
        let err = continuously_variable(-5.0, 10.0, 1.0, 1.0, 0.2, 1.0, 0.5).unwrap_err();
        assert!(matches!(err, NsvbError::DomainError(_)));
    }

    #[test]
    fn test_zero_diameter() {
        assert_eq!(schumacher_hall(0.0, 10.0, 1.0, 2.0, 1.0).unwrap(), 0.0);
    }
}
