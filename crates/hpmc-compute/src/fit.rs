//! Least-squares polynomial fits used for the pressure extrapolation.

use hpmc_core::{ErrorInfo, HpmcError};
use nalgebra::{DMatrix, DVector};

const SVD_EPSILON: f64 = 1e-12;

fn fit_error(code: &str, message: impl Into<String>, points: usize, degree: usize) -> HpmcError {
    HpmcError::Configuration(
        ErrorInfo::new(code, message.into())
            .with_context("points", points)
            .with_context("degree", degree),
    )
}

/// Fits a polynomial of `degree` to the points `(x, y)` in the least-squares sense.
///
/// Coefficients are returned in ascending order, `y ~ c0 + c1 x + ...`. The
/// abscissa is divided by its largest magnitude before the Vandermonde matrix
/// is built, which keeps the SVD well conditioned for bin centres of order
/// `1e-4`.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Vec<f64>, HpmcError> {
    let points = x.len();
    if points != y.len() {
        return Err(fit_error(
            "fit-length",
            "x and y must have equal length",
            points,
            degree,
        ));
    }
    if points == 0 {
        return Err(fit_error("fit-empty", "cannot fit an empty series", 0, degree));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(fit_error(
            "fit-non-finite",
            "fit input contains non-finite values",
            points,
            degree,
        ));
    }

    let scale = x.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let design = DMatrix::from_fn(points, degree + 1, |row, col| {
        (x[row] / scale).powi(col as i32)
    });
    let rhs = DVector::from_column_slice(y);
    let solution = design
        .svd(true, true)
        .solve(&rhs, SVD_EPSILON)
        .map_err(|msg| fit_error("fit-failed", msg, points, degree))?;

    Ok(solution
        .iter()
        .enumerate()
        .map(|(power, c)| c / scale.powi(power as i32))
        .collect())
}

/// Evaluates ascending-order coefficients at `x` with Horner's rule.
pub fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
