//! Shared Hermite cubic interpolation primitives.
//!
//! This module provides the 1-D building blocks that the tensor-product table
//! evaluator and the grid builder share:
//! - Hermite basis function evaluation (and its derivative)
//! - Binary search interval finding
//! - Breakpoint validation
//!
//! # Hermite Cubic Interpolation
//!
//! Given values y0, y1 and slopes d0, d1 at interval endpoints x0, x1,
//! the Hermite cubic polynomial is:
//!
//! ```text
//! p(x) = h00(t)*y0 + h10(t)*h*d0 + h01(t)*y1 + h11(t)*h*d1
//!
//! where t = (x - x0) / h, h = x1 - x0
//!
//! h00(t) = 2t³ - 3t² + 1
//! h10(t) = t³ - 2t² + t
//! h01(t) = -2t³ + 3t²
//! h11(t) = t³ - t²
//! ```
//!
//! In D dimensions each corner slot is weighted by a product of these factors,
//! one per axis; see [`AxisBasis`].

use crate::interpolate::error::{InterpolateError, InterpolateResult};

/// Data required for Hermite interpolation at a point.
pub struct HermitePoint {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub d0: f64,
    pub d1: f64,
}

/// Evaluate Hermite cubic at a point within an interval.
///
/// # Arguments
/// * `point` - The interval data (endpoints, values, slopes)
/// * `xi` - The x coordinate to evaluate at (must be in [x0, x1])
#[inline]
pub fn hermite_eval(point: &HermitePoint, xi: f64) -> f64 {
    let h = point.x1 - point.x0;
    let t = (xi - point.x0) / h;
    let [h00, h10, h01, h11] = basis(t);

    h00 * point.y0 + h10 * h * point.d0 + h01 * point.y1 + h11 * h * point.d1
}

/// Hermite basis `[h00, h10, h01, h11]` at local coordinate `t`.
#[inline]
pub fn basis(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    ]
}

/// Derivatives of the Hermite basis with respect to `t`.
#[inline]
pub fn basis_derivative(t: f64) -> [f64; 4] {
    let t2 = t * t;
    [
        6.0 * t2 - 6.0 * t,
        3.0 * t2 - 4.0 * t + 1.0,
        -6.0 * t2 + 6.0 * t,
        3.0 * t2 - 2.0 * t,
    ]
}

/// Per-axis weights of the tensor-product Hermite basis.
///
/// `value[c][s]` is the weight of the slot that records a value (`s = 0`) or a
/// derivative along this axis (`s = 1`) at the lower (`c = 0`) or upper
/// (`c = 1`) endpoint. Derivative weights carry the cell width so that slots
/// hold plain partial derivatives. `slope` holds the x-derivatives of the same
/// weights.
#[derive(Debug, Clone, Copy)]
pub struct AxisBasis {
    pub value: [[f64; 2]; 2],
    pub slope: [[f64; 2]; 2],
}

impl AxisBasis {
    /// Basis at local coordinate `t` of an interval of width `h`.
    #[inline]
    pub fn new(t: f64, h: f64) -> Self {
        let [h00, h10, h01, h11] = basis(t);
        let [dh00, dh10, dh01, dh11] = basis_derivative(t);
        Self {
            value: [[h00, h * h10], [h01, h * h11]],
            slope: [[dh00 / h, dh10], [dh01 / h, dh11]],
        }
    }

    /// Weight for `corner`/`slot` bits; `differentiate` selects the slope.
    #[inline]
    pub fn weight(&self, corner: usize, slot: usize, differentiate: bool) -> f64 {
        if differentiate {
            self.slope[corner][slot]
        } else {
            self.value[corner][slot]
        }
    }
}

/// Find the interval index for a given x value using binary search.
///
/// Returns the index `i` such that `x_data[i] <= xi < x_data[i+1]`,
/// or the last valid interval index if xi equals the maximum.
#[inline]
pub fn find_interval(x_data: &[f64], n: usize, xi: f64) -> usize {
    let mut lo = 0;
    let mut hi = n - 1;

    while lo < hi - 1 {
        let mid = (lo + hi) / 2;
        if x_data[mid] <= xi {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    lo
}

/// Validate a breakpoint array for one axis.
///
/// Checks that:
/// - At least 2 breakpoints are provided
/// - All breakpoints are finite
/// - Breakpoints are strictly increasing
pub fn validate_breakpoints(x_data: &[f64], context: &str) -> InterpolateResult<()> {
    let n = x_data.len();
    if n < 2 {
        return Err(InterpolateError::InsufficientData {
            required: 2,
            actual: n,
            context: context.to_string(),
        });
    }

    if let Some(bad) = x_data.iter().find(|x| !x.is_finite()) {
        return Err(InterpolateError::InvalidParameter {
            parameter: "breakpoints".to_string(),
            message: format!("non-finite breakpoint {} in {}", bad, context),
        });
    }

    for i in 1..n {
        if x_data[i] <= x_data[i - 1] {
            return Err(InterpolateError::NotMonotonic {
                context: context.to_string(),
            });
        }
    }

    Ok(())
}
