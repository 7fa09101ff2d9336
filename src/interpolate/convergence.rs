//! Tolerances and debounced convergence detection.
//!
//! [`StableConvergenceDetector`] declares convergence only after a run of
//! consecutive passing checks; a single failing check resets the run. The grid
//! builder uses it to accept intervals and cells, and [`sum_series`] uses it to
//! stop summing an infinite series whose individual terms may dip below the
//! tolerance before the tail has really died out.

use crate::interpolate::error::{InterpolateError, InterpolateResult};

/// Relative/absolute error target, applied per function component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Relative error target.
    pub rel_tol: f64,
    /// Absolute floor for components near zero.
    pub abs_tol: f64,
}

impl Tolerance {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self { rel_tol, abs_tol }
    }

    /// Largest acceptable error for a component whose reference value is `reference`.
    #[inline]
    pub fn threshold(&self, reference: f64) -> f64 {
        self.abs_tol.max(self.rel_tol * reference.abs())
    }

    /// Whether `error` is within tolerance of `reference`.
    #[inline]
    pub fn accepts(&self, error: f64, reference: f64) -> bool {
        error.abs() <= self.threshold(reference)
    }

    /// Same tolerance divided evenly among `parts` contributions.
    pub fn split(&self, parts: usize) -> Self {
        let parts = parts.max(1) as f64;
        Self {
            rel_tol: self.rel_tol / parts,
            abs_tol: self.abs_tol / parts,
        }
    }

    /// Relative error of `approx` against `exact`.
    ///
    /// The denominator never drops below `abs_tol / rel_tol`, so a component is
    /// within tolerance exactly when this is at most `rel_tol`.
    pub fn relative_error(&self, exact: f64, approx: f64) -> f64 {
        let floor = if self.rel_tol > 0.0 {
            self.abs_tol / self.rel_tol
        } else {
            0.0
        };
        let denom = exact.abs().max(floor);
        let diff = (exact - approx).abs();
        if denom > 0.0 {
            diff / denom
        } else {
            diff
        }
    }

    pub(crate) fn validate(&self) -> InterpolateResult<()> {
        if !(self.rel_tol.is_finite() && self.rel_tol >= 0.0) {
            return Err(InterpolateError::InvalidParameter {
                parameter: "rel_tol".to_string(),
                message: format!("must be finite and non-negative, got {}", self.rel_tol),
            });
        }
        if !(self.abs_tol.is_finite() && self.abs_tol >= 0.0) {
            return Err(InterpolateError::InvalidParameter {
                parameter: "abs_tol".to_string(),
                message: format!("must be finite and non-negative, got {}", self.abs_tol),
            });
        }
        if self.rel_tol == 0.0 && self.abs_tol == 0.0 {
            return Err(InterpolateError::InvalidParameter {
                parameter: "rel_tol, abs_tol".to_string(),
                message: "at least one tolerance must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Counts consecutive passing checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableConvergenceDetector {
    required: usize,
    streak: usize,
}

impl StableConvergenceDetector {
    /// Detector that needs `required` consecutive passes (at least 1).
    pub fn new(required: usize) -> Self {
        Self {
            required: required.max(1),
            streak: 0,
        }
    }

    /// Record one check; returns whether the detector has now converged.
    pub fn observe(&mut self, passed: bool) -> bool {
        if passed {
            self.streak += 1;
        } else {
            self.streak = 0;
        }
        self.is_converged()
    }

    /// Current run of consecutive passes.
    pub fn streak(&self) -> usize {
        self.streak
    }

    pub fn is_converged(&self) -> bool {
        self.streak >= self.required
    }
}

/// Outcome of [`sum_series`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSum {
    /// Accumulated sum, one entry per component.
    pub values: Vec<f64>,
    /// Number of terms added.
    pub terms: usize,
}

/// Sum a vector-valued series until its terms have stayed negligible.
///
/// `term(n, out)` writes term `n` (starting at 0) into `out`, which has
/// `ncomp` zeroed entries. Term 0 and the terms up to `leading` set the
/// reference magnitudes; after that a term passes when every component is
/// within `tolerance` of the reference. Summation stops once `streak`
/// consecutive terms pass.
pub fn sum_series<F>(
    ncomp: usize,
    leading: usize,
    tolerance: Tolerance,
    streak: usize,
    max_terms: usize,
    mut term: F,
) -> InterpolateResult<SeriesSum>
where
    F: FnMut(usize, &mut [f64]),
{
    tolerance.validate()?;

    let mut values = vec![0.0; ncomp];
    let mut buf = vec![0.0; ncomp];
    let mut reference = vec![0.0; ncomp];
    let mut detector = StableConvergenceDetector::new(streak);

    for n in 0..max_terms {
        buf.iter_mut().for_each(|v| *v = 0.0);
        term(n, &mut buf);
        for (v, t) in values.iter_mut().zip(&buf) {
            *v += t;
        }

        if n <= leading {
            for (r, v) in reference.iter_mut().zip(&values) {
                *r = v.abs();
            }
            continue;
        }

        let passed = buf
            .iter()
            .zip(&reference)
            .all(|(t, r)| tolerance.accepts(*t, *r));
        if detector.observe(passed) {
            return Ok(SeriesSum {
                values,
                terms: n + 1,
            });
        }
    }

    Err(InterpolateError::SeriesNonConvergence { terms: max_terms })
}
