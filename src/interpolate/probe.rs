//! The probe contract and typed views of packed value/derivative data.
//!
//! A probe fills a flat buffer of `nfun * 2^D` values: for each function in
//! order, one entry per [`Sigma`] in canonical order. Inside the crate that
//! layout is wrapped in [`FunctionRecord`] / [`PackedValues`] so slots are
//! addressed by selector instead of by hand-computed offsets.

use crate::interpolate::error::{InterpolateError, InterpolateResult};
use crate::interpolate::vertex::{num_slots, sigmas, Sigma, MAX_DIM, MAX_SLOTS};

/// A pure function of `(coordinate, context)` producing values and partials.
///
/// `x` holds one coordinate per active (non-collapsed) axis. `out` has length
/// `nfun * 2^x.len()` and is laid out function-major, slots in
/// [`sigmas`] order. Any state the probe needs must live in `ctx` or in
/// `self`; both are shared between worker threads during table construction.
///
/// Closures `Fn(&[f64], &Ctx, &mut [f64]) + Sync` implement this trait.
pub trait FunctionProbe<Ctx: ?Sized>: Sync {
    /// Evaluate the functions and their recorded partials at `x`.
    fn probe(&self, x: &[f64], ctx: &Ctx, out: &mut [f64]);
}

impl<Ctx: ?Sized, F> FunctionProbe<Ctx> for F
where
    F: Fn(&[f64], &Ctx, &mut [f64]) + Sync,
{
    #[inline]
    fn probe(&self, x: &[f64], ctx: &Ctx, out: &mut [f64]) {
        self(x, ctx, out)
    }
}

/// Call `probe` at `x` and reject non-finite output.
pub(crate) fn probe_checked<P, Ctx>(
    probe: &P,
    ctx: &Ctx,
    x: &[f64],
    nfun: usize,
) -> InterpolateResult<Vec<f64>>
where
    P: FunctionProbe<Ctx> + ?Sized,
    Ctx: ?Sized,
{
    let nvd = num_slots(x.len());
    let mut out = vec![0.0; nfun * nvd];
    probe.probe(x, ctx, &mut out);

    if let Some((i, &value)) = out.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(InterpolateError::ProbeFailure {
            point: x.to_vec(),
            function: i / nvd,
            slot: i % nvd,
            value,
        });
    }
    Ok(out)
}

/// Value and recorded partials of one function at one point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FunctionRecord {
    slots: [f64; MAX_SLOTS],
}

impl FunctionRecord {
    /// Record from the `2^D` slots of one function in probe order.
    #[inline]
    pub fn from_slots(data: &[f64]) -> Self {
        debug_assert!(data.len() <= MAX_SLOTS);
        let mut slots = [0.0; MAX_SLOTS];
        slots[..data.len()].copy_from_slice(data);
        Self { slots }
    }

    /// Function value.
    #[inline]
    pub fn value(&self) -> f64 {
        self.slots[0]
    }

    /// Slot selected by `sigma`.
    #[inline]
    pub fn get(&self, sigma: Sigma) -> f64 {
        self.slots[sigma.index()]
    }

    /// First derivative along `axis`.
    #[inline]
    pub fn derivative(&self, axis: usize) -> f64 {
        self.get(Sigma::axis(axis))
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> f64 {
        self.slots[index]
    }
}

/// Values and partials of all functions at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedValues {
    dim: usize,
    records: Vec<FunctionRecord>,
}

impl PackedValues {
    /// Wrap a flat probe buffer of `nfun * 2^dim` entries.
    pub fn from_flat(flat: &[f64], nfun: usize, dim: usize) -> InterpolateResult<Self> {
        if dim > MAX_DIM {
            return Err(InterpolateError::InvalidParameter {
                parameter: "dim".to_string(),
                message: format!("at most {} dimensions are supported, got {}", MAX_DIM, dim),
            });
        }
        let nvd = num_slots(dim);
        if flat.len() != nfun * nvd {
            return Err(InterpolateError::ShapeMismatch {
                expected: nfun * nvd,
                actual: flat.len(),
                context: "PackedValues::from_flat".to_string(),
            });
        }
        let records = flat.chunks_exact(nvd).map(FunctionRecord::from_slots).collect();
        Ok(Self { dim, records })
    }

    /// Number of functions.
    pub fn nfun(&self) -> usize {
        self.records.len()
    }

    /// Dimension the slots refer to.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Record of function `f`.
    pub fn function(&self, f: usize) -> &FunctionRecord {
        &self.records[f]
    }

    /// All records in function order.
    pub fn records(&self) -> &[FunctionRecord] {
        &self.records
    }

    /// Value of function `f`.
    pub fn value(&self, f: usize) -> f64 {
        self.records[f].value()
    }

    /// Slot `sigma` of function `f`.
    pub fn get(&self, f: usize, sigma: Sigma) -> f64 {
        self.records[f].get(sigma)
    }

    /// Write the flat probe layout into `out`.
    pub fn write_flat(&self, out: &mut [f64]) {
        let nvd = num_slots(self.dim);
        for (chunk, record) in out.chunks_exact_mut(nvd).zip(&self.records) {
            for sigma in sigmas(self.dim) {
                chunk[sigma.index()] = record.get(sigma);
            }
        }
    }

    /// The flat probe layout as a new vector.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.records.len() * num_slots(self.dim)];
        self.write_flat(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(x: &[f64], scale: &f64, out: &mut [f64]) {
        // f = scale * x0² * x1, with all four slots
        out[0] = scale * x[0] * x[0] * x[1];
        out[1] = scale * 2.0 * x[0] * x[1];
        out[2] = scale * x[0] * x[0];
        out[3] = scale * 2.0 * x[0];
    }

    #[test]
    fn test_closure_is_probe() {
        let mut out = [0.0; 4];
        quadratic.probe(&[2.0, 3.0], &0.5, &mut out);
        assert_eq!(out, [6.0, 6.0, 2.0, 2.0]);
    }

    #[test]
    fn test_packed_values_layout() {
        let flat = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let packed = PackedValues::from_flat(&flat, 2, 2).unwrap();

        assert_eq!(packed.nfun(), 2);
        assert_eq!(packed.value(1), 5.0);
        assert_eq!(packed.function(0).derivative(1), 3.0);
        assert_eq!(packed.get(1, Sigma::axis(0)), 6.0);
        assert_eq!(packed.to_flat(), flat.to_vec());
    }

    #[test]
    fn test_packed_values_shape_check() {
        let result = PackedValues::from_flat(&[1.0, 2.0, 3.0], 2, 1);
        assert!(matches!(result, Err(InterpolateError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_probe_checked_reports_function_and_slot() {
        let bad = |x: &[f64], _: &(), out: &mut [f64]| {
            out[0] = x[0];
            out[1] = 1.0;
            out[2] = 1.0 / (x[0] - x[0]);
            out[3] = 0.0;
        };
        let err = probe_checked(&bad, &(), &[0.25], 2).unwrap_err();
        match err {
            InterpolateError::ProbeFailure {
                point,
                function,
                slot,
                ..
            } => {
                assert_eq!(point, vec![0.25]);
                assert_eq!(function, 1);
                assert_eq!(slot, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
