//! Adaptive Hermite lookup tables.
//!
//! An [`InterpTable`] memoizes an expensive vector-valued function over a box
//! of up to three dimensions. Construction probes the function (values and
//! mixed first partials) on an adaptively refined rectilinear grid until the
//! tensor-product cubic Hermite interpolant meets the requested tolerance;
//! afterwards evaluation only touches the stored corner data.
//!
//! # Example
//!
//! ```ignore
//! use mdinterp::interpolate::{InterpTable, TableOptions};
//!
//! // f(x, y) = exp(-x² - y²), probed with all four value/derivative slots
//! let probe = |x: &[f64], _: &(), out: &mut [f64]| {
//!     let f = (-x[0] * x[0] - x[1] * x[1]).exp();
//!     out[0] = f;
//!     out[1] = -2.0 * x[0] * f;
//!     out[2] = -2.0 * x[1] * f;
//!     out[3] = 4.0 * x[0] * x[1] * f;
//! };
//!
//! let options = TableOptions::default().with_rel_tol(1e-6);
//! let table = InterpTable::build(&probe, &(), 1, &[-1.0, -1.0], &[1.0, 1.0], &options)?;
//! let value = table.evaluate(&[0.3, -0.2])?;
//! ```
//!
//! # Collapsed axes
//!
//! An axis with `xmin[d] == xmax[d]` is collapsed: it takes no part in the
//! tensor product, and the probe sees only the remaining (active) coordinates
//! and returns `nfun * 2^active` values. Queries still pass the full
//! coordinate vector, with the collapsed coordinate equal to its fixed value.

mod build;
mod diagnostics;
mod evaluate;
pub(crate) mod grid;

pub use grid::{AxisGrid, Cell};

use crate::interpolate::convergence::Tolerance;
use crate::interpolate::error::{InterpolateError, InterpolateResult};
use crate::interpolate::probe::FunctionProbe;
use crate::interpolate::vertex::{num_slots, MAX_DIM};
use tracing::{info, warn};

use build::{GridBuilder, CHECK_POINTS, CROSS_FRACTIONS};
use grid::HermiteGrid;

/// Environment variable overriding [`TableOptions::rel_tol`].
pub const TOLERANCE_ENV: &str = "MDINTERP_TOLERANCE";

/// Environment variable enabling [`TableOptions::verbose`].
pub const VERBOSE_ENV: &str = "MDINTERP_VERBOSE";

/// Options controlling table construction.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Relative tolerance (default: 1e-3)
    pub rel_tol: f64,
    /// Absolute tolerance floor (default: 1e-10)
    pub abs_tol: f64,
    /// Log refinement passes at info level (default: false)
    pub verbose: bool,
    /// Consecutive passing checks before an interval or cell is accepted (default: 2)
    pub stable_streak: usize,
    /// Maximum refinement passes per stage (default: 64)
    pub max_passes: usize,
    /// Maximum breakpoints on any axis (default: 4096)
    pub max_nodes_per_axis: usize,
    /// Maximum bisection depth of an interval (default: 40)
    pub max_depth: usize,
    /// Maximum number of grid vertices (default: 2^24)
    pub max_grid_points: usize,
    /// Positions per cross axis at which axis refinement samples (default: 3)
    pub cross_samples: usize,
    /// Check every cell of the assembled table before accepting it (default: true)
    pub verify: bool,
    /// Worker threads for probe calls; `None` uses the global rayon pool
    pub workers: Option<usize>,
    /// Seed for diagnostic sampling (default: 0)
    pub seed: u64,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            rel_tol: 1e-3,
            abs_tol: 1e-10,
            verbose: false,
            stable_streak: 2,
            max_passes: 64,
            max_nodes_per_axis: 4096,
            max_depth: 40,
            max_grid_points: 1 << 24,
            cross_samples: 3,
            verify: true,
            workers: None,
            seed: 0,
        }
    }
}

impl TableOptions {
    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_stable_streak(mut self, streak: usize) -> Self {
        self.stable_streak = streak;
        self
    }

    pub fn with_max_nodes_per_axis(mut self, max_nodes: usize) -> Self {
        self.max_nodes_per_axis = max_nodes;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Apply `MDINTERP_TOLERANCE` and `MDINTERP_VERBOSE` from the environment.
    ///
    /// Unparsable values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(TOLERANCE_ENV) {
            match raw.trim().parse::<f64>() {
                Ok(tol) => self.rel_tol = tol,
                Err(_) => warn!(value = %raw, "ignoring unparsable {}", TOLERANCE_ENV),
            }
        }
        if let Ok(raw) = std::env::var(VERBOSE_ENV) {
            let raw = raw.trim();
            self.verbose = !(raw.is_empty() || raw == "0" || raw.eq_ignore_ascii_case("false"));
        }
        self
    }

    /// The tolerance pair these options describe.
    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.rel_tol, self.abs_tol)
    }

    pub(crate) fn validate(&self) -> InterpolateResult<()> {
        self.tolerance().validate()?;

        if self.stable_streak < 2 || self.stable_streak > CHECK_POINTS.len() {
            return Err(InterpolateError::InvalidParameter {
                parameter: "stable_streak".to_string(),
                message: format!(
                    "must be between 2 and {}, got {}",
                    CHECK_POINTS.len(),
                    self.stable_streak
                ),
            });
        }
        if self.cross_samples == 0 || self.cross_samples > CROSS_FRACTIONS.len() {
            return Err(InterpolateError::InvalidParameter {
                parameter: "cross_samples".to_string(),
                message: format!(
                    "must be between 1 and {}, got {}",
                    CROSS_FRACTIONS.len(),
                    self.cross_samples
                ),
            });
        }
        if self.max_nodes_per_axis < 2 {
            return Err(InterpolateError::InvalidParameter {
                parameter: "max_nodes_per_axis".to_string(),
                message: format!("must be at least 2, got {}", self.max_nodes_per_axis),
            });
        }
        if self.max_passes == 0 {
            return Err(InterpolateError::InvalidParameter {
                parameter: "max_passes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.workers == Some(0) {
            return Err(InterpolateError::InvalidParameter {
                parameter: "workers".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Immutable Hermite lookup table over a box of up to three dimensions.
///
/// A table only exists once construction has succeeded; all query methods take
/// `&self`, so a table can be shared freely between threads.
#[derive(Debug, Clone)]
pub struct InterpTable {
    xmin: Vec<f64>,
    xmax: Vec<f64>,
    /// Nominal axis index of each active axis.
    active: Vec<usize>,
    nfun: usize,
    grid: HermiteGrid,
    tolerance: Tolerance,
    seed: u64,
}

impl InterpTable {
    /// Build a table for `probe` over `[xmin, xmax]` with default options.
    ///
    /// # Arguments
    ///
    /// * `probe` - Function returning values and partials (see [`FunctionProbe`])
    /// * `ctx` - Immutable context passed to every probe call
    /// * `nfun` - Number of functions the probe returns
    /// * `xmin`, `xmax` - Box bounds, one entry per axis (1 to 3 axes)
    /// * `rel_tol` - Relative error target
    /// * `verbose` - Log refinement progress at info level
    pub fn new<P, Ctx>(
        probe: &P,
        ctx: &Ctx,
        nfun: usize,
        xmin: &[f64],
        xmax: &[f64],
        rel_tol: f64,
        verbose: bool,
    ) -> InterpolateResult<Self>
    where
        P: FunctionProbe<Ctx> + ?Sized,
        Ctx: Sync + ?Sized,
    {
        let options = TableOptions::default()
            .with_rel_tol(rel_tol)
            .with_verbose(verbose);
        Self::build(probe, ctx, nfun, xmin, xmax, &options)
    }

    /// Build a table for `probe` over `[xmin, xmax]`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The bounds are malformed (length, ordering, non-finite values)
    /// - The probe returns a non-finite value (`ProbeFailure`)
    /// - The tolerance cannot be met within the budget (`BuildNonConvergence`)
    pub fn build<P, Ctx>(
        probe: &P,
        ctx: &Ctx,
        nfun: usize,
        xmin: &[f64],
        xmax: &[f64],
        options: &TableOptions,
    ) -> InterpolateResult<Self>
    where
        P: FunctionProbe<Ctx> + ?Sized,
        Ctx: Sync + ?Sized,
    {
        options.validate()?;
        validate_box(nfun, xmin, xmax)?;

        let active: Vec<usize> = (0..xmin.len()).filter(|&d| xmin[d] < xmax[d]).collect();
        let bounds: Vec<(f64, f64)> = active.iter().map(|&d| (xmin[d], xmax[d])).collect();

        let grid = GridBuilder::new(probe, ctx, nfun, bounds, options)?.run()?;
        let table = Self {
            xmin: xmin.to_vec(),
            xmax: xmax.to_vec(),
            active,
            nfun,
            grid,
            tolerance: options.tolerance(),
            seed: options.seed,
        };

        if options.verbose {
            info!(nodes = ?table.node_counts(), vertices = table.num_vertices(), "interpolation table ready");
        }
        Ok(table)
    }

    /// Build a table on caller-supplied breakpoints, without refinement.
    ///
    /// Each entry of `grids` lists the breakpoints of one axis. A single
    /// breakpoint collapses that axis.
    pub fn from_grids<P, Ctx>(
        probe: &P,
        ctx: &Ctx,
        nfun: usize,
        grids: &[Vec<f64>],
        options: &TableOptions,
    ) -> InterpolateResult<Self>
    where
        P: FunctionProbe<Ctx> + ?Sized,
        Ctx: Sync + ?Sized,
    {
        options.validate()?;
        if grids.is_empty() || grids.len() > MAX_DIM {
            return Err(InterpolateError::InvalidParameter {
                parameter: "grids".to_string(),
                message: format!("expected 1 to {} axes, got {}", MAX_DIM, grids.len()),
            });
        }

        let mut xmin = Vec::with_capacity(grids.len());
        let mut xmax = Vec::with_capacity(grids.len());
        let mut active = Vec::new();
        let mut axes = Vec::new();
        for (d, points) in grids.iter().enumerate() {
            match points.as_slice() {
                [] => {
                    return Err(InterpolateError::InsufficientData {
                        required: 1,
                        actual: 0,
                        context: format!("InterpTable::from_grids axis {}", d),
                    })
                }
                [x] => {
                    xmin.push(*x);
                    xmax.push(*x);
                }
                _ => {
                    let axis = AxisGrid::new(points.clone())?;
                    xmin.push(axis.min());
                    xmax.push(axis.max());
                    active.push(d);
                    axes.push(axis);
                }
            }
        }
        validate_box(nfun, &xmin, &xmax)?;

        let bounds: Vec<(f64, f64)> = axes.iter().map(|a| (a.min(), a.max())).collect();
        let grid = GridBuilder::new(probe, ctx, nfun, bounds, options)?.assemble_fixed(axes)?;

        Ok(Self {
            xmin,
            xmax,
            active,
            nfun,
            grid,
            tolerance: options.tolerance(),
            seed: options.seed,
        })
    }

    /// Nominal number of axes (including collapsed ones).
    pub fn ndim(&self) -> usize {
        self.xmin.len()
    }

    /// Number of axes taking part in the tensor product.
    pub fn effective_dim(&self) -> usize {
        self.active.len()
    }

    /// Number of functions.
    pub fn nfun(&self) -> usize {
        self.nfun
    }

    /// Slots per function in [`evaluate_vd`](Self::evaluate_vd) output.
    pub fn num_slots(&self) -> usize {
        num_slots(self.effective_dim())
    }

    /// Breakpoint count of every nominal axis; collapsed axes report 1.
    pub fn node_counts(&self) -> Vec<usize> {
        (0..self.ndim())
            .map(|d| match self.active.iter().position(|&a| a == d) {
                Some(a) => self.grid.axes()[a].len(),
                None => 1,
            })
            .collect()
    }

    /// Breakpoints of nominal axis `d`, or `None` if that axis is collapsed.
    pub fn grid(&self, d: usize) -> Option<&AxisGrid> {
        self.active
            .iter()
            .position(|&a| a == d)
            .map(|a| &self.grid.axes()[a])
    }

    /// Nominal axis indices that take part in the tensor product.
    pub fn active_axes(&self) -> &[usize] {
        &self.active
    }

    /// Box bounds as `(min, max)` per nominal axis.
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.xmin.iter().copied().zip(self.xmax.iter().copied()).collect()
    }

    /// Number of stored grid vertices.
    pub fn num_vertices(&self) -> usize {
        self.grid.num_vertices()
    }

    /// Tolerance the table was built for.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }
}

fn validate_box(nfun: usize, xmin: &[f64], xmax: &[f64]) -> InterpolateResult<()> {
    if nfun == 0 {
        return Err(InterpolateError::InvalidParameter {
            parameter: "nfun".to_string(),
            message: "at least one function required".to_string(),
        });
    }
    if xmin.len() != xmax.len() {
        return Err(InterpolateError::ShapeMismatch {
            expected: xmin.len(),
            actual: xmax.len(),
            context: "InterpTable bounds (xmin vs xmax)".to_string(),
        });
    }
    if xmin.is_empty() || xmin.len() > MAX_DIM {
        return Err(InterpolateError::InvalidParameter {
            parameter: "xmin".to_string(),
            message: format!("expected 1 to {} axes, got {}", MAX_DIM, xmin.len()),
        });
    }
    for (d, (&lo, &hi)) in xmin.iter().zip(xmax).enumerate() {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(InterpolateError::InvalidParameter {
                parameter: format!("bounds[{}]", d),
                message: format!("bounds must be finite, got [{}, {}]", lo, hi),
            });
        }
        if lo > hi {
            return Err(InterpolateError::InvalidParameter {
                parameter: format!("bounds[{}]", d),
                message: format!("xmin {} exceeds xmax {}", lo, hi),
            });
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_probes::{gauss_poly, gaussian, GaussPolyContext};
    use super::*;
    use crate::interpolate::vertex::sigmas;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_point(rng: &mut ChaCha8Rng, xmin: &[f64], xmax: &[f64]) -> Vec<f64> {
        xmin.iter()
            .zip(xmax)
            .map(|(&lo, &hi)| if lo < hi { rng.gen_range(lo..hi) } else { lo })
            .collect()
    }

    fn assert_within_tolerance<P, Ctx>(
        table: &InterpTable,
        probe: &P,
        ctx: &Ctx,
        xmin: &[f64],
        xmax: &[f64],
        samples: usize,
    ) where
        P: FunctionProbe<Ctx>,
        Ctx: Sync,
    {
        let tol = table.tolerance();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut exact = vec![0.0; table.nfun() * table.num_slots()];
        for _ in 0..samples {
            let x = random_point(&mut rng, xmin, xmax);
            let reduced: Vec<f64> = table.active_axes().iter().map(|&d| x[d]).collect();
            probe.probe(&reduced, ctx, &mut exact);
            let values = table.evaluate(&x).unwrap();
            for f in 0..table.nfun() {
                let e = exact[f * table.num_slots()];
                assert!(
                    tol.accepts(values[f] - e, e),
                    "function {} at {:?}: {} vs {}",
                    f,
                    x,
                    values[f],
                    e
                );
            }
        }
    }

    #[test]
    fn test_tolerance_met_in_every_dimension() {
        let ctx = GaussPolyContext::new(0);
        let options = TableOptions::default().with_rel_tol(1e-5);
        let boxes: [(&[f64], &[f64]); 3] = [
            (&[-1.0], &[2.0]),
            (&[-1.0, -2.0], &[2.0, 3.0]),
            (&[-1.0, -1.0, -0.5], &[1.0, 1.5, 1.0]),
        ];

        for (xmin, xmax) in boxes {
            let table = InterpTable::build(&gauss_poly, &ctx, 3, xmin, xmax, &options).unwrap();
            assert_eq!(table.ndim(), xmin.len());
            assert_within_tolerance(&table, &gauss_poly, &ctx, xmin, xmax, 300);
        }
    }

    #[test]
    fn test_three_dimensional_gauss_poly() {
        let ctx = GaussPolyContext::new(0);
        let xmin = [-1.0, -2.0, -3.0];
        let xmax = [2.0, 3.0, 4.0];
        let options = TableOptions::default().with_rel_tol(1e-4);
        let table = InterpTable::build(&gauss_poly, &ctx, 3, &xmin, &xmax, &options).unwrap();

        let nodes = table.node_counts();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|&n| n >= 2 && n <= options.max_nodes_per_axis));

        let x = [0.123, -0.456, 1.789];
        let values = table.evaluate(&x).unwrap();
        let mut exact = vec![0.0; 3 * 8];
        gauss_poly(&x, &ctx, &mut exact);
        for f in 0..3 {
            let e = exact[f * 8];
            assert!(table.tolerance().accepts(values[f] - e, e), "f{} = {} vs {}", f, values[f], e);
        }

        let max_rel = table.sample_error(&gauss_poly, &ctx, None, 1000).unwrap();
        assert!(max_rel <= 10.0 * 1e-4, "max relative error {}", max_rel);
    }

    #[test]
    fn test_exact_at_vertices() {
        let ctx = GaussPolyContext::new(3);
        let options = TableOptions::default().with_rel_tol(1e-4);
        let table =
            InterpTable::build(&gauss_poly, &ctx, 3, &[-1.0, 0.0], &[1.0, 2.0], &options).unwrap();

        let xs = table.grid(0).unwrap().points().to_vec();
        let ys = table.grid(1).unwrap().points().to_vec();
        let mut exact = vec![0.0; 3 * 4];
        for &x in xs.iter().step_by(3) {
            for &y in ys.iter().step_by(2) {
                gauss_poly(&[x, y], &ctx, &mut exact);
                let vd = table.evaluate_vd(&[x, y]).unwrap();
                for f in 0..3 {
                    for s in sigmas(2) {
                        let e = exact[f * 4 + s.index()];
                        assert!(
                            (vd.get(f, s) - e).abs() <= 1e-12 * e.abs().max(1.0),
                            "f{} slot {} at ({}, {})",
                            f,
                            s.index(),
                            x,
                            y
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_boundary_queries_return_probe_values() {
        let options = TableOptions::default().with_rel_tol(1e-6);
        let xmin = [-1.5, -0.5];
        let xmax = [1.0, 2.0];
        let table = InterpTable::build(&gaussian, &1.2, 1, &xmin, &xmax, &options).unwrap();

        let mut exact = [0.0; 4];
        for corner in [[xmin[0], xmin[1]], [xmax[0], xmax[1]], [xmin[0], xmax[1]]] {
            gaussian(&corner, &1.2, &mut exact);
            let v = table.evaluate(&corner).unwrap();
            assert!((v[0] - exact[0]).abs() <= 1e-14 * exact[0].abs());
        }
    }

    #[test]
    fn test_out_of_domain() {
        let table = InterpTable::new(&gaussian, &1.0, 1, &[0.0, 0.0], &[1.0, 1.0], 1e-3, false)
            .unwrap();

        let result = table.evaluate(&[0.5, 1.5]);
        assert!(matches!(
            result,
            Err(InterpolateError::OutOfDomain { dimension: 1, .. })
        ));
        assert!(matches!(
            table.evaluate_vd(&[-0.1, 0.5]),
            Err(InterpolateError::OutOfDomain { dimension: 0, .. })
        ));
        assert!(matches!(
            table.evaluate(&[0.5]),
            Err(InterpolateError::DimensionMismatch { .. })
        ));
        assert!(table.evaluate(&[f64::NAN, 0.5]).is_err());
    }

    #[test]
    fn test_point_in_grid() {
        let table = InterpTable::new(&gaussian, &1.0, 1, &[-1.0, 2.0], &[1.0, 3.0], 1e-3, false)
            .unwrap();

        assert!(table.point_in_grid(&[-1.0, 2.0]));
        assert!(table.point_in_grid(&[1.0, 3.0]));
        assert!(table.point_in_grid(&[0.0, 2.5]));
        assert!(!table.point_in_grid(&[1.0 + 1e-12, 2.5]));
        assert!(!table.point_in_grid(&[0.0, 1.99]));
        assert!(!table.point_in_grid(&[0.0]));
        assert!(!table.point_in_grid(&[f64::NAN, 2.5]));

        assert!(table.covers(&[-0.5, 2.0], &[1.0, 2.9]));
        assert!(!table.covers(&[-0.5, 2.0], &[1.5, 2.9]));
    }

    #[test]
    fn test_tighter_tolerance_never_removes_nodes() {
        let xmin = [-2.0, -1.0];
        let xmax = [2.0, 3.0];
        let mut previous: Option<Vec<usize>> = None;

        for rel_tol in [1e-2, 1e-3, 1e-4, 1e-5, 1e-6] {
            let options = TableOptions::default().with_rel_tol(rel_tol);
            let table = InterpTable::build(&gaussian, &1.5, 1, &xmin, &xmax, &options).unwrap();
            let nodes = table.node_counts();
            if let Some(prev) = &previous {
                for (a, b) in prev.iter().zip(&nodes) {
                    assert!(b >= a, "node counts shrank from {:?} to {:?}", prev, nodes);
                }
            }
            previous = Some(nodes);
        }
    }

    #[test]
    fn test_non_separable_grids_nest_as_tolerance_tightens() {
        let probe = |x: &[f64], _: &(), out: &mut [f64]| {
            let (u, v) = (x[0], x[1]);
            let (s, c) = (4.0 * u * v).sin_cos();
            out[0] = s + 0.3;
            out[1] = 4.0 * v * c;
            out[2] = 4.0 * u * c;
            out[3] = 4.0 * c - 16.0 * u * v * s;
        };
        let mut previous: Option<InterpTable> = None;

        for k in 0..13 {
            let rel_tol = 1e-2 * 0.6f64.powi(k);
            let options = TableOptions::default().with_rel_tol(rel_tol);
            let table =
                InterpTable::build(&probe, &(), 1, &[-1.0, -0.5], &[1.2, 1.0], &options).unwrap();

            if let Some(prev) = &previous {
                for d in 0..2 {
                    let coarse = prev.grid(d).unwrap().points();
                    let fine = table.grid(d).unwrap().points();
                    assert!(
                        coarse.iter().all(|x| fine.contains(x)),
                        "axis {} lost nodes at rel_tol {:e}: {:?} -> {:?}",
                        d,
                        rel_tol,
                        prev.node_counts(),
                        table.node_counts()
                    );
                }
            }
            previous = Some(table);
        }
    }

    #[test]
    fn test_construction_is_deterministic() {
        let ctx = GaussPolyContext::new(11);
        let options = TableOptions::default().with_rel_tol(1e-4).with_workers(3);
        let xmin = [-1.0, -2.0, -0.5];
        let xmax = [1.0, 1.0, 0.5];

        let a = InterpTable::build(&gauss_poly, &ctx, 3, &xmin, &xmax, &options).unwrap();
        let b = InterpTable::build(&gauss_poly, &ctx, 3, &xmin, &xmax, &options).unwrap();

        for d in 0..3 {
            assert_eq!(a.grid(d), b.grid(d));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            let x = random_point(&mut rng, &xmin, &xmax);
            assert_eq!(a.evaluate_vd(&x).unwrap(), b.evaluate_vd(&x).unwrap());
        }
    }

    #[test]
    fn test_collapsed_axes_match_reduced_table() {
        let options = TableOptions::default().with_rel_tol(1e-6);
        let reduced = InterpTable::build(&gaussian, &0.8, 1, &[-1.0], &[2.0], &options).unwrap();
        let collapsed =
            InterpTable::build(&gaussian, &0.8, 1, &[0.5, -1.0, 3.0], &[0.5, 2.0, 3.0], &options)
                .unwrap();

        assert_eq!(collapsed.ndim(), 3);
        assert_eq!(collapsed.effective_dim(), 1);
        assert_eq!(collapsed.active_axes().to_vec(), vec![1]);
        assert_eq!(collapsed.node_counts()[0], 1);
        assert_eq!(collapsed.node_counts()[2], 1);
        assert_eq!(collapsed.grid(1), reduced.grid(0));
        assert!(collapsed.grid(0).is_none());

        for i in 0..=40 {
            let x = -1.0 + 3.0 * i as f64 / 40.0;
            assert_eq!(
                collapsed.evaluate_vd(&[0.5, x, 3.0]).unwrap(),
                reduced.evaluate_vd(&[x]).unwrap()
            );
        }

        // Collapsed coordinates must match exactly
        assert!(collapsed.evaluate(&[0.6, 0.0, 3.0]).is_err());
        assert!(!collapsed.point_in_grid(&[0.5, 0.0, 3.1]));
    }

    #[test]
    fn test_fully_collapsed_box() {
        let table = InterpTable::build(
            &gaussian,
            &1.0,
            1,
            &[0.5, 0.25],
            &[0.5, 0.25],
            &TableOptions::default(),
        )
        .unwrap();

        assert_eq!(table.effective_dim(), 0);
        assert_eq!(table.num_vertices(), 1);
        let v = table.evaluate(&[0.5, 0.25]).unwrap();
        let mut exact = [0.0];
        gaussian(&[], &1.0, &mut exact);
        assert_eq!(v[0], exact[0]);
    }

    #[test]
    fn test_from_grids() {
        let grids = vec![vec![-1.0, 0.0, 0.5, 1.0], vec![2.0], vec![0.0, 1.0, 2.0]];
        let table =
            InterpTable::from_grids(&gaussian, &2.0, 1, &grids, &TableOptions::default()).unwrap();

        assert_eq!(table.node_counts(), vec![4, 1, 3]);
        assert_eq!(table.bounds(), vec![(-1.0, 1.0), (2.0, 2.0), (0.0, 2.0)]);

        let mut exact = [0.0; 4];
        gaussian(&[0.5, 1.0], &2.0, &mut exact);
        let vd = table.evaluate_vd(&[0.5, 2.0, 1.0]).unwrap();
        for s in 0..4 {
            assert!((vd.to_flat()[s] - exact[s]).abs() < 1e-14);
        }

        let bad = vec![vec![0.0, 1.0, 0.5]];
        assert!(matches!(
            InterpTable::from_grids(&gaussian, &2.0, 1, &bad, &TableOptions::default()),
            Err(InterpolateError::NotMonotonic { .. })
        ));
    }

    #[test]
    fn test_invalid_construction_parameters() {
        let opts = TableOptions::default();
        assert!(matches!(
            InterpTable::build(&gaussian, &1.0, 1, &[0.0, 0.0], &[1.0], &opts),
            Err(InterpolateError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            InterpTable::build(&gaussian, &1.0, 1, &[1.0], &[0.0], &opts),
            Err(InterpolateError::InvalidParameter { .. })
        ));
        assert!(matches!(
            InterpTable::build(&gaussian, &1.0, 0, &[0.0], &[1.0], &opts),
            Err(InterpolateError::InvalidParameter { .. })
        ));
        assert!(matches!(
            InterpTable::build(&gaussian, &1.0, 1, &[0.0; 4], &[1.0; 4], &opts),
            Err(InterpolateError::InvalidParameter { .. })
        ));
        let streak = TableOptions::default().with_stable_streak(1);
        assert!(matches!(
            InterpTable::build(&gaussian, &1.0, 1, &[0.0], &[1.0], &streak),
            Err(InterpolateError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_probe_failure_aborts_build() {
        // log(x) is fine on [0.5, 2] and NaN below zero
        let probe = |x: &[f64], _: &(), out: &mut [f64]| {
            out[0] = x[0].ln();
            out[1] = 1.0 / x[0];
        };
        assert!(InterpTable::build(&probe, &(), 1, &[0.5], &[2.0], &TableOptions::default()).is_ok());

        let err = InterpTable::build(&probe, &(), 1, &[-1.0], &[2.0], &TableOptions::default())
            .unwrap_err();
        match err {
            InterpolateError::ProbeFailure { point, function, .. } => {
                assert_eq!(function, 0);
                assert!(point[0] < 0.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_node_budget_reports_non_convergence() {
        let options = TableOptions::default()
            .with_rel_tol(1e-10)
            .with_max_nodes_per_axis(8);
        let result = InterpTable::build(&gaussian, &0.1, 1, &[-3.0], &[3.0], &options);
        assert!(matches!(
            result,
            Err(InterpolateError::BuildNonConvergence { .. })
        ));
    }

    #[test]
    fn test_table_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InterpTable>();
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var(TOLERANCE_ENV, "2.5e-5");
        std::env::set_var(VERBOSE_ENV, "1");
        let options = TableOptions::default().with_env_overrides();
        std::env::remove_var(TOLERANCE_ENV);
        std::env::remove_var(VERBOSE_ENV);

        assert!((options.rel_tol - 2.5e-5).abs() < 1e-20);
        assert!(options.verbose);
    }
}
