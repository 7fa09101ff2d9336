//! Adaptive grid construction.
//!
//! Construction runs in two stages:
//!
//! 1. **Axis refinement.** Each active axis is bisected on its own. A pending
//!    interval is checked by comparing the 1-D Hermite interpolant from its
//!    endpoints against the probe, along a few cross lines where the other
//!    axes are pinned at fixed fractions of the box. An interval is accepted
//!    after `stable_streak` consecutive passing checks; one failure splits it.
//! 2. **Verification.** Starting from the whole box, each dyadic box is
//!    checked at interior points against the tensor interpolant of its own
//!    corners with the full tolerance. A failing box is halved on every
//!    active axis and its midpoints become nodes. The table grid is the union
//!    of both stages' nodes.
//!
//! Whether an interval or box is split depends only on its own position, the
//! probe and the tolerance, and a tighter tolerance never turns a failing
//! check into a passing one. Grids built with tighter tolerances therefore
//! contain every node of looser ones.
//!
//! Probe results are cached by coordinate, so each point (and in particular
//! each grid vertex) is probed at most once. The probe calls of a pass are
//! independent and run on a rayon pool.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::interpolate::convergence::{StableConvergenceDetector, Tolerance};
use crate::interpolate::error::{InterpolateError, InterpolateResult};
use crate::interpolate::hermite_core::{hermite_eval, HermitePoint};
use crate::interpolate::probe::{probe_checked, FunctionProbe, FunctionRecord};
use crate::interpolate::vertex::{num_slots, sigmas, Sigma, MAX_DIM};

use super::grid::{multi_indices, AxisGrid, Cell, HermiteGrid, Point};
use super::TableOptions;

/// Local positions of successive checks on a pending interval, indexed by streak.
pub(crate) const CHECK_POINTS: [f64; 8] = [0.5, 0.25, 0.75, 0.125, 0.875, 0.375, 0.625, 1.0 / 3.0];

/// Fractions of the box at which cross axes are pinned during axis refinement.
pub(crate) const CROSS_FRACTIONS: [f64; 5] = [0.0, 1.0, 0.5, 0.25, 0.75];

/// Local positions at which a cell is verified.
static VERIFY_POINTS: [[f64; MAX_DIM]; 8] = [
    [0.5, 0.5, 0.5],
    [0.25, 0.75, 0.25],
    [0.75, 0.25, 0.75],
    [0.25, 0.25, 0.25],
    [0.75, 0.75, 0.75],
    [0.375, 0.625, 0.375],
    [0.625, 0.375, 0.625],
    [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
];

type ProbeKey = [u64; MAX_DIM];

#[inline]
fn probe_key(p: &Point) -> ProbeKey {
    // -0.0 + 0.0 == +0.0, so both zeros share a key
    std::array::from_fn(|d| (p[d] + 0.0).to_bits())
}

#[inline]
fn with_coord(line: &Point, axis: usize, x: f64) -> Point {
    let mut p = *line;
    p[axis] = x;
    p
}

fn insert_sorted(points: &mut Vec<f64>, x: f64) {
    let pos = points.partition_point(|&v| v < x);
    points.insert(pos, x);
}

/// Insert `x` unless it is already a node.
fn insert_node(points: &mut Vec<f64>, x: f64) {
    let pos = points.partition_point(|&v| v < x);
    if points.get(pos) != Some(&x) {
        points.insert(pos, x);
    }
}

/// A box of the dyadic subdivision of the active bounds.
///
/// Midpoints are computed the same way as during axis refinement, so a box
/// edge and an axis node at the same dyadic position are equal as `f64`.
#[derive(Debug, Clone, Copy)]
struct DyadicBox {
    lo: Point,
    hi: Point,
    depth: usize,
}

impl DyadicBox {
    fn root(bounds: &[(f64, f64)]) -> Self {
        let mut b = Self {
            lo: [0.0; MAX_DIM],
            hi: [0.0; MAX_DIM],
            depth: 0,
        };
        for (d, &(lo, hi)) in bounds.iter().enumerate() {
            b.lo[d] = lo;
            b.hi[d] = hi;
        }
        b
    }

    fn breakpoints(&self, dim: usize) -> Vec<Vec<f64>> {
        (0..dim).map(|d| vec![self.lo[d], self.hi[d]]).collect()
    }

    fn corners(&self, dim: usize) -> impl Iterator<Item = Point> + '_ {
        sigmas(dim).map(move |corner| {
            std::array::from_fn(|d| if corner.bit(d) == 1 { self.hi[d] } else { self.lo[d] })
        })
    }

    fn point(&self, t: &[f64; MAX_DIM]) -> Point {
        std::array::from_fn(|d| self.lo[d] + t[d] * (self.hi[d] - self.lo[d]))
    }

    /// The `2^dim` halves of this box, or `None` if an edge cannot be split in `f64`.
    fn bisect(&self, dim: usize) -> Option<Vec<DyadicBox>> {
        let mut mid = [0.0; MAX_DIM];
        for d in 0..dim {
            mid[d] = 0.5 * (self.lo[d] + self.hi[d]);
            if !(mid[d] > self.lo[d] && mid[d] < self.hi[d]) {
                return None;
            }
        }

        let children = sigmas(dim)
            .map(|corner| {
                let mut child = Self {
                    lo: self.lo,
                    hi: self.hi,
                    depth: self.depth + 1,
                };
                for d in 0..dim {
                    if corner.bit(d) == 1 {
                        child.lo[d] = mid[d];
                    } else {
                        child.hi[d] = mid[d];
                    }
                }
                child
            })
            .collect();
        Some(children)
    }
}

/// An axis interval awaiting acceptance.
#[derive(Debug, Clone)]
struct Interval {
    lo: f64,
    hi: f64,
    depth: usize,
    detector: StableConvergenceDetector,
}

impl Interval {
    fn new(lo: f64, hi: f64, depth: usize, streak: usize) -> Self {
        Self {
            lo,
            hi,
            depth,
            detector: StableConvergenceDetector::new(streak),
        }
    }

    fn check_point(&self) -> f64 {
        let t = CHECK_POINTS[self.detector.streak()];
        self.lo + t * (self.hi - self.lo)
    }
}

/// Drives probe calls and refinement for one table.
pub(crate) struct GridBuilder<'a, P: ?Sized, Ctx: ?Sized> {
    probe: &'a P,
    ctx: &'a Ctx,
    nfun: usize,
    /// Bounds of the active axes.
    bounds: Vec<(f64, f64)>,
    options: &'a TableOptions,
    tolerance: Tolerance,
    cache: HashMap<ProbeKey, Vec<f64>>,
    pool: Option<rayon::ThreadPool>,
    probe_calls: usize,
}

impl<'a, P, Ctx> GridBuilder<'a, P, Ctx>
where
    P: FunctionProbe<Ctx> + ?Sized,
    Ctx: Sync + ?Sized,
{
    pub(crate) fn new(
        probe: &'a P,
        ctx: &'a Ctx,
        nfun: usize,
        bounds: Vec<(f64, f64)>,
        options: &'a TableOptions,
    ) -> InterpolateResult<Self> {
        let pool = match options.workers {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| InterpolateError::InvalidParameter {
                        parameter: "workers".to_string(),
                        message: e.to_string(),
                    })?,
            ),
            None => None,
        };

        Ok(Self {
            probe,
            ctx,
            nfun,
            bounds,
            options,
            tolerance: options.tolerance(),
            cache: HashMap::new(),
            pool,
            probe_calls: 0,
        })
    }

    fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// Refine, verify and freeze the grid.
    pub(crate) fn run(mut self) -> InterpolateResult<HermiteGrid> {
        let mut breakpoints: Vec<Vec<f64>> =
            self.bounds.iter().map(|&(lo, hi)| vec![lo, hi]).collect();

        let passes = self.refine_axes(&mut breakpoints)?;
        let grid = if self.dim() == 0 || !self.options.verify {
            self.check_grid_budget(&breakpoints, passes)?;
            self.assemble(&breakpoints)?
        } else {
            self.verify(breakpoints, passes)?
        };

        debug!(
            probes = self.probe_calls,
            cached = self.cache.len(),
            vertices = grid.num_vertices(),
            "grid construction finished"
        );
        Ok(grid)
    }

    /// Probe the vertices of fixed axes, without refinement.
    pub(crate) fn assemble_fixed(mut self, axes: Vec<AxisGrid>) -> InterpolateResult<HermiteGrid> {
        let breakpoints: Vec<Vec<f64>> = axes.iter().map(|a| a.points().to_vec()).collect();
        self.check_grid_budget(&breakpoints, 0)?;
        self.assemble(&breakpoints)
    }

    /// Probe every point not yet in the cache.
    ///
    /// Results are stored in input order, so the first failing point in
    /// `points` is the one reported.
    fn probe_points(&mut self, points: &[Point]) -> InterpolateResult<()> {
        let dim = self.dim();
        let mut seen = HashSet::new();
        let missing: Vec<Point> = points
            .iter()
            .filter(|p| {
                let key = probe_key(p);
                !self.cache.contains_key(&key) && seen.insert(key)
            })
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let (probe, ctx, nfun) = (self.probe, self.ctx, self.nfun);
        let run = || -> Vec<InterpolateResult<Vec<f64>>> {
            missing
                .par_iter()
                .map(|p| probe_checked(probe, ctx, &p[..dim], nfun))
                .collect()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        self.probe_calls += missing.len();
        for (p, result) in missing.iter().zip(results) {
            self.cache.insert(probe_key(p), result?);
        }
        Ok(())
    }

    /// Cached probe output at `p`, which must have been probed.
    #[inline]
    fn cached(&self, p: &Point) -> &[f64] {
        &self.cache[&probe_key(p)]
    }

    /// Points along which axis `axis` is checked, with that axis set to zero.
    fn cross_lines(&self, axis: usize) -> Vec<Point> {
        let k = self.options.cross_samples;
        let shape: Vec<usize> = (0..self.dim()).map(|d| if d == axis { 1 } else { k }).collect();

        multi_indices(&shape)
            .into_iter()
            .map(|idx| {
                let mut p = [0.0; MAX_DIM];
                for (d, &(lo, hi)) in self.bounds.iter().enumerate() {
                    p[d] = lo + CROSS_FRACTIONS[idx[d]] * (hi - lo);
                }
                p
            })
            .collect()
    }

    /// Stage 1: bisect each axis until its 1-D interpolant meets the split tolerance.
    ///
    /// Returns the number of passes used.
    fn refine_axes(&mut self, breakpoints: &mut [Vec<f64>]) -> InterpolateResult<usize> {
        let dim = self.dim();
        let streak = self.options.stable_streak;
        let tol = self.tolerance.split(2 * dim);
        let lines: Vec<Vec<Point>> = (0..dim).map(|a| self.cross_lines(a)).collect();
        let mut pending: Vec<Vec<Interval>> = self
            .bounds
            .iter()
            .map(|&(lo, hi)| vec![Interval::new(lo, hi, 0, streak)])
            .collect();

        for pass in 0..self.options.max_passes {
            let open: usize = pending.iter().map(Vec::len).sum();
            if open == 0 {
                return Ok(pass);
            }

            let mut points = Vec::with_capacity(3 * open * lines.first().map_or(1, Vec::len));
            for (a, intervals) in pending.iter().enumerate() {
                for iv in intervals {
                    let x = iv.check_point();
                    for line in &lines[a] {
                        points.push(with_coord(line, a, iv.lo));
                        points.push(with_coord(line, a, iv.hi));
                        points.push(with_coord(line, a, x));
                    }
                }
            }
            self.probe_points(&points)?;

            for a in 0..dim {
                let mut next = Vec::with_capacity(pending[a].len());
                for mut iv in std::mem::take(&mut pending[a]) {
                    let passed = self.axis_check(a, &iv, &lines[a], &tol);
                    if iv.detector.observe(passed) {
                        continue;
                    }
                    if passed {
                        next.push(iv);
                        continue;
                    }

                    let mid = 0.5 * (iv.lo + iv.hi);
                    if iv.depth >= self.options.max_depth || !(mid > iv.lo && mid < iv.hi) {
                        let reason = format!(
                            "interval [{}, {}] on axis {} reached the bisection depth limit",
                            iv.lo, iv.hi, a
                        );
                        return Err(self.non_convergence(reason, pass + 1, breakpoints));
                    }
                    if breakpoints[a].len() >= self.options.max_nodes_per_axis {
                        let reason = format!(
                            "axis {} reached the limit of {} nodes",
                            a, self.options.max_nodes_per_axis
                        );
                        return Err(self.non_convergence(reason, pass + 1, breakpoints));
                    }

                    insert_sorted(&mut breakpoints[a], mid);
                    next.push(Interval::new(iv.lo, mid, iv.depth + 1, streak));
                    next.push(Interval::new(mid, iv.hi, iv.depth + 1, streak));
                }
                pending[a] = next;
            }

            self.check_grid_budget(breakpoints, pass + 1)?;
            self.report_pass("axis", pass + 1, breakpoints, open);
        }

        if pending.iter().all(Vec::is_empty) {
            return Ok(self.options.max_passes);
        }
        let reason = format!(
            "axis refinement did not settle within {} passes",
            self.options.max_passes
        );
        Err(self.non_convergence(reason, self.options.max_passes, breakpoints))
    }

    /// Compare the 1-D interpolant of `iv` with the probe along every line.
    fn axis_check(&self, axis: usize, iv: &Interval, lines: &[Point], tol: &Tolerance) -> bool {
        let nvd = num_slots(self.dim());
        let slope = Sigma::axis(axis).index();
        let x = iv.check_point();

        lines.iter().all(|line| {
            let lo = self.cached(&with_coord(line, axis, iv.lo));
            let hi = self.cached(&with_coord(line, axis, iv.hi));
            let exact = self.cached(&with_coord(line, axis, x));

            (0..self.nfun).all(|f| {
                let s = f * nvd;
                let point = HermitePoint {
                    x0: iv.lo,
                    x1: iv.hi,
                    y0: lo[s],
                    y1: hi[s],
                    d0: lo[s + slope],
                    d1: hi[s + slope],
                };
                tol.accepts(hermite_eval(&point, x) - exact[s], exact[s])
            })
        })
    }

    /// Stage 2: walk the dyadic subdivision of the box, splitting boxes that fail.
    ///
    /// Returns the grid on the union of the axis-stage nodes and the midpoints
    /// of every failed box.
    fn verify(
        &mut self,
        mut nodes: Vec<Vec<f64>>,
        axis_passes: usize,
    ) -> InterpolateResult<HermiteGrid> {
        let dim = self.dim();
        let checks = &VERIFY_POINTS[..self.options.stable_streak];
        let mut buf = vec![0.0; self.nfun];
        let mut level = vec![DyadicBox::root(&self.bounds)];

        for pass in 0..self.options.max_passes {
            let passes = axis_passes + pass;
            if level.is_empty() {
                self.check_grid_budget(&nodes, passes)?;
                return self.assemble(&nodes);
            }

            let mut samples = Vec::with_capacity(level.len() * (checks.len() + (1 << dim)));
            for b in &level {
                samples.extend(b.corners(dim));
                samples.extend(checks.iter().map(|t| b.point(t)));
            }
            self.probe_points(&samples)?;

            let mut next = Vec::new();
            for b in &level {
                let cell = self.assemble(&b.breakpoints(dim))?;
                let points: Vec<Point> =
                    checks.iter().map(|t| cell.cell_point(&[0; MAX_DIM], t)).collect();
                if self.cell_check(&cell, &[0; MAX_DIM], checks, &points, &mut buf) {
                    continue;
                }

                if b.depth >= self.options.max_depth {
                    let reason = format!(
                        "box {:?}..{:?} reached the bisection depth limit",
                        &b.lo[..dim],
                        &b.hi[..dim]
                    );
                    return Err(self.non_convergence(reason, passes + 1, &nodes));
                }
                let Some(children) = b.bisect(dim) else {
                    let reason = format!(
                        "box {:?}..{:?} became too narrow to split",
                        &b.lo[..dim],
                        &b.hi[..dim]
                    );
                    return Err(self.non_convergence(reason, passes + 1, &nodes));
                };
                for (a, points) in nodes.iter_mut().enumerate() {
                    insert_node(points, 0.5 * (b.lo[a] + b.hi[a]));
                }
                next.extend(children);
            }

            if let Some(a) = (0..dim).find(|&a| nodes[a].len() > self.options.max_nodes_per_axis) {
                let reason = format!(
                    "axis {} reached the limit of {} nodes during verification",
                    a, self.options.max_nodes_per_axis
                );
                return Err(self.non_convergence(reason, passes + 1, &nodes));
            }
            self.check_grid_budget(&nodes, passes + 1)?;
            self.report_pass("verify", passes + 1, &nodes, next.len() >> dim);
            level = next;
        }

        if level.is_empty() {
            return self.assemble(&nodes);
        }
        let reason = format!(
            "verification did not settle within {} passes",
            self.options.max_passes
        );
        Err(self.non_convergence(reason, axis_passes + self.options.max_passes, &nodes))
    }

    /// Whether the interpolant matches the probe at every check point of a cell.
    fn cell_check(
        &self,
        grid: &HermiteGrid,
        index: &[usize; MAX_DIM],
        checks: &[[f64; MAX_DIM]],
        points: &[Point],
        buf: &mut [f64],
    ) -> bool {
        let nvd = num_slots(self.dim());
        let mut detector = StableConvergenceDetector::new(checks.len());

        for (t, p) in checks.iter().zip(points) {
            grid.interpolate(&Cell { index: *index, t: *t }, false, buf);
            let exact = self.cached(p);
            let passed = buf
                .iter()
                .enumerate()
                .all(|(f, v)| self.tolerance.accepts(v - exact[f * nvd], exact[f * nvd]));
            if !detector.observe(passed) && !passed {
                return false;
            }
        }
        detector.is_converged()
    }

    /// Probe all vertices of `breakpoints` and freeze them into a grid.
    fn assemble(&mut self, breakpoints: &[Vec<f64>]) -> InterpolateResult<HermiteGrid> {
        let axes = breakpoints
            .iter()
            .map(|points| AxisGrid::new(points.clone()))
            .collect::<InterpolateResult<Vec<_>>>()?;
        let vertices = HermiteGrid::vertex_points(&axes);
        self.probe_points(&vertices)?;

        let nvd = num_slots(self.dim());
        let mut corners = Vec::with_capacity(vertices.len() * self.nfun);
        for p in &vertices {
            corners.extend(self.cached(p).chunks_exact(nvd).map(FunctionRecord::from_slots));
        }
        HermiteGrid::new(axes, self.nfun, corners)
    }

    fn check_grid_budget(&self, breakpoints: &[Vec<f64>], passes: usize) -> InterpolateResult<()> {
        let total: usize = breakpoints.iter().map(Vec::len).product();
        if total > self.options.max_grid_points {
            let reason = format!(
                "grid needs {} vertices, limit is {}",
                total, self.options.max_grid_points
            );
            return Err(self.non_convergence(reason, passes, breakpoints));
        }
        Ok(())
    }

    fn non_convergence(
        &self,
        reason: String,
        passes: usize,
        breakpoints: &[Vec<f64>],
    ) -> InterpolateError {
        InterpolateError::BuildNonConvergence {
            reason,
            passes,
            nodes: breakpoints.iter().map(Vec::len).collect(),
        }
    }

    fn report_pass(&self, stage: &'static str, pass: usize, breakpoints: &[Vec<f64>], open: usize) {
        let nodes: Vec<usize> = breakpoints.iter().map(Vec::len).collect();
        if self.options.verbose {
            info!(stage, pass, ?nodes, open, probes = self.probe_calls, "refinement pass");
        } else {
            debug!(stage, pass, ?nodes, open, probes = self.probe_calls, "refinement pass");
        }
    }
}
