//! Axis grids, the shared corner store, and cell location.

use crate::interpolate::error::{InterpolateError, InterpolateResult};
use crate::interpolate::hermite_core::{find_interval, validate_breakpoints};
use crate::interpolate::probe::FunctionRecord;
use crate::interpolate::vertex::{Sigma, MAX_DIM};

/// A coordinate in the active (non-collapsed) axes; unused entries are zero.
pub(crate) type Point = [f64; MAX_DIM];

/// Strictly increasing breakpoints of one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisGrid {
    points: Vec<f64>,
}

impl AxisGrid {
    /// Create an axis grid, validating length and ordering.
    pub fn new(points: Vec<f64>) -> InterpolateResult<Self> {
        validate_breakpoints(&points, "AxisGrid::new")?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Number of breakpoints.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.points[0]
    }

    pub fn max(&self) -> f64 {
        self.points[self.points.len() - 1]
    }

    /// Interval index and local coordinate of `x`, which must lie in `[min, max]`.
    #[inline]
    pub fn locate(&self, x: f64) -> (usize, f64) {
        let n = self.points.len();
        let lo = find_interval(&self.points, n, x);

        // x exactly at the upper bound maps to the last interval
        if lo == n - 2 && x == self.points[n - 1] {
            return (lo, 1.0);
        }

        let t = (x - self.points[lo]) / (self.points[lo + 1] - self.points[lo]);
        (lo, t.clamp(0.0, 1.0))
    }
}

/// Cell containing a query point: interval index and local coordinate per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub index: [usize; MAX_DIM],
    pub t: [f64; MAX_DIM],
}

/// Row-major multi-indices (last axis fastest) of a box with the given shape.
pub(crate) fn multi_indices(shape: &[usize]) -> Vec<[usize; MAX_DIM]> {
    let total: usize = shape.iter().product();
    let mut out = Vec::with_capacity(total);
    if total == 0 {
        return out;
    }

    let mut idx = [0usize; MAX_DIM];
    for _ in 0..total {
        out.push(idx);
        for d in (0..shape.len()).rev() {
            idx[d] += 1;
            if idx[d] < shape[d] {
                break;
            }
            idx[d] = 0;
        }
    }
    out
}

/// Tensor-product grid with corner data stored once per vertex.
#[derive(Debug, Clone)]
pub(crate) struct HermiteGrid {
    axes: Vec<AxisGrid>,
    strides: [usize; MAX_DIM],
    nfun: usize,
    /// `nfun` records per vertex, vertices in row-major order.
    corners: Vec<FunctionRecord>,
}

impl HermiteGrid {
    /// Assemble a grid from axes and per-vertex records.
    pub(crate) fn new(
        axes: Vec<AxisGrid>,
        nfun: usize,
        corners: Vec<FunctionRecord>,
    ) -> InterpolateResult<Self> {
        let mut strides = [0usize; MAX_DIM];
        let mut stride = 1;
        for d in (0..axes.len()).rev() {
            strides[d] = stride;
            stride *= axes[d].len();
        }

        if corners.len() != stride * nfun {
            return Err(InterpolateError::ShapeMismatch {
                expected: stride * nfun,
                actual: corners.len(),
                context: "HermiteGrid::new (corner records)".to_string(),
            });
        }

        Ok(Self {
            axes,
            strides,
            nfun,
            corners,
        })
    }

    /// Vertex coordinates in storage order.
    pub(crate) fn vertex_points(axes: &[AxisGrid]) -> Vec<Point> {
        let shape: Vec<usize> = axes.iter().map(AxisGrid::len).collect();
        multi_indices(&shape)
            .into_iter()
            .map(|idx| {
                let mut p = [0.0; MAX_DIM];
                for (d, axis) in axes.iter().enumerate() {
                    p[d] = axis.points()[idx[d]];
                }
                p
            })
            .collect()
    }

    pub(crate) fn dim(&self) -> usize {
        self.axes.len()
    }

    pub(crate) fn nfun(&self) -> usize {
        self.nfun
    }

    pub(crate) fn axes(&self) -> &[AxisGrid] {
        &self.axes
    }

    pub(crate) fn num_vertices(&self) -> usize {
        self.corners.len() / self.nfun
    }

    /// Records of all functions at a vertex.
    #[inline]
    pub(crate) fn vertex(&self, vertex: usize) -> &[FunctionRecord] {
        &self.corners[vertex * self.nfun..(vertex + 1) * self.nfun]
    }

    /// Storage index of the lower corner of `cell` displaced to `corner`.
    #[inline]
    pub(crate) fn corner_vertex(&self, index: &[usize; MAX_DIM], corner: Sigma) -> usize {
        (0..self.dim())
            .map(|d| (index[d] + corner.bit(d)) * self.strides[d])
            .sum()
    }

    /// Locate the cell containing `x` (active coordinates, already in range).
    #[inline]
    pub(crate) fn locate(&self, x: &[f64]) -> Cell {
        let mut cell = Cell {
            index: [0; MAX_DIM],
            t: [0.0; MAX_DIM],
        };
        for (d, axis) in self.axes.iter().enumerate() {
            let (i, t) = axis.locate(x[d]);
            cell.index[d] = i;
            cell.t[d] = t;
        }
        cell
    }

    /// Coordinates of the point at local position `t` inside cell `index`.
    pub(crate) fn cell_point(&self, index: &[usize; MAX_DIM], t: &[f64; MAX_DIM]) -> Point {
        let mut p = [0.0; MAX_DIM];
        for (d, axis) in self.axes.iter().enumerate() {
            let lo = axis.points()[index[d]];
            let hi = axis.points()[index[d] + 1];
            p[d] = lo + t[d] * (hi - lo);
        }
        p
    }
}
