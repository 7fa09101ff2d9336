//! Tensor-product Hermite evaluation and the table query surface.

use crate::interpolate::error::{InterpolateError, InterpolateResult};
use crate::interpolate::hermite_core::AxisBasis;
use crate::interpolate::probe::PackedValues;
use crate::interpolate::vertex::{num_slots, sigmas, MAX_DIM};

use super::grid::{Cell, HermiteGrid, Point};
use super::InterpTable;

impl HermiteGrid {
    /// Evaluate the interpolant inside `cell`.
    ///
    /// With `derivatives == false`, `out` receives one value per function.
    /// Otherwise `out` receives `nfun * 2^D` entries in probe order, slot σ
    /// holding the corresponding mixed partial of the interpolant.
    pub(crate) fn interpolate(&self, cell: &Cell, derivatives: bool, out: &mut [f64]) {
        let dim = self.dim();
        let nfun = self.nfun();
        let n_out = if derivatives { num_slots(dim) } else { 1 };
        debug_assert_eq!(out.len(), nfun * n_out);

        let bases: [AxisBasis; MAX_DIM] = std::array::from_fn(|d| {
            if d < dim {
                let pts = self.axes()[d].points();
                let h = pts[cell.index[d] + 1] - pts[cell.index[d]];
                AxisBasis::new(cell.t[d], h)
            } else {
                AxisBasis::new(0.0, 1.0)
            }
        });

        out.iter_mut().for_each(|v| *v = 0.0);

        for corner in sigmas(dim) {
            let records = self.vertex(self.corner_vertex(&cell.index, corner));
            for slot in sigmas(dim) {
                for tau in sigmas(dim).take(n_out) {
                    let mut weight = 1.0;
                    for (d, basis) in bases.iter().enumerate().take(dim) {
                        weight *= basis.weight(corner.bit(d), slot.bit(d), tau.has(d));
                    }
                    if weight == 0.0 {
                        continue;
                    }
                    for (f, record) in records.iter().enumerate() {
                        out[f * n_out + tau.index()] += weight * record.slot(slot.index());
                    }
                }
            }
        }
    }
}

impl InterpTable {
    /// Map a full coordinate to active coordinates, rejecting points outside the box.
    pub(crate) fn reduce(&self, x: &[f64], context: &str) -> InterpolateResult<Point> {
        if x.len() != self.ndim() {
            return Err(InterpolateError::DimensionMismatch {
                expected: self.ndim(),
                actual: x.len(),
                context: context.to_string(),
            });
        }

        for (d, &xd) in x.iter().enumerate() {
            let (min, max) = (self.xmin[d], self.xmax[d]);
            if !(xd >= min && xd <= max) {
                return Err(InterpolateError::OutOfDomain {
                    dimension: d,
                    point: xd,
                    min,
                    max,
                    context: context.to_string(),
                });
            }
        }

        let mut p = [0.0; MAX_DIM];
        for (a, &d) in self.active.iter().enumerate() {
            p[a] = x[d];
        }
        Ok(p)
    }

    fn check_output(&self, out: &[f64], expected: usize, context: &str) -> InterpolateResult<()> {
        if out.len() != expected {
            return Err(InterpolateError::ShapeMismatch {
                expected,
                actual: out.len(),
                context: context.to_string(),
            });
        }
        Ok(())
    }

    /// Cell containing `x`: interval index and local coordinate per active axis.
    pub fn locate(&self, x: &[f64]) -> InterpolateResult<Cell> {
        let p = self.reduce(x, "InterpTable::locate")?;
        Ok(self.grid.locate(&p[..self.effective_dim()]))
    }

    /// Interpolated values of all functions at `x`.
    ///
    /// # Errors
    ///
    /// `OutOfDomain` if any coordinate lies outside the table box,
    /// `DimensionMismatch` if `x` has the wrong length.
    pub fn evaluate(&self, x: &[f64]) -> InterpolateResult<Vec<f64>> {
        let mut out = vec![0.0; self.nfun];
        self.evaluate_into(x, &mut out)?;
        Ok(out)
    }

    /// Like [`evaluate`](Self::evaluate), writing into `out` (length `nfun`).
    pub fn evaluate_into(&self, x: &[f64], out: &mut [f64]) -> InterpolateResult<()> {
        self.check_output(out, self.nfun, "InterpTable::evaluate")?;
        let cell = self.locate(x)?;
        self.grid.interpolate(&cell, false, out);
        Ok(())
    }

    /// Interpolated values and partials of all functions at `x`.
    ///
    /// Slots follow the probe layout over the active axes, so the result can be
    /// compared directly with a probe call at the same point.
    pub fn evaluate_vd(&self, x: &[f64]) -> InterpolateResult<PackedValues> {
        let mut flat = vec![0.0; self.nfun * self.num_slots()];
        self.evaluate_vd_into(x, &mut flat)?;
        PackedValues::from_flat(&flat, self.nfun, self.effective_dim())
    }

    /// Like [`evaluate_vd`](Self::evaluate_vd), writing the flat layout into `out`.
    pub fn evaluate_vd_into(&self, x: &[f64], out: &mut [f64]) -> InterpolateResult<()> {
        self.check_output(out, self.nfun * self.num_slots(), "InterpTable::evaluate_vd")?;
        let cell = self.locate(x)?;
        self.grid.interpolate(&cell, true, out);
        Ok(())
    }

    /// Whether `x` lies inside the table box (bounds included).
    pub fn point_in_grid(&self, x: &[f64]) -> bool {
        x.len() == self.ndim()
            && x
                .iter()
                .zip(self.xmin.iter().zip(&self.xmax))
                .all(|(&xd, (&min, &max))| xd >= min && xd <= max)
    }

    /// Whether the box `[xmin, xmax]` lies inside the table box.
    pub fn covers(&self, xmin: &[f64], xmax: &[f64]) -> bool {
        self.point_in_grid(xmin) && self.point_in_grid(xmax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolate::probe::FunctionRecord;
    use crate::interpolate::table::grid::AxisGrid;
    use crate::interpolate::vertex::Sigma;

    /// f(x, y) = x³y² - 2xy + y³ with all four slots.
    fn bicubic(x: f64, y: f64) -> [f64; 4] {
        [
            x * x * x * y * y - 2.0 * x * y + y * y * y,
            3.0 * x * x * y * y - 2.0 * y,
            2.0 * x * x * x * y - 2.0 * x + 3.0 * y * y,
            6.0 * x * x * y - 2.0,
        ]
    }

    fn bicubic_grid() -> HermiteGrid {
        let axes = vec![
            AxisGrid::new(vec![-1.0, 0.5, 2.0]).unwrap(),
            AxisGrid::new(vec![0.0, 1.0, 1.5, 3.0]).unwrap(),
        ];
        let corners = HermiteGrid::vertex_points(&axes)
            .iter()
            .map(|p| FunctionRecord::from_slots(&bicubic(p[0], p[1])))
            .collect();
        HermiteGrid::new(axes, 1, corners).unwrap()
    }

    #[test]
    fn test_bicubic_reproduced_exactly() {
        // Tensor-product cubic Hermite reproduces polynomials of degree ≤ 3 per axis
        let grid = bicubic_grid();
        let mut out = [0.0; 4];

        for &(x, y) in &[(-0.3, 0.2), (1.7, 2.9), (0.5, 1.2), (2.0, 3.0)] {
            let cell = grid.locate(&[x, y]);
            grid.interpolate(&cell, true, &mut out);
            let exact = bicubic(x, y);
            for s in 0..4 {
                assert!(
                    (out[s] - exact[s]).abs() < 1e-10,
                    "slot {} at ({}, {}): {} vs {}",
                    s,
                    x,
                    y,
                    out[s],
                    exact[s]
                );
            }
        }
    }

    #[test]
    fn test_value_only_matches_full_evaluation() {
        let grid = bicubic_grid();
        let cell = grid.locate(&[0.1, 2.2]);
        let mut value = [0.0; 1];
        let mut full = [0.0; 4];
        grid.interpolate(&cell, false, &mut value);
        grid.interpolate(&cell, true, &mut full);
        assert!((value[0] - full[Sigma::VALUE.index()]).abs() < 1e-14);
    }

    #[test]
    fn test_vertices_exact() {
        // Non-polynomial corner data is still reproduced exactly at every vertex
        let axes = vec![
            AxisGrid::new(vec![0.0, 0.3, 1.0]).unwrap(),
            AxisGrid::new(vec![-2.0, -1.0]).unwrap(),
        ];
        let points = HermiteGrid::vertex_points(&axes);
        let corners: Vec<FunctionRecord> = points
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let i = i as f64;
                FunctionRecord::from_slots(&[i.sin(), i.cos(), i * 0.5, -i])
            })
            .collect();
        let grid = HermiteGrid::new(axes, 1, corners.clone()).unwrap();

        let mut out = [0.0; 4];
        for (p, rec) in points.iter().zip(&corners) {
            let cell = grid.locate(&p[..2]);
            grid.interpolate(&cell, true, &mut out);
            for s in sigmas(2) {
                assert!((out[s.index()] - rec.get(s)).abs() < 1e-13);
            }
        }
    }

    #[test]
    fn test_zero_dimensional_grid() {
        let records = vec![
            FunctionRecord::from_slots(&[3.0]),
            FunctionRecord::from_slots(&[-1.0]),
        ];
        let grid = HermiteGrid::new(Vec::new(), 2, records).unwrap();
        let cell = grid.locate(&[]);
        let mut out = [0.0; 2];
        grid.interpolate(&cell, false, &mut out);
        assert_eq!(out, [3.0, -1.0]);
    }
}
