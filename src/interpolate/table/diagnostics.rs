//! Sampled error reports.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::interpolate::error::{InterpolateError, InterpolateResult};
use crate::interpolate::probe::{probe_checked, FunctionProbe};
use crate::interpolate::vertex::{sigmas, slot_label};

use super::InterpTable;

const WRITER_PATH: &str = "<writer>";

fn report_error(err: io::Error) -> InterpolateError {
    InterpolateError::Report {
        path: WRITER_PATH.to_string(),
        message: err.to_string(),
    }
}

impl InterpTable {
    /// Compare the table with `probe` at random points inside the box.
    ///
    /// Points are drawn uniformly from the box with a generator seeded from
    /// [`TableOptions::seed`](super::TableOptions::seed), so repeated calls
    /// sample the same points. If `output` is given, a report with one line
    /// per sample is written there (see [`sample_error_to`](Self::sample_error_to)).
    ///
    /// Returns the largest relative error of any function value.
    pub fn sample_error<P, Ctx>(
        &self,
        probe: &P,
        ctx: &Ctx,
        output: Option<&Path>,
        samples: usize,
    ) -> InterpolateResult<f64>
    where
        P: FunctionProbe<Ctx> + ?Sized,
        Ctx: Sync + ?Sized,
    {
        let Some(path) = output else {
            return self.sample_error_to(probe, ctx, io::sink(), samples);
        };

        let with_path = |err: InterpolateError| match err {
            InterpolateError::Report { message, .. } => InterpolateError::Report {
                path: path.display().to_string(),
                message,
            },
            other => other,
        };
        let file = File::create(path).map_err(|e| with_path(report_error(e)))?;
        self.sample_error_to(probe, ctx, BufWriter::new(file), samples)
            .map_err(with_path)
    }

    /// Like [`sample_error`](Self::sample_error), writing the report to `writer`.
    ///
    /// The report starts with a `#` header naming the columns. Each following
    /// line holds the sample coordinates, then for every function and every
    /// slot (function-major, slots in probe order) the exact value, the
    /// interpolated value, the absolute error and the relative error.
    pub fn sample_error_to<P, Ctx, W>(
        &self,
        probe: &P,
        ctx: &Ctx,
        mut writer: W,
        samples: usize,
    ) -> InterpolateResult<f64>
    where
        P: FunctionProbe<Ctx> + ?Sized,
        Ctx: Sync + ?Sized,
        W: Write,
    {
        if samples == 0 {
            return Err(InterpolateError::InvalidParameter {
                parameter: "samples".to_string(),
                message: "at least one sample required".to_string(),
            });
        }

        let points = self.sample_points(samples);
        let nfun = self.nfun;
        let exact: Vec<Vec<f64>> = points
            .par_iter()
            .map(|x| {
                let reduced: Vec<f64> = self.active.iter().map(|&d| x[d]).collect();
                probe_checked(probe, ctx, &reduced, nfun)
            })
            .collect::<InterpolateResult<_>>()?;

        self.write_header(&mut writer).map_err(report_error)?;

        let nvd = self.num_slots();
        let dim = self.effective_dim();
        let mut interp = vec![0.0; nfun * nvd];
        let mut max_rel = 0.0f64;

        for (x, exact) in points.iter().zip(&exact) {
            self.evaluate_vd_into(x, &mut interp)?;

            let mut line = String::new();
            for xd in x {
                line.push_str(&format!("{:.16e} ", xd));
            }
            for f in 0..nfun {
                for sigma in sigmas(dim) {
                    let i = f * nvd + sigma.index();
                    let abs = (exact[i] - interp[i]).abs();
                    let rel = self.tolerance.relative_error(exact[i], interp[i]);
                    if sigma.index() == 0 {
                        max_rel = max_rel.max(rel);
                    }
                    line.push_str(&format!(
                        "{:.16e} {:.16e} {:.6e} {:.6e} ",
                        exact[i], interp[i], abs, rel
                    ));
                }
            }
            writeln!(writer, "{}", line.trim_end()).map_err(report_error)?;
        }
        writer.flush().map_err(report_error)?;

        if max_rel > self.tolerance.rel_tol {
            warn!(
                max_rel,
                rel_tol = self.tolerance.rel_tol,
                samples,
                "sampled error exceeds tolerance"
            );
        } else {
            debug!(max_rel, samples, "sampled table error");
        }
        Ok(max_rel)
    }

    /// Uniform random points in the box; collapsed axes keep their fixed value.
    fn sample_points(&self, samples: usize) -> Vec<Vec<f64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..samples)
            .map(|_| {
                self.xmin
                    .iter()
                    .zip(&self.xmax)
                    .map(|(&lo, &hi)| if lo < hi { rng.gen_range(lo..=hi) } else { lo })
                    .collect()
            })
            .collect()
    }

    fn write_header<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut header = String::from("#");
        for d in 0..self.ndim() {
            header.push_str(&format!(" x{}", d));
        }
        for f in 0..self.nfun {
            for sigma in sigmas(self.effective_dim()) {
                let label = slot_label(sigma, self.effective_dim());
                for column in ["exact", "interp", "abs", "rel"] {
                    header.push_str(&format!(" f{}.{}.{}", f, label, column));
                }
            }
        }
        writeln!(writer, "{}", header)
    }
}
