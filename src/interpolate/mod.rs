//! Adaptive Hermite interpolation tables.
//!
//! This module memoizes expensive, analytically differentiable functions of up
//! to three variables. A caller supplies a probe that returns values and all
//! mixed first partials; [`InterpTable`] refines a rectilinear grid until the
//! tensor-product cubic Hermite interpolant meets the requested tolerance and
//! then answers queries from the stored corner data alone.
//!
//! # Module Organization
//!
//! - [`vertex`] - Corner/derivative-slot enumeration ([`Sigma`])
//! - [`probe`] - The probe contract and packed value/derivative records
//! - [`table`] - Grid construction, evaluation and diagnostics
//! - [`convergence`] - Tolerances, debounced convergence, series summation
//! - [`hermite_core`] - 1-D Hermite basis shared by builder and evaluator
//!
//! Batch evaluation of query tensors goes through [`HermiteTableAlgorithms`],
//! implemented for numr's CPU client.
//!
//! # Example
//!
//! ```ignore
//! use mdinterp::interpolate::{HermiteTableAlgorithms, InterpTable, TableOptions};
//! use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
//! use numr::tensor::Tensor;
//!
//! // f(x) = sin(x) with its derivative
//! let probe = |x: &[f64], _: &(), out: &mut [f64]| {
//!     out[0] = x[0].sin();
//!     out[1] = x[0].cos();
//! };
//! let table = InterpTable::build(&probe, &(), 1, &[0.0], &[3.0], &TableOptions::default())?;
//!
//! let device = CpuDevice::new();
//! let client = CpuClient::new(device.clone());
//! let xi = Tensor::<CpuRuntime>::from_slice(&[0.5, 1.5, 2.5], &[3, 1], &device);
//! let values = client.hermite_table_evaluate(&table, &xi)?;
//! ```

pub mod convergence;
mod cpu;
mod error;
pub mod hermite_core;
pub mod impl_generic;
pub mod probe;
pub mod table;
pub mod traits;
pub mod vertex;

pub use convergence::{sum_series, SeriesSum, StableConvergenceDetector, Tolerance};
pub use error::{InterpolateError, InterpolateResult};
pub use probe::{FunctionProbe, FunctionRecord, PackedValues};
pub use table::{AxisGrid, Cell, InterpTable, TableOptions, TOLERANCE_ENV, VERBOSE_ENV};
pub use traits::HermiteTableAlgorithms;
pub use vertex::{num_slots, sigmas, slot_label, Sigma, MAX_DIM};
