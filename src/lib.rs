//! mdinterp - Adaptive Hermite Lookup Tables for Expensive Functions
//!
//! mdinterp memoizes expensive, analytically differentiable functions of one to
//! three variables. It builds a piecewise-cubic Hermite table that reproduces
//! the function within a caller-specified tolerance, then answers evaluation
//! requests far cheaper than calling the function again.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     caller probe                         │
//! │      (values + mixed first partials, pure in x, ctx)     │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ probed by
//! ┌──────────────────────────▼──────────────────────────────┐
//! │                    GridBuilder                           │
//! │   (axis refinement, box verification, probe cache)      │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ freezes into
//! ┌──────────────────────────▼──────────────────────────────┐
//! │                    InterpTable                           │
//! │  (cell location, tensor-product Hermite evaluation)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Current Modules
//!
//! - [`interpolate`] - Tables, probes, convergence helpers and the numr tensor surface
//!
//! # Example
//!
//! ```ignore
//! use mdinterp::interpolate::{InterpTable, TableOptions};
//!
//! // exp(-x² - y²) on [-1, 1]², probed with f, ∂f/∂x, ∂f/∂y, ∂²f/∂x∂y
//! let probe = |x: &[f64], _: &(), out: &mut [f64]| {
//!     let f = (-x[0] * x[0] - x[1] * x[1]).exp();
//!     out[0] = f;
//!     out[1] = -2.0 * x[0] * f;
//!     out[2] = -2.0 * x[1] * f;
//!     out[3] = 4.0 * x[0] * x[1] * f;
//! };
//!
//! let table = InterpTable::new(&probe, &(), 1, &[-1.0, -1.0], &[1.0, 1.0], 1e-6, false)?;
//! let f = table.evaluate(&[0.25, -0.5])?;
//! let vd = table.evaluate_vd(&[0.25, -0.5])?;
//! ```
//!
//! # Logging
//!
//! Construction emits `tracing` events (`debug` per refinement pass, `info`
//! when verbose). The library never installs a subscriber.

pub mod interpolate;

pub use interpolate::{
    FunctionProbe, HermiteTableAlgorithms, InterpTable, InterpolateError, InterpolateResult,
    PackedValues, TableOptions,
};

// Re-export numr types that users will commonly need
pub use numr::runtime::{Runtime, RuntimeClient};
pub use numr::tensor::Tensor;
