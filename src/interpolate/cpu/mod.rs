//! CPU implementation of the Hermite table tensor surface.
//!
//! This module implements the table algorithm traits for CPU by delegating
//! to the generic implementations in `impl_generic/`.

mod hermite_table;
