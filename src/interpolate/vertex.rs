//! Corner and derivative-slot enumeration for D-dimensional boxes.
//!
//! A [`Sigma`] is a D-bit selector. Bit `d` set means "axis `d`": for a probe
//! slot it selects the first derivative along axis `d`, for a cell corner it
//! selects the upper endpoint along axis `d`. Both uses share the single
//! enumeration in [`sigmas`], so the slot order produced by probes and the
//! order consumed by the evaluator cannot drift apart.
//!
//! ```text
//! D = 2:   σ = 0b00  f
//!          σ = 0b01  ∂f/∂x0
//!          σ = 0b10  ∂f/∂x1
//!          σ = 0b11  ∂²f/∂x0∂x1
//! ```

/// Largest supported table dimension.
pub const MAX_DIM: usize = 3;

/// Number of slots per function record at [`MAX_DIM`].
pub const MAX_SLOTS: usize = 1 << MAX_DIM;

/// Bit-vector selecting a value/derivative slot or a cell corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Sigma(u8);

impl Sigma {
    /// The value slot / lower corner.
    pub const VALUE: Sigma = Sigma(0);

    /// Selector with only `axis` set.
    #[inline]
    pub fn axis(axis: usize) -> Self {
        debug_assert!(axis < MAX_DIM);
        Sigma(1 << axis)
    }

    /// Position of this selector in canonical order.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether axis `d` is selected.
    #[inline]
    pub fn has(self, d: usize) -> bool {
        (self.0 >> d) & 1 == 1
    }

    /// Bit `d` as 0 or 1, for indexing per-axis tables.
    #[inline]
    pub fn bit(self, d: usize) -> usize {
        ((self.0 >> d) & 1) as usize
    }

    /// Number of selected axes (order of the recorded mixed partial).
    #[inline]
    pub fn order(self) -> u32 {
        self.0.count_ones()
    }
}

/// Number of slots (or corners) for dimension `dim`.
#[inline]
pub fn num_slots(dim: usize) -> usize {
    1 << dim
}

/// All selectors for dimension `dim`, in canonical order.
#[inline]
pub fn sigmas(dim: usize) -> impl Iterator<Item = Sigma> + Clone {
    debug_assert!(dim <= MAX_DIM);
    (0..num_slots(dim) as u8).map(Sigma)
}

/// Human-readable label of a slot, e.g. `f`, `d0`, `d0d2`.
pub fn slot_label(sigma: Sigma, dim: usize) -> String {
    if sigma == Sigma::VALUE {
        return "f".to_string();
    }
    (0..dim)
        .filter(|&d| sigma.has(d))
        .map(|d| format!("d{}", d))
        .collect()
}
