//! Error types for interpolation table operations.

/// Result type for interpolation operations.
pub type InterpolateResult<T> = Result<T, InterpolateError>;

/// Errors that can occur while building or querying an interpolation table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolateError {
    /// Input arrays have mismatched lengths.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    /// Number of coordinates does not match the table dimension.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    /// Input array is too small for the requested operation.
    #[error("Insufficient data for {context}: need at least {required}, got {actual}")]
    InsufficientData {
        required: usize,
        actual: usize,
        context: String,
    },

    /// Query coordinate is outside the table box along one axis.
    #[error(
        "Coordinate {point} on axis {dimension} is outside interpolation domain [{min}, {max}] in {context}"
    )]
    OutOfDomain {
        dimension: usize,
        point: f64,
        min: f64,
        max: f64,
        context: String,
    },

    /// Grid breakpoints are not strictly increasing.
    #[error("Grid breakpoints must be strictly increasing in {context}")]
    NotMonotonic { context: String },

    /// Adaptive refinement could not meet the tolerance within its budget.
    #[error("Grid refinement did not converge after {passes} passes ({nodes:?} nodes): {reason}")]
    BuildNonConvergence {
        reason: String,
        passes: usize,
        nodes: Vec<usize>,
    },

    /// The probe produced a non-finite value.
    #[error("Probe returned non-finite value {value} for function {function} (slot {slot}) at {point:?}")]
    ProbeFailure {
        point: Vec<f64>,
        function: usize,
        slot: usize,
        value: f64,
    },

    /// A series did not settle within the allowed number of terms.
    #[error("Series did not converge within {terms} terms")]
    SeriesNonConvergence { terms: usize },

    /// Invalid parameter value.
    #[error("Invalid parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Writing the diagnostic report failed.
    #[error("Failed to write error report {path}: {message}")]
    Report { path: String, message: String },
}
