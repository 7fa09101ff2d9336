//! Batch evaluation of Hermite lookup tables on tensors.

use crate::interpolate::error::InterpolateResult;
use crate::interpolate::table::InterpTable;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Tensor-level evaluation of an [`InterpTable`].
///
/// The table itself lives on the host; these methods move a batch of query
/// points through it and return the results on the query tensor's device.
pub trait HermiteTableAlgorithms<R: Runtime> {
    /// Evaluate all functions of `table` at a batch of points.
    ///
    /// # Arguments
    ///
    /// * `table` - Constructed lookup table
    /// * `xi` - Query points as 2D tensor of shape [n_points, ndim]
    ///
    /// # Returns
    ///
    /// 2D tensor of shape [n_points, nfun].
    fn hermite_table_evaluate(
        &self,
        table: &InterpTable,
        xi: &Tensor<R>,
    ) -> InterpolateResult<Tensor<R>>;

    /// Evaluate values and all recorded partials at a batch of points.
    ///
    /// # Returns
    ///
    /// 3D tensor of shape [n_points, nfun, 2^D], slots in probe order over the
    /// table's active axes.
    fn hermite_table_evaluate_vd(
        &self,
        table: &InterpTable,
        xi: &Tensor<R>,
    ) -> InterpolateResult<Tensor<R>>;
}
