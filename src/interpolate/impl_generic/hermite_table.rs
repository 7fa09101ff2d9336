//! Hermite table batch evaluation generic implementation.
//!
//! Queries are pulled to the host, evaluated cell by cell, and the results
//! are written back as a single tensor on the query device.

use crate::interpolate::error::{InterpolateError, InterpolateResult};
use crate::interpolate::table::InterpTable;
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

/// Evaluate `table` at the rows of `xi`.
///
/// # Arguments
///
/// * `table` - Constructed lookup table
/// * `xi` - Query points as 2D tensor of shape [n_points, ndim]
/// * `derivatives` - Also return every recorded partial
///
/// # Returns
///
/// Tensor of shape [n_points, nfun], or [n_points, nfun, 2^D] with derivatives.
pub fn hermite_table_evaluate_impl<R, C>(
    _client: &C,
    table: &InterpTable,
    xi: &Tensor<R>,
    derivatives: bool,
) -> InterpolateResult<Tensor<R>>
where
    R: Runtime,
    C: RuntimeClient<R>,
{
    let xi_shape = xi.shape();
    if xi_shape.len() != 2 {
        return Err(InterpolateError::InvalidParameter {
            parameter: "xi".to_string(),
            message: format!(
                "Query points must be 2D [n_points, ndim], got {:?}",
                xi_shape
            ),
        });
    }

    let n_points = xi_shape[0];
    let ndim = xi_shape[1];
    if ndim != table.ndim() {
        return Err(InterpolateError::DimensionMismatch {
            expected: table.ndim(),
            actual: ndim,
            context: "hermite_table_evaluate (query dimensions)".to_string(),
        });
    }

    let nfun = table.nfun();
    let per_point = if derivatives {
        nfun * table.num_slots()
    } else {
        nfun
    };

    let xi_data: Vec<f64> = xi.to_vec();
    let mut result = vec![0.0; n_points * per_point];

    if n_points > 0 {
        for (x, out) in xi_data
            .chunks_exact(ndim)
            .zip(result.chunks_exact_mut(per_point))
        {
            if derivatives {
                table.evaluate_vd_into(x, out)?;
            } else {
                table.evaluate_into(x, out)?;
            }
        }
    }

    let device = xi.device();
    if derivatives {
        Ok(Tensor::from_slice(
            &result,
            &[n_points, nfun, table.num_slots()],
            device,
        ))
    } else {
        Ok(Tensor::from_slice(&result, &[n_points, nfun], device))
    }
}
