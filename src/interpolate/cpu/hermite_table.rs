use crate::interpolate::error::InterpolateResult;
use crate::interpolate::impl_generic::hermite_table::hermite_table_evaluate_impl;
use crate::interpolate::table::InterpTable;
use crate::interpolate::traits::hermite_table::HermiteTableAlgorithms;
use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

impl HermiteTableAlgorithms<CpuRuntime> for CpuClient {
    fn hermite_table_evaluate(
        &self,
        table: &InterpTable,
        xi: &Tensor<CpuRuntime>,
    ) -> InterpolateResult<Tensor<CpuRuntime>> {
        hermite_table_evaluate_impl(self, table, xi, false)
    }

    fn hermite_table_evaluate_vd(
        &self,
        table: &InterpTable,
        xi: &Tensor<CpuRuntime>,
    ) -> InterpolateResult<Tensor<CpuRuntime>> {
        hermite_table_evaluate_impl(self, table, xi, true)
    }
}
