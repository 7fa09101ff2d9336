pub mod hermite_table;

pub use hermite_table::HermiteTableAlgorithms;
