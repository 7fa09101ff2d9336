pub mod hermite_table;

pub use hermite_table::hermite_table_evaluate_impl;
