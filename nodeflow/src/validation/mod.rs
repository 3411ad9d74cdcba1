//! DAG validation and execution ordering.

mod dag;
mod topology;

pub use dag::{ensure_valid, validate_pipeline_dag};
pub use topology::{execution_order, Adjacency};
