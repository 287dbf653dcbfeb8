//! Graph passes built on the fusion primitives.

mod ir_based_fusion;

pub use ir_based_fusion::{run_on_graph, IrBasedFusionPass};
