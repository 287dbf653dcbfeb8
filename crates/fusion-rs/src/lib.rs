pub mod fusion;
pub mod graph;
pub mod optimizer;
pub mod passes;
pub mod pipeline;
mod env;

pub use fusion::FusionError;
pub use graph::{Graph, NodeId, Op};
pub use optimizer::FusionConfig;
pub use passes::{run_on_graph, IrBasedFusionPass};
