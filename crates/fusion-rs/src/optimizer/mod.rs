//! Graph pass infrastructure: the pass trait, run statistics and pass configuration.

mod config;

use crate::fusion::FusionError;
use crate::graph::Graph;

pub use config::FusionConfig;

/// Result returned by a [`GraphPass`] after it runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassResult {
    /// Whether the pass changed the graph.
    pub changed: bool,
    /// Number of pass invocations folded into this result.
    pub iterations: usize,
    /// Fused nodes inserted.
    pub fused_nodes: usize,
    /// Original nodes absorbed into fused nodes.
    pub absorbed_nodes: usize,
    /// Size of the boundary set(s) computed.
    pub boundary_nodes: usize,
}

impl PassResult {
    /// Merges two run results, accumulating statistics.
    pub fn merge(self, other: PassResult) -> PassResult {
        PassResult {
            changed: self.changed || other.changed,
            iterations: self.iterations + other.iterations,
            fused_nodes: self.fused_nodes + other.fused_nodes,
            absorbed_nodes: self.absorbed_nodes + other.absorbed_nodes,
            boundary_nodes: self.boundary_nodes + other.boundary_nodes,
        }
    }
}

/// Canonical interface implemented by passes that rewrite a whole graph.
pub trait GraphPass: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, graph: &mut Graph) -> Result<PassResult, FusionError>;
}
