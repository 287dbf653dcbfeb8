//! IR-based fusion: boundary tagging, backward clustering and fused-node construction.
//!
//! The pass runs in two phases. [`BoundaryTagger`] scans the canonical node ordering once and
//! marks nodes that must stay separate from their consumers. [`Clusterer`] then walks backward
//! from every boundary node, absorbing producers that are neither boundaries nor previously
//! fused regions, and hands non-trivial clusters to a [`FusedNodeBuilder`].

mod builder;
mod cluster;
mod marker;
mod tagger;
mod translate;

use thiserror::Error;

use crate::graph::{GraphError, NodeId};

pub use builder::{BuildMode, FusedNodeBuilder, SubgraphBuilder};
pub use cluster::{collect_cluster, Clusterer, FusedRegion, FusionCluster};
pub use marker::{IrMarkers, ACCUMULATE_MARKER, ASSIGN_MARKER, MEDIATE_MARKER};
pub use tagger::{BoundarySet, BoundaryTagger, TagRule};
pub use translate::{IrTranslator, TemplateTranslator};

/// Errors surfaced by the fusion pass instead of out-of-bounds accesses on malformed graphs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FusionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("malformed graph: {op_type} node `{name}` ({node}) has no incoming edge required by the {rule} rule")]
    MalformedGraph {
        node: NodeId,
        name: String,
        op_type: String,
        rule: TagRule,
    },
    #[error("fusion cluster seeded at {0} has no members")]
    EmptyCluster(NodeId),
    #[error("failed to translate node {node}: {reason}")]
    Translate { node: NodeId, reason: String },
}
