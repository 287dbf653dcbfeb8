use std::collections::{HashSet, VecDeque};

use crate::graph::{EdgeId, Graph, NodeId};

use super::{BoundarySet, BuildMode, FusedNodeBuilder, FusionError};

/// Backward closure collected for one boundary (seed) node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionCluster {
    pub seed: NodeId,
    /// Members in discovery order; the seed comes first.
    pub members: Vec<NodeId>,
    /// Incoming edges whose producer stopped the walk, in discovery order.
    pub inputs: Vec<EdgeId>,
}

impl FusionCluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A cluster holding only its seed never triggers fusion.
    pub fn is_trivial(&self) -> bool {
        self.members.len() <= 1
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }
}

/// Walks backward from `seed`, collecting producers that are neither boundaries nor fused nodes.
///
/// The collected set doubles as the visited set, so each node is processed at most once.
pub fn collect_cluster(
    graph: &Graph,
    boundary: &BoundarySet,
    seed: NodeId,
) -> Result<FusionCluster, FusionError> {
    graph.node(seed)?;

    let mut collected = HashSet::new();
    let mut members = Vec::new();
    let mut inputs = Vec::new();
    let mut ready = VecDeque::from([seed]);

    while let Some(id) = ready.pop_front() {
        if !collected.insert(id) {
            continue;
        }
        members.push(id);
        for &edge_id in graph.in_edges(id)? {
            let edge = graph.edge(edge_id)?;
            let src = graph.node(edge.src)?;
            if !boundary.contains(src.id) && !src.op.is_matched_pattern() {
                ready.push_back(src.id);
            } else {
                tracing::trace!(seed = %seed, stop = %src.name, "cluster stop");
                inputs.push(edge_id);
            }
        }
    }

    Ok(FusionCluster {
        seed,
        members,
        inputs,
    })
}

/// Fused node produced for a non-trivial cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedRegion {
    pub node: NodeId,
    pub cluster: FusionCluster,
}

/// Replaces the backward closure of boundary nodes with fused nodes.
pub struct Clusterer<'a> {
    builder: &'a dyn FusedNodeBuilder,
    mode: BuildMode,
}

impl<'a> Clusterer<'a> {
    pub fn new(builder: &'a dyn FusedNodeBuilder) -> Self {
        Self {
            builder,
            mode: BuildMode::ReplaceMembers,
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Collects the cluster for `seed` and fuses it when it holds more than one node.
    pub fn fuse(
        &self,
        graph: &mut Graph,
        boundary: &BoundarySet,
        seed: NodeId,
    ) -> Result<Option<FusedRegion>, FusionError> {
        let cluster = collect_cluster(graph, boundary, seed)?;
        if cluster.is_trivial() {
            return Ok(None);
        }
        let node = self.builder.build(&cluster, graph, self.mode)?;
        tracing::debug!(
            seed = %seed,
            fused = %node,
            members = cluster.len(),
            inputs = cluster.inputs.len(),
            "fused cluster"
        );
        Ok(Some(FusedRegion { node, cluster }))
    }
}
