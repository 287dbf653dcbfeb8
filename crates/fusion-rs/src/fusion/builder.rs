use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::graph::{
    EdgeId, FusedBody, FusedMember, Graph, GraphError, NodeId, Op, FUSED_KERNEL,
};

use super::{FusionCluster, FusionError, IrTranslator};

/// What happens to cluster members once the fused node exists.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Rewire external edges onto the fused node and delete the members.
    #[default]
    ReplaceMembers,
    /// Only connect the fused node's inputs; members and their consumers stay untouched.
    KeepMembers,
}

/// Constructs the replacement node for a fusion cluster and inserts it into the graph.
pub trait FusedNodeBuilder: Send + Sync {
    fn build(
        &self,
        cluster: &FusionCluster,
        graph: &mut Graph,
        mode: BuildMode,
    ) -> Result<NodeId, FusionError>;
}

/// Default builder: snapshots the members into a [`FusedBody`] labelled `Matched_Pattern`.
///
/// Fused inputs keep the cluster's discovery order, so the seed's stop edges come first.
/// Each distinct `(member, output)` pair consumed outside the cluster becomes one fused output.
pub struct SubgraphBuilder {
    translator: Arc<dyn IrTranslator>,
}

impl SubgraphBuilder {
    pub fn new(translator: Arc<dyn IrTranslator>) -> Self {
        Self { translator }
    }
}

impl FusedNodeBuilder for SubgraphBuilder {
    fn build(
        &self,
        cluster: &FusionCluster,
        graph: &mut Graph,
        mode: BuildMode,
    ) -> Result<NodeId, FusionError> {
        if cluster.is_empty() {
            return Err(FusionError::EmptyCluster(cluster.seed));
        }
        let member_set: HashSet<NodeId> = cluster.members.iter().copied().collect();
        let ordered = order_members(graph, &member_set)?;

        let mut members = Vec::with_capacity(ordered.len());
        for &id in &ordered {
            let node = graph.node(id)?;
            members.push(FusedMember {
                name: node.name.clone(),
                op_type: node.op_type().to_string(),
                ir: self.translator.translate(graph, id)?,
            });
        }

        let inputs = external_inputs(graph, cluster, &ordered, &member_set)?;
        let outputs = external_outputs(graph, &ordered, &member_set)?;

        let name = graph.unique_name(FUSED_KERNEL);
        let fused = graph.add_node(name, Op::Fused(FusedBody::new(members)))?;

        match mode {
            BuildMode::ReplaceMembers => {
                for edge in inputs {
                    graph.redirect_edge_target(edge, fused)?;
                }
                for (edge, output) in outputs {
                    graph.redirect_edge_source(edge, fused, output)?;
                }
                for id in ordered {
                    graph.remove_node(id)?;
                }
            }
            BuildMode::KeepMembers => {
                for edge in inputs {
                    let edge = graph.edge(edge)?.clone();
                    graph.add_edge(edge.src, edge.src_output, fused)?;
                }
            }
        }
        Ok(fused)
    }
}

/// Topological order of the members over internal edges, ties broken by id.
fn order_members(graph: &Graph, members: &HashSet<NodeId>) -> Result<Vec<NodeId>, FusionError> {
    let mut pending: HashMap<NodeId, usize> = HashMap::with_capacity(members.len());
    let mut ready = BTreeSet::new();
    for &id in members {
        let internal = graph
            .producers(id)?
            .into_iter()
            .filter(|src| members.contains(src))
            .count();
        if internal == 0 {
            ready.insert(id);
        } else {
            pending.insert(id, internal);
        }
    }

    let mut order = Vec::with_capacity(members.len());
    while let Some(id) = ready.pop_first() {
        order.push(id);
        for dst in graph.consumers(id)? {
            if let Some(degree) = pending.get_mut(&dst) {
                *degree -= 1;
                if *degree == 0 {
                    pending.remove(&dst);
                    ready.insert(dst);
                }
            }
        }
    }

    match pending.keys().min() {
        Some(stuck) => Err(GraphError::Cycle(*stuck).into()),
        None => Ok(order),
    }
}

fn external_inputs(
    graph: &Graph,
    cluster: &FusionCluster,
    ordered: &[NodeId],
    members: &HashSet<NodeId>,
) -> Result<Vec<EdgeId>, FusionError> {
    let mut inputs = Vec::new();
    let mut seen = HashSet::new();
    let is_external = |edge: EdgeId| -> Result<bool, FusionError> {
        let edge = graph.edge(edge)?;
        Ok(members.contains(&edge.dst) && !members.contains(&edge.src))
    };
    for &edge in &cluster.inputs {
        if is_external(edge)? && seen.insert(edge) {
            inputs.push(edge);
        }
    }
    for &id in ordered {
        for &edge in graph.in_edges(id)? {
            if is_external(edge)? && seen.insert(edge) {
                inputs.push(edge);
            }
        }
    }
    Ok(inputs)
}

fn external_outputs(
    graph: &Graph,
    ordered: &[NodeId],
    members: &HashSet<NodeId>,
) -> Result<Vec<(EdgeId, u32)>, FusionError> {
    let mut exports: Vec<(NodeId, u32)> = Vec::new();
    let mut outputs = Vec::new();
    for &id in ordered {
        for &edge_id in graph.out_edges(id)? {
            let edge = graph.edge(edge_id)?;
            if members.contains(&edge.dst) {
                continue;
            }
            let key = (id, edge.src_output);
            let index = match exports.iter().position(|export| *export == key) {
                Some(index) => index,
                None => {
                    exports.push(key);
                    exports.len() - 1
                }
            };
            outputs.push((edge_id, index as u32));
        }
    }
    Ok(outputs)
}
