use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

use crate::graph::{Graph, Node, NodeId};

use super::{FusionError, IrMarkers, IrTranslator};

/// Rule that placed a node in the [`BoundarySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagRule {
    /// The node feeds more than one consumer.
    MultiConsumer,
    /// The node's op needs materialized tensor storage.
    TensorOp,
    /// The node is the sole producer of a graph output.
    OutputProducer,
    /// A consumer's IR contains the mediate marker.
    MediateProducer,
    /// The node's IR contains the accumulate marker.
    Accumulate,
    /// The node's IR contains the assign marker.
    Assign,
    /// The node is the first producer of an assign-marked consumer.
    AssignProducer,
}

impl fmt::Display for TagRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagRule::MultiConsumer => "multi-consumer",
            TagRule::TensorOp => "tensor-op",
            TagRule::OutputProducer => "output",
            TagRule::MediateProducer => "mediate",
            TagRule::Accumulate => "accumulate",
            TagRule::Assign => "assign",
            TagRule::AssignProducer => "assign",
        };
        f.write_str(name)
    }
}

/// Nodes that must never be absorbed into a neighbouring fusion cluster.
///
/// Computed once per pass invocation and never mutated while clustering.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BoundarySet {
    tags: BTreeMap<NodeId, SmallVec<[TagRule; 2]>>,
}

impl BoundarySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node`, remembering `rule`. Re-tagging is idempotent.
    pub fn insert(&mut self, node: NodeId, rule: TagRule) {
        let rules = self.tags.entry(node).or_default();
        if !rules.contains(&rule) {
            rules.push(rule);
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.tags.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tagged nodes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tags.keys().copied()
    }

    /// Rules that tagged `node`, in the order they fired.
    pub fn reasons(&self, node: NodeId) -> &[TagRule] {
        self.tags.get(&node).map(|rules| rules.as_slice()).unwrap_or(&[])
    }
}

/// Computes fusion boundaries from graph structure and IR markers.
pub struct BoundaryTagger<'a> {
    translator: &'a dyn IrTranslator,
}

impl<'a> BoundaryTagger<'a> {
    pub fn new(translator: &'a dyn IrTranslator) -> Self {
        Self { translator }
    }

    /// Tags `graph` using its current canonical ordering.
    pub fn tag_graph(&self, graph: &Graph) -> Result<BoundarySet, FusionError> {
        let order = graph.ordered_nodes()?;
        self.tag(graph, &order)
    }

    /// Applies every rule to each node of `order` in a single linear scan.
    pub fn tag(&self, graph: &Graph, order: &[NodeId]) -> Result<BoundarySet, FusionError> {
        let mut boundary = BoundarySet::new();
        for &id in order {
            let node = graph.node(id)?;

            if node.out_edges().len() > 1 {
                boundary.insert(id, TagRule::MultiConsumer);
            }
            if node.op.is_tensor_op() {
                boundary.insert(id, TagRule::TensorOp);
            }
            if node.op.is_output() {
                let producer = first_producer(graph, node, TagRule::OutputProducer)?;
                boundary.insert(producer, TagRule::OutputProducer);
            }

            let ir = self.translator.translate(graph, id)?;
            let markers = IrMarkers::scan(&ir);
            if markers.mediate {
                tracing::info!(op_type = node.op_type(), node = %node.name, "mediate ir");
                for producer in graph.producers(id)? {
                    boundary.insert(producer, TagRule::MediateProducer);
                }
            }
            if markers.accumulate {
                boundary.insert(id, TagRule::Accumulate);
            }
            if markers.assign {
                boundary.insert(id, TagRule::Assign);
                let producer = first_producer(graph, node, TagRule::AssignProducer)?;
                boundary.insert(producer, TagRule::AssignProducer);
            }
        }
        Ok(boundary)
    }
}

fn first_producer(graph: &Graph, node: &Node, rule: TagRule) -> Result<NodeId, FusionError> {
    match graph.in_edge(node.id, 0)? {
        Some(edge) => Ok(edge.src),
        None => Err(FusionError::MalformedGraph {
            node: node.id,
            name: node.name.clone(),
            op_type: node.op_type().to_string(),
            rule,
        }),
    }
}
