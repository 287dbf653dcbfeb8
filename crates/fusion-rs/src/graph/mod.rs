//! Arena-backed computation graph consumed by the fusion pass.
//!
//! Nodes and edges live in slot vectors addressed by [`NodeId`] / [`EdgeId`]. Removing a node
//! or edge empties its slot; identifiers are never reused within one graph, so handles held by
//! a pass stay unambiguous across mutations.

mod node;
pub mod text;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

pub use node::{
    Edge, EdgeId, FusedBody, FusedMember, Node, NodeId, Op, OpRole, FUSED_KERNEL, MATCHED_PATTERN,
};
pub use text::{parse_graph, TextGraphError};

/// Structural errors raised by graph queries and mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("edge {0} does not exist")]
    UnknownEdge(EdgeId),
    #[error("node name `{0}` is already in use")]
    DuplicateName(String),
    #[error("graph contains a cycle through {0}")]
    Cycle(NodeId),
    #[error("edge {edge} references missing endpoint {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },
}

/// Directed graph of operator nodes connected by data-dependency edges.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    name: String,
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    by_name: HashMap<String, NodeId>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0 as usize), Some(Some(_)))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge, GraphError> {
        self.edges
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownEdge(id))
    }

    fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge, GraphError> {
        self.edges
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownEdge(id))
    }

    /// Looks a node up by its unique name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Iterates live nodes in arena (insertion) order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|node| node.id).collect()
    }

    pub fn in_edges(&self, id: NodeId) -> Result<&[EdgeId], GraphError> {
        Ok(self.node(id)?.in_edges())
    }

    pub fn out_edges(&self, id: NodeId) -> Result<&[EdgeId], GraphError> {
        Ok(self.node(id)?.out_edges())
    }

    /// Returns the edge feeding input slot `index` of `id`, if any.
    pub fn in_edge(&self, id: NodeId, index: usize) -> Result<Option<&Edge>, GraphError> {
        match self.node(id)?.in_edges.get(index) {
            Some(edge) => Ok(Some(self.edge(*edge)?)),
            None => Ok(None),
        }
    }

    /// Source nodes of every incoming edge, in input order.
    pub fn producers(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.node(id)?
            .in_edges
            .iter()
            .map(|edge| self.edge(*edge).map(|edge| edge.src))
            .collect()
    }

    /// Target nodes of every outgoing edge.
    pub fn consumers(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.node(id)?
            .out_edges
            .iter()
            .map(|edge| self.edge(*edge).map(|edge| edge.dst))
            .collect()
    }

    /// Inserts a node without edges.
    pub fn add_node(&mut self, name: impl Into<String>, op: Op) -> Result<NodeId, GraphError> {
        self.insert_node(name.into(), op, None)
    }

    /// Inserts a node carrying an IR annotation.
    pub fn add_node_with_ir(
        &mut self,
        name: impl Into<String>,
        op: Op,
        ir: impl Into<String>,
    ) -> Result<NodeId, GraphError> {
        self.insert_node(name.into(), op, Some(ir.into()))
    }

    fn insert_node(
        &mut self,
        name: String,
        op: Op,
        ir: Option<String>,
    ) -> Result<NodeId, GraphError> {
        if self.by_name.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.nodes.push(Some(Node {
            id,
            name,
            op,
            ir,
            in_edges: SmallVec::new(),
            out_edges: SmallVec::new(),
        }));
        Ok(id)
    }

    /// Connects output `src_output` of `src` to the next free input slot of `dst`.
    pub fn add_edge(
        &mut self,
        src: NodeId,
        src_output: u32,
        dst: NodeId,
    ) -> Result<EdgeId, GraphError> {
        self.node(src)?;
        self.node(dst)?;
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(Edge {
            id,
            src,
            src_output,
            dst,
        }));
        self.node_mut(src)?.out_edges.push(id);
        self.node_mut(dst)?.in_edges.push(id);
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(GraphError::UnknownEdge(id))?;
        if let Ok(src) = self.node_mut(edge.src) {
            src.out_edges.retain(|e| *e != id);
        }
        if let Ok(dst) = self.node_mut(edge.dst) {
            dst.in_edges.retain(|e| *e != id);
        }
        Ok(edge)
    }

    /// Removes a node together with every incident edge.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let incident = {
            let node = self.node(id)?;
            node.in_edges
                .iter()
                .chain(node.out_edges.iter())
                .copied()
                .collect::<Vec<_>>()
        };
        for edge in incident {
            // Self-loops appear twice in the incident list.
            if self.edge(edge).is_ok() {
                self.remove_edge(edge)?;
            }
        }
        let node = self
            .nodes
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(GraphError::UnknownNode(id))?;
        self.by_name.remove(&node.name);
        Ok(node)
    }

    /// Moves the producing end of `edge` to output `src_output` of `src`.
    ///
    /// The consumer keeps the edge in the same input slot.
    pub fn redirect_edge_source(
        &mut self,
        edge: EdgeId,
        src: NodeId,
        src_output: u32,
    ) -> Result<(), GraphError> {
        self.node(src)?;
        let old = self.edge(edge)?.src;
        if let Ok(node) = self.node_mut(old) {
            node.out_edges.retain(|e| *e != edge);
        }
        {
            let edge_ref = self.edge_mut(edge)?;
            edge_ref.src = src;
            edge_ref.src_output = src_output;
        }
        self.node_mut(src)?.out_edges.push(edge);
        Ok(())
    }

    /// Moves the consuming end of `edge` to the next free input slot of `dst`.
    ///
    /// The producer keeps the edge at the same position in its outgoing list.
    pub fn redirect_edge_target(&mut self, edge: EdgeId, dst: NodeId) -> Result<(), GraphError> {
        self.node(dst)?;
        let old = self.edge(edge)?.dst;
        if let Ok(node) = self.node_mut(old) {
            node.in_edges.retain(|e| *e != edge);
        }
        self.edge_mut(edge)?.dst = dst;
        self.node_mut(dst)?.in_edges.push(edge);
        Ok(())
    }

    /// Returns `prefix_<k>` for the smallest `k` whose name is still free.
    pub fn unique_name(&self, prefix: &str) -> String {
        let mut index = 0usize;
        loop {
            let candidate = format!("{prefix}_{index}");
            if !self.by_name.contains_key(&candidate) {
                return candidate;
            }
            index += 1;
        }
    }

    /// Canonical node ordering: topological, ties broken by ascending [`NodeId`].
    pub fn ordered_nodes(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut pending: HashMap<NodeId, usize> = HashMap::with_capacity(self.node_count());
        let mut ready = BTreeSet::new();
        for node in self.nodes() {
            let degree = node.in_edges.len();
            if degree == 0 {
                ready.insert(node.id);
            } else {
                pending.insert(node.id, degree);
            }
        }

        let mut order = Vec::with_capacity(self.node_count());
        while let Some(id) = ready.pop_first() {
            order.push(id);
            for edge in &self.node(id)?.out_edges {
                let dst = self.edge(*edge)?.dst;
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
            Some(stuck) => Err(GraphError::Cycle(*stuck)),
            None => Ok(order),
        }
    }

    /// Checks that every edge endpoint exists and edge lists agree in both directions.
    pub fn validate(&self) -> Result<(), GraphError> {
        for edge in self.edges.iter().filter_map(Option::as_ref) {
            for endpoint in [edge.src, edge.dst] {
                if !self.contains(endpoint) {
                    return Err(GraphError::DanglingEdge {
                        edge: edge.id,
                        node: endpoint,
                    });
                }
            }
            if !self.node(edge.src)?.out_edges.contains(&edge.id)
                || !self.node(edge.dst)?.in_edges.contains(&edge.id)
            {
                return Err(GraphError::DanglingEdge {
                    edge: edge.id,
                    node: edge.src,
                });
            }
        }
        for node in self.nodes() {
            for edge in node.in_edges.iter().chain(node.out_edges.iter()) {
                self.edge(*edge)?;
            }
        }
        Ok(())
    }

    /// Renders the graph in the textual format accepted by [`parse_graph`].
    pub fn to_text(&self) -> String {
        text::print_graph(self)
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
