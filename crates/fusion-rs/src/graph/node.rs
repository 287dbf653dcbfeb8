use std::fmt;

use smallvec::SmallVec;

/// Operator-type label carried by every node produced by the fused-node builder.
pub const MATCHED_PATTERN: &str = "Matched_Pattern";

/// Kernel name recorded on fused ops.
pub const FUSED_KERNEL: &str = "fused_kernel";

/// Stable handle of a node inside a [`Graph`](super::Graph) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub u32);

/// Stable handle of an edge inside a [`Graph`](super::Graph) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct EdgeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Storage class of an operator, as far as fusion is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpRole {
    /// Ordinary computation.
    Compute,
    /// Parameters, constants and variables that need materialized tensor storage.
    Tensor,
    /// Designated graph output (`Result`).
    Output,
}

impl OpRole {
    /// Infers the role from a conventional operator-type label.
    pub fn infer(op_type: &str) -> OpRole {
        match op_type {
            "Parameter" | "Constant" | "Variable" => OpRole::Tensor,
            "Result" => OpRole::Output,
            _ => OpRole::Compute,
        }
    }
}

/// Snapshot of a node absorbed into a fused op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedMember {
    pub name: String,
    pub op_type: String,
    pub ir: String,
}

/// Payload of a fused op: the absorbed members in topological order and their composed IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedBody {
    pub kernel: String,
    pub members: Vec<FusedMember>,
    pub ir: String,
}

impl FusedBody {
    pub fn new(members: Vec<FusedMember>) -> Self {
        let ir = members
            .iter()
            .map(|member| member.ir.as_str())
            .filter(|ir| !ir.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            kernel: FUSED_KERNEL.to_string(),
            members,
            ir,
        }
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|member| member.name.as_str())
    }
}

/// Operator attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Generic { op_type: String, role: OpRole },
    Fused(FusedBody),
}

impl Op {
    /// Builds a generic op whose role is inferred from its label.
    pub fn new(op_type: impl Into<String>) -> Self {
        let op_type = op_type.into();
        let role = OpRole::infer(&op_type);
        Op::Generic { op_type, role }
    }

    pub fn with_role(op_type: impl Into<String>, role: OpRole) -> Self {
        Op::Generic {
            op_type: op_type.into(),
            role,
        }
    }

    pub fn op_type(&self) -> &str {
        match self {
            Op::Generic { op_type, .. } => op_type,
            Op::Fused(_) => MATCHED_PATTERN,
        }
    }

    pub fn role(&self) -> OpRole {
        match self {
            Op::Generic { role, .. } => *role,
            Op::Fused(_) => OpRole::Compute,
        }
    }

    pub fn is_tensor_op(&self) -> bool {
        self.role() == OpRole::Tensor
    }

    pub fn is_output(&self) -> bool {
        self.role() == OpRole::Output
    }

    /// Returns `true` for ops carrying the sentinel fused label.
    pub fn is_matched_pattern(&self) -> bool {
        self.op_type() == MATCHED_PATTERN
    }

    pub fn fused_body(&self) -> Option<&FusedBody> {
        match self {
            Op::Fused(body) => Some(body),
            Op::Generic { .. } => None,
        }
    }
}

/// Directed data dependency from `src` (output `src_output`) to `dst`.
///
/// The input slot on the consumer is the edge's position in the consumer's `in_edges`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub src: NodeId,
    pub src_output: u32,
    pub dst: NodeId,
}

/// Operator instance stored in the graph arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub op: Op,
    /// Optional IR annotation consulted by translators before their template table.
    pub ir: Option<String>,
    pub(super) in_edges: SmallVec<[EdgeId; 4]>,
    pub(super) out_edges: SmallVec<[EdgeId; 4]>,
}

impl Node {
    pub fn op_type(&self) -> &str {
        self.op.op_type()
    }

    pub fn in_edges(&self) -> &[EdgeId] {
        &self.in_edges
    }

    pub fn out_edges(&self) -> &[EdgeId] {
        &self.out_edges
    }
}
