use thiserror::Error;

use super::{Graph, NodeId, Op, MATCHED_PATTERN};

/// Errors raised while parsing the textual graph format used in fixtures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextGraphError {
    #[error("{0}")]
    Message(String),
}

impl TextGraphError {
    fn new(msg: impl Into<String>) -> Self {
        TextGraphError::Message(msg.into())
    }
}

/// Parses a graph described with a compact MLIR-inspired syntax.
///
/// # Example
/// ```
/// use fusion_rs::graph::parse_graph;
///
/// let graph = parse_graph(r#"
/// graph @chain {
///   %x = Parameter()
///   %y = Relu(%x) ir "@output0@[N] = @input0@[N].call(`max`, [0.0]);"
///   %out = Result(%y)
/// }
/// "#).expect("valid graph");
/// assert_eq!(graph.name(), "chain");
/// assert_eq!(graph.node_count(), 3);
/// ```
pub fn parse_graph(src: &str) -> Result<Graph, TextGraphError> {
    let trimmed = src.trim();
    if trimmed.is_empty() {
        return Err(TextGraphError::new("input is empty"));
    }
    let header_end = trimmed
        .find('{')
        .ok_or_else(|| TextGraphError::new("missing `{` to start graph body"))?;
    let body_end = trimmed
        .rfind('}')
        .ok_or_else(|| TextGraphError::new("missing `}` to end graph body"))?;
    if body_end < header_end {
        return Err(TextGraphError::new("graph body is not closed"));
    }

    let header = trimmed[..header_end].trim();
    let name = header
        .strip_prefix("graph")
        .ok_or_else(|| TextGraphError::new("graph header must start with `graph`"))?
        .trim();
    let name = name.strip_prefix('@').unwrap_or(name).trim();
    if name.is_empty() {
        return Err(TextGraphError::new("graph name cannot be empty"));
    }

    let mut graph = Graph::new(name);
    for (line_no, line) in trimmed[header_end + 1..body_end].lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        parse_statement(&mut graph, line).map_err(|err| {
            TextGraphError::new(format!("line {}: {}", line_no + 1, err_message(err)))
        })?;
    }
    Ok(graph)
}

fn err_message(err: TextGraphError) -> String {
    match err {
        TextGraphError::Message(msg) => msg,
    }
}

fn parse_statement(graph: &mut Graph, line: &str) -> Result<NodeId, TextGraphError> {
    let (lhs, rhs) = line
        .split_once('=')
        .ok_or_else(|| TextGraphError::new("statement must be `%name = Op(...)`"))?;
    let name = normalize_name(lhs.trim());
    if name.is_empty() {
        return Err(TextGraphError::new("node name cannot be empty"));
    }

    let rhs = rhs.trim();
    let open = rhs
        .find('(')
        .ok_or_else(|| TextGraphError::new("missing `(` after operator type"))?;
    let close = rhs[open..]
        .find(')')
        .map(|offset| open + offset)
        .ok_or_else(|| TextGraphError::new("missing `)` to close operand list"))?;

    let op_type = rhs[..open].trim();
    if op_type.is_empty() {
        return Err(TextGraphError::new("operator type cannot be empty"));
    }
    if op_type == MATCHED_PATTERN {
        return Err(TextGraphError::new(
            "fused nodes cannot be declared in text; they are produced by the fusion builder",
        ));
    }

    let mut operands = Vec::new();
    for raw in rhs[open + 1..close].split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        operands.push(parse_operand(graph, raw)?);
    }

    let ir = parse_annotation(rhs[close + 1..].trim())?;
    let op = Op::new(op_type);
    let id = match ir {
        Some(ir) => graph.add_node_with_ir(name, op, ir),
        None => graph.add_node(name, op),
    }
    .map_err(|err| TextGraphError::new(err.to_string()))?;

    for (src, src_output) in operands {
        graph
            .add_edge(src, src_output, id)
            .map_err(|err| TextGraphError::new(err.to_string()))?;
    }
    Ok(id)
}

fn parse_operand(graph: &Graph, raw: &str) -> Result<(NodeId, u32), TextGraphError> {
    let (name, output) = match raw.split_once('#') {
        Some((name, output)) => {
            let output = output
                .trim()
                .parse::<u32>()
                .map_err(|_| TextGraphError::new(format!("invalid output index in `{raw}`")))?;
            (name, output)
        }
        None => (raw, 0),
    };
    let name = normalize_name(name.trim());
    let id = graph
        .find(name)
        .ok_or_else(|| TextGraphError::new(format!("unknown operand `{name}`")))?;
    Ok((id, output))
}

fn parse_annotation(rest: &str) -> Result<Option<String>, TextGraphError> {
    if rest.is_empty() {
        return Ok(None);
    }
    let quoted = rest
        .strip_prefix("ir")
        .ok_or_else(|| TextGraphError::new(format!("unexpected trailing text `{rest}`")))?
        .trim();
    let start = quoted
        .strip_prefix('"')
        .ok_or_else(|| TextGraphError::new("ir annotation must be a quoted string"))?;
    let body = start
        .strip_suffix('"')
        .ok_or_else(|| TextGraphError::new("unterminated ir annotation"))?;
    Ok(Some(body.to_string()))
}

fn normalize_name(raw: &str) -> &str {
    raw.strip_prefix('%').unwrap_or(raw)
}

pub(super) fn print_graph(graph: &Graph) -> String {
    let order = graph.ordered_nodes().unwrap_or_else(|_| graph.node_ids());
    let mut out = format!("graph @{} {{\n", graph.name());
    for id in order {
        let Ok(node) = graph.node(id) else {
            continue;
        };
        let operands = node
            .in_edges()
            .iter()
            .filter_map(|edge| graph.edge(*edge).ok())
            .filter_map(|edge| {
                let src = graph.node(edge.src).ok()?;
                Some(if edge.src_output == 0 {
                    format!("%{}", src.name)
                } else {
                    format!("%{}#{}", src.name, edge.src_output)
                })
            })
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("  %{} = {}({})", node.name, node.op_type(), operands));
        if let Some(body) = node.op.fused_body() {
            let members = body
                .member_names()
                .map(|name| format!("%{name}"))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(" fused[{members}]"));
        }
        if let Some(ir) = &node.ir {
            out.push_str(&format!(" ir \"{ir}\""));
        }
        out.push('\n');
    }
    out.push('}');
    out.push('\n');
    out
}
