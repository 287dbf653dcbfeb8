use std::collections::HashMap;

use crate::graph::{Graph, NodeId, OpRole};

use super::FusionError;

/// Maps a node to its textual intermediate representation.
///
/// The fusion pass treats the returned string as opaque and only checks it for markers.
pub trait IrTranslator: Send + Sync {
    fn translate(&self, graph: &Graph, node: NodeId) -> Result<String, FusionError>;
}

impl<F> IrTranslator for F
where
    F: Fn(&Graph, NodeId) -> String + Send + Sync,
{
    fn translate(&self, graph: &Graph, node: NodeId) -> Result<String, FusionError> {
        graph.node(node)?;
        Ok(self(graph, node))
    }
}

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("Add", "@output0@[N] = @input0@[N] + @input1@[N];"),
    ("Subtract", "@output0@[N] = @input0@[N] - @input1@[N];"),
    ("Multiply", "@output0@[N] = @input0@[N] * @input1@[N];"),
    ("Divide", "@output0@[N] = @input0@[N] / @input1@[N];"),
    ("Exp", "@output0@[N] = @input0@[N].call(`exp`);"),
    ("Tanh", "@output0@[N] = @input0@[N].call(`tanh`);"),
    (
        "Relu",
        "@output0@[N] = @input0@[N].call(`max`, [const(0).cast(@input0@[N].dtype())]);",
    ),
    ("Broadcast", "@output0@[N, M] = @input0@[M];"),
    ("Sum", "@output0@[N] +=! @input0@[N, K];"),
    ("Max", "@output0@[N] >=! @input0@[N, K];"),
    ("Dot", "@output0@[N, M] +=! @input0@[N, K] * @input1@[K, M];"),
    (
        "Softmax",
        "mediate0[N] >=! @input0@[N, K]; \
         mediate1[N, K] = (@input0@[N, K] - mediate0[N]).call(`exp`); \
         mediate2[N] +=! mediate1[N, K]; \
         @output0@[N, K] = mediate1[N, K] / mediate2[N];",
    ),
];

/// Translator backed by per-op-type IR templates.
///
/// Resolution order: the node's own `ir` annotation, the composed IR of a fused op, the
/// template registered for the op type, and finally the empty string. A strict translator
/// rejects compute ops that have no template instead of treating them as marker-free.
#[derive(Debug, Clone)]
pub struct TemplateTranslator {
    templates: HashMap<String, String>,
    strict: bool,
}

impl TemplateTranslator {
    /// Translator with an empty template table.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
            strict: false,
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_template(mut self, op_type: impl Into<String>, ir: impl Into<String>) -> Self {
        self.templates.insert(op_type.into(), ir.into());
        self
    }

    pub fn template(&self, op_type: &str) -> Option<&str> {
        self.templates.get(op_type).map(String::as_str)
    }
}

impl Default for TemplateTranslator {
    fn default() -> Self {
        DEFAULT_TEMPLATES
            .iter()
            .fold(Self::empty(), |translator, (op_type, ir)| {
                translator.with_template(*op_type, *ir)
            })
    }
}

impl IrTranslator for TemplateTranslator {
    fn translate(&self, graph: &Graph, node: NodeId) -> Result<String, FusionError> {
        let node = graph.node(node)?;
        if let Some(ir) = &node.ir {
            return Ok(ir.clone());
        }
        if let Some(body) = node.op.fused_body() {
            return Ok(body.ir.clone());
        }
        match self.template(node.op_type()) {
            Some(ir) => Ok(ir.to_string()),
            None if self.strict && node.op.role() == OpRole::Compute => {
                Err(FusionError::Translate {
                    node: node.id,
                    reason: format!("no IR template for op type `{}`", node.op_type()),
                })
            }
            None => Ok(String::new()),
        }
    }
}
