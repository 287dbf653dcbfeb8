use std::sync::Arc;

use crate::fusion::{
    BoundaryTagger, Clusterer, FusedNodeBuilder, FusionError, IrTranslator, SubgraphBuilder,
    TemplateTranslator,
};
use crate::graph::Graph;
use crate::optimizer::{FusionConfig, GraphPass, PassResult};

/// Fuses the backward closure of every boundary node into a `Matched_Pattern` node.
///
/// The boundary set is computed from a snapshot of the canonical ordering before any
/// mutation, and seeds are visited in that same order. Fused nodes created earlier in the
/// run are hard stops for later closures.
pub struct IrBasedFusionPass {
    config: FusionConfig,
    translator: Arc<dyn IrTranslator>,
    builder: Arc<dyn FusedNodeBuilder>,
}

impl IrBasedFusionPass {
    const NAME: &'static str = "ir_based_fusion";

    /// Pass using the default [`TemplateTranslator`] and [`SubgraphBuilder`].
    pub fn new(config: FusionConfig) -> Self {
        Self::with_translator(config, Arc::new(TemplateTranslator::default()))
    }

    pub fn with_translator(config: FusionConfig, translator: Arc<dyn IrTranslator>) -> Self {
        Self {
            config,
            builder: Arc::new(SubgraphBuilder::new(translator.clone())),
            translator,
        }
    }

    pub fn with_builder(mut self, builder: Arc<dyn FusedNodeBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }
}

impl GraphPass for IrBasedFusionPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, graph: &mut Graph) -> Result<PassResult, FusionError> {
        if !self.config.ir_based_fusion {
            return Ok(PassResult::default());
        }

        let order = graph.ordered_nodes()?;
        let boundary = BoundaryTagger::new(self.translator.as_ref()).tag(graph, &order)?;
        let clusterer = Clusterer::new(self.builder.as_ref());

        let mut result = PassResult {
            iterations: 1,
            boundary_nodes: boundary.len(),
            ..PassResult::default()
        };
        for seed in order.iter().copied().filter(|id| boundary.contains(*id)) {
            if !graph.contains(seed) {
                continue;
            }
            if let Some(region) = clusterer.fuse(graph, &boundary, seed)? {
                result.changed = true;
                result.fused_nodes += 1;
                result.absorbed_nodes += region.cluster.len();
            }
        }
        Ok(result)
    }
}

/// Runs IR-based fusion with the default collaborators and reports success.
pub fn run_on_graph(graph: &mut Graph, config: &FusionConfig) -> Result<bool, FusionError> {
    IrBasedFusionPass::new(config.clone()).run(graph)?;
    Ok(true)
}
