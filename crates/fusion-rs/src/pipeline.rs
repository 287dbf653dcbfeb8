use std::sync::Arc;

use crate::fusion::FusionError;
use crate::graph::Graph;
use crate::optimizer::{FusionConfig, GraphPass, PassResult};
use crate::passes::IrBasedFusionPass;

pub enum Step {
    Pass(Arc<dyn GraphPass>),
    FixedPoint { max_iters: usize, steps: Vec<Step> },
}

pub struct PipelineBuilder {
    steps: Vec<Step>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn pass(&mut self, pass: Arc<dyn GraphPass>) {
        self.steps.push(Step::Pass(pass));
    }

    pub fn fixed_point<F>(&mut self, max_iters: usize, build: F)
    where
        F: FnOnce(&mut PipelineBuilder),
    {
        let mut inner = PipelineBuilder::new();
        build(&mut inner);
        self.steps.push(Step::FixedPoint {
            max_iters: max_iters.max(1),
            steps: inner.steps,
        });
    }

    pub fn finish(self) -> Vec<Step> {
        self.steps
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered list of passes with bounded fixed-point groups.
pub struct Pipeline {
    steps: Vec<Step>,
    log_stats: bool,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>, log_stats: bool) -> Self {
        Self { steps, log_stats }
    }

    /// IR-based fusion repeated until the graph stops changing.
    pub fn fusion(config: &FusionConfig) -> Self {
        let mut builder = PipelineBuilder::new();
        let pass_config = config.clone();
        builder.fixed_point(config.fixed_point_max_iters, move |p| {
            p.pass(Arc::new(IrBasedFusionPass::new(pass_config)));
        });
        Self::new(builder.finish(), config.log_stats)
    }

    pub fn run(&self, graph: &mut Graph) -> Result<PassResult, FusionError> {
        let mut result = PassResult::default();
        run_steps(&self.steps, graph, &mut result, self.log_stats)?;
        Ok(result)
    }
}

fn run_steps(
    steps: &[Step],
    graph: &mut Graph,
    totals: &mut PassResult,
    log_stats: bool,
) -> Result<bool, FusionError> {
    let mut changed_any = false;
    for step in steps {
        match step {
            Step::Pass(pass) => {
                let _span = tracing::debug_span!("graph_pass", pass = pass.name()).entered();
                let stats = pass.run(graph)?;
                changed_any |= stats.changed;
                *totals = totals.merge(stats);
                if log_stats {
                    tracing::debug!(
                        graph = graph.name(),
                        pass = pass.name(),
                        changed = stats.changed,
                        fused_nodes = stats.fused_nodes,
                        absorbed_nodes = stats.absorbed_nodes,
                        boundary_nodes = stats.boundary_nodes,
                        node_count = graph.node_count(),
                        "pass stats"
                    );
                }
            }
            Step::FixedPoint { max_iters, steps } => {
                let mut iter = 0usize;
                loop {
                    if iter >= *max_iters {
                        break;
                    }
                    iter += 1;
                    let mut local = PassResult::default();
                    let changed = run_steps(steps, graph, &mut local, log_stats)?;
                    *totals = totals.merge(local);
                    changed_any |= changed;
                    if !changed {
                        break;
                    }
                }
            }
        }
    }
    Ok(changed_any)
}
