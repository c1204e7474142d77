//! Frame graph definition and compilation

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::backend::traits::*;
use crate::render_graph::error::*;
use crate::render_graph::pass::*;
use crate::render_graph::registry::ResourceRegistry;
use crate::render_graph::resource::*;
use crate::GraphConfig;

/// Where the graph is in its per-frame lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphPhase {
    /// Passes and outputs can be declared
    Recording,
    /// Order resolved and resources allocated, ready to execute
    Built,
    /// Frame submitted; call `reset` before declaring the next one
    Executed,
}

/// `consumer` reads `resource`, which `producer` writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub consumer: PassId,
    pub producer: PassId,
    pub resource: ResourceId,
}

/// What resolving one output produced
struct ResolvedOutput {
    edges: Vec<DependencyEdge>,
    order: Vec<PassId>,
    in_use: Vec<ResourceId>,
}

/// The main frame graph structure
///
/// Owns the resource registry, the passes declared for the current frame and
/// the provider that realizes them. A frame goes through
/// [`add_pass`](Self::add_pass) / [`set_output`](Self::set_output),
/// [`build`](Self::build), [`execute`](Self::execute) and
/// [`reset`](Self::reset).
pub struct FrameGraph<P: Provider> {
    pub(crate) config: GraphConfig,
    pub(crate) provider: P,
    pub(crate) registry: ResourceRegistry,
    pub(crate) passes: Vec<Pass<P>>,
    pub(crate) outputs: Vec<ResourceId>,
    pub(crate) dependencies: Vec<(ResourceId, Vec<DependencyEdge>)>,
    pub(crate) pass_order: Vec<PassId>,
    pub(crate) command_buffer: Option<CommandBufferHandle>,
    pub(crate) phase: GraphPhase,
    pub(crate) frame_index: u64,
}

impl<P: Provider> FrameGraph<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, GraphConfig::default())
    }

    pub fn with_config(provider: P, config: GraphConfig) -> Self {
        Self {
            config,
            provider,
            registry: ResourceRegistry::new(),
            passes: Vec::new(),
            outputs: Vec::new(),
            dependencies: Vec::new(),
            pass_order: Vec::new(),
            command_buffer: None,
            phase: GraphPhase::Recording,
            frame_index: 0,
        }
    }

    /// Declare a new pass and return a builder for its resources
    pub fn add_pass(&mut self, name: &str, info: PassInfo) -> GraphResult<PassBuilder<'_, P>> {
        self.expect_phase(GraphPhase::Recording, "add a pass")?;

        if self.passes.iter().any(|pass| pass.name() == name) {
            log::warn!("Pass name '{}' is declared more than once", name);
        }

        let index = self.passes.len();
        self.passes
            .push(Pass::new(PassId(index as u32), name, info));

        Ok(PassBuilder {
            pass: &mut self.passes[index],
            registry: &mut self.registry,
        })
    }

    /// Designate a declared Permanent resource as a root of the frame
    pub fn set_output(&mut self, name: &str) -> GraphResult<()> {
        self.expect_phase(GraphPhase::Recording, "set an output")?;

        let resource = self.registry.get_by_name(name).ok_or_else(|| {
            log::error!("Output '{}' has not been declared by any pass", name);
            GraphError::UnknownResource {
                name: name.to_string(),
            }
        })?;
        if resource.is_transient() {
            log::error!("Output '{}' must be a permanent resource", name);
            return Err(GraphError::TransientOutput {
                name: name.to_string(),
            });
        }

        let id = resource.id();
        if !self.outputs.contains(&id) {
            self.outputs.push(id);
        }
        Ok(())
    }

    /// Resolve the pass order for every output and allocate resources.
    ///
    /// A failing output does not stop the others from being resolved, so
    /// every problem gets logged, but the first error is returned and nothing
    /// is allocated. The graph then stays in [`GraphPhase::Recording`].
    pub fn build(&mut self) -> GraphResult<()> {
        self.expect_phase(GraphPhase::Recording, "build")?;

        if self.outputs.is_empty() {
            log::error!("Frame graph has no outputs");
            return Err(GraphError::NoOutputs);
        }

        self.pass_order.clear();
        self.dependencies.clear();

        let mut first_error = None;
        let mut in_use = Vec::new();
        for output in self.outputs.clone() {
            match self.resolve_output(output) {
                Ok(resolved) => {
                    for pass in resolved.order {
                        if !self.pass_order.contains(&pass) {
                            self.pass_order.push(pass);
                        }
                    }
                    in_use.extend(resolved.in_use);
                    self.dependencies.push((output, resolved.edges));
                }
                Err(err) => {
                    if err.is_structural() {
                        log::error!("Abandoning output ordering: {}", err);
                    } else {
                        log::error!("Invalid frame graph configuration: {}", err);
                    }
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        for id in in_use {
            if let Some(resource) = self.registry.get_mut(id) {
                resource.idle_frames = 0;
            }
        }

        let allocated = self.allocate_resources()?;
        self.phase = GraphPhase::Built;

        log::debug!(
            "Frame {} built: {} of {} passes scheduled, {} resources allocated",
            self.frame_index,
            self.pass_order.len(),
            self.passes.len(),
            allocated
        );
        log::trace!("Pass order: {:?}", self.pass_order_names());
        Ok(())
    }

    /// Drop this frame's passes and outputs, keeping resources and their
    /// physical backing.
    pub fn reset(&mut self) {
        self.passes.clear();
        self.outputs.clear();
        self.dependencies.clear();
        self.pass_order.clear();
        for resource in self.registry.iter_mut() {
            let reset_usage = !resource.is_transient();
            resource.begin_frame(reset_usage);
        }
        self.phase = GraphPhase::Recording;
        self.frame_index += 1;
    }

    fn resolve_output(&self, output: ResourceId) -> GraphResult<ResolvedOutput> {
        let writer = self.output_writer(output)?;
        let output_name = self.resource_name(output);
        let (edges, in_use) = self.discover(&output_name, writer)?;
        let order = self.linearize(&output_name, writer, &edges)?;
        Ok(ResolvedOutput {
            edges,
            order,
            in_use,
        })
    }

    fn output_writer(&self, output: ResourceId) -> GraphResult<PassId> {
        let resource = self
            .registry
            .get(output)
            .ok_or_else(|| GraphError::UnknownResource {
                name: format!("{:?}", output),
            })?;

        if resource.is_transient() {
            return Err(GraphError::TransientOutput {
                name: resource.name().to_string(),
            });
        }

        match resource.write_passes() {
            [writer] => Ok(*writer),
            [] => Err(GraphError::NoWriter {
                output: resource.name().to_string(),
            }),
            writers => Err(GraphError::MultipleWriters {
                output: resource.name().to_string(),
                writers: writers.iter().map(|&id| self.pass_name(id)).collect(),
            }),
        }
    }

    /// Walk backwards from `writer`, collecting every producer edge and the
    /// resources touched by the visited passes.
    fn discover(
        &self,
        output: &str,
        writer: PassId,
    ) -> GraphResult<(Vec<DependencyEdge>, Vec<ResourceId>)> {
        let limit = self.config.max_traversal_steps;
        let mut stack = vec![writer];
        let mut pushed = HashSet::from([writer]);
        let mut seen_edges = HashSet::new();
        let mut edges = Vec::new();
        let mut in_use = Vec::new();
        let mut steps = 0;

        while let Some(consumer) = stack.pop() {
            steps += 1;
            if steps > limit {
                return Err(GraphError::TraversalLimitExceeded {
                    output: output.to_string(),
                    limit,
                });
            }

            let Some(pass) = self.passes.get(consumer.index()) else {
                continue;
            };
            for input in pass.inputs() {
                let Some(resource) = self.registry.get(input) else {
                    continue;
                };
                in_use.push(input);

                for &producer in resource.write_passes() {
                    if producer == consumer {
                        continue;
                    }
                    if seen_edges.insert((consumer, producer)) {
                        edges.push(DependencyEdge {
                            consumer,
                            producer,
                            resource: input,
                        });
                    }
                    if pushed.insert(producer) {
                        stack.push(producer);
                    }
                }
            }
            in_use.extend(pass.outputs());
        }

        Ok((edges, in_use))
    }

    /// Order the discovered passes so every producer precedes its consumers.
    ///
    /// Kahn's algorithm; among passes that are ready at the same time the one
    /// declared first runs first.
    fn linearize(
        &self,
        output: &str,
        writer: PassId,
        edges: &[DependencyEdge],
    ) -> GraphResult<Vec<PassId>> {
        let mut in_degree: HashMap<PassId, usize> = HashMap::from([(writer, 0)]);
        let mut consumers: HashMap<PassId, Vec<PassId>> = HashMap::new();
        for edge in edges {
            in_degree.entry(edge.producer).or_insert(0);
            *in_degree.entry(edge.consumer).or_insert(0) += 1;
            consumers.entry(edge.producer).or_default().push(edge.consumer);
        }

        let mut ready: BinaryHeap<Reverse<PassId>> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&pass, _)| Reverse(pass))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(pass)) = ready.pop() {
            order.push(pass);
            for consumer in consumers.get(&pass).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(consumer) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(*consumer));
                    }
                }
            }
        }

        if order.len() < in_degree.len() {
            let stuck = in_degree
                .iter()
                .filter(|(_, &degree)| degree > 0)
                .map(|(&pass, _)| pass)
                .min()
                .unwrap_or(writer);
            return Err(GraphError::DependencyCycle {
                output: output.to_string(),
                pass: self.pass_name(stuck),
            });
        }
        Ok(order)
    }

    fn expect_phase(&self, expected: GraphPhase, operation: &'static str) -> GraphResult<()> {
        if self.phase != expected {
            log::error!("Cannot {} while the frame graph is {:?}", operation, self.phase);
            return Err(GraphError::InvalidPhase {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn pass_name(&self, id: PassId) -> String {
        self.passes
            .get(id.index())
            .map(|pass| pass.name().to_string())
            .unwrap_or_else(|| format!("{:?}", id))
    }

    fn resource_name(&self, id: ResourceId) -> String {
        self.registry
            .get(id)
            .map(|resource| resource.name().to_string())
            .unwrap_or_else(|| format!("{:?}", id))
    }

    fn pass_order_names(&self) -> Vec<&str> {
        self.ordered_passes().map(Pass::name).collect()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn phase(&self) -> GraphPhase {
        self.phase
    }

    /// Number of `reset` calls so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Execution order resolved by the last `build`
    pub fn pass_order(&self) -> &[PassId] {
        &self.pass_order
    }

    /// Passes in execution order
    pub fn ordered_passes(&self) -> impl Iterator<Item = &Pass<P>> {
        self.pass_order
            .iter()
            .filter_map(|id| self.passes.get(id.index()))
    }

    pub fn pass(&self, id: PassId) -> Option<&Pass<P>> {
        self.passes.get(id.index())
    }

    pub fn pass_by_name(&self, name: &str) -> Option<&Pass<P>> {
        self.passes.iter().find(|pass| pass.name() == name)
    }

    /// Passes in declaration order
    pub fn passes(&self) -> &[Pass<P>] {
        &self.passes
    }

    pub fn outputs(&self) -> &[ResourceId] {
        &self.outputs
    }

    /// Edges discovered for `output` by the last `build`
    pub fn dependencies(&self, output: &str) -> Option<&[DependencyEdge]> {
        let id = self.registry.id_of(output)?;
        self.dependencies
            .iter()
            .find(|(resource, _)| *resource == id)
            .map(|(_, edges)| edges.as_slice())
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn physical_image(&self, name: &str) -> Option<ImageHandle> {
        self.registry
            .get_by_name(name)
            .and_then(Resource::image_handle)
    }

    pub fn physical_buffer(&self, name: &str) -> Option<BufferHandle> {
        self.registry
            .get_by_name(name)
            .and_then(Resource::buffer_handle)
    }
}
