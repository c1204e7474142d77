//! Frame graph executor
//!
//! Realizes the resources a built graph needs, records every scheduled pass
//! into the graph's command buffer with the transitions it requires, submits
//! it and then ages transient resources.

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::error::*;
use crate::render_graph::graph::*;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;

/// Summary of one `execute` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub passes_executed: usize,
    pub transitions_emitted: usize,
    pub resources_released: usize,
}

impl<P: Provider> FrameGraph<P> {
    /// Bind physical backing: Permanent resources once, Transient resources
    /// every frame.
    pub(crate) fn allocate_resources(&mut self) -> GraphResult<usize> {
        let mut allocated = 0;

        for resource in self.registry.iter_mut() {
            let transient = resource.is_transient();
            if !transient && resource.physical.is_some() {
                continue;
            }

            let physical = match resource.kind() {
                ResourceKind::Image => self
                    .provider
                    .create_image(resource)
                    .map(PhysicalResource::Image),
                ResourceKind::Buffer => self
                    .provider
                    .create_buffer(resource)
                    .map(PhysicalResource::Buffer),
            }
            .map_err(|err| {
                log::error!(
                    "Failed to allocate {} '{}': {}",
                    resource.kind(),
                    resource.name(),
                    err
                );
                err
            })?;

            if transient {
                resource.state = ResourceState::UNDEFINED;
            }
            resource.physical = Some(physical);
            allocated += 1;
        }

        Ok(allocated)
    }

    /// Record and submit every scheduled pass, then run the idle sweep.
    ///
    /// Tracked resource states only change once the command buffer has been
    /// submitted, so a failed execute can be retried with the same barriers.
    pub fn execute(&mut self) -> GraphResult<FrameStats> {
        if self.phase != GraphPhase::Built {
            log::error!("Cannot execute while the frame graph is {:?}", self.phase);
            return Err(GraphError::InvalidPhase {
                operation: "execute",
                phase: self.phase,
            });
        }

        let cmd = self.command_buffer()?;
        self.provider.begin_command_buffer(cmd)?;

        let mut stats = FrameStats::default();
        let pending = match self.record_passes(cmd, &mut stats) {
            Ok(pending) => pending,
            Err(err) => {
                if let Err(end_err) = self.provider.end_command_buffer(cmd) {
                    log::warn!("Failed to end command buffer after error: {}", end_err);
                }
                return Err(err);
            }
        };

        self.provider.end_command_buffer(cmd)?;
        self.provider.submit_command_buffer(cmd).map_err(|err| {
            log::error!("Frame {} submission failed: {}", self.frame_index, err);
            err
        })?;

        for (id, state) in pending {
            if let Some(resource) = self.registry.get_mut(id) {
                resource.state = state;
            }
        }

        stats.resources_released = self.release_idle_resources();
        self.phase = GraphPhase::Executed;

        log::debug!(
            "Frame {} executed: {} passes, {} transitions, {} resources released",
            self.frame_index,
            stats.passes_executed,
            stats.transitions_emitted,
            stats.resources_released
        );
        Ok(stats)
    }

    /// Emit transitions and run callbacks for every scheduled pass.
    ///
    /// Returns the state each transitioned resource ends up in.
    fn record_passes(
        &mut self,
        cmd: CommandBufferHandle,
        stats: &mut FrameStats,
    ) -> GraphResult<HashMap<ResourceId, ResourceState>> {
        let mut pending: HashMap<ResourceId, ResourceState> = HashMap::new();

        for &pass_id in &self.pass_order {
            let Some(pass) = self.passes.get(pass_id.index()) else {
                continue;
            };

            for transition in pass.transitions() {
                let resource = self.registry.get(transition.resource).ok_or_else(|| {
                    GraphError::UnknownResource {
                        name: format!("{:?}", transition.resource),
                    }
                })?;
                let current = pending
                    .get(&transition.resource)
                    .copied()
                    .unwrap_or(resource.state);
                if current == transition.state {
                    continue;
                }

                match resource.physical {
                    Some(PhysicalResource::Image(image)) => {
                        self.provider
                            .transition_image(cmd, image, &current, &transition.state)
                    }
                    Some(PhysicalResource::Buffer(buffer)) => {
                        self.provider
                            .transition_buffer(cmd, buffer, &current, &transition.state)
                    }
                    None => {
                        log::error!(
                            "Pass '{}' uses '{}' before it was allocated",
                            pass.name(),
                            resource.name()
                        );
                        return Err(GraphError::Unallocated {
                            name: resource.name().to_string(),
                        });
                    }
                }
                log::trace!(
                    "Transition '{}': {:?} -> {:?}",
                    resource.name(),
                    current.layout,
                    transition.state.layout
                );
                pending.insert(transition.resource, transition.state);
                stats.transitions_emitted += 1;
            }

            let mut ctx = PassContext {
                pass,
                resources: &self.registry,
                command_buffer: cmd,
                provider: &mut self.provider,
            };
            if !pass.execute(&mut ctx) {
                log::trace!("Pass '{}' has no execute callback", pass.name());
            }
            stats.passes_executed += 1;
        }

        Ok(pending)
    }

    /// Release every physical resource and empty the registry.
    ///
    /// The graph is left ready to record a fresh frame.
    pub fn teardown(&mut self) {
        let ids: Vec<ResourceId> = self.registry.iter().map(Resource::id).collect();
        let count = ids.len();
        for id in ids {
            if let Some(resource) = self.registry.remove(id) {
                release(&mut self.provider, &resource);
            }
        }

        self.passes.clear();
        self.outputs.clear();
        self.dependencies.clear();
        self.pass_order.clear();
        self.phase = GraphPhase::Recording;
        log::debug!("Frame graph torn down, {} resources released", count);
    }

    /// Tear the graph down and hand the provider back
    pub fn into_provider(mut self) -> P {
        self.teardown();
        self.provider
    }

    fn command_buffer(&mut self) -> GraphResult<CommandBufferHandle> {
        if let Some(cmd) = self.command_buffer {
            return Ok(cmd);
        }

        let desc = CommandBufferDesc {
            label: Some(self.config.command_buffer_label.clone()),
            queue: QueueFlags::GRAPHICS,
        };
        let cmd = self.provider.create_command_buffer(&desc)?;
        self.command_buffer = Some(cmd);
        Ok(cmd)
    }

    fn release_idle_resources(&mut self) -> usize {
        let threshold = self.config.idle_frame_threshold;
        let mut expired = Vec::new();
        for resource in self.registry.iter_transient_mut() {
            resource.idle_frames = resource.idle_frames.saturating_add(1);
            if resource.idle_frames > threshold {
                expired.push(resource.id());
            }
        }

        for &id in &expired {
            if let Some(resource) = self.registry.remove(id) {
                log::debug!(
                    "Releasing '{}' after {} idle frames",
                    resource.name(),
                    resource.idle_frames()
                );
                release(&mut self.provider, &resource);
            }
        }
        expired.len()
    }
}

fn release<P: Provider>(provider: &mut P, resource: &Resource) {
    match resource.physical() {
        Some(PhysicalResource::Image(image)) => provider.release_image(resource, image),
        Some(PhysicalResource::Buffer(buffer)) => provider.release_buffer(resource, buffer),
        None => {}
    }
}
