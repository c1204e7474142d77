//! Pass declarations for the frame graph

use std::fmt;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::error::GraphResult;
use crate::render_graph::registry::ResourceRegistry;
use crate::render_graph::resource::*;

/// Identifier of a pass: its position in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Parameters for a new pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassInfo {
    pub queue: QueueFlags,
}

impl PassInfo {
    pub fn graphics() -> Self {
        Self {
            queue: QueueFlags::GRAPHICS,
        }
    }

    pub fn compute() -> Self {
        Self {
            queue: QueueFlags::COMPUTE,
        }
    }

    pub fn transfer() -> Self {
        Self {
            queue: QueueFlags::TRANSFER,
        }
    }
}

impl Default for PassInfo {
    fn default() -> Self {
        Self::graphics()
    }
}

/// The role a resource plays in a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessSlot {
    ColorInput,
    ColorOutput,
    DepthInput,
    DepthOutput,
    DepthStencilInput,
    DepthStencilOutput,
    VertexBufferInput,
    IndexBufferInput,
    UniformTextureInput,
    UniformBufferInput,
}

impl AccessSlot {
    pub fn is_output(self) -> bool {
        matches!(
            self,
            Self::ColorOutput | Self::DepthOutput | Self::DepthStencilOutput
        )
    }

    pub fn kind(self) -> ResourceKind {
        match self {
            Self::VertexBufferInput | Self::IndexBufferInput | Self::UniformBufferInput => {
                ResourceKind::Buffer
            }
            _ => ResourceKind::Image,
        }
    }

    /// Usage bits this access adds to the resource
    pub fn usage(self) -> ResourceUsage {
        match self {
            Self::ColorOutput => ResourceUsage::COLOR_ATTACHMENT,
            Self::DepthOutput | Self::DepthStencilOutput => {
                ResourceUsage::DEPTH_STENCIL_ATTACHMENT
            }
            Self::ColorInput
            | Self::DepthInput
            | Self::DepthStencilInput
            | Self::UniformTextureInput => ResourceUsage::SAMPLED,
            Self::VertexBufferInput => ResourceUsage::VERTEX_BUFFER,
            Self::IndexBufferInput => ResourceUsage::INDEX_BUFFER,
            Self::UniformBufferInput => ResourceUsage::UNIFORM_BUFFER,
        }
    }

    /// State the resource must be in before the pass runs
    pub fn required_state(self, stages: ShaderStages) -> ResourceState {
        let shader_stage = if stages.is_empty() {
            PipelineStages::FRAGMENT_SHADER
        } else {
            PipelineStages::from(stages)
        };
        let depth_tests =
            PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS;
        let depth_access = AccessFlags::DEPTH_STENCIL_READ | AccessFlags::DEPTH_STENCIL_WRITE;

        match self {
            Self::ColorOutput => ResourceState::new(
                PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                AccessFlags::COLOR_ATTACHMENT_WRITE,
                ImageLayout::ColorAttachment,
            ),
            Self::ColorInput => ResourceState::new(
                shader_stage,
                AccessFlags::SHADER_READ,
                ImageLayout::ShaderReadOnly,
            ),
            Self::DepthOutput => {
                ResourceState::new(depth_tests, depth_access, ImageLayout::DepthAttachment)
            }
            Self::DepthInput => ResourceState::new(
                shader_stage,
                AccessFlags::SHADER_READ,
                ImageLayout::DepthReadOnly,
            ),
            Self::DepthStencilOutput => ResourceState::new(
                depth_tests,
                depth_access,
                ImageLayout::DepthStencilAttachment,
            ),
            Self::DepthStencilInput => ResourceState::new(
                shader_stage,
                AccessFlags::SHADER_READ,
                ImageLayout::DepthStencilReadOnly,
            ),
            Self::VertexBufferInput => ResourceState::new(
                PipelineStages::VERTEX_INPUT,
                AccessFlags::VERTEX_ATTRIBUTE_READ,
                ImageLayout::Undefined,
            ),
            Self::IndexBufferInput => ResourceState::new(
                PipelineStages::VERTEX_INPUT,
                AccessFlags::INDEX_READ,
                ImageLayout::Undefined,
            ),
            Self::UniformTextureInput => ResourceState::new(
                shader_stage,
                AccessFlags::SHADER_READ,
                ImageLayout::ShaderReadOnly,
            ),
            Self::UniformBufferInput => ResourceState::new(
                shader_stage,
                AccessFlags::UNIFORM_READ,
                ImageLayout::Undefined,
            ),
        }
    }
}

/// State a pass requires one of its resources to be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub resource: ResourceId,
    pub slot: AccessSlot,
    pub state: ResourceState,
}

/// Deferred work attached to a pass
pub type ExecuteFn<P> = Box<dyn Fn(&mut PassContext<'_, P>)>;

/// A declared unit of work
pub struct Pass<P: Provider> {
    id: PassId,
    name: String,
    queue: QueueFlags,
    color_inputs: Vec<ResourceId>,
    color_outputs: Vec<ResourceId>,
    depth_inputs: Vec<ResourceId>,
    depth_outputs: Vec<ResourceId>,
    depth_stencil_inputs: Vec<ResourceId>,
    depth_stencil_outputs: Vec<ResourceId>,
    vertex_buffer_inputs: Vec<ResourceId>,
    index_buffer_inputs: Vec<ResourceId>,
    uniform_texture_inputs: Vec<ResourceId>,
    uniform_buffer_inputs: Vec<ResourceId>,
    transitions: Vec<Transition>,
    execute: Option<ExecuteFn<P>>,
}

impl<P: Provider> Pass<P> {
    pub(crate) fn new(id: PassId, name: &str, info: PassInfo) -> Self {
        Self {
            id,
            name: name.to_string(),
            queue: info.queue,
            color_inputs: Vec::new(),
            color_outputs: Vec::new(),
            depth_inputs: Vec::new(),
            depth_outputs: Vec::new(),
            depth_stencil_inputs: Vec::new(),
            depth_stencil_outputs: Vec::new(),
            vertex_buffer_inputs: Vec::new(),
            index_buffer_inputs: Vec::new(),
            uniform_texture_inputs: Vec::new(),
            uniform_buffer_inputs: Vec::new(),
            transitions: Vec::new(),
            execute: None,
        }
    }

    pub fn id(&self) -> PassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue(&self) -> QueueFlags {
        self.queue
    }

    /// Resources declared in `slot`, in declaration order
    pub fn resources_in(&self, slot: AccessSlot) -> &[ResourceId] {
        match slot {
            AccessSlot::ColorInput => &self.color_inputs,
            AccessSlot::ColorOutput => &self.color_outputs,
            AccessSlot::DepthInput => &self.depth_inputs,
            AccessSlot::DepthOutput => &self.depth_outputs,
            AccessSlot::DepthStencilInput => &self.depth_stencil_inputs,
            AccessSlot::DepthStencilOutput => &self.depth_stencil_outputs,
            AccessSlot::VertexBufferInput => &self.vertex_buffer_inputs,
            AccessSlot::IndexBufferInput => &self.index_buffer_inputs,
            AccessSlot::UniformTextureInput => &self.uniform_texture_inputs,
            AccessSlot::UniformBufferInput => &self.uniform_buffer_inputs,
        }
    }

    /// Every input across all categories
    pub fn inputs(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.color_inputs
            .iter()
            .chain(&self.depth_inputs)
            .chain(&self.depth_stencil_inputs)
            .chain(&self.uniform_texture_inputs)
            .chain(&self.vertex_buffer_inputs)
            .chain(&self.index_buffer_inputs)
            .chain(&self.uniform_buffer_inputs)
            .copied()
    }

    /// Every output across all categories
    pub fn outputs(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.color_outputs
            .iter()
            .chain(&self.depth_outputs)
            .chain(&self.depth_stencil_outputs)
            .copied()
    }

    pub fn writes(&self, resource: ResourceId) -> bool {
        self.outputs().any(|id| id == resource)
    }

    pub fn reads(&self, resource: ResourceId) -> bool {
        self.inputs().any(|id| id == resource)
    }

    /// Required resource states, in declaration order
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn has_execute(&self) -> bool {
        self.execute.is_some()
    }

    /// Run the attached callback, if any
    pub(crate) fn execute(&self, ctx: &mut PassContext<'_, P>) -> bool {
        match &self.execute {
            Some(callback) => {
                callback(ctx);
                true
            }
            None => false,
        }
    }

    fn slot_mut(&mut self, slot: AccessSlot) -> &mut Vec<ResourceId> {
        match slot {
            AccessSlot::ColorInput => &mut self.color_inputs,
            AccessSlot::ColorOutput => &mut self.color_outputs,
            AccessSlot::DepthInput => &mut self.depth_inputs,
            AccessSlot::DepthOutput => &mut self.depth_outputs,
            AccessSlot::DepthStencilInput => &mut self.depth_stencil_inputs,
            AccessSlot::DepthStencilOutput => &mut self.depth_stencil_outputs,
            AccessSlot::VertexBufferInput => &mut self.vertex_buffer_inputs,
            AccessSlot::IndexBufferInput => &mut self.index_buffer_inputs,
            AccessSlot::UniformTextureInput => &mut self.uniform_texture_inputs,
            AccessSlot::UniformBufferInput => &mut self.uniform_buffer_inputs,
        }
    }
}

impl<P: Provider> fmt::Debug for Pass<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("inputs", &self.inputs().collect::<Vec<_>>())
            .field("outputs", &self.outputs().collect::<Vec<_>>())
            .field("has_execute", &self.execute.is_some())
            .finish_non_exhaustive()
    }
}

/// Declares the resources of one pass.
///
/// Each `add_*` call resolves (or creates) the named resource through the
/// graph's registry, accumulates this pass's flags on it, records the read or
/// write and appends the state the pass needs.
pub struct PassBuilder<'a, P: Provider> {
    pub(crate) pass: &'a mut Pass<P>,
    pub(crate) registry: &'a mut ResourceRegistry,
}

impl<'a, P: Provider> PassBuilder<'a, P> {
    pub fn id(&self) -> PassId {
        self.pass.id
    }

    pub fn name(&self) -> &str {
        &self.pass.name
    }

    /// Look at the registry while declaring
    pub fn resources(&self) -> &ResourceRegistry {
        self.registry
    }

    pub fn add_color_input(&mut self, name: &str, info: &ImageInfo) -> GraphResult<ResourceId> {
        self.declare_image(name, info, AccessSlot::ColorInput, ShaderStages::FRAGMENT)
    }

    pub fn add_color_output(&mut self, name: &str, info: &ImageInfo) -> GraphResult<ResourceId> {
        self.declare_image(name, info, AccessSlot::ColorOutput, ShaderStages::empty())
    }

    pub fn add_depth_input(&mut self, name: &str, info: &ImageInfo) -> GraphResult<ResourceId> {
        self.declare_image(name, info, AccessSlot::DepthInput, ShaderStages::FRAGMENT)
    }

    pub fn add_depth_output(&mut self, name: &str, info: &ImageInfo) -> GraphResult<ResourceId> {
        self.declare_image(name, info, AccessSlot::DepthOutput, ShaderStages::empty())
    }

    pub fn add_depth_stencil_input(
        &mut self,
        name: &str,
        info: &ImageInfo,
    ) -> GraphResult<ResourceId> {
        self.declare_image(
            name,
            info,
            AccessSlot::DepthStencilInput,
            ShaderStages::FRAGMENT,
        )
    }

    pub fn add_depth_stencil_output(
        &mut self,
        name: &str,
        info: &ImageInfo,
    ) -> GraphResult<ResourceId> {
        self.declare_image(
            name,
            info,
            AccessSlot::DepthStencilOutput,
            ShaderStages::empty(),
        )
    }

    pub fn add_uniform_texture_input(
        &mut self,
        name: &str,
        info: &ImageInfo,
        stages: ShaderStages,
    ) -> GraphResult<ResourceId> {
        self.declare_image(name, info, AccessSlot::UniformTextureInput, stages)
    }

    pub fn add_vertex_buffer_input(
        &mut self,
        name: &str,
        info: &BufferInfo,
    ) -> GraphResult<ResourceId> {
        self.declare_buffer(
            name,
            info,
            AccessSlot::VertexBufferInput,
            ShaderStages::VERTEX,
        )
    }

    pub fn add_index_buffer_input(
        &mut self,
        name: &str,
        info: &BufferInfo,
    ) -> GraphResult<ResourceId> {
        self.declare_buffer(
            name,
            info,
            AccessSlot::IndexBufferInput,
            ShaderStages::VERTEX,
        )
    }

    pub fn add_uniform_buffer_input(
        &mut self,
        name: &str,
        info: &BufferInfo,
        stages: ShaderStages,
    ) -> GraphResult<ResourceId> {
        self.declare_buffer(name, info, AccessSlot::UniformBufferInput, stages)
    }

    /// Attach the work to run once this pass's transitions are recorded
    pub fn set_execute<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut PassContext<'_, P>) + 'static,
    {
        self.pass.execute = Some(Box::new(callback));
        self
    }

    fn declare_image(
        &mut self,
        name: &str,
        info: &ImageInfo,
        slot: AccessSlot,
        stages: ShaderStages,
    ) -> GraphResult<ResourceId> {
        let (resource, _) = self.registry.acquire_image(name, info)?;
        Ok(Self::record(self.pass, resource, slot, stages))
    }

    fn declare_buffer(
        &mut self,
        name: &str,
        info: &BufferInfo,
        slot: AccessSlot,
        stages: ShaderStages,
    ) -> GraphResult<ResourceId> {
        let (resource, _) = self.registry.acquire_buffer(name, info)?;
        Ok(Self::record(self.pass, resource, slot, stages))
    }

    fn record(
        pass: &mut Pass<P>,
        resource: &mut Resource,
        slot: AccessSlot,
        stages: ShaderStages,
    ) -> ResourceId {
        let id = resource.id();
        resource.usage |= slot.usage();
        resource.queues |= pass.queue;
        resource.shader_stages |= stages;
        if slot.is_output() {
            resource.record_write(pass.id);
        } else {
            resource.record_read(pass.id);
        }

        pass.slot_mut(slot).push(id);
        pass.transitions.push(Transition {
            resource: id,
            slot,
            state: slot.required_state(stages),
        });
        id
    }
}

/// Everything a pass callback can reach while recording
pub struct PassContext<'a, P: Provider> {
    pub(crate) pass: &'a Pass<P>,
    pub(crate) resources: &'a ResourceRegistry,
    pub(crate) command_buffer: CommandBufferHandle,
    pub(crate) provider: &'a mut P,
}

impl<'a, P: Provider> PassContext<'a, P> {
    /// The pass being executed
    pub fn pass(&self) -> &Pass<P> {
        self.pass
    }

    pub fn resources(&self) -> &ResourceRegistry {
        self.resources
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Physical image bound to `id` for this frame
    pub fn physical_image(&self, id: ResourceId) -> Option<ImageHandle> {
        self.resources.get(id).and_then(Resource::image_handle)
    }

    /// Physical buffer bound to `id` for this frame
    pub fn physical_buffer(&self, id: ResourceId) -> Option<BufferHandle> {
        self.resources.get(id).and_then(Resource::buffer_handle)
    }

    /// Command buffer commands should be recorded into
    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.command_buffer
    }

    /// The provider, for recording backend-specific commands
    pub fn provider(&mut self) -> &mut P {
        self.provider
    }
}
