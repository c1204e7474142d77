//! Common types shared between the frame graph and its provider

use bitflags::bitflags;

/// Image format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    Rg32Float,
    Depth32Float,
    Depth24PlusStencil8,
    Depth32FloatStencil8,
}

impl Format {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Format::Depth32Float | Format::Depth24PlusStencil8 | Format::Depth32FloatStencil8
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            Format::Depth24PlusStencil8 | Format::Depth32FloatStencil8
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Format::Rgba8Unorm
            | Format::Rgba8UnormSrgb
            | Format::Bgra8Unorm
            | Format::Bgra8UnormSrgb
            | Format::Depth32Float
            | Format::Depth24PlusStencil8
            | Format::R32Float => 4,
            Format::Rgba16Float | Format::Rg32Float | Format::Depth32FloatStencil8 => 8,
            Format::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// How a resource is used across all passes of a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceUsage: u32 {
        const COLOR_ATTACHMENT = 1 << 0;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const VERTEX_BUFFER = 1 << 4;
        const INDEX_BUFFER = 1 << 5;
        const UNIFORM_BUFFER = 1 << 6;
        const TRANSFER_SRC = 1 << 7;
        const TRANSFER_DST = 1 << 8;
    }
}

bitflags! {
    /// Queue families a pass (and therefore its resources) runs on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QueueFlags: u32 {
        const GRAPHICS = 1 << 0;
        const COMPUTE = 1 << 1;
        const TRANSFER = 1 << 2;
    }
}

bitflags! {
    /// Shader stages that access a resource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

bitflags! {
    /// Pipeline stages used as barrier scopes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_INPUT = 1 << 1;
        const VERTEX_SHADER = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
        const EARLY_FRAGMENT_TESTS = 1 << 4;
        const LATE_FRAGMENT_TESTS = 1 << 5;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 6;
        const COMPUTE_SHADER = 1 << 7;
        const TRANSFER = 1 << 8;
        const BOTTOM_OF_PIPE = 1 << 9;
    }
}

bitflags! {
    /// Memory access kinds used as barrier scopes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const VERTEX_ATTRIBUTE_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const UNIFORM_READ = 1 << 2;
        const SHADER_READ = 1 << 3;
        const SHADER_WRITE = 1 << 4;
        const COLOR_ATTACHMENT_READ = 1 << 5;
        const COLOR_ATTACHMENT_WRITE = 1 << 6;
        const DEPTH_STENCIL_READ = 1 << 7;
        const DEPTH_STENCIL_WRITE = 1 << 8;
        const TRANSFER_READ = 1 << 9;
        const TRANSFER_WRITE = 1 << 10;
    }
}

impl From<ShaderStages> for PipelineStages {
    fn from(stages: ShaderStages) -> Self {
        let mut result = PipelineStages::empty();
        if stages.contains(ShaderStages::VERTEX) {
            result |= PipelineStages::VERTEX_SHADER;
        }
        if stages.contains(ShaderStages::FRAGMENT) {
            result |= PipelineStages::FRAGMENT_SHADER;
        }
        if stages.contains(ShaderStages::COMPUTE) {
            result |= PipelineStages::COMPUTE_SHADER;
        }
        result
    }
}

/// Image layout a pass requires an image to be in.
///
/// Buffers carry no layout and always report [`ImageLayout::Undefined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    #[default]
    Undefined,
    General,
    ColorAttachment,
    DepthAttachment,
    DepthStencilAttachment,
    DepthReadOnly,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    Present,
}

/// Access state of a resource: the last (or required) stage, access and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceState {
    pub stage: PipelineStages,
    pub access: AccessFlags,
    pub layout: ImageLayout,
}

impl ResourceState {
    /// State of a resource whose contents are unknown.
    pub const UNDEFINED: Self = Self {
        stage: PipelineStages::TOP_OF_PIPE,
        access: AccessFlags::empty(),
        layout: ImageLayout::Undefined,
    };

    pub const fn new(stage: PipelineStages, access: AccessFlags, layout: ImageLayout) -> Self {
        Self {
            stage,
            access,
            layout,
        }
    }

    /// Whether this state includes any write access.
    pub fn is_write(&self) -> bool {
        self.access.intersects(
            AccessFlags::SHADER_WRITE
                | AccessFlags::COLOR_ATTACHMENT_WRITE
                | AccessFlags::DEPTH_STENCIL_WRITE
                | AccessFlags::TRANSFER_WRITE,
        )
    }
}

/// Command buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBufferDesc {
    pub label: Option<String>,
    pub queue: QueueFlags,
}

impl Default for CommandBufferDesc {
    fn default() -> Self {
        Self {
            label: None,
            queue: QueueFlags::GRAPHICS,
        }
    }
}
