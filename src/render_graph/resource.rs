//! Logical resources tracked by the frame graph

use std::fmt;

use crate::backend::traits::{BufferHandle, ImageHandle};
use crate::backend::types::*;
use crate::render_graph::pass::PassId;

/// Unique identifier for a frame graph resource
///
/// Ids are never reused within one registry: a resource released by the idle
/// sweep and declared again gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u32);

impl ResourceId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Which pool a resource lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Frame-scoped, released once idle for long enough
    #[default]
    Transient,
    /// Physical backing persists across frames
    Permanent,
}

/// Resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Buffer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Image => write!(f, "image"),
            ResourceKind::Buffer => write!(f, "buffer"),
        }
    }
}

/// Image description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: u32,
    pub format: Format,
    pub lifetime: Lifetime,
}

impl ImageInfo {
    /// A transient 2D image with a single mip and layer
    pub fn new_2d(width: u32, height: u32, format: Format) -> Self {
        Self {
            width,
            height,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
            format,
            lifetime: Lifetime::Transient,
        }
    }

    pub fn permanent(mut self) -> Self {
        self.lifetime = Lifetime::Permanent;
        self
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    pub fn with_array_layers(mut self, array_layers: u32) -> Self {
        self.array_layers = array_layers;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Size of the base mip level in bytes
    pub fn byte_size(&self) -> u64 {
        self.width as u64
            * self.height as u64
            * self.depth as u64
            * self.array_layers as u64
            * self.format.bytes_per_pixel() as u64
    }
}

/// Buffer description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    pub size: u64,
    pub lifetime: Lifetime,
}

impl BufferInfo {
    /// A transient buffer of `size` bytes
    pub fn new(size: u64) -> Self {
        Self {
            size,
            lifetime: Lifetime::Transient,
        }
    }

    pub fn permanent(mut self) -> Self {
        self.lifetime = Lifetime::Permanent;
        self
    }
}

/// Logical description of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceDesc {
    Image(ImageInfo),
    Buffer(BufferInfo),
}

/// Physical backing bound to a resource at allocation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalResource {
    Image(ImageHandle),
    Buffer(BufferHandle),
}

/// A named logical image or buffer
///
/// Owned by the [`ResourceRegistry`](super::ResourceRegistry); passes refer
/// to it by [`ResourceId`].
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    name: String,
    desc: ResourceDesc,
    lifetime: Lifetime,
    pub(crate) usage: ResourceUsage,
    pub(crate) queues: QueueFlags,
    pub(crate) shader_stages: ShaderStages,
    pub(crate) read_passes: Vec<PassId>,
    pub(crate) write_passes: Vec<PassId>,
    pub(crate) state: ResourceState,
    pub(crate) physical: Option<PhysicalResource>,
    pub(crate) idle_frames: u32,
}

impl Resource {
    pub(crate) fn new(id: ResourceId, name: &str, desc: ResourceDesc) -> Self {
        let lifetime = match &desc {
            ResourceDesc::Image(info) => info.lifetime,
            ResourceDesc::Buffer(info) => info.lifetime,
        };
        Self {
            id,
            name: name.to_string(),
            desc,
            lifetime,
            usage: ResourceUsage::empty(),
            queues: QueueFlags::empty(),
            shader_stages: ShaderStages::empty(),
            read_passes: Vec::new(),
            write_passes: Vec::new(),
            state: ResourceState::UNDEFINED,
            physical: None,
            idle_frames: 0,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        match self.desc {
            ResourceDesc::Image(_) => ResourceKind::Image,
            ResourceDesc::Buffer(_) => ResourceKind::Buffer,
        }
    }

    pub fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    pub fn image_info(&self) -> Option<&ImageInfo> {
        match &self.desc {
            ResourceDesc::Image(info) => Some(info),
            ResourceDesc::Buffer(_) => None,
        }
    }

    pub fn buffer_info(&self) -> Option<&BufferInfo> {
        match &self.desc {
            ResourceDesc::Buffer(info) => Some(info),
            ResourceDesc::Image(_) => None,
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn is_transient(&self) -> bool {
        self.lifetime == Lifetime::Transient
    }

    /// Usage accumulated over every pass declared this frame
    pub fn usage(&self) -> ResourceUsage {
        self.usage
    }

    pub fn queues(&self) -> QueueFlags {
        self.queues
    }

    pub fn shader_stages(&self) -> ShaderStages {
        self.shader_stages
    }

    /// Passes reading this resource, in declaration order
    pub fn read_passes(&self) -> &[PassId] {
        &self.read_passes
    }

    /// Passes writing this resource, in declaration order
    pub fn write_passes(&self) -> &[PassId] {
        &self.write_passes
    }

    /// Last known access state
    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn physical(&self) -> Option<PhysicalResource> {
        self.physical
    }

    pub fn image_handle(&self) -> Option<ImageHandle> {
        match self.physical {
            Some(PhysicalResource::Image(handle)) => Some(handle),
            _ => None,
        }
    }

    pub fn buffer_handle(&self) -> Option<BufferHandle> {
        match self.physical {
            Some(PhysicalResource::Buffer(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Number of execute sweeps since the resource was last found in use
    pub fn idle_frames(&self) -> u32 {
        self.idle_frames
    }

    pub(crate) fn record_read(&mut self, pass: PassId) {
        if !self.read_passes.contains(&pass) {
            self.read_passes.push(pass);
        }
    }

    pub(crate) fn record_write(&mut self, pass: PassId) {
        if !self.write_passes.contains(&pass) {
            self.write_passes.push(pass);
        }
    }

    /// Drop per-frame pass bookkeeping; `reset_usage` also clears accumulated flags
    pub(crate) fn begin_frame(&mut self, reset_usage: bool) {
        self.read_passes.clear();
        self.write_passes.clear();
        if reset_usage {
            self.usage = ResourceUsage::empty();
            self.queues = QueueFlags::empty();
            self.shader_stages = ShaderStages::empty();
        }
    }
}
