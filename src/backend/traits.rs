//! Provider abstraction
//!
//! The frame graph never touches a graphics API directly. Everything physical
//! (images, buffers, command buffers, barriers, submission) goes through a
//! [`Provider`] supplied by the graphics backend.

use crate::backend::types::*;
use crate::render_graph::Resource;
use thiserror::Error;

/// Provider error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Failed to create image: {0}")]
    ImageCreationFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create command buffer: {0}")]
    CommandBufferCreationFailed(String),
    #[error("Failed to record commands: {0}")]
    RecordingFailed(String),
    #[error("Failed to submit command buffer: {0}")]
    SubmissionFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Handle to a physical image owned by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageHandle(u64);

impl ImageHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to a physical buffer owned by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to a physical command buffer owned by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandBufferHandle(u64);

impl CommandBufferHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Capability set the graphics backend injects into a
/// [`FrameGraph`](crate::render_graph::FrameGraph).
///
/// The provider owns every physical object. The graph only asks for
/// creation and release; it never frees anything itself. Creation calls
/// receive the logical [`Resource`] so the backend can read its description
/// and the usage accumulated over the frame.
pub trait Provider {
    // Resource creation

    /// Create the physical backing for an image resource
    fn create_image(&mut self, resource: &Resource) -> ProviderResult<ImageHandle>;

    /// Create the physical backing for a buffer resource
    fn create_buffer(&mut self, resource: &Resource) -> ProviderResult<BufferHandle>;

    /// Create a command buffer
    fn create_command_buffer(
        &mut self,
        desc: &CommandBufferDesc,
    ) -> ProviderResult<CommandBufferHandle>;

    // Recording

    /// Begin recording into a command buffer
    fn begin_command_buffer(&mut self, cmd: CommandBufferHandle) -> ProviderResult<()>;

    /// Finish recording
    fn end_command_buffer(&mut self, cmd: CommandBufferHandle) -> ProviderResult<()>;

    /// Submit a recorded command buffer
    fn submit_command_buffer(&mut self, cmd: CommandBufferHandle) -> ProviderResult<()>;

    /// Record an image barrier moving `image` from `old` to `new`
    fn transition_image(
        &mut self,
        cmd: CommandBufferHandle,
        image: ImageHandle,
        old: &ResourceState,
        new: &ResourceState,
    );

    /// Record a buffer barrier moving `buffer` from `old` to `new`
    fn transition_buffer(
        &mut self,
        cmd: CommandBufferHandle,
        buffer: BufferHandle,
        old: &ResourceState,
        new: &ResourceState,
    );

    // Resource cleanup

    /// Release the physical image bound to `resource`
    fn release_image(&mut self, resource: &Resource, image: ImageHandle);

    /// Release the physical buffer bound to `resource`
    fn release_buffer(&mut self, resource: &Resource, buffer: BufferHandle);
}
