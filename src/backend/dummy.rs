//! Dummy provider for testing and headless runs.
//!
//! This provider doesn't touch any GPU but hands out unique handles and
//! records every call it receives, so the scheduling behavior of a
//! [`FrameGraph`](crate::render_graph::FrameGraph) can be observed without
//! graphics hardware.

use std::collections::BTreeSet;

use crate::backend::traits::*;
use crate::backend::types::{CommandBufferDesc, ResourceState};
use crate::render_graph::Resource;

/// A single call received by the [`DummyProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CreateImage { name: String, image: ImageHandle },
    CreateBuffer { name: String, buffer: BufferHandle },
    CreateCommandBuffer(CommandBufferHandle),
    BeginCommandBuffer(CommandBufferHandle),
    EndCommandBuffer(CommandBufferHandle),
    SubmitCommandBuffer(CommandBufferHandle),
    TransitionImage {
        image: ImageHandle,
        old: ResourceState,
        new: ResourceState,
    },
    TransitionBuffer {
        buffer: BufferHandle,
        old: ResourceState,
        new: ResourceState,
    },
    ReleaseImage { name: String, image: ImageHandle },
    ReleaseBuffer { name: String, buffer: BufferHandle },
}

/// Dummy provider.
///
/// Re-creating a resource that is still bound to a live handle returns the
/// same handle, which mimics a pooling backend.
#[derive(Debug, Default)]
pub struct DummyProvider {
    next_handle: u64,
    calls: Vec<ProviderCall>,
    live_images: BTreeSet<ImageHandle>,
    live_buffers: BTreeSet<BufferHandle>,
    fail_allocations: bool,
    fail_submissions: bool,
}

impl DummyProvider {
    /// Create a new dummy provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the provider name.
    pub fn name(&self) -> &'static str {
        "Dummy Provider"
    }

    /// Make every subsequent image/buffer creation fail with `OutOfMemory`.
    pub fn set_fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    /// Make every subsequent submission fail with `DeviceLost`.
    pub fn set_fail_submissions(&mut self, fail: bool) {
        self.fail_submissions = fail;
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> &[ProviderCall] {
        &self.calls
    }

    /// Forget the recorded calls (live handles are kept).
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of image handles currently alive.
    pub fn live_image_count(&self) -> usize {
        self.live_images.len()
    }

    /// Number of buffer handles currently alive.
    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }

    /// Number of image or buffer creations requested for `name`.
    pub fn creations_of(&self, name: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| match call {
                ProviderCall::CreateImage { name: n, .. }
                | ProviderCall::CreateBuffer { name: n, .. } => n == name,
                _ => false,
            })
            .count()
    }

    /// Number of image or buffer releases requested for `name`.
    pub fn releases_of(&self, name: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| match call {
                ProviderCall::ReleaseImage { name: n, .. }
                | ProviderCall::ReleaseBuffer { name: n, .. } => n == name,
                _ => false,
            })
            .count()
    }

    /// Total number of release calls.
    pub fn release_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    ProviderCall::ReleaseImage { .. } | ProviderCall::ReleaseBuffer { .. }
                )
            })
            .count()
    }

    /// Image transitions recorded for `image`, in order.
    pub fn image_transitions(&self, image: ImageHandle) -> Vec<(ResourceState, ResourceState)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ProviderCall::TransitionImage { image: i, old, new } if *i == image => {
                    Some((*old, *new))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of command buffer submissions.
    pub fn submit_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, ProviderCall::SubmitCommandBuffer(_)))
            .count()
    }

    fn next_raw(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl Provider for DummyProvider {
    fn create_image(&mut self, resource: &Resource) -> ProviderResult<ImageHandle> {
        if self.fail_allocations {
            return Err(ProviderError::OutOfMemory);
        }
        let image = match resource.image_handle() {
            Some(existing) if self.live_images.contains(&existing) => existing,
            _ => ImageHandle::new(self.next_raw()),
        };
        log::trace!(
            "DummyProvider: creating image '{}' -> {:?}",
            resource.name(),
            image
        );
        self.live_images.insert(image);
        self.calls.push(ProviderCall::CreateImage {
            name: resource.name().to_string(),
            image,
        });
        Ok(image)
    }

    fn create_buffer(&mut self, resource: &Resource) -> ProviderResult<BufferHandle> {
        if self.fail_allocations {
            return Err(ProviderError::OutOfMemory);
        }
        let buffer = match resource.buffer_handle() {
            Some(existing) if self.live_buffers.contains(&existing) => existing,
            _ => BufferHandle::new(self.next_raw()),
        };
        log::trace!(
            "DummyProvider: creating buffer '{}' -> {:?}",
            resource.name(),
            buffer
        );
        self.live_buffers.insert(buffer);
        self.calls.push(ProviderCall::CreateBuffer {
            name: resource.name().to_string(),
            buffer,
        });
        Ok(buffer)
    }

    fn create_command_buffer(
        &mut self,
        desc: &CommandBufferDesc,
    ) -> ProviderResult<CommandBufferHandle> {
        let cmd = CommandBufferHandle::new(self.next_raw());
        log::trace!(
            "DummyProvider: creating command buffer {:?} ({:?})",
            desc.label,
            cmd
        );
        self.calls.push(ProviderCall::CreateCommandBuffer(cmd));
        Ok(cmd)
    }

    fn begin_command_buffer(&mut self, cmd: CommandBufferHandle) -> ProviderResult<()> {
        self.calls.push(ProviderCall::BeginCommandBuffer(cmd));
        Ok(())
    }

    fn end_command_buffer(&mut self, cmd: CommandBufferHandle) -> ProviderResult<()> {
        self.calls.push(ProviderCall::EndCommandBuffer(cmd));
        Ok(())
    }

    fn submit_command_buffer(&mut self, cmd: CommandBufferHandle) -> ProviderResult<()> {
        if self.fail_submissions {
            return Err(ProviderError::DeviceLost);
        }
        log::trace!("DummyProvider: submitting {:?}", cmd);
        self.calls.push(ProviderCall::SubmitCommandBuffer(cmd));
        Ok(())
    }

    fn transition_image(
        &mut self,
        _cmd: CommandBufferHandle,
        image: ImageHandle,
        old: &ResourceState,
        new: &ResourceState,
    ) {
        self.calls.push(ProviderCall::TransitionImage {
            image,
            old: *old,
            new: *new,
        });
    }

    fn transition_buffer(
        &mut self,
        _cmd: CommandBufferHandle,
        buffer: BufferHandle,
        old: &ResourceState,
        new: &ResourceState,
    ) {
        self.calls.push(ProviderCall::TransitionBuffer {
            buffer,
            old: *old,
            new: *new,
        });
    }

    fn release_image(&mut self, resource: &Resource, image: ImageHandle) {
        log::trace!(
            "DummyProvider: releasing image '{}' ({:?})",
            resource.name(),
            image
        );
        self.live_images.remove(&image);
        self.calls.push(ProviderCall::ReleaseImage {
            name: resource.name().to_string(),
            image,
        });
    }

    fn release_buffer(&mut self, resource: &Resource, buffer: BufferHandle) {
        log::trace!(
            "DummyProvider: releasing buffer '{}' ({:?})",
            resource.name(),
            buffer
        );
        self.live_buffers.remove(&buffer);
        self.calls.push(ProviderCall::ReleaseBuffer {
            name: resource.name().to_string(),
            buffer,
        });
    }
}
