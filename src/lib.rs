//! Frame Graph - declarative scheduling of per-frame GPU work
//!
//! Callers describe logical images and buffers and the passes that read and
//! write them by name. The graph derives a safe execution order, binds
//! physical resources through an injected [`Provider`], and emits the state
//! transitions each pass needs before it runs.
//!
//! # Features
//! - Find-or-create resource registry with transient and permanent pools
//! - Dependency discovery backwards from output resources, with cycle detection
//! - Transition elision based on tracked resource state
//! - Idle transient resources are released back to the provider
//!
//! # Example
//! ```
//! use frame_graph::backend::{DummyProvider, Format};
//! use frame_graph::render_graph::{FrameGraph, ImageInfo, PassInfo};
//!
//! let mut graph = FrameGraph::new(DummyProvider::new());
//! let hdr = ImageInfo::new_2d(1280, 720, Format::Rgba16Float);
//! let swapchain = ImageInfo::new_2d(1280, 720, Format::Bgra8UnormSrgb).permanent();
//!
//! graph
//!     .add_pass("scene", PassInfo::graphics())?
//!     .add_color_output("hdr", &hdr)?;
//! {
//!     let mut tonemap = graph.add_pass("tonemap", PassInfo::graphics())?;
//!     tonemap.add_color_input("hdr", &hdr)?;
//!     tonemap.add_color_output("swapchain", &swapchain)?;
//! }
//! graph.set_output("swapchain")?;
//!
//! graph.build()?;
//! let stats = graph.execute()?;
//! assert_eq!(stats.passes_executed, 2);
//! graph.reset();
//! # Ok::<(), frame_graph::render_graph::GraphError>(())
//! ```

pub mod backend;
pub mod render_graph;

pub use backend::{Provider, ProviderError, ProviderResult};
pub use render_graph::{FrameGraph, FrameStats, GraphError, GraphResult};

/// Configuration for a frame graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// A transient resource idle for more executes than this is released
    pub idle_frame_threshold: u32,
    /// Maximum passes visited while resolving one output
    pub max_traversal_steps: usize,
    /// Label of the command buffer the graph records into
    pub command_buffer_label: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            idle_frame_threshold: 3,
            max_traversal_steps: 128,
            command_buffer_label: "Frame Graph Commands".to_string(),
        }
    }
}

impl GraphConfig {
    pub fn with_idle_frame_threshold(mut self, frames: u32) -> Self {
        self.idle_frame_threshold = frames;
        self
    }

    pub fn with_max_traversal_steps(mut self, steps: usize) -> Self {
        self.max_traversal_steps = steps;
        self
    }

    pub fn with_command_buffer_label(mut self, label: &str) -> Self {
        self.command_buffer_label = label.to_string();
        self
    }
}
