//! Common utilities for frame graph integration tests.
//!
//! Graphs are declared against the [`DummyProvider`], which records every
//! call so tests can check what the graph asked of the provider.

#![allow(dead_code)]

use frame_graph::backend::{DummyProvider, Format};
use frame_graph::render_graph::{BufferInfo, FrameGraph, ImageInfo, PassInfo};
use frame_graph::GraphConfig;

pub const WIDTH: u32 = 256;
pub const HEIGHT: u32 = 144;

/// Install a test logger once per binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn new_graph() -> FrameGraph<DummyProvider> {
    init_logging();
    FrameGraph::new(DummyProvider::new())
}

pub fn new_graph_with(config: GraphConfig) -> FrameGraph<DummyProvider> {
    init_logging();
    FrameGraph::with_config(DummyProvider::new(), config)
}

/// Transient color target.
pub fn color_target() -> ImageInfo {
    ImageInfo::new_2d(WIDTH, HEIGHT, Format::Rgba16Float)
}

/// Permanent presentable target.
pub fn swapchain() -> ImageInfo {
    ImageInfo::new_2d(WIDTH, HEIGHT, Format::Bgra8UnormSrgb).permanent()
}

/// Permanent depth buffer.
pub fn depth() -> ImageInfo {
    ImageInfo::new_2d(WIDTH, HEIGHT, Format::Depth32Float).permanent()
}

pub fn vertices() -> BufferInfo {
    BufferInfo::new(64 * 1024)
}

/// `scene` writes "hdr", `tonemap` reads it and writes "swapchain".
///
/// "swapchain" is set as the only output.
pub fn declare_tonemap_chain(graph: &mut FrameGraph<DummyProvider>) {
    graph
        .add_pass("scene", PassInfo::graphics())
        .unwrap()
        .add_color_output("hdr", &color_target())
        .unwrap();
    {
        let mut tonemap = graph.add_pass("tonemap", PassInfo::graphics()).unwrap();
        tonemap.add_color_input("hdr", &color_target()).unwrap();
        tonemap.add_color_output("swapchain", &swapchain()).unwrap();
    }
    graph.set_output("swapchain").unwrap();
}

/// Run one full frame: build, execute, reset.
pub fn run_frame(graph: &mut FrameGraph<DummyProvider>) {
    graph.build().unwrap();
    graph.execute().unwrap();
    graph.reset();
}

/// Names of the scheduled passes, in execution order.
pub fn order(graph: &FrameGraph<DummyProvider>) -> Vec<String> {
    graph
        .ordered_passes()
        .map(|pass| pass.name().to_string())
        .collect()
}
