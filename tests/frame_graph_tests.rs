//! Integration tests for the frame graph.
//!
//! Every test runs against the `DummyProvider`, so they check scheduling,
//! resource caching and provider traffic rather than GPU output.
//!
//! # Test Categories
//!
//! - **Ordering Tests**: pass order produced by `build`
//! - **Configuration Tests**: build-fatal declarations
//! - **Lifetime Tests**: transient aging and permanent persistence
//! - **Execution Tests**: callbacks and transitions

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;

use common::{
    color_target, declare_tonemap_chain, depth, new_graph, new_graph_with, order, run_frame,
    swapchain, vertices,
};
use frame_graph::backend::{DummyProvider, ProviderCall, ShaderStages};
use frame_graph::render_graph::{
    BufferInfo, FrameGraph, GraphError, GraphPhase, Lifetime, PassInfo,
};
use frame_graph::GraphConfig;

fn declare_present_only(graph: &mut FrameGraph<DummyProvider>) {
    graph
        .add_pass("present", PassInfo::graphics())
        .unwrap()
        .add_color_output("swapchain", &swapchain())
        .unwrap();
    graph.set_output("swapchain").unwrap();
}

// ============================================================================
// Ordering Tests
// ============================================================================

#[test]
fn test_single_pass_without_inputs() {
    let mut graph = new_graph();
    declare_present_only(&mut graph);
    graph.build().unwrap();

    assert_eq!(order(&graph), vec!["present"]);
}

#[rstest]
#[case::producer_declared_first(true)]
#[case::producer_declared_last(false)]
fn test_producer_runs_before_consumer(#[case] producer_first: bool) {
    let mut graph = new_graph();
    let declare_a = |graph: &mut FrameGraph<DummyProvider>| {
        graph
            .add_pass("a", PassInfo::graphics())
            .unwrap()
            .add_color_output("x", &color_target())
            .unwrap();
    };

    if producer_first {
        declare_a(&mut graph);
    }
    {
        let mut b = graph.add_pass("b", PassInfo::graphics()).unwrap();
        b.add_color_input("x", &color_target()).unwrap();
        b.add_color_output("y", &swapchain()).unwrap();
    }
    if !producer_first {
        declare_a(&mut graph);
    }
    graph.set_output("y").unwrap();
    graph.build().unwrap();

    assert_eq!(order(&graph), vec!["a", "b"]);
}

#[test]
fn test_outputs_are_merged_without_duplicates() {
    let mut graph = new_graph();
    graph
        .add_pass("prepass", PassInfo::graphics())
        .unwrap()
        .add_depth_output("scene_depth", &depth())
        .unwrap();
    {
        let mut lighting = graph.add_pass("lighting", PassInfo::graphics()).unwrap();
        lighting.add_depth_input("scene_depth", &depth()).unwrap();
        lighting.add_color_output("swapchain", &swapchain()).unwrap();
    }
    {
        let mut probe = graph.add_pass("probe", PassInfo::compute()).unwrap();
        probe
            .add_uniform_texture_input("scene_depth", &depth(), ShaderStages::COMPUTE)
            .unwrap();
        probe
            .add_color_output("probe_cache", &color_target().permanent())
            .unwrap();
    }
    graph.set_output("swapchain").unwrap();
    graph.set_output("probe_cache").unwrap();
    graph.build().unwrap();

    assert_eq!(order(&graph), vec!["prepass", "lighting", "probe"]);
    assert_eq!(graph.dependencies("swapchain").unwrap().len(), 1);
    assert_eq!(graph.dependencies("probe_cache").unwrap().len(), 1);
}

#[test]
fn test_cycle_is_rejected() {
    let mut graph = new_graph();
    {
        let mut a = graph.add_pass("a", PassInfo::graphics()).unwrap();
        a.add_color_input("b_out", &color_target()).unwrap();
        a.add_color_output("a_out", &color_target()).unwrap();
    }
    {
        let mut b = graph.add_pass("b", PassInfo::graphics()).unwrap();
        b.add_color_input("a_out", &color_target()).unwrap();
        b.add_color_output("b_out", &color_target()).unwrap();
    }
    {
        let mut resolve = graph.add_pass("resolve", PassInfo::graphics()).unwrap();
        resolve.add_color_input("a_out", &color_target()).unwrap();
        resolve.add_color_output("swapchain", &swapchain()).unwrap();
    }
    graph.set_output("swapchain").unwrap();

    let err = graph.build().unwrap_err();
    assert!(matches!(err, GraphError::DependencyCycle { ref output, .. } if output == "swapchain"));
    assert!(err.is_structural());

    let scheduled = order(&graph);
    assert!(!(scheduled.contains(&"a".to_string()) && scheduled.contains(&"b".to_string())));
    assert_eq!(graph.phase(), GraphPhase::Recording);
    assert!(graph.provider().calls().is_empty());
}

#[test]
fn test_cycle_in_one_output_still_resolves_the_other() {
    let mut graph = new_graph();
    {
        let mut a = graph.add_pass("a", PassInfo::graphics()).unwrap();
        a.add_color_input("b_out", &color_target()).unwrap();
        a.add_color_output("a_out", &color_target().permanent())
            .unwrap();
    }
    {
        let mut b = graph.add_pass("b", PassInfo::graphics()).unwrap();
        b.add_color_input("a_out", &color_target()).unwrap();
        b.add_color_output("b_out", &color_target()).unwrap();
    }
    declare_present_only(&mut graph);
    graph.set_output("a_out").unwrap();

    assert!(matches!(
        graph.build(),
        Err(GraphError::DependencyCycle { .. })
    ));
    assert_eq!(order(&graph), vec!["present"]);
    assert!(graph.dependencies("swapchain").is_some());
    assert!(graph.dependencies("a_out").is_none());
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_build_without_outputs_fails() {
    let mut graph = new_graph();
    graph
        .add_pass("present", PassInfo::graphics())
        .unwrap()
        .add_color_output("swapchain", &swapchain())
        .unwrap();

    assert_eq!(graph.build(), Err(GraphError::NoOutputs));
    assert!(matches!(
        graph.execute(),
        Err(GraphError::InvalidPhase { .. })
    ));
    assert!(graph.provider().calls().is_empty());
}

#[test]
fn test_two_writers_of_one_output_fail() {
    let mut graph = new_graph();
    graph
        .add_pass("ui", PassInfo::graphics())
        .unwrap()
        .add_color_output("swapchain", &swapchain())
        .unwrap();
    graph
        .add_pass("tonemap", PassInfo::graphics())
        .unwrap()
        .add_color_output("swapchain", &swapchain())
        .unwrap();
    graph.set_output("swapchain").unwrap();

    assert_eq!(
        graph.build(),
        Err(GraphError::MultipleWriters {
            output: "swapchain".to_string(),
            writers: vec!["ui".to_string(), "tonemap".to_string()],
        })
    );
    assert_eq!(graph.provider().live_image_count(), 0);
}

#[test]
fn test_output_without_writer_fails() {
    let mut graph = new_graph();
    {
        let mut post = graph.add_pass("post", PassInfo::graphics()).unwrap();
        post.add_color_input("history", &swapchain()).unwrap();
        post.add_color_output("scratch", &color_target()).unwrap();
    }
    graph.set_output("history").unwrap();

    assert_eq!(
        graph.build(),
        Err(GraphError::NoWriter {
            output: "history".to_string()
        })
    );
}

#[test]
fn test_transient_output_is_rejected() {
    let mut graph = new_graph();
    declare_tonemap_chain(&mut graph);

    assert_eq!(
        graph.set_output("hdr"),
        Err(GraphError::TransientOutput {
            name: "hdr".to_string()
        })
    );
    assert_eq!(graph.outputs().len(), 1);
}

#[test]
fn test_kind_mismatch_is_rejected() {
    let mut graph = new_graph();
    let mut pass = graph.add_pass("draw", PassInfo::graphics()).unwrap();
    pass.add_vertex_buffer_input("mesh", &vertices()).unwrap();

    assert!(matches!(
        pass.add_color_input("mesh", &color_target()),
        Err(GraphError::KindMismatch { .. })
    ));
}

// ============================================================================
// Lifetime Tests
// ============================================================================

#[rstest]
#[case::released_quickly(1)]
#[case::default_threshold(3)]
#[case::released_late(5)]
fn test_idle_transient_is_released_once(#[case] threshold: u32) {
    let config = GraphConfig::default().with_idle_frame_threshold(threshold);
    let mut graph = new_graph_with(config);

    declare_tonemap_chain(&mut graph);
    run_frame(&mut graph);
    let first_id = graph.registry().id_of("hdr").unwrap();

    for unused in 1..=threshold + 2 {
        declare_present_only(&mut graph);
        run_frame(&mut graph);

        let expected = if unused >= threshold { 1 } else { 0 };
        assert_eq!(
            graph.provider().releases_of("hdr"),
            expected,
            "after {} unused frames",
            unused
        );
        assert_eq!(graph.registry().contains("hdr"), unused < threshold);
    }

    // Declaring the name again creates a brand new resource
    declare_tonemap_chain(&mut graph);
    let second_id = graph.registry().id_of("hdr").unwrap();
    assert_ne!(first_id, second_id);
    assert_eq!(graph.provider().releases_of("hdr"), 1);
}

#[rstest]
#[case(1)]
#[case(4)]
#[case(10)]
fn test_permanent_depth_survives_frames(#[case] frames: usize) {
    let mut graph = new_graph();
    let mut handle = None;

    for _ in 0..frames {
        {
            let mut geometry = graph.add_pass("geometry", PassInfo::graphics()).unwrap();
            geometry.add_depth_output("depth", &depth()).unwrap();
        }
        graph.set_output("depth").unwrap();
        graph.build().unwrap();
        graph.execute().unwrap();

        let current = graph.physical_image("depth");
        assert!(current.is_some());
        if handle.is_some() {
            assert_eq!(current, handle);
        }
        handle = current;
        graph.reset();
    }

    assert_eq!(graph.provider().creations_of("depth"), 1);
    assert_eq!(graph.provider().release_count(), 0);

    // Only the first frame needs a transition
    let image = handle.unwrap();
    assert_eq!(graph.provider().image_transitions(image).len(), 1);
}

#[test]
fn test_permanent_resource_kept_when_not_redeclared() {
    let mut graph = new_graph();
    {
        let mut geometry = graph.add_pass("geometry", PassInfo::graphics()).unwrap();
        geometry.add_depth_output("depth", &depth()).unwrap();
    }
    graph.set_output("depth").unwrap();
    run_frame(&mut graph);
    let handle = graph.physical_image("depth");

    for _ in 0..8 {
        declare_present_only(&mut graph);
        run_frame(&mut graph);
    }

    assert_eq!(graph.physical_image("depth"), handle);
    assert_eq!(graph.provider().releases_of("depth"), 0);
    let depth = graph.registry().get_by_name("depth").unwrap();
    assert_eq!(depth.lifetime(), Lifetime::Permanent);
}

#[test]
fn test_transient_in_rotation_is_not_released() {
    let mut graph = new_graph();
    for _ in 0..8 {
        {
            let mut draw = graph.add_pass("draw", PassInfo::graphics()).unwrap();
            draw.add_vertex_buffer_input("mesh", &vertices()).unwrap();
            draw.add_color_output("swapchain", &swapchain()).unwrap();
        }
        graph.set_output("swapchain").unwrap();
        run_frame(&mut graph);
    }

    assert_eq!(graph.provider().release_count(), 0);
    assert_eq!(graph.provider().live_buffer_count(), 1);
    assert_eq!(graph.provider().creations_of("mesh"), 8);
}

#[test]
fn test_teardown_releases_both_pools() {
    let mut graph = new_graph();
    declare_tonemap_chain(&mut graph);
    graph.build().unwrap();
    graph.execute().unwrap();

    graph.teardown();
    assert!(graph.registry().is_empty());
    assert_eq!(graph.provider().live_image_count(), 0);
    assert_eq!(graph.provider().release_count(), 2);
}

// ============================================================================
// Execution Tests
// ============================================================================

#[test]
fn test_callbacks_run_in_pass_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut graph = new_graph();

    for (name, input, output) in [
        ("compose", Some("lit"), "swapchain"),
        ("gbuffer", None, "albedo"),
        ("lighting", Some("albedo"), "lit"),
    ] {
        let log = log.clone();
        let mut pass = graph.add_pass(name, PassInfo::graphics()).unwrap();
        if let Some(input) = input {
            pass.add_color_input(input, &color_target()).unwrap();
        }
        let info = if output == "swapchain" {
            swapchain()
        } else {
            color_target()
        };
        pass.add_color_output(output, &info).unwrap();
        pass.set_execute(move |ctx| {
            log.borrow_mut().push(ctx.pass().name().to_string());
        });
    }
    graph.set_output("swapchain").unwrap();
    graph.build().unwrap();
    let stats = graph.execute().unwrap();

    assert_eq!(stats.passes_executed, 3);
    assert_eq!(*log.borrow(), vec!["gbuffer", "lighting", "compose"]);
}

#[test]
fn test_buffer_transitions_are_emitted() {
    let mut graph = new_graph();
    {
        let mut draw = graph.add_pass("draw", PassInfo::graphics()).unwrap();
        draw.add_vertex_buffer_input("mesh", &vertices()).unwrap();
        draw.add_index_buffer_input("indices", &BufferInfo::new(1024))
            .unwrap();
        draw.add_uniform_buffer_input("camera", &BufferInfo::new(256), ShaderStages::VERTEX)
            .unwrap();
        draw.add_color_output("swapchain", &swapchain()).unwrap();
    }
    graph.set_output("swapchain").unwrap();
    graph.build().unwrap();
    let stats = graph.execute().unwrap();

    let buffer_transitions = graph
        .provider()
        .calls()
        .iter()
        .filter(|call| matches!(call, ProviderCall::TransitionBuffer { .. }))
        .count();
    assert_eq!(buffer_transitions, 3);
    assert_eq!(stats.transitions_emitted, 4);
}

#[test]
fn test_frame_index_advances_on_reset() {
    let mut graph = new_graph();
    for _ in 0..3 {
        declare_tonemap_chain(&mut graph);
        run_frame(&mut graph);
    }

    assert_eq!(graph.frame_index(), 3);
    assert_eq!(graph.provider().submit_count(), 3);
}
