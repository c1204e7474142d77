//! Frame Graph System
//!
//! Passes declare the resources they read and write by name. Building the
//! graph walks backwards from each output's writer to find every pass that
//! must run first, merges the results into one execution order and allocates
//! physical resources. Executing records each pass behind the transitions it
//! needs, submits, and releases transient resources that went idle.

pub mod error;
pub mod executor;
pub mod graph;
pub mod pass;
pub mod registry;
pub mod resource;

pub use error::*;
pub use executor::*;
pub use graph::*;
pub use pass::*;
pub use registry::*;
pub use resource::*;
