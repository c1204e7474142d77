//! Provider abstraction layer
//!
//! Provides the trait and types a graphics backend implements to realize the
//! frame graph's logical resources and recorded work.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::*;
pub use traits::*;
pub use types::*;
