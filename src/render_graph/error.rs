//! Frame graph error types

use thiserror::Error;

use crate::backend::traits::ProviderError;
use crate::render_graph::graph::GraphPhase;
use crate::render_graph::resource::ResourceKind;

/// Errors reported while declaring, building or executing a frame graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("No output resource was set before build")]
    NoOutputs,
    #[error("Resource '{name}' has not been declared")]
    UnknownResource { name: String },
    #[error("Resource '{name}' is transient and cannot be a graph output")]
    TransientOutput { name: String },
    #[error("Output '{output}' is not written by any pass")]
    NoWriter { output: String },
    #[error("Output '{output}' is written by {} passes: {writers:?}", writers.len())]
    MultipleWriters { output: String, writers: Vec<String> },
    #[error("Resource '{name}' is declared as {found}, but was used as {expected}")]
    KindMismatch {
        name: String,
        expected: ResourceKind,
        found: ResourceKind,
    },
    #[error("Dependency cycle through pass '{pass}' while resolving output '{output}'")]
    DependencyCycle { output: String, pass: String },
    #[error("Dependency discovery for output '{output}' exceeded {limit} steps")]
    TraversalLimitExceeded { output: String, limit: usize },
    #[error("Cannot {operation} while the graph is {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: GraphPhase,
    },
    #[error("Resource '{name}' has no physical backing")]
    Unallocated { name: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl GraphError {
    /// Whether this error comes from the shape of the dependency graph
    /// rather than from its configuration.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GraphError::DependencyCycle { .. } | GraphError::TraversalLimitExceeded { .. }
        )
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::MultipleWriters {
            output: "backbuffer".to_string(),
            writers: vec!["ui".to_string(), "tonemap".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Output 'backbuffer' is written by 2 passes: [\"ui\", \"tonemap\"]"
        );

        let err = GraphError::KindMismatch {
            name: "camera".to_string(),
            expected: ResourceKind::Image,
            found: ResourceKind::Buffer,
        };
        assert_eq!(
            err.to_string(),
            "Resource 'camera' is declared as buffer, but was used as image"
        );
    }

    #[test]
    fn test_provider_errors_convert() {
        let err: GraphError = ProviderError::OutOfMemory.into();
        assert_eq!(err.to_string(), "Out of memory");
        assert!(!err.is_structural());
    }
}
