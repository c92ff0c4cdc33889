use thiserror::Error;

use crate::element::ElementType;
use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("operation `{name}` is not recognized")]
    OperationNotRecognized { name: String },
    #[error("operation name `{name}` is already registered")]
    DuplicateOperation { name: String },
    #[error("invalid value `{value}` for `precision`; must be `float` or `double`")]
    InvalidPrecision { value: String },
    #[error("node name `{name}` already exists in the target network")]
    DuplicateNodeName { name: String },
    #[error("configuration record is missing required field `{field}`")]
    MissingConfigField { field: String },
    #[error("configuration field `{field}` is invalid: {reason}")]
    InvalidConfigField { field: String, reason: String },
    #[error("invalid argument for `{operation}`: {reason}")]
    InvalidArgument { operation: String, reason: String },
    #[error("node handle {node} does not resolve in this network")]
    UnknownNode { node: NodeId },
    #[error("node `{name}` already has its inputs attached")]
    InputsAlreadyAttached { name: String },
    #[error("node `{node}` ({node_type}) consumes `{input}` ({input_type})")]
    MixedPrecisionEdge {
        node: String,
        node_type: ElementType,
        input: String,
        input_type: ElementType,
    },
    #[error("node `{node}` references input {input} which is no longer part of the network")]
    DanglingInput { node: String, input: NodeId },
}

impl GraphError {
    pub(crate) fn invalid_argument(
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        GraphError::InvalidArgument {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphError::InvalidConfigField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
