//! Graph nodes: identity, parameters and ordered input edges.

mod kind;
pub mod params;

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementType};
use crate::error::GraphError;

pub use kind::OperationKind;
pub use params::{
    ConvolutionParams, ImageLayout, InputParams, NceEvalMode, NodeParams, ParameterParams,
    PoolingParams, RecurrentParams,
};

/// Device placement token. Negative values mean the host CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub i32);

impl DeviceId {
    pub const CPU: DeviceId = DeviceId(-1);

    pub fn gpu(ordinal: u16) -> Self {
        DeviceId(i32::from(ordinal))
    }

    pub fn is_cpu(self) -> bool {
        self.0 < 0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        DeviceId::CPU
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_cpu() {
            f.write_str("cpu")
        } else {
            write!(f, "gpu:{}", self.0)
        }
    }
}

/// Identifies one [`ComputationNetwork`](crate::network::ComputationNetwork) for the
/// process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId(pub(crate) u32);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net{}", self.0)
    }
}

/// Non-owning handle to a node: the owning network plus the node's slot.
///
/// Slots are never reused, so a handle to a removed node stays unresolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) network: NetworkId,
    pub(crate) index: u32,
}

impl NodeId {
    pub fn network(self) -> NetworkId {
        self.network
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.network, self.index)
    }
}

/// Flat, object-safe view of a node regardless of its element type.
pub trait NodeBase: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn operation(&self) -> OperationKind;

    fn element_type(&self) -> ElementType;

    fn device(&self) -> DeviceId;

    /// Input edges in attachment order.
    fn inputs(&self) -> &[NodeId];

    /// One-way transition from "no inputs attached" to "inputs attached".
    fn attach_inputs(&mut self, inputs: Vec<NodeId>) -> Result<(), GraphError>;

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputationNode<E: Element> {
    name: String,
    device: DeviceId,
    kind: OperationKind,
    params: NodeParams<E>,
    inputs: Vec<NodeId>,
    inputs_attached: bool,
}

impl<E: Element> ComputationNode<E> {
    /// Node with the default parameters for `kind`.
    pub fn new(kind: OperationKind, device: DeviceId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device,
            kind,
            params: NodeParams::default_for(kind),
            inputs: Vec::new(),
            inputs_attached: false,
        }
    }

    /// Node with explicit parameters. Fails with `InvalidArgument` when the
    /// parameters are out of range or belong to a different operation.
    pub fn with_params(
        kind: OperationKind,
        device: DeviceId,
        name: impl Into<String>,
        params: NodeParams<E>,
    ) -> Result<Self, GraphError> {
        params.validate(kind)?;
        Ok(Self {
            params,
            ..Self::new(kind, device, name)
        })
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn params(&self) -> &NodeParams<E> {
        &self.params
    }

    pub fn has_inputs_attached(&self) -> bool {
        self.inputs_attached
    }
}

impl<E: Element> NodeBase for ComputationNode<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn operation(&self) -> OperationKind {
        self.kind
    }

    fn element_type(&self) -> ElementType {
        E::ELEMENT_TYPE
    }

    fn device(&self) -> DeviceId {
        self.device
    }

    fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    fn attach_inputs(&mut self, inputs: Vec<NodeId>) -> Result<(), GraphError> {
        if self.inputs_attached {
            return Err(GraphError::InputsAlreadyAttached {
                name: self.name.clone(),
            });
        }
        self.inputs = inputs;
        self.inputs_attached = true;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(index: u32) -> NodeId {
        NodeId {
            network: NetworkId(0),
            index,
        }
    }

    #[test]
    fn new_node_has_no_inputs() {
        let node = ComputationNode::<f32>::new(OperationKind::Plus, DeviceId::CPU, "sum");
        assert_eq!(node.name(), "sum");
        assert_eq!(node.operation(), OperationKind::Plus);
        assert_eq!(node.element_type(), ElementType::Float);
        assert!(node.inputs().is_empty());
        assert!(!node.has_inputs_attached());
        assert_eq!(node.params(), &NodeParams::None);
    }

    #[test]
    fn inputs_attach_once() {
        let mut node = ComputationNode::<f64>::new(OperationKind::Times, DeviceId::gpu(0), "w_x");
        node.attach_inputs(vec![handle(1), handle(0)]).unwrap();
        assert_eq!(node.inputs(), &[handle(1), handle(0)]);

        let err = node.attach_inputs(vec![handle(2)]).unwrap_err();
        assert!(matches!(err, GraphError::InputsAlreadyAttached { .. }));
        assert_eq!(
            err.to_string(),
            "node `w_x` already has its inputs attached"
        );
        assert_eq!(node.inputs(), &[handle(1), handle(0)]);
    }

    #[test]
    fn empty_input_list_still_counts_as_attached() {
        let mut node = ComputationNode::<f32>::new(OperationKind::RowStack, DeviceId::CPU, "stack");
        node.attach_inputs(Vec::new()).unwrap();
        assert!(node.has_inputs_attached());
        assert!(node.attach_inputs(vec![handle(0)]).is_err());
    }

    #[test]
    fn with_params_validates() {
        let result = ComputationNode::<f32>::with_params(
            OperationKind::RowRepeat,
            DeviceId::CPU,
            "rep",
            NodeParams::RowRepeat { num_repeats: 0 },
        );
        assert!(matches!(result, Err(GraphError::InvalidArgument { .. })));

        let node = ComputationNode::<f32>::with_params(
            OperationKind::RowRepeat,
            DeviceId::CPU,
            "rep",
            NodeParams::RowRepeat { num_repeats: 3 },
        )
        .unwrap();
        assert_eq!(node.params(), &NodeParams::RowRepeat { num_repeats: 3 });
    }

    #[test]
    fn device_display() {
        assert_eq!(DeviceId::CPU.to_string(), "cpu");
        assert_eq!(DeviceId::gpu(2).to_string(), "gpu:2");
        assert_eq!(DeviceId::default(), DeviceId::CPU);
        assert_eq!(handle(7).to_string(), "net0#7");
    }
}
