use crate::config::ConfigRecord;
use crate::element::{Element, ElementType};
use crate::error::GraphError;
use crate::node::{ComputationNode, DeviceId, NodeBase};
use crate::registry::{NodeArgs, OperationRegistries, OperationRegistry};

/// Builds typed nodes by operation name. Never touches a network.
#[derive(Clone, Copy)]
pub struct NodeFactory<'r, E: Element> {
    registry: &'r OperationRegistry<E>,
}

impl<'r, E: Element> NodeFactory<'r, E> {
    pub fn new(registry: &'r OperationRegistry<E>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r OperationRegistry<E> {
        self.registry
    }

    /// Resolve `operation` through the standard tier, then the extended tier.
    ///
    /// Constructor errors from either tier propagate unchanged; a name found
    /// in neither is `OperationNotRecognized`.
    pub fn create(
        &self,
        operation: &str,
        args: &NodeArgs<'_>,
    ) -> Result<ComputationNode<E>, GraphError> {
        if let Some(node) = self.registry.resolve_standard(operation, args) {
            return node;
        }
        if let Some(node) = self.registry.resolve_extended(operation, args) {
            return node;
        }
        Err(GraphError::OperationNotRecognized {
            name: operation.to_string(),
        })
    }

    /// Standard tier only.
    pub fn create_standard(
        &self,
        operation: &str,
        device: DeviceId,
        name: &str,
    ) -> Result<ComputationNode<E>, GraphError> {
        self.registry
            .resolve_standard(operation, &NodeArgs::standard(device, name))
            .unwrap_or_else(|| {
                Err(GraphError::OperationNotRecognized {
                    name: operation.to_string(),
                })
            })
    }
}

/// Build a node whose precision and operation are only known from a record.
///
/// Reads `precision` and `operation` (both required), `name` (required) and
/// `deviceId` (optional, CPU when absent). The record is forwarded whole so the
/// operation's constructor can read its own parameters.
pub fn new_node_from_config(
    registries: &OperationRegistries,
    record: &ConfigRecord,
) -> Result<Box<dyn NodeBase>, GraphError> {
    let precision = ElementType::parse(record.get_str("precision")?)?;
    let operation = record.get_str("operation")?;
    let name = record.get_str("name")?;
    let device = read_device(record)?;
    let args = NodeArgs::configured(device, name, record);

    tracing::debug!(
        %precision,
        operation,
        name,
        %device,
        "building node from configuration"
    );
    match precision {
        ElementType::Float => {
            let node = NodeFactory::new(&registries.float).create(operation, &args)?;
            Ok(Box::new(node))
        }
        ElementType::Double => {
            let node = NodeFactory::new(&registries.double).create(operation, &args)?;
            Ok(Box::new(node))
        }
    }
}

fn read_device(record: &ConfigRecord) -> Result<DeviceId, GraphError> {
    let raw = record.i64_or("deviceId", i64::from(DeviceId::CPU.0))?;
    i32::try_from(raw)
        .map(DeviceId)
        .map_err(|_| {
            GraphError::invalid_field("deviceId", format!("{raw} is out of range"))
        })
}
