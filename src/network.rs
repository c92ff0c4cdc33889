use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::element::Element;
use crate::error::GraphError;
use crate::node::{ComputationNode, DeviceId, NetworkId, NodeBase, NodeId};

static NEXT_NETWORK_ID: AtomicU32 = AtomicU32::new(0);

/// The owning graph. Holds every registered node exclusively and hands out
/// [`NodeId`] handles.
///
/// Node names are unique within one network. Input edges may point at nodes
/// of another network (see `NetworkBuilder::pair_network`).
#[derive(Debug)]
pub struct ComputationNetwork {
    id: NetworkId,
    device: DeviceId,
    nodes: Vec<Option<Box<dyn NodeBase>>>,
    name_to_id: HashMap<String, NodeId>,
}

impl ComputationNetwork {
    pub fn new(device: DeviceId) -> Self {
        Self {
            id: NetworkId(NEXT_NETWORK_ID.fetch_add(1, Ordering::Relaxed)),
            device,
            nodes: Vec::new(),
            name_to_id: HashMap::new(),
        }
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    /// Device newly built nodes are placed on.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Take ownership of `node` and return its handle.
    pub fn register(&mut self, node: Box<dyn NodeBase>) -> Result<NodeId, GraphError> {
        self.ensure_name_free(node.name())?;
        Ok(self.insert(node))
    }

    /// Register `node` with `inputs` attached in the given order.
    ///
    /// Every check runs before the network is touched: on error the node table
    /// is exactly as it was.
    pub fn attach_inputs(
        &mut self,
        mut node: Box<dyn NodeBase>,
        inputs: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        self.ensure_name_free(node.name())?;
        self.ensure_inputs_resolve(inputs)?;
        node.attach_inputs(inputs.to_vec())?;
        Ok(self.insert(node))
    }

    /// Attach inputs to a node that was registered without them.
    pub fn set_inputs(&mut self, id: NodeId, inputs: &[NodeId]) -> Result<(), GraphError> {
        self.ensure_inputs_resolve(inputs)?;
        let node = self
            .slot_mut(id)
            .ok_or(GraphError::UnknownNode { node: id })?;
        node.attach_inputs(inputs.to_vec())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn NodeBase> {
        if id.network != self.id {
            return None;
        }
        self.nodes.get(id.index as usize)?.as_deref()
    }

    /// Typed access to a node. `None` when the handle does not resolve or the
    /// node computes in another element type.
    pub fn typed_node<E: Element>(&self, id: NodeId) -> Option<&ComputationNode<E>> {
        self.node(id)?.as_any().downcast_ref()
    }

    pub fn node_named(&self, name: &str) -> Option<NodeId> {
        self.name_to_id.get(name).copied()
    }

    pub fn inputs_of(&self, id: NodeId) -> Option<&[NodeId]> {
        self.node(id).map(|node| node.inputs())
    }

    /// Detach a node from the network and hand it back.
    ///
    /// Edges other nodes hold to it are left in place and become dangling.
    pub fn remove_node(&mut self, name: &str) -> Option<Box<dyn NodeBase>> {
        let id = self.name_to_id.remove(name)?;
        let removed = self.nodes.get_mut(id.index as usize)?.take();
        if removed.is_some() {
            tracing::debug!(network = %self.id, node = name, "removed node");
        }
        removed
    }

    /// Nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &dyn NodeBase)> + '_ {
        let network = self.id;
        self.nodes.iter().enumerate().filter_map(move |(index, slot)| {
            slot.as_deref().map(|node| {
                (
                    NodeId {
                        network,
                        index: index as u32,
                    },
                    node,
                )
            })
        })
    }

    fn ensure_name_free(&self, name: &str) -> Result<(), GraphError> {
        if self.name_to_id.contains_key(name) {
            return Err(GraphError::DuplicateNodeName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_inputs_resolve(&self, inputs: &[NodeId]) -> Result<(), GraphError> {
        for input in inputs {
            if input.network == self.id && !self.contains(*input) {
                return Err(GraphError::UnknownNode { node: *input });
            }
        }
        Ok(())
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Box<dyn NodeBase>> {
        if id.network != self.id {
            return None;
        }
        self.nodes.get_mut(id.index as usize)?.as_mut()
    }

    fn insert(&mut self, node: Box<dyn NodeBase>) -> NodeId {
        let id = NodeId {
            network: self.id,
            index: self.nodes.len() as u32,
        };
        tracing::debug!(
            network = %self.id,
            node = node.name(),
            operation = %node.operation(),
            precision = %node.element_type(),
            inputs = node.inputs().len(),
            "registered node"
        );
        self.name_to_id.insert(node.name().to_string(), id);
        self.nodes.push(Some(node));
        id
    }
}

impl Default for ComputationNetwork {
    fn default() -> Self {
        Self::new(DeviceId::CPU)
    }
}
