use std::collections::HashMap;

use crate::error::GraphError;
use crate::network::ComputationNetwork;
use crate::node::NodeId;

#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Accept edges between nodes of different element types.
    pub allow_mixed_precision: bool,
    /// Accept edges into other networks (pairing edges).
    pub allow_foreign_inputs: bool,
    /// Accept compute nodes that never had inputs attached.
    pub allow_unattached: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            allow_mixed_precision: false,
            allow_foreign_inputs: true,
            allow_unattached: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Nodes with no inputs, in registration order.
    pub leaves: Vec<NodeId>,
    /// Nodes no other node consumes, in registration order.
    pub roots: Vec<NodeId>,
    pub node_to_consumers: HashMap<NodeId, Vec<String>>,
    /// Edges pointing into another network.
    pub foreign_inputs: Vec<(NodeId, NodeId)>,
}

/// Consistency checks over a finished network.
///
/// Construction never checks precision across edges or edges left behind by
/// `remove_node`; this pass does.
pub struct NetworkValidator<'a> {
    network: &'a ComputationNetwork,
    options: ValidatorOptions,
}

impl<'a> NetworkValidator<'a> {
    pub fn new(network: &'a ComputationNetwork, options: ValidatorOptions) -> Self {
        Self { network, options }
    }

    pub fn validate(self) -> Result<ValidationReport, GraphError> {
        let mut report = ValidationReport::default();

        for (id, node) in self.network.iter() {
            if node.inputs().is_empty() {
                if !self.options.allow_unattached && !node.operation().is_leaf() {
                    return Err(GraphError::invalid_argument(
                        node.operation().name(),
                        format!("node `{}` has no inputs attached", node.name()),
                    ));
                }
                report.leaves.push(id);
            }

            for input in node.inputs() {
                if input.network() != self.network.id() {
                    if !self.options.allow_foreign_inputs {
                        return Err(GraphError::UnknownNode { node: *input });
                    }
                    report.foreign_inputs.push((id, *input));
                    continue;
                }
                let producer = self
                    .network
                    .node(*input)
                    .ok_or_else(|| GraphError::DanglingInput {
                        node: node.name().to_string(),
                        input: *input,
                    })?;
                let mixed = producer.element_type() != node.element_type();
                if mixed && !self.options.allow_mixed_precision {
                    return Err(GraphError::MixedPrecisionEdge {
                        node: node.name().to_string(),
                        node_type: node.element_type(),
                        input: producer.name().to_string(),
                        input_type: producer.element_type(),
                    });
                }
                report
                    .node_to_consumers
                    .entry(*input)
                    .or_default()
                    .push(node.name().to_string());
            }
        }

        report.roots = self
            .network
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !report.node_to_consumers.contains_key(id))
            .collect();

        tracing::debug!(
            network = %self.network.id(),
            nodes = self.network.len(),
            leaves = report.leaves.len(),
            roots = report.roots.len(),
            "network validated"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetworkBuilder;
    use crate::node::{ComputationNode, DeviceId, OperationKind};
    use crate::registry::OperationRegistry;

    #[test]
    fn reports_leaves_roots_and_consumers() {
        let registry = OperationRegistry::<f32>::with_defaults();
        let mut net = ComputationNetwork::default();
        let (x, w, out) = {
            let mut builder = NetworkBuilder::new(&mut net, &registry);
            let x = builder.create_input_node("x", 4, 1).unwrap();
            let w = builder.create_learnable_parameter("w", 2, 4).unwrap();
            let wx = builder.times(w, x, "wx").unwrap();
            let out = builder.sigmoid(wx, "out").unwrap();
            (x, w, out)
        };

        let report = NetworkValidator::new(&net, ValidatorOptions::default())
            .validate()
            .unwrap();
        assert_eq!(report.leaves, [x, w]);
        assert_eq!(report.roots, [out]);
        assert_eq!(report.node_to_consumers[&x], ["wx"]);
        assert!(report.foreign_inputs.is_empty());
    }

    #[test]
    fn mixed_precision_edge_fails() {
        let mut net = ComputationNetwork::default();
        let x = net
            .register(Box::new(ComputationNode::<f64>::new(
                OperationKind::InputValue,
                DeviceId::CPU,
                "x",
            )))
            .unwrap();
        let float_registry = OperationRegistry::<f32>::with_defaults();
        NetworkBuilder::new(&mut net, &float_registry)
            .tanh(x, "t")
            .unwrap();

        let err = NetworkValidator::new(&net, ValidatorOptions::default())
            .validate()
            .unwrap_err();
        match err {
            GraphError::MixedPrecisionEdge { node, input, .. } => {
                assert_eq!(node, "t");
                assert_eq!(input, "x");
            }
            other => panic!("expected MixedPrecisionEdge, got {other:?}"),
        }

        let options = ValidatorOptions {
            allow_mixed_precision: true,
            ..ValidatorOptions::default()
        };
        assert!(NetworkValidator::new(&net, options).validate().is_ok());
    }

    #[test]
    fn removed_input_leaves_dangling_edge() {
        let registry = OperationRegistry::<f64>::with_defaults();
        let mut net = ComputationNetwork::default();
        let x = {
            let mut builder = NetworkBuilder::new(&mut net, &registry);
            let x = builder.create_input_node("x", 4, 1).unwrap();
            builder.exp(x, "e").unwrap();
            x
        };
        net.remove_node("x").unwrap();

        let err = NetworkValidator::new(&net, ValidatorOptions::default())
            .validate()
            .unwrap_err();
        match err {
            GraphError::DanglingInput { node, input } => {
                assert_eq!(node, "e");
                assert_eq!(input, x);
            }
            other => panic!("expected DanglingInput, got {other:?}"),
        }
    }

    #[test]
    fn unattached_compute_nodes_can_be_rejected() {
        let registry = OperationRegistry::<f32>::with_defaults();
        let mut net = ComputationNetwork::default();
        NetworkBuilder::new(&mut net, &registry)
            .create_computation_node("Plus", "pending")
            .unwrap();

        let relaxed = NetworkValidator::new(&net, ValidatorOptions::default());
        assert!(relaxed.validate().is_ok());
        let strict = ValidatorOptions {
            allow_unattached: false,
            ..ValidatorOptions::default()
        };
        assert!(matches!(
            NetworkValidator::new(&net, strict).validate(),
            Err(GraphError::InvalidArgument { .. })
        ));
    }
}
