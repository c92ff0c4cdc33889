use std::collections::BTreeSet;
use std::fmt::Write;

use crate::network::ComputationNetwork;
use crate::node::{NodeId, OperationKind};

/// Render a network as a Graphviz DOT document. Edge labels give the input position.
pub fn graph_to_dot(network: &ComputationNetwork) -> String {
    let mut dot = format!("digraph {} {{\n", network.id());
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [fontname=\"Helvetica\"];\n");
    dot.push_str("  edge [fontname=\"Helvetica\"];\n\n");

    let mut foreign = BTreeSet::new();
    for (id, node) in network.iter() {
        let (shape, fill) = match node.operation() {
            OperationKind::InputValue => ("oval", "#d0e6ff"),
            OperationKind::LearnableParameter | OperationKind::SparseLearnableParameter => {
                ("diamond", "#f0f0f0")
            }
            OperationKind::PairNetwork => ("box", "#fff2cc"),
            _ => ("box", "#ffffff"),
        };
        let label = escape_label(&format!(
            "{}\n{} ({})",
            node.name(),
            node.operation(),
            node.element_type()
        ));
        let _ = writeln!(
            dot,
            "  {} [shape={},style=\"rounded,filled\",fillcolor=\"{}\",label=\"{}\"];",
            node_key(id),
            shape,
            fill,
            label
        );

        for (position, input) in node.inputs().iter().enumerate() {
            if input.network() != network.id() {
                foreign.insert(*input);
            }
            let _ = writeln!(
                dot,
                "  {} -> {} [label=\"in{}\"];",
                node_key(*input),
                node_key(id),
                position
            );
        }
    }

    if !foreign.is_empty() {
        dot.push('\n');
    }
    for input in foreign {
        let _ = writeln!(
            dot,
            "  {} [shape=box,style=dashed,label=\"{}\"];",
            node_key(input),
            escape_label(&input.to_string())
        );
    }

    dot.push_str("}\n");
    dot
}

fn node_key(id: NodeId) -> String {
    format!("{}_{}", id.network(), id.index())
}

fn escape_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::graph_to_dot;
    use crate::builder::NetworkBuilder;
    use crate::network::ComputationNetwork;
    use crate::registry::OperationRegistry;

    #[test]
    fn exports_nodes_and_ordered_edges() {
        let registry = OperationRegistry::<f32>::with_defaults();
        let mut net = ComputationNetwork::default();
        let mut builder = NetworkBuilder::new(&mut net, &registry);
        let lhs = builder.create_input_node("lhs", 3, 1).unwrap();
        let rhs = builder.create_learnable_parameter("rhs", 3, 1).unwrap();
        builder.minus(rhs, lhs, "diff").unwrap();

        let dot = graph_to_dot(&net);
        let id = net.id();

        assert!(dot.starts_with(&format!("digraph {id} {{")));
        assert!(dot.contains(&format!("{id}_0 [shape=oval")));
        assert!(dot.contains(&format!("{id}_1 [shape=diamond")));
        assert!(dot.contains(&format!("{id}_1 -> {id}_2 [label=\"in0\"]")));
        assert!(dot.contains(&format!("{id}_0 -> {id}_2 [label=\"in1\"]")));
        assert!(dot.contains("diff\\nMinus (float)"));
    }

    #[test]
    fn foreign_inputs_are_drawn_dashed() {
        let registry = OperationRegistry::<f64>::with_defaults();
        let mut source = ComputationNetwork::default();
        let shared = NetworkBuilder::new(&mut source, &registry)
            .create_input_node("shared", 2, 1)
            .unwrap();
        let mut target = ComputationNetwork::default();
        NetworkBuilder::new(&mut target, &registry)
            .pair_network(&source, shared, "pair")
            .unwrap();

        let dot = graph_to_dot(&target);
        let foreign = format!("{}_0 [shape=box,style=dashed", source.id());
        assert!(dot.contains(&foreign));
        assert!(dot.contains("PairNetwork (double)"));
    }
}
