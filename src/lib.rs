pub mod builder;
pub mod config;
pub mod element;
pub mod error;
pub mod factory;
pub mod graphviz;
pub mod network;
pub mod node;
pub mod registry;
pub mod validator;

pub use builder::NetworkBuilder;
pub use config::ConfigRecord;
pub use element::{Element, ElementType};
pub use error::GraphError;
pub use factory::{NodeFactory, new_node_from_config};
pub use graphviz::graph_to_dot;
pub use network::ComputationNetwork;
pub use node::{
    ComputationNode, ConvolutionParams, DeviceId, ImageLayout, InputParams, NceEvalMode, NetworkId,
    NodeBase, NodeId, NodeParams, OperationKind, ParameterParams, PoolingParams, RecurrentParams,
};
pub use registry::{Constructor, NodeArgs, OperationRegistries, OperationRegistry, Tier};
pub use validator::{NetworkValidator, ValidationReport, ValidatorOptions};
