use crate::element::Element;
use crate::error::GraphError;
use crate::factory::NodeFactory;
use crate::network::ComputationNetwork;
use crate::node::{
    ComputationNode, ConvolutionParams, ImageLayout, InputParams, NceEvalMode, NodeId, NodeParams,
    OperationKind, ParameterParams, PoolingParams, RecurrentParams,
};
use crate::registry::{NodeArgs, OperationRegistry};

/// Builds nodes of one element type straight into a network.
///
/// Every method either registers exactly one node (with all of its inputs
/// attached, for the create-and-attach family) and returns its handle, or
/// fails and leaves the network untouched. Inputs are attached in the order
/// they are passed.
pub struct NetworkBuilder<'a, E: Element> {
    net: &'a mut ComputationNetwork,
    factory: NodeFactory<'a, E>,
}

impl<'a, E: Element> NetworkBuilder<'a, E> {
    pub fn new(net: &'a mut ComputationNetwork, registry: &'a OperationRegistry<E>) -> Self {
        Self {
            net,
            factory: NodeFactory::new(registry),
        }
    }

    pub fn network(&self) -> &ComputationNetwork {
        &*self.net
    }

    pub fn factory(&self) -> NodeFactory<'a, E> {
        self.factory
    }

    // ---- create-only ----

    /// Create and register a node by operation name, standard tier only.
    pub fn create_computation_node(
        &mut self,
        operation: &str,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let device = self.net.device();
        let node = self.factory.create_standard(operation, device, name)?;
        self.register(node)
    }

    /// Create and register a node by operation name, searching both tiers.
    /// Extended-tier operations get their default parameters.
    pub fn create_node(&mut self, operation: &str, name: &str) -> Result<NodeId, GraphError> {
        let args = NodeArgs::standard(self.net.device(), name);
        let node = self.factory.create(operation, &args)?;
        self.register(node)
    }

    pub fn create_learnable_parameter(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Parameter(ParameterParams {
            rows,
            cols,
            sparse_size: None,
        });
        let node = self.node_with(OperationKind::LearnableParameter, name, params)?;
        self.register(node)
    }

    /// `size` is the number of non-zero entries reserved up front.
    pub fn create_sparse_learnable_parameter(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
        size: usize,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Parameter(ParameterParams {
            rows,
            cols,
            sparse_size: Some(size),
        });
        let node = self.node_with(OperationKind::SparseLearnableParameter, name, params)?;
        self.register(node)
    }

    pub fn create_input_node(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<NodeId, GraphError> {
        self.create_input(name, InputParams::matrix(rows, cols, false))
    }

    pub fn create_sparse_input_node(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<NodeId, GraphError> {
        self.create_input(name, InputParams::matrix(rows, cols, true))
    }

    pub fn create_image_input_node(
        &mut self,
        name: &str,
        layout: ImageLayout,
        num_images: usize,
    ) -> Result<NodeId, GraphError> {
        self.create_input(name, InputParams::image(layout, num_images, false))
    }

    pub fn create_sparse_image_input_node(
        &mut self,
        name: &str,
        layout: ImageLayout,
        num_images: usize,
    ) -> Result<NodeId, GraphError> {
        self.create_input(name, InputParams::image(layout, num_images, true))
    }

    pub fn create_pair_network_node(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::PairNetwork { rows, cols };
        let node = self.node_with(OperationKind::PairNetwork, name, params)?;
        self.register(node)
    }

    pub fn create_convolution_node(
        &mut self,
        name: &str,
        params: ConvolutionParams,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Convolution(params);
        let node = self.node_with(OperationKind::Convolution, name, params)?;
        self.register(node)
    }

    pub fn create_max_pooling_node(
        &mut self,
        name: &str,
        params: PoolingParams,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Pooling(params);
        let node = self.node_with(OperationKind::MaxPooling, name, params)?;
        self.register(node)
    }

    pub fn create_average_pooling_node(
        &mut self,
        name: &str,
        params: PoolingParams,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Pooling(params);
        let node = self.node_with(OperationKind::AveragePooling, name, params)?;
        self.register(node)
    }

    /// Wire a node created with one of the create-only methods.
    pub fn attach_inputs(&mut self, node: NodeId, inputs: &[NodeId]) -> Result<(), GraphError> {
        self.net.set_inputs(node, inputs)
    }

    // ---- create-and-attach by name ----

    /// Create a node by operation name and attach `inputs` in order.
    pub fn create_and_attach(
        &mut self,
        operation: &str,
        inputs: &[NodeId],
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let args = NodeArgs::standard(self.net.device(), name);
        let node = self.factory.create(operation, &args)?;
        self.attach(node, inputs)
    }

    // ---- parameterized operations ----

    /// Convolution of `input` with kernel weights `weight`. The weight is attached first.
    pub fn convolution(
        &mut self,
        weight: NodeId,
        input: NodeId,
        params: ConvolutionParams,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Convolution(params);
        let node = self.node_with(OperationKind::Convolution, name, params)?;
        self.attach(node, &[weight, input])
    }

    pub fn max_pooling(
        &mut self,
        input: NodeId,
        params: PoolingParams,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Pooling(params);
        let node = self.node_with(OperationKind::MaxPooling, name, params)?;
        self.attach(node, &[input])
    }

    pub fn average_pooling(
        &mut self,
        input: NodeId,
        params: PoolingParams,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Pooling(params);
        let node = self.node_with(OperationKind::AveragePooling, name, params)?;
        self.attach(node, &[input])
    }

    /// Value of `input` `params.time_step` steps earlier in the sequence.
    pub fn past_value(
        &mut self,
        input: NodeId,
        params: RecurrentParams<E>,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Recurrent(params);
        let node = self.node_with(OperationKind::PastValue, name, params)?;
        self.attach(node, &[input])
    }

    /// Value of `input` `params.time_step` steps later in the sequence.
    pub fn future_value(
        &mut self,
        input: NodeId,
        params: RecurrentParams<E>,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Recurrent(params);
        let node = self.node_with(OperationKind::FutureValue, name, params)?;
        self.attach(node, &[input])
    }

    pub fn row_slice(
        &mut self,
        input: NodeId,
        start_index: usize,
        num_rows: usize,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::RowSlice {
            start_index,
            num_rows,
        };
        let node = self.node_with(OperationKind::RowSlice, name, params)?;
        self.attach(node, &[input])
    }

    pub fn row_repeat(
        &mut self,
        input: NodeId,
        num_repeats: usize,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::RowRepeat { num_repeats };
        let node = self.node_with(OperationKind::RowRepeat, name, params)?;
        self.attach(node, &[input])
    }

    pub fn reshape(
        &mut self,
        input: NodeId,
        num_rows: usize,
        layout: ImageLayout,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::Reshape { num_rows, layout };
        let node = self.node_with(OperationKind::Reshape, name, params)?;
        self.attach(node, &[input])
    }

    /// Noise-contrastive estimation criterion. Inputs: label, input, weight, bias.
    pub fn noise_contrastive_estimation(
        &mut self,
        label: NodeId,
        input: NodeId,
        input_weight: NodeId,
        bias: NodeId,
        mode: NceEvalMode,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let params = NodeParams::NoiseContrastive { mode };
        let node = self.node_with(OperationKind::NoiseContrastiveEstimation, name, params)?;
        self.attach(node, &[label, input, input_weight, bias])
    }

    /// Mirror `node` of `source` into this network through a `PairNetwork` node.
    ///
    /// Fails with `DuplicateNodeName` when this network already holds a node
    /// named like the paired one.
    pub fn pair_network(
        &mut self,
        source: &ComputationNetwork,
        node: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let paired = source.node(node).ok_or(GraphError::UnknownNode { node })?;
        if self.net.node_named(paired.name()).is_some() {
            tracing::warn!(
                source = %source.id(),
                target = %self.net.id(),
                node = paired.name(),
                "cannot pair node: the target network already has a node with this name"
            );
            return Err(GraphError::DuplicateNodeName {
                name: paired.name().to_string(),
            });
        }
        self.apply(OperationKind::PairNetwork, &[node], name)
    }

    // ---- one input ----

    pub fn negate(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Negate, &[a], name)
    }

    pub fn sigmoid(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Sigmoid, &[a], name)
    }

    pub fn tanh(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Tanh, &[a], name)
    }

    pub fn exp(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Exp, &[a], name)
    }

    pub fn log(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Log, &[a], name)
    }

    pub fn cos(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Cosine, &[a], name)
    }

    pub fn hardmax(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Hardmax, &[a], name)
    }

    pub fn softmax(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Softmax, &[a], name)
    }

    pub fn log_softmax(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::LogSoftmax, &[a], name)
    }

    /// Sum of all elements
    pub fn sum(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::SumElements, &[a], name)
    }

    /// Per-column sum
    pub fn sum_column_elements(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::SumColumnElements, &[a], name)
    }

    pub fn transpose(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Transpose, &[a], name)
    }

    pub fn rectified_linear(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::RectifiedLinear, &[a], name)
    }

    pub fn dropout(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Dropout, &[a], name)
    }

    pub fn diagonal(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Diagonal, &[a], name)
    }

    pub fn mean(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Mean, &[a], name)
    }

    pub fn inv_std_dev(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::InvStdDev, &[a], name)
    }

    pub fn matrix_l1_reg(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::MatrixL1Reg, &[a], name)
    }

    pub fn matrix_l2_reg(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::MatrixL2Reg, &[a], name)
    }

    pub fn time_reverse(&mut self, a: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::TimeReverse, &[a], name)
    }

    // ---- two inputs ----

    pub fn plus(&mut self, a: NodeId, b: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Plus, &[a, b], name)
    }

    pub fn minus(&mut self, a: NodeId, b: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Minus, &[a, b], name)
    }

    /// Matrix product `a * b`
    pub fn times(&mut self, a: NodeId, b: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Times, &[a, b], name)
    }

    /// Matrix product `aᵀ * b`
    pub fn transpose_times(
        &mut self,
        a: NodeId,
        b: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::TransposeTimes, &[a, b], name)
    }

    pub fn element_times(
        &mut self,
        a: NodeId,
        b: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::ElementTimes, &[a, b], name)
    }

    pub fn row_element_times(
        &mut self,
        a: NodeId,
        b: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::RowElementTimes, &[a, b], name)
    }

    pub fn column_element_times(
        &mut self,
        a: NodeId,
        b: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::ColumnElementTimes, &[a, b], name)
    }

    pub fn diag_times(&mut self, a: NodeId, b: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::DiagTimes, &[a, b], name)
    }

    pub fn cos_distance(&mut self, a: NodeId, b: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::CosDistance, &[a, b], name)
    }

    pub fn khatri_rao_product(
        &mut self,
        a: NodeId,
        b: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::KhatriRaoProduct, &[a, b], name)
    }

    /// Scale matrix `b` by the scalar node `a`.
    pub fn scale(&mut self, a: NodeId, b: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Scale, &[a, b], name)
    }

    pub fn parallel(&mut self, a: NodeId, b: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Parallel, &[a, b], name)
    }

    /// Adopt the minibatch layout of `layout_source` for `input`.
    pub fn reconcile_mb_layout(
        &mut self,
        input: NodeId,
        layout_source: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::ReconcileMbLayout,
            &[input, layout_source],
            name,
        )
    }

    pub fn cross_entropy(
        &mut self,
        label: NodeId,
        prediction: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::CrossEntropy, &[label, prediction], name)
    }

    pub fn cross_entropy_with_softmax(
        &mut self,
        label: NodeId,
        prediction: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::CrossEntropyWithSoftmax,
            &[label, prediction],
            name,
        )
    }

    pub fn error_prediction(
        &mut self,
        label: NodeId,
        prediction: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::ErrorPrediction, &[label, prediction], name)
    }

    pub fn square_error(&mut self, a: NodeId, b: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::SquareError, &[a, b], name)
    }

    pub fn logistic(
        &mut self,
        label: NodeId,
        prediction: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Logistic, &[label, prediction], name)
    }

    /// Embedding lookup of `input` rows in `dictionary`.
    pub fn lookup_table(
        &mut self,
        dictionary: NodeId,
        input: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::LookupTable, &[dictionary, input], name)
    }

    // ---- three inputs ----

    pub fn crf(
        &mut self,
        label: NodeId,
        position_dependent_scores: NodeId,
        transition_scores: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::Crf,
            &[label, position_dependent_scores, transition_scores],
            name,
        )
    }

    pub fn per_dim_mean_var_normalization(
        &mut self,
        feature: NodeId,
        mean: NodeId,
        inv_std_dev: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::PerDimMeanVarNormalization,
            &[feature, mean, inv_std_dev],
            name,
        )
    }

    pub fn per_dim_mean_var_denormalization(
        &mut self,
        feature: NodeId,
        mean: NodeId,
        inv_std_dev: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::PerDimMeanVarDeNormalization,
            &[feature, mean, inv_std_dev],
            name,
        )
    }

    pub fn sequence_decoder(
        &mut self,
        label: NodeId,
        position_dependent_scores: NodeId,
        transition_scores: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::SequenceDecoder,
            &[label, position_dependent_scores, transition_scores],
            name,
        )
    }

    pub fn sequence_with_softmax(
        &mut self,
        label: NodeId,
        prediction: NodeId,
        log_likelihood: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::SequenceWithSoftmax,
            &[label, prediction, log_likelihood],
            name,
        )
    }

    pub fn dummy_criterion(
        &mut self,
        objectives: NodeId,
        derivatives: NodeId,
        prediction: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::DummyCriterion,
            &[objectives, derivatives, prediction],
            name,
        )
    }

    pub fn stride_times(
        &mut self,
        a: NodeId,
        b: NodeId,
        stride: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::StrideTimes, &[a, b, stride], name)
    }

    /// Weighted logistic criterion: label, prediction and per-sample weight.
    pub fn logistic_weighted(
        &mut self,
        label: NodeId,
        prediction: NodeId,
        weight: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::Logistic, &[label, prediction, weight], name)
    }

    // ---- four and more ----

    pub fn cos_distance_with_negative_samples(
        &mut self,
        a: NodeId,
        b: NodeId,
        shift: NodeId,
        num_negative: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::CosDistanceWithNegativeSamples,
            &[a, b, shift, num_negative],
            name,
        )
    }

    pub fn class_cross_entropy_with_softmax(
        &mut self,
        label: NodeId,
        prediction: NodeId,
        input_weight: NodeId,
        class_log_post_prob: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::ClassBasedCrossEntropyWithSoftmax,
            &[label, prediction, input_weight, class_log_post_prob],
            name,
        )
    }

    pub fn gmm_log_likelihood(
        &mut self,
        unnormed_prior: NodeId,
        mean: NodeId,
        log_stddev: NodeId,
        feature: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::GmmLogLikelihood,
            &[unnormed_prior, mean, log_stddev, feature],
            name,
        )
    }

    /// LSTM cell. Inputs in order: observation, input gate, forget gate,
    /// output gate, memory cell weights.
    pub fn lstm(
        &mut self,
        observation: NodeId,
        input_gate: NodeId,
        forget_gate: NodeId,
        output_gate: NodeId,
        memory_cell_weight: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.apply(
            OperationKind::Lstm,
            &[observation, input_gate, forget_gate, output_gate, memory_cell_weight],
            name,
        )
    }

    /// Vertical concatenation of any number of inputs.
    pub fn row_stack(&mut self, inputs: &[NodeId], name: &str) -> Result<NodeId, GraphError> {
        self.apply(OperationKind::RowStack, inputs, name)
    }

    // ---- helpers ----

    fn create_input(&mut self, name: &str, params: InputParams) -> Result<NodeId, GraphError> {
        let params = NodeParams::Input(params);
        let node = self.node_with(OperationKind::InputValue, name, params)?;
        self.register(node)
    }

    fn node_with(
        &self,
        kind: OperationKind,
        name: &str,
        params: NodeParams<E>,
    ) -> Result<ComputationNode<E>, GraphError> {
        ComputationNode::with_params(kind, self.net.device(), name, params)
    }

    /// Standard-tier construction through the registry, then attach.
    fn apply(
        &mut self,
        kind: OperationKind,
        inputs: &[NodeId],
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let device = self.net.device();
        let node = self.factory.create_standard(kind.name(), device, name)?;
        self.attach(node, inputs)
    }

    fn register(&mut self, node: ComputationNode<E>) -> Result<NodeId, GraphError> {
        self.net.register(Box::new(node))
    }

    fn attach(
        &mut self,
        node: ComputationNode<E>,
        inputs: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        self.net.attach_inputs(Box::new(node), inputs)
    }
}
