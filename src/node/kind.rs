use std::fmt;

macro_rules! operation_kinds {
    ($($variant:ident => $name:literal,)+) => {
        /// Every operation a node can carry, keyed by its canonical name.
        ///
        /// Legacy aliases (`Delay`, `PerDimMeanVarNormalizationNode`, ...) are a
        /// registry concern and never appear here.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum OperationKind {
            $($variant,)+
        }

        impl OperationKind {
            pub const ALL: &'static [OperationKind] = &[$(OperationKind::$variant,)+];

            pub fn name(self) -> &'static str {
                match self {
                    $(OperationKind::$variant => $name,)+
                }
            }
        }
    };
}

operation_kinds! {
    AveragePooling => "AveragePooling",
    ClassBasedCrossEntropyWithSoftmax => "ClassBasedCrossEntropyWithSoftmax",
    ColumnElementTimes => "ColumnElementTimes",
    Convolution => "Convolution",
    CosDistance => "CosDistance",
    CosDistanceWithNegativeSamples => "CosDistanceWithNegativeSamples",
    Cosine => "Cosine",
    Crf => "CRF",
    CrossEntropy => "CrossEntropy",
    CrossEntropyWithSoftmax => "CrossEntropyWithSoftmax",
    DiagTimes => "DiagTimes",
    Diagonal => "Diagonal",
    Dropout => "Dropout",
    DummyCriterion => "DummyCriterion",
    ElementTimes => "ElementTimes",
    ErrorPrediction => "ErrorPrediction",
    Exp => "Exp",
    FutureValue => "FutureValue",
    GmmLogLikelihood => "GMMLogLikelihood",
    Hardmax => "Hardmax",
    InputValue => "InputValue",
    InvStdDev => "InvStdDev",
    KhatriRaoProduct => "KhatriRaoProduct",
    LearnableParameter => "LearnableParameter",
    Log => "Log",
    LogSoftmax => "LogSoftmax",
    Logistic => "Logistic",
    LookupTable => "LookupTable",
    Lstm => "LSTM",
    MatrixL1Reg => "MatrixL1Reg",
    MatrixL2Reg => "MatrixL2Reg",
    MaxPooling => "MaxPooling",
    Mean => "Mean",
    Minus => "Minus",
    NoiseContrastiveEstimation => "NCEBasedCrossEntropyWithSoftmax",
    Negate => "Negate",
    PairNetwork => "PairNetwork",
    Parallel => "Parallel",
    PastValue => "PastValue",
    PerDimMeanVarDeNormalization => "PerDimMeanVarDeNormalization",
    PerDimMeanVarNormalization => "PerDimMeanVarNormalization",
    Plus => "Plus",
    ReconcileMbLayout => "ReconcileMBLayout",
    RectifiedLinear => "RectifiedLinear",
    Reshape => "Reshape",
    RowElementTimes => "RowElementTimes",
    RowRepeat => "RowRepeat",
    RowSlice => "RowSlice",
    RowStack => "RowStack",
    Scale => "Scale",
    SequenceDecoder => "SequenceDecoderNode",
    SequenceWithSoftmax => "SequenceWithSoftmax",
    Sigmoid => "Sigmoid",
    Softmax => "Softmax",
    SparseLearnableParameter => "SparseLearnableParameter",
    SquareError => "SquareError",
    StrideTimes => "StrideTimes",
    SumColumnElements => "SumColumnElements",
    SumElements => "SumElements",
    Tanh => "Tanh",
    TimeReverse => "TimeReverse",
    Times => "Times",
    Transpose => "Transpose",
    TransposeTimes => "TransposeTimes",
}

impl OperationKind {
    /// Look up a kind by canonical name. Case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Nodes that hold data rather than compute it.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            OperationKind::InputValue
                | OperationKind::LearnableParameter
                | OperationKind::SparseLearnableParameter
        )
    }

    /// Nodes whose output at one step reads their input at another step.
    pub fn is_recurrent(self) -> bool {
        matches!(self, OperationKind::PastValue | OperationKind::FutureValue)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
