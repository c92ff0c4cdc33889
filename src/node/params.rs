//! Parameters fixed when a node is constructed.
//!
//! Most operations carry none. The ones that do (convolution, pooling,
//! recurrent values, row slicing and the data-holding leaves) keep them in a
//! dedicated struct so that every constructor validates the same way no
//! matter whether it was reached from code or from a configuration record.

use std::fmt;
use std::mem;

use serde::{Deserialize, Serialize};

use super::OperationKind;
use crate::config::ConfigRecord;
use crate::element::Element;
use crate::error::GraphError;

/// Width × height × channels layout of one image sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageLayout {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl ImageLayout {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Layout of a plain column vector with `rows` entries.
    pub fn column(rows: usize) -> Self {
        Self::new(1, rows, 1)
    }

    /// Elements in one sample, or `None` when the product overflows `usize`.
    pub fn num_elements(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.channels)
    }

    fn read(record: &ConfigRecord, default: ImageLayout) -> Result<Self, GraphError> {
        Ok(Self {
            width: record.usize_or("imageWidth", default.width)?,
            height: record.usize_or("imageHeight", default.height)?,
            channels: record.usize_or("imageChannels", default.channels)?,
        })
    }

    fn present_in(record: &ConfigRecord) -> bool {
        ["imageWidth", "imageHeight", "imageChannels"]
            .iter()
            .any(|field| record.contains(field))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvolutionParams {
    pub kernel_width: usize,
    pub kernel_height: usize,
    pub output_channels: usize,
    pub horizontal_subsample: usize,
    pub vertical_subsample: usize,
    pub zero_padding: bool,
    pub max_temp_mem_size_in_samples: usize,
}

impl ConvolutionParams {
    /// Unit strides, no padding, unbounded temporary memory.
    pub fn new(kernel_width: usize, kernel_height: usize, output_channels: usize) -> Self {
        Self {
            kernel_width,
            kernel_height,
            output_channels,
            horizontal_subsample: 1,
            vertical_subsample: 1,
            zero_padding: false,
            max_temp_mem_size_in_samples: 0,
        }
    }

    pub fn with_subsample(mut self, horizontal: usize, vertical: usize) -> Self {
        self.horizontal_subsample = horizontal;
        self.vertical_subsample = vertical;
        self
    }

    pub fn with_zero_padding(mut self, zero_padding: bool) -> Self {
        self.zero_padding = zero_padding;
        self
    }

    pub fn with_max_temp_mem_size_in_samples(mut self, samples: usize) -> Self {
        self.max_temp_mem_size_in_samples = samples;
        self
    }

    fn validate(&self, operation: OperationKind) -> Result<(), GraphError> {
        require_positive(operation, "kernel_width", self.kernel_width)?;
        require_positive(operation, "kernel_height", self.kernel_height)?;
        require_positive(operation, "output_channels", self.output_channels)?;
        require_positive(operation, "horizontal_subsample", self.horizontal_subsample)?;
        require_positive(operation, "vertical_subsample", self.vertical_subsample)
    }

    fn read(record: &ConfigRecord, default: Self) -> Result<Self, GraphError> {
        Ok(Self {
            kernel_width: record.usize_or("kernelWidth", default.kernel_width)?,
            kernel_height: record.usize_or("kernelHeight", default.kernel_height)?,
            output_channels: record.usize_or("outputChannels", default.output_channels)?,
            horizontal_subsample: read_horizontal(record, default.horizontal_subsample)?,
            vertical_subsample: read_vertical(record, default.vertical_subsample)?,
            zero_padding: record.bool_or("zeroPadding", default.zero_padding)?,
            max_temp_mem_size_in_samples: record.usize_or(
                "maxTempMemSizeInSamples",
                default.max_temp_mem_size_in_samples,
            )?,
        })
    }
}

impl Default for ConvolutionParams {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

/// Window and stride shared by max and average pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolingParams {
    pub window_width: usize,
    pub window_height: usize,
    pub horizontal_subsample: usize,
    pub vertical_subsample: usize,
}

impl PoolingParams {
    pub fn new(
        window_width: usize,
        window_height: usize,
        horizontal_subsample: usize,
        vertical_subsample: usize,
    ) -> Self {
        Self {
            window_width,
            window_height,
            horizontal_subsample,
            vertical_subsample,
        }
    }

    fn validate(&self, operation: OperationKind) -> Result<(), GraphError> {
        require_positive(operation, "window_width", self.window_width)?;
        require_positive(operation, "window_height", self.window_height)?;
        require_positive(operation, "horizontal_subsample", self.horizontal_subsample)?;
        require_positive(operation, "vertical_subsample", self.vertical_subsample)
    }

    fn read(record: &ConfigRecord, default: Self) -> Result<Self, GraphError> {
        Ok(Self {
            window_width: record.usize_or("windowWidth", default.window_width)?,
            window_height: record.usize_or("windowHeight", default.window_height)?,
            horizontal_subsample: read_horizontal(record, default.horizontal_subsample)?,
            vertical_subsample: read_vertical(record, default.vertical_subsample)?,
        })
    }
}

impl Default for PoolingParams {
    fn default() -> Self {
        Self::new(1, 1, 1, 1)
    }
}

/// Configuration of a `PastValue` / `FutureValue` node.
///
/// `initial_activation` is emitted for the steps that fall outside the
/// sequence. `rows`/`cols` of zero leave the shape to be inferred later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecurrentParams<E: Element> {
    pub initial_activation: E,
    pub rows: usize,
    pub cols: usize,
    pub time_step: usize,
}

impl<E: Element> RecurrentParams<E> {
    pub const DEFAULT_INITIAL_ACTIVATION: f64 = 0.1;

    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            initial_activation: E::from_f64(Self::DEFAULT_INITIAL_ACTIVATION),
            rows,
            cols,
            time_step: 1,
        }
    }

    pub fn with_initial_activation(mut self, value: E) -> Self {
        self.initial_activation = value;
        self
    }

    pub fn with_time_step(mut self, time_step: usize) -> Self {
        self.time_step = time_step;
        self
    }

    fn validate(&self, operation: OperationKind) -> Result<(), GraphError> {
        require_positive(operation, "time_step", self.time_step)
    }

    fn read(record: &ConfigRecord, default: Self) -> Result<Self, GraphError> {
        let fallback = default.initial_activation.to_f64();
        let initial = record.f64_or("initialActivation", fallback)?;
        Ok(Self {
            initial_activation: E::from_f64(initial),
            rows: record.usize_or("rows", default.rows)?,
            cols: record.usize_or("cols", default.cols)?,
            time_step: record.usize_or("timeStep", default.time_step)?,
        })
    }
}

impl<E: Element> Default for RecurrentParams<E> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Shape of a learnable parameter. `sparse_size` is set only for the sparse variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterParams {
    pub rows: usize,
    pub cols: usize,
    pub sparse_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputParams {
    pub layout: ImageLayout,
    /// Number of columns (samples, or images for image-shaped inputs).
    pub columns: usize,
    pub sparse: bool,
}

impl InputParams {
    pub fn matrix(rows: usize, cols: usize, sparse: bool) -> Self {
        Self {
            layout: ImageLayout::column(rows),
            columns: cols,
            sparse,
        }
    }

    pub fn image(layout: ImageLayout, num_images: usize, sparse: bool) -> Self {
        Self {
            layout,
            columns: num_images,
            sparse,
        }
    }

    /// Rows of the input matrix, `None` when the layout overflows.
    pub fn rows(&self) -> Option<usize> {
        self.layout.num_elements()
    }

    fn validate(&self, operation: OperationKind) -> Result<(), GraphError> {
        if self.rows().is_none() {
            return Err(GraphError::invalid_argument(
                operation.name(),
                format!("image layout {:?} has too many elements", self.layout),
            ));
        }
        Ok(())
    }
}

/// How a noise-contrastive-estimation node evaluates outside of training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NceEvalMode {
    #[default]
    None,
    Softmax,
    Unnormalized,
}

impl NceEvalMode {
    pub fn parse(value: &str) -> Option<Self> {
        [NceEvalMode::None, NceEvalMode::Softmax, NceEvalMode::Unnormalized]
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NceEvalMode::None => "none",
            NceEvalMode::Softmax => "softmax",
            NceEvalMode::Unnormalized => "unnormalized",
        }
    }
}

impl fmt::Display for NceEvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeParams<E: Element> {
    None,
    Parameter(ParameterParams),
    Input(InputParams),
    PairNetwork {
        rows: usize,
        cols: usize,
    },
    Convolution(ConvolutionParams),
    Pooling(PoolingParams),
    Recurrent(RecurrentParams<E>),
    RowSlice {
        start_index: usize,
        num_rows: usize,
    },
    RowRepeat {
        num_repeats: usize,
    },
    Reshape {
        num_rows: usize,
        layout: ImageLayout,
    },
    NoiseContrastive { mode: NceEvalMode },
}

impl<E: Element> NodeParams<E> {
    /// Parameters a node of `kind` gets when only a device and a name are known.
    pub fn default_for(kind: OperationKind) -> Self {
        match kind {
            OperationKind::LearnableParameter => NodeParams::Parameter(ParameterParams::default()),
            OperationKind::SparseLearnableParameter => NodeParams::Parameter(ParameterParams {
                sparse_size: Some(0),
                ..ParameterParams::default()
            }),
            OperationKind::InputValue => NodeParams::Input(InputParams::matrix(0, 1, false)),
            OperationKind::PairNetwork => NodeParams::PairNetwork { rows: 0, cols: 0 },
            OperationKind::Convolution => NodeParams::Convolution(ConvolutionParams::default()),
            OperationKind::MaxPooling | OperationKind::AveragePooling => {
                NodeParams::Pooling(PoolingParams::default())
            }
            OperationKind::PastValue | OperationKind::FutureValue => {
                NodeParams::Recurrent(RecurrentParams::default())
            }
            OperationKind::RowSlice => NodeParams::RowSlice {
                start_index: 0,
                num_rows: 1,
            },
            OperationKind::RowRepeat => NodeParams::RowRepeat { num_repeats: 1 },
            OperationKind::Reshape => NodeParams::Reshape {
                num_rows: 0,
                layout: ImageLayout::default(),
            },
            OperationKind::NoiseContrastiveEstimation => NodeParams::NoiseContrastive {
                mode: NceEvalMode::default(),
            },
            _ => NodeParams::None,
        }
    }

    /// Read the parameters of `kind` from a configuration record.
    ///
    /// Absent fields keep the values of [`NodeParams::default_for`]; present
    /// fields of the wrong type are reported as `InvalidConfigField`.
    pub fn from_record(kind: OperationKind, record: &ConfigRecord) -> Result<Self, GraphError> {
        let params = match Self::default_for(kind) {
            NodeParams::None => NodeParams::None,
            NodeParams::Parameter(default) => NodeParams::Parameter(ParameterParams {
                rows: record.usize_or("rows", default.rows)?,
                cols: record.usize_or("cols", default.cols)?,
                sparse_size: match default.sparse_size {
                    Some(size) => Some(record.usize_or("size", size)?),
                    None => None,
                },
            }),
            NodeParams::Input(default) => {
                let sparse = record.bool_or("isSparse", default.sparse)?;
                if ImageLayout::present_in(record) {
                    let layout = ImageLayout::read(record, ImageLayout::new(1, 1, 1))?;
                    let num_images = record.usize_or("numImages", 1)?;
                    NodeParams::Input(InputParams::image(layout, num_images, sparse))
                } else {
                    NodeParams::Input(InputParams::matrix(
                        record.usize_or("rows", default.layout.height)?,
                        record.usize_or("cols", default.columns)?,
                        sparse,
                    ))
                }
            }
            NodeParams::PairNetwork { rows, cols } => NodeParams::PairNetwork {
                rows: record.usize_or("rows", rows)?,
                cols: record.usize_or("cols", cols)?,
            },
            NodeParams::Convolution(default) => {
                NodeParams::Convolution(ConvolutionParams::read(record, default)?)
            }
            NodeParams::Pooling(default) => {
                NodeParams::Pooling(PoolingParams::read(record, default)?)
            }
            NodeParams::Recurrent(default) => {
                NodeParams::Recurrent(RecurrentParams::read(record, default)?)
            }
            NodeParams::RowSlice {
                start_index,
                num_rows,
            } => NodeParams::RowSlice {
                start_index: record.usize_or("startIndex", start_index)?,
                num_rows: record.usize_or("numRows", num_rows)?,
            },
            NodeParams::RowRepeat { num_repeats } => NodeParams::RowRepeat {
                num_repeats: record.usize_or("numRepeats", num_repeats)?,
            },
            NodeParams::Reshape { num_rows, layout } => NodeParams::Reshape {
                num_rows: record.usize_or("numRows", num_rows)?,
                layout: ImageLayout::read(record, layout)?,
            },
            NodeParams::NoiseContrastive { mode } => {
                let raw = record.str_or("evalMode", mode.as_str())?;
                let mode = NceEvalMode::parse(raw).ok_or_else(|| {
                    GraphError::invalid_field(
                        "evalMode",
                        format!("`{raw}` is not one of none, softmax, unnormalized"),
                    )
                })?;
                NodeParams::NoiseContrastive { mode }
            }
        };
        Ok(params)
    }

    /// Check that these parameters belong to `kind` and are in range.
    pub(crate) fn validate(&self, kind: OperationKind) -> Result<(), GraphError> {
        if mem::discriminant(self) != mem::discriminant(&Self::default_for(kind)) {
            return Err(GraphError::invalid_argument(
                kind.name(),
                format!("parameters {} do not apply to this operation", self.label()),
            ));
        }
        match self {
            NodeParams::Convolution(params) => params.validate(kind),
            NodeParams::Pooling(params) => params.validate(kind),
            NodeParams::Recurrent(params) => params.validate(kind),
            NodeParams::Input(params) => params.validate(kind),
            NodeParams::RowSlice { num_rows, .. } => require_positive(kind, "num_rows", *num_rows),
            NodeParams::RowRepeat { num_repeats } => {
                require_positive(kind, "num_repeats", *num_repeats)
            }
            _ => Ok(()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            NodeParams::None => "none",
            NodeParams::Parameter(_) => "parameter",
            NodeParams::Input(_) => "input",
            NodeParams::PairNetwork { .. } => "pair-network",
            NodeParams::Convolution(_) => "convolution",
            NodeParams::Pooling(_) => "pooling",
            NodeParams::Recurrent(_) => "recurrent",
            NodeParams::RowSlice { .. } => "row-slice",
            NodeParams::RowRepeat { .. } => "row-repeat",
            NodeParams::Reshape { .. } => "reshape",
            NodeParams::NoiseContrastive { .. } => "noise-contrastive",
        }
    }
}

fn read_horizontal(record: &ConfigRecord, default: usize) -> Result<usize, GraphError> {
    record.usize_or("horizontalSubsample", default)
}

fn read_vertical(record: &ConfigRecord, default: usize) -> Result<usize, GraphError> {
    record.usize_or("verticalSubsample", default)
}

fn require_positive(operation: OperationKind, field: &str, value: usize) -> Result<(), GraphError> {
    if value == 0 {
        return Err(GraphError::invalid_argument(
            operation.name(),
            format!("{field} must be greater than zero"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ConfigRecord {
        ConfigRecord::from_value(value).unwrap()
    }

    #[test]
    fn defaults_match_operation_kind() {
        for kind in OperationKind::ALL {
            let params = NodeParams::<f32>::default_for(*kind);
            params.validate(*kind).unwrap();
        }
    }

    #[test]
    fn convolution_reads_record_fields() {
        let params = NodeParams::<f32>::from_record(
            OperationKind::Convolution,
            &record(json!({
                "kernelWidth": 5,
                "kernelHeight": 3,
                "outputChannels": 16,
                "horizontalSubsample": 2,
                "zeroPadding": true
            })),
        )
        .unwrap();

        let expected = ConvolutionParams::new(5, 3, 16)
            .with_subsample(2, 1)
            .with_zero_padding(true);
        assert_eq!(params, NodeParams::Convolution(expected));
    }

    #[test]
    fn zero_kernel_width_fails() {
        let params = NodeParams::<f64>::Convolution(ConvolutionParams::new(0, 3, 8));
        match params.validate(OperationKind::Convolution) {
            Err(GraphError::InvalidArgument { operation, reason }) => {
                assert_eq!(operation, "Convolution");
                assert!(reason.contains("kernel_width"));
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn zero_pooling_stride_fails() {
        let params = NodeParams::<f32>::Pooling(PoolingParams::new(2, 2, 0, 2));
        assert!(matches!(
            params.validate(OperationKind::MaxPooling),
            Err(GraphError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn zero_time_step_fails() {
        let params = NodeParams::Recurrent(RecurrentParams::<f32>::new(4, 1).with_time_step(0));
        assert!(matches!(
            params.validate(OperationKind::PastValue),
            Err(GraphError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn mismatched_parameters_fail() {
        let params = NodeParams::<f32>::Pooling(PoolingParams::default());
        assert!(params.validate(OperationKind::Convolution).is_err());
        let params = NodeParams::<f32>::None;
        assert!(params.validate(OperationKind::PastValue).is_err());
        assert!(
            NodeParams::<f32>::RowRepeat { num_repeats: 2 }
                .validate(OperationKind::Plus)
                .is_err()
        );
    }

    #[test]
    fn recurrent_record_converts_activation() {
        let params = NodeParams::<f32>::from_record(
            OperationKind::FutureValue,
            &record(json!({
                "initialActivation": 0.5,
                "rows": 10,
                "timeStep": 2
            })),
        )
        .unwrap();
        match params {
            NodeParams::Recurrent(recurrent) => {
                assert_eq!(recurrent.initial_activation, 0.5f32);
                assert_eq!(recurrent.rows, 10);
                assert_eq!(recurrent.cols, 0);
                assert_eq!(recurrent.time_step, 2);
            }
            other => panic!("expected recurrent parameters, got {other:?}"),
        }
    }

    #[test]
    fn image_input_record_uses_layout() {
        let params = NodeParams::<f64>::from_record(
            OperationKind::InputValue,
            &record(json!({
                "imageWidth": 28,
                "imageHeight": 28,
                "numImages": 4,
                "isSparse": true
            })),
        )
        .unwrap();
        match params {
            NodeParams::Input(input) => {
                assert_eq!(input.layout, ImageLayout::new(28, 28, 1));
                assert_eq!(input.rows(), Some(784));
                assert_eq!(input.columns, 4);
                assert!(input.sparse);
            }
            other => panic!("expected input parameters, got {other:?}"),
        }
    }

    #[test]
    fn overflowing_image_layout_fails() {
        let layout = ImageLayout::new(usize::MAX, 2, 1);
        assert_eq!(layout.num_elements(), None);
        let layout = ImageLayout::new(usize::MAX, 1, 1);
        assert_eq!(layout.num_elements(), Some(usize::MAX));

        let params = NodeParams::<f32>::from_record(
            OperationKind::InputValue,
            &record(json!({
                "imageWidth": usize::MAX,
                "imageHeight": 2,
                "imageChannels": 3
            })),
        )
        .unwrap();
        match &params {
            NodeParams::Input(input) => assert_eq!(input.rows(), None),
            other => panic!("expected input parameters, got {other:?}"),
        }
        let err = params.validate(OperationKind::InputValue).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument { .. }));
    }

    #[test]
    fn unknown_eval_mode_is_reported() {
        let result = NodeParams::<f32>::from_record(
            OperationKind::NoiseContrastiveEstimation,
            &record(json!({ "evalMode": "sampled" })),
        );
        assert!(matches!(result, Err(GraphError::InvalidConfigField { .. })));
        assert_eq!(NceEvalMode::parse("Softmax"), Some(NceEvalMode::Softmax));
    }
}
