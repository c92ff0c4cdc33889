use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Numeric precision a node computes in.
///
/// The tag is fixed when a node is constructed. The two literals accepted from
/// configuration records are `float` and `double`; nothing else is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Float,
    Double,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Float => "float",
            ElementType::Double => "double",
        }
    }

    /// Parse a `precision` value from a configuration record.
    pub fn parse(value: &str) -> Result<Self, GraphError> {
        match value {
            "float" => Ok(ElementType::Float),
            "double" => Ok(ElementType::Double),
            other => Err(GraphError::InvalidPrecision {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::parse(s)
    }
}

/// Rust scalar types a node can be instantiated over.
///
/// Connects the compile-time type parameter of [`ComputationNode`](crate::node::ComputationNode)
/// to the runtime [`ElementType`] tag.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;
}

impl Element for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::Float;

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::Double;

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }
}
