//! Element types and constant tensors.
//!
//! Constant values in a model graph (axes, shapes, weights) are stored as
//! small dense tensors. Integer data is always held as `i64` and float data
//! as `f64`; the `ElementType` records the precision the IR declares.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric element type of a tensor or of an operation's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    I32,
    I64,
    U8,
    F16,
    F32,
    F64,
    Bool,
}

impl ElementType {
    /// Whether values of this type are stored as integers.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ElementType::I32 | ElementType::I64 | ElementType::U8 | ElementType::Bool
        )
    }

    /// Whether this type is accepted as the output type of shape-producing ops.
    pub fn is_index_type(&self) -> bool {
        matches!(self, ElementType::I32 | ElementType::I64)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::F16 => "f16",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::Bool => "boolean",
        };
        write!(f, "{s}")
    }
}

/// Raw tensor storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TensorData {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::Int(v) => v.len(),
            TensorData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors raised when constructing a tensor.
#[derive(Debug, Error, PartialEq)]
pub enum TensorError {
    #[error("tensor data has {actual} element(s) but shape {shape:?} needs {expected}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("shape {shape:?} has more elements than can be addressed")]
    TooLarge { shape: Vec<usize> },

    #[error("element type {element_type} cannot hold {kind} data")]
    StorageMismatch {
        element_type: ElementType,
        kind: &'static str,
    },
}

/// A dense constant tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub element_type: ElementType,
    /// Dimensions; empty for a scalar.
    pub shape: Vec<usize>,
    pub data: TensorData,
}

impl Tensor {
    /// Create a tensor, checking that the data matches the shape and type.
    pub fn new(
        element_type: ElementType,
        shape: Vec<usize>,
        data: TensorData,
    ) -> Result<Self, TensorError> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| TensorError::TooLarge {
                shape: shape.clone(),
            })?;
        if data.len() != expected {
            return Err(TensorError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        match (&data, element_type.is_integer()) {
            (TensorData::Int(_), false) => {
                return Err(TensorError::StorageMismatch {
                    element_type,
                    kind: "integer",
                })
            }
            (TensorData::Float(_), true) => {
                return Err(TensorError::StorageMismatch {
                    element_type,
                    kind: "float",
                })
            }
            _ => {}
        }
        Ok(Self {
            element_type,
            shape,
            data,
        })
    }

    /// A 1-D `i64` tensor with the given values.
    pub fn int64_array(values: &[i64]) -> Self {
        Self {
            element_type: ElementType::I64,
            shape: vec![values.len()],
            data: TensorData::Int(values.to_vec()),
        }
    }

    /// A 0-D `i64` tensor.
    pub fn int64_scalar(value: i64) -> Self {
        Self {
            element_type: ElementType::I64,
            shape: Vec::new(),
            data: TensorData::Int(vec![value]),
        }
    }

    /// The 1-D tensor describing `dims`, typed as `element_type`.
    pub fn from_shape(dims: &[usize], element_type: ElementType) -> Self {
        Self {
            element_type,
            shape: vec![dims.len()],
            data: TensorData::Int(dims.iter().map(|&d| d as i64).collect()),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Integer view of the data, if the tensor holds integers.
    pub fn as_int_slice(&self) -> Option<&[i64]> {
        match &self.data {
            TensorData::Int(v) => Some(v),
            TensorData::Float(_) => None,
        }
    }

    /// Reinterpret the same data under a new shape with equal element count.
    pub fn reshaped(&self, shape: Vec<usize>) -> Result<Self, TensorError> {
        Self::new(self.element_type, shape, self.data.clone())
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.element_type, self.shape)?;
        match &self.data {
            TensorData::Int(v) => write!(f, "{v:?}"),
            TensorData::Float(v) => write!(f, "{v:?}"),
        }
    }
}
