//! Dense `f64` tensors with a nested-list JSON form.
//!
//! A [`Tensor`] stores its elements flattened in row-major order together
//! with its shape. On the wire it is the usual nested-list representation
//! (`[1.0, 2.0]`, `[[1.0, 2.0], [3.0, 4.0]]`, or a bare number for a
//! scalar), so remote peers can treat it as an ordinary array.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors produced when constructing a [`Tensor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    /// The number of elements does not match the product of the shape.
    ShapeMismatch { shape: Vec<usize>, len: usize },
    /// Nested lists of unequal length (or mixed scalars and lists).
    Ragged,
}

impl fmt::Display for TensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorError::ShapeMismatch { shape, len } => {
                write!(f, "shape {shape:?} does not hold {len} elements")
            }
            TensorError::Ragged => write!(f, "ragged nested list cannot form a tensor"),
        }
    }
}

impl std::error::Error for TensorError {}

/// Row-major `f64` tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    /// Builds a tensor from a shape and its row-major elements.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, TensorError> {
        if element_count(&shape) != Some(data.len()) {
            return Err(TensorError::ShapeMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional tensor over `data`.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Zero-dimensional tensor holding a single value.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Elements in row-major iteration order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends the little-endian IEEE-754 bytes of every element, in
    /// row-major order, to `out`.
    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(self.data.len() * 8);
        for value in &self.data {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Product of the dimensions, or `None` if it does not fit in `usize`.
fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

impl From<Vec<f64>> for Tensor {
    fn from(data: Vec<f64>) -> Self {
        Tensor::from_vec(data)
    }
}

/// Wire representation: arbitrarily nested lists of numbers.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Nested {
    Scalar(f64),
    List(Vec<Nested>),
}

impl Nested {
    fn build(shape: &[usize], data: &[f64]) -> Nested {
        match shape.split_first() {
            None => Nested::Scalar(data.first().copied().unwrap_or_default()),
            Some((&dim, rest)) => {
                let stride: usize = rest.iter().product();
                let items = (0..dim)
                    .map(|i| Nested::build(rest, &data[i * stride..(i + 1) * stride]))
                    .collect();
                Nested::List(items)
            }
        }
    }

    /// Infers the shape from the first element along each axis.
    fn infer_shape(&self) -> Vec<usize> {
        let mut shape = Vec::new();
        let mut cursor = self;
        while let Nested::List(items) = cursor {
            shape.push(items.len());
            match items.first() {
                Some(first) => cursor = first,
                None => break,
            }
        }
        shape
    }

    fn flatten_into(&self, shape: &[usize], out: &mut Vec<f64>) -> Result<(), TensorError> {
        match (self, shape.split_first()) {
            (Nested::Scalar(v), None) => {
                out.push(*v);
                Ok(())
            }
            (Nested::List(items), Some((&dim, rest))) if items.len() == dim => {
                for item in items {
                    item.flatten_into(rest, out)?;
                }
                Ok(())
            }
            _ => Err(TensorError::Ragged),
        }
    }
}

impl Serialize for Tensor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Nested::build(&self.shape, &self.data).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tensor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let nested = Nested::deserialize(deserializer)?;
        let shape = nested.infer_shape();
        // The inferred shape only follows the first element of each axis and
        // is untrusted until `flatten_into` has walked every element.
        let mut data = Vec::new();
        nested
            .flatten_into(&shape, &mut data)
            .map_err(D::Error::custom)?;
        Ok(Tensor { shape, data })
    }
}
