use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// The algebraic shape of an expression: its tensor rank and per-axis
/// dimensions.
///
/// A scalar has rank 0, a vector in $d$ dimensions has shape `[d]`, a
/// second-order tensor has shape `[d, d]` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn scalar() -> Self {
        Shape(Vec::new())
    }

    pub fn vector(dim: usize) -> Self {
        Shape(vec![dim])
    }

    pub fn tensor(rows: usize, cols: usize) -> Self {
        Shape(vec![rows, cols])
    }

    pub fn from_dims(dims: &[usize]) -> Self {
        Shape(dims.to_vec())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// The shape obtained by appending one axis of dimension `dim`,
    /// as produced by taking a gradient in `dim` spatial dimensions.
    pub fn with_appended_axis(&self, dim: usize) -> Self {
        let mut dims = self.0.clone();
        dims.push(dim);
        Shape(dims)
    }

    /// The shape obtained by dropping the last axis, as produced by a
    /// divergence. Returns `None` for scalars.
    pub fn with_last_axis_dropped(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Shape(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn last_dim(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn first_dim(&self) -> Option<usize> {
        self.0.first().copied()
    }

    /// The shape of `outer(a, b)`: concatenated axes.
    pub fn outer(&self, other: &Shape) -> Shape {
        let mut dims = self.0.clone();
        dims.extend_from_slice(&other.0);
        Shape(dims)
    }

    /// The shape of `dot(a, b)`: contract the last axis of `a` against the
    /// first axis of `b`. Returns `None` if the contracted dimensions differ
    /// or either operand is scalar.
    pub fn dot(&self, other: &Shape) -> Option<Shape> {
        let k = self.last_dim()?;
        if other.first_dim()? != k {
            return None;
        }
        let mut dims = self.0[..self.0.len() - 1].to_vec();
        dims.extend_from_slice(&other.0[1..]);
        Some(Shape(dims))
    }

    pub fn transposed(&self) -> Option<Shape> {
        match self.0.as_slice() {
            [m, n] => Some(Shape(vec![*n, *m])),
            _ => None,
        }
    }

    pub fn is_square_tensor(&self) -> bool {
        matches!(self.0.as_slice(), [m, n] if m == n)
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            write!(f, "scalar")
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}
