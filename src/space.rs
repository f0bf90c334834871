//! Reference descriptor implementations.
//!
//! The symbolic core only ever sees descriptors through the opaque traits
//! in `vfl-traits`; these two implementations cover the common cases and
//! are what the test suite builds spaces from. Real providers (element
//! libraries, meshfree point generators) implement the same traits.

use nalgebra::DVector;
use std::sync::Arc;
use vfl_traits::{CollocationSet, ElementDescriptor, Sobolev};

/// A Lagrange element descriptor of a given polynomial degree.
#[derive(Debug, Clone)]
pub struct LagrangeElement {
    label: String,
    dim: usize,
    degree: usize,
    value_shape: Vec<usize>,
}

impl LagrangeElement {
    /// A scalar-valued Lagrange element in `dim` spatial dimensions.
    pub fn scalar(degree: usize, dim: usize) -> Arc<Self> {
        Arc::new(Self {
            label: format!("Lagrange{}_{}d", degree, dim),
            dim,
            degree,
            value_shape: Vec::new(),
        })
    }

    /// A vector-valued Lagrange element with one component per spatial
    /// dimension.
    pub fn vector(degree: usize, dim: usize) -> Arc<Self> {
        Arc::new(Self {
            label: format!("VectorLagrange{}_{}d", degree, dim),
            dim,
            degree,
            value_shape: vec![dim],
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl ElementDescriptor for LagrangeElement {
    fn label(&self) -> &str {
        &self.label
    }

    fn geometric_dimension(&self) -> usize {
        self.dim
    }

    fn value_shape(&self) -> &[usize] {
        &self.value_shape
    }

    fn sobolev(&self) -> Sobolev {
        Sobolev::H1
    }
}

/// An explicit set of collocation points.
#[derive(Debug, Clone)]
pub struct PointCloud {
    label: String,
    dim: usize,
    points: Vec<DVector<f64>>,
    transfer_order: usize,
}

impl PointCloud {
    /// # Panics
    ///
    /// Panics if `points` is empty or the points disagree in dimension.
    pub fn new(label: impl Into<String>, points: Vec<DVector<f64>>) -> Arc<Self> {
        let dim = points.first().map(|p| p.len()).expect("point set must be nonempty");
        assert!(
            points.iter().all(|p| p.len() == dim),
            "collocation points must share a dimension"
        );
        Arc::new(Self {
            label: label.into(),
            dim,
            points,
            transfer_order: 2,
        })
    }

    pub fn with_transfer_order(mut self: Arc<Self>, order: usize) -> Arc<Self> {
        Arc::make_mut(&mut self).transfer_order = order;
        self
    }
}

impl CollocationSet for PointCloud {
    fn label(&self) -> &str {
        &self.label
    }

    fn geometric_dimension(&self) -> usize {
        self.dim
    }

    fn num_points(&self) -> usize {
        self.points.len()
    }

    fn points(&self) -> &[DVector<f64>] {
        &self.points
    }

    fn transfer_order(&self) -> usize {
        self.transfer_order
    }
}
