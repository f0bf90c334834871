use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub use nalgebra;

/// Sobolev regularity class of a function space.
///
/// Determines how many spatial derivatives of an argument drawn from the
/// space are admissible in a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sobolev {
    L2,
    H1,
    H2,
    HDiv,
    HCurl,
}

impl Sobolev {
    /// The number of spatial derivatives supported by members of the space.
    pub fn derivative_order(&self) -> usize {
        match self {
            Sobolev::L2 => 0,
            Sobolev::H1 => 1,
            Sobolev::H2 => 2,
            // Only specific first-order differential operators are bounded
            // on these spaces, but we do not track directionality here.
            Sobolev::HDiv | Sobolev::HCurl => 1,
        }
    }
}

/// Descriptor of a finite element (or extended-stencil) basis.
///
/// The symbolic core never tabulates basis functions; it stores descriptors
/// and hands them through to the form compiler unchanged. The `label` must
/// be a stable identifier: two descriptors with equal labels are treated as
/// the same space for equality, hashing and signatures.
pub trait ElementDescriptor: Debug + Send + Sync {
    fn label(&self) -> &str;

    fn geometric_dimension(&self) -> usize;

    /// Shape of values taken by functions in the space (empty for scalars).
    fn value_shape(&self) -> &[usize];

    fn sobolev(&self) -> Sobolev;
}

/// Descriptor of a collocation point set for delta-functional testing.
///
/// As with [`ElementDescriptor`], the point geometry is opaque to the
/// symbolic core and is passed through to the form compiler unchanged.
pub trait CollocationSet: Debug + Send + Sync {
    fn label(&self) -> &str;

    fn geometric_dimension(&self) -> usize;

    fn num_points(&self) -> usize;

    /// Collocation point coordinates, one vector per point.
    fn points(&self) -> &[DVector<f64>];

    /// The number of spatial derivatives a delta pairing may transfer onto
    /// the trial side by integration by parts.
    fn transfer_order(&self) -> usize {
        2
    }
}
