use crate::expr::Shape;
use crate::testspace::TestSpaceKind;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use vfl_traits::ElementDescriptor;

/// A known or unknown field of the PDE, drawn from a function space.
///
/// Coefficients are identified by name: two coefficients with the same name
/// over the same space are the same symbol.
#[derive(Debug, Clone)]
pub struct Coefficient {
    name: String,
    space: Arc<dyn ElementDescriptor>,
}

impl Coefficient {
    pub fn new(name: impl Into<String>, space: Arc<dyn ElementDescriptor>) -> Self {
        Self {
            name: name.into(),
            space,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn space(&self) -> &Arc<dyn ElementDescriptor> {
        &self.space
    }

    pub fn value_shape(&self) -> Shape {
        Shape::from_dims(self.space.value_shape())
    }
}

impl PartialEq for Coefficient {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.space.label() == other.space.label()
    }
}

impl Eq for Coefficient {}

impl Hash for Coefficient {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.space.label().hash(state);
    }
}

/// A test or trial slot of a form.
///
/// By convention number 0 is the test slot and number 1 the trial slot. Each
/// argument carries the [`TestSpaceKind`] it is paired through.
#[derive(Debug, Clone)]
pub struct Argument {
    number: usize,
    kind: TestSpaceKind,
}

impl Argument {
    pub fn new(number: usize, kind: TestSpaceKind) -> Self {
        Self { number, kind }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn kind(&self) -> &TestSpaceKind {
        &self.kind
    }

    pub fn is_test(&self) -> bool {
        self.number == 0
    }

    pub fn value_shape(&self) -> Shape {
        self.kind.value_shape()
    }
}

impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.kind.same_kind(&other.kind)
    }
}

impl Eq for Argument {}

impl Hash for Argument {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
        self.kind.discriminant().hash(state);
        self.kind.label().hash(state);
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v_{}", self.number)
    }
}

/// A leaf of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Coefficient(Arc<Coefficient>),
    Argument(Arc<Argument>),
    /// A scalar literal.
    Constant(f64),
    /// The shaped zero. Its shape and free indices live on the enclosing
    /// expression node so that differentiation can produce well-formed zeros
    /// inside indexed sums.
    Zero,
    /// The coordinate vector `x`; the payload is the geometric dimension.
    SpatialCoordinate(usize),
    /// The outward unit facet normal `n`; the payload is the geometric
    /// dimension.
    FacetNormal(usize),
}

impl Terminal {
    /// Whether the terminal is constant over space, so that its spatial
    /// derivative is identically zero.
    pub fn is_spatially_constant(&self) -> bool {
        matches!(self, Terminal::Constant(_) | Terminal::Zero)
    }

    pub fn geometric_dimension(&self) -> Option<usize> {
        match self {
            Terminal::Coefficient(c) => Some(c.space().geometric_dimension()),
            Terminal::Argument(a) => a.kind().geometric_dimension(),
            Terminal::SpatialCoordinate(dim) | Terminal::FacetNormal(dim) => Some(*dim),
            Terminal::Constant(_) | Terminal::Zero => None,
        }
    }
}

impl Eq for Terminal {}

impl Hash for Terminal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Terminal::Coefficient(c) => c.hash(state),
            Terminal::Argument(a) => a.hash(state),
            Terminal::Constant(value) => value.to_bits().hash(state),
            Terminal::Zero => {}
            Terminal::SpatialCoordinate(dim) | Terminal::FacetNormal(dim) => dim.hash(state),
        }
    }
}
