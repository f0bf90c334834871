use crate::signature::{self, Signature};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::OnceLock;

mod display;
mod index;
mod ops;
mod shape;
mod terminal;
mod visit;

pub use index::{FreeIndices, Index, IndexBase};
pub use ops::{
    abs, avg, cos, cross, dot, exp, inner, jump, ln, minus, outer, plus, sin, skew, sqrt, sym,
    tan, tr, transpose,
};
pub use shape::Shape;
pub use terminal::{Argument, Coefficient, Terminal};
pub use visit::PreOrder;

use crate::testspace::TestSpaceKind;

/// Scalar math functions applied pointwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    Sqrt,
    Exp,
    Ln,
    Sin,
    Cos,
    Tan,
    Abs,
}

impl MathFunction {
    pub fn name(&self) -> &'static str {
        match self {
            MathFunction::Sqrt => "sqrt",
            MathFunction::Exp => "exp",
            MathFunction::Ln => "ln",
            MathFunction::Sin => "sin",
            MathFunction::Cos => "cos",
            MathFunction::Tan => "tan",
            MathFunction::Abs => "abs",
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        match self {
            MathFunction::Sqrt => x.sqrt(),
            MathFunction::Exp => x.exp(),
            MathFunction::Ln => x.ln(),
            MathFunction::Sin => x.sin(),
            MathFunction::Cos => x.cos(),
            MathFunction::Tan => x.tan(),
            MathFunction::Abs => x.abs(),
        }
    }
}

/// Spatial differential operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivativeKind {
    Grad,
    Div,
    Curl,
}

impl DerivativeKind {
    pub fn name(&self) -> &'static str {
        match self {
            DerivativeKind::Grad => "grad",
            DerivativeKind::Div => "div",
            DerivativeKind::Curl => "curl",
        }
    }
}

/// Facet side of a restriction on interior facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Plus,
    Minus,
}

impl Side {
    pub fn symbol(&self) -> &'static str {
        match self {
            Side::Plus => "+",
            Side::Minus => "-",
        }
    }
}

/// The closed operator vocabulary of the language.
///
/// Nodes are only ever built through the checked constructors on [`Expr`],
/// which validate shapes and free indices, so a constructed tree is always
/// well formed.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Terminal(Terminal),
    /// n-ary sum; operands share shape and free indices.
    Sum(Vec<Expr>),
    /// n-ary product of scalar operands (at most one operand may be
    /// tensor-valued); repeated free indices are contracted by the
    /// constructor, which wraps the product in [`ExprKind::IndexSum`].
    Product(Vec<Expr>),
    /// Numerator of any shape divided by an index-free scalar.
    Division(Expr, Expr),
    /// Scalar base raised to an index-free scalar exponent.
    Power(Expr, Expr),
    /// Full contraction of two equally shaped operands.
    Inner(Expr, Expr),
    /// Contraction of the last axis of the left operand against the first
    /// axis of the right operand.
    Dot(Expr, Expr),
    /// Tensor product: shapes concatenate.
    Outer(Expr, Expr),
    Transposed(Expr),
    Trace(Expr),
    Sym(Expr),
    Skew(Expr),
    Cross(Expr, Expr),
    Math(MathFunction, Expr),
    /// Component access: base indexed by a multi-index of fixed and free
    /// positions.
    Indexed(Expr, Vec<IndexBase>),
    /// Implicit-summation binder: sums the body over one free index of the
    /// given dimension.
    IndexSum(Expr, Index, usize),
    Spatial(DerivativeKind, Expr),
    Restricted(Side, Expr),
}

#[derive(Debug)]
pub(crate) struct ExprData {
    kind: ExprKind,
    shape: Shape,
    free_indices: FreeIndices,
    /// Distinct arguments referenced by the subtree, each with the maximum
    /// spatial-derivative order applied to any of its occurrences.
    arg_derivs: Vec<(Arc<Argument>, usize)>,
    signature: OnceLock<Signature>,
}

/// An immutable node in an expression tree.
///
/// `Expr` is a cheap-to-clone handle over shared, immutable node data;
/// structural sharing of subtrees is safe and expected.
#[derive(Clone)]
pub struct Expr(pub(crate) Arc<ExprData>);

impl Expr {
    /// Builds a node, deriving the argument-derivative cache from the
    /// operands. Callers are responsible for shape and index validation.
    pub(crate) fn new_node(kind: ExprKind, shape: Shape, free_indices: FreeIndices) -> Expr {
        let mut arg_derivs: Vec<(Arc<Argument>, usize)> = Vec::new();
        let mut merge = |argument: &Arc<Argument>, order: usize| {
            match arg_derivs.iter_mut().find(|(a, _)| **a == **argument) {
                Some((_, existing)) => *existing = (*existing).max(order),
                None => arg_derivs.push((argument.clone(), order)),
            }
        };
        let increment = matches!(kind, ExprKind::Spatial(_, _)) as usize;
        match &kind {
            ExprKind::Terminal(Terminal::Argument(argument)) => merge(argument, 0),
            ExprKind::Terminal(_) => {}
            _ => {
                for child in kind_operands(&kind) {
                    for (argument, order) in &child.0.arg_derivs {
                        merge(argument, order + increment);
                    }
                }
            }
        }
        Expr(Arc::new(ExprData {
            kind,
            shape,
            free_indices,
            arg_derivs,
            signature: OnceLock::new(),
        }))
    }

    /// Rebuilds a node with new children while keeping this node's shape and
    /// free indices. Used by canonicalization, whose rewrites preserve both.
    pub(crate) fn rebuilt(&self, kind: ExprKind) -> Expr {
        Expr::new_node(kind, self.shape().clone(), self.free_indices().clone())
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }

    pub fn free_indices(&self) -> &FreeIndices {
        &self.0.free_indices
    }

    /// Distinct arguments in the subtree, each paired with the maximum
    /// spatial-derivative order applied to it.
    pub fn argument_derivatives(&self) -> &[(Arc<Argument>, usize)] {
        &self.0.arg_derivs
    }

    /// The operands of this node, in order. Empty for terminals.
    pub fn operands(&self) -> Vec<Expr> {
        kind_operands(&self.0.kind).cloned().collect()
    }

    /// The structural signature of this tree; computed lazily and cached on
    /// the node.
    pub fn signature(&self) -> Signature {
        *self.0.signature.get_or_init(|| signature::compute(self))
    }

    /// Semantic equality: signature equality after canonicalization.
    ///
    /// Structural equality ([`PartialEq`]) distinguishes `a + b` from
    /// `b + a`; this does not.
    pub fn equivalent(&self, other: &Expr) -> bool {
        crate::canonicalize::canonicalize(self).signature()
            == crate::canonicalize::canonicalize(other).signature()
    }

    pub fn is_zero(&self) -> bool {
        match &self.0.kind {
            ExprKind::Terminal(Terminal::Zero) => true,
            ExprKind::Terminal(Terminal::Constant(value)) => *value == 0.0,
            _ => false,
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match &self.0.kind {
            ExprKind::Terminal(Terminal::Constant(value)) => Some(*value),
            ExprKind::Terminal(Terminal::Zero) if self.0.shape.is_scalar() => Some(0.0),
            _ => None,
        }
    }

    /// The zero expression with the same shape and free indices as `self`.
    pub fn zero_like(&self) -> Expr {
        Expr::new_node(
            ExprKind::Terminal(Terminal::Zero),
            self.0.shape.clone(),
            self.0.free_indices.clone(),
        )
    }

    /// The geometric dimension of the expression, deduced from the first
    /// terminal that pins it down.
    pub fn geometric_dimension(&self) -> Option<usize> {
        self.pre_order().find_map(|node| match node.kind() {
            ExprKind::Terminal(terminal) => terminal.geometric_dimension(),
            _ => None,
        })
    }

    /// Whether the subtree references the given coefficient.
    pub fn references_coefficient(&self, coefficient: &Coefficient) -> bool {
        self.pre_order().any(|node| {
            matches!(node.kind(), ExprKind::Terminal(Terminal::Coefficient(c)) if **c == *coefficient)
        })
    }

    /// Whether the subtree references the given argument.
    pub fn references_argument(&self, argument: &Argument) -> bool {
        self.0.arg_derivs.iter().any(|(a, _)| **a == *argument)
    }

    /// Whether any subexpression is a restriction to a facet side.
    pub fn contains_restriction(&self) -> bool {
        self.pre_order()
            .any(|node| matches!(node.kind(), ExprKind::Restricted(_, _)))
    }

    // --- Terminal constructors ---

    pub fn constant(value: f64) -> Expr {
        Expr::new_node(
            ExprKind::Terminal(Terminal::Constant(value)),
            Shape::scalar(),
            FreeIndices::empty(),
        )
    }

    pub fn zero(shape: Shape) -> Expr {
        Expr::new_node(
            ExprKind::Terminal(Terminal::Zero),
            shape,
            FreeIndices::empty(),
        )
    }

    pub(crate) fn zero_with(shape: Shape, free_indices: FreeIndices) -> Expr {
        Expr::new_node(ExprKind::Terminal(Terminal::Zero), shape, free_indices)
    }

    pub fn coefficient(
        name: impl Into<String>,
        space: Arc<dyn vfl_traits::ElementDescriptor>,
    ) -> Expr {
        let coefficient = Coefficient::new(name, space);
        let shape = coefficient.value_shape();
        Expr::new_node(
            ExprKind::Terminal(Terminal::Coefficient(Arc::new(coefficient))),
            shape,
            FreeIndices::empty(),
        )
    }

    pub fn argument(number: usize, kind: TestSpaceKind) -> Expr {
        let argument = Argument::new(number, kind);
        let shape = argument.value_shape();
        Expr::new_node(
            ExprKind::Terminal(Terminal::Argument(Arc::new(argument))),
            shape,
            FreeIndices::empty(),
        )
    }

    /// The test slot (argument number 0) over a basis-function space.
    pub fn test_function(space: Arc<dyn vfl_traits::ElementDescriptor>) -> Expr {
        Expr::argument(0, TestSpaceKind::BasisFunction(space))
    }

    /// The test slot (argument number 0) over a collocation point set.
    pub fn collocation_test_function(set: Arc<dyn vfl_traits::CollocationSet>) -> Expr {
        Expr::argument(0, TestSpaceKind::DeltaFunctional(set))
    }

    /// The trial slot (argument number 1) over a basis-function space.
    pub fn trial_function(space: Arc<dyn vfl_traits::ElementDescriptor>) -> Expr {
        Expr::argument(1, TestSpaceKind::BasisFunction(space))
    }

    pub fn spatial_coordinate(dim: usize) -> Expr {
        Expr::new_node(
            ExprKind::Terminal(Terminal::SpatialCoordinate(dim)),
            Shape::vector(dim),
            FreeIndices::empty(),
        )
    }

    pub fn facet_normal(dim: usize) -> Expr {
        Expr::new_node(
            ExprKind::Terminal(Terminal::FacetNormal(dim)),
            Shape::vector(dim),
            FreeIndices::empty(),
        )
    }
}

fn kind_operands(kind: &ExprKind) -> impl Iterator<Item = &Expr> {
    // Boxing keeps the match arms uniform; traversal is not hot enough for
    // this to matter.
    let operands: Box<dyn Iterator<Item = &Expr>> = match kind {
        ExprKind::Terminal(_) => Box::new(std::iter::empty()),
        ExprKind::Sum(operands) | ExprKind::Product(operands) => Box::new(operands.iter()),
        ExprKind::Division(a, b)
        | ExprKind::Power(a, b)
        | ExprKind::Inner(a, b)
        | ExprKind::Dot(a, b)
        | ExprKind::Outer(a, b)
        | ExprKind::Cross(a, b) => Box::new([a, b].into_iter()),
        ExprKind::Transposed(a)
        | ExprKind::Trace(a)
        | ExprKind::Sym(a)
        | ExprKind::Skew(a)
        | ExprKind::Math(_, a)
        | ExprKind::Indexed(a, _)
        | ExprKind::IndexSum(a, _, _)
        | ExprKind::Spatial(_, a)
        | ExprKind::Restricted(_, a) => Box::new(std::iter::once(a)),
    };
    operands
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.shape == other.0.shape
                && self.0.free_indices == other.0.free_indices
                && self.0.kind == other.0.kind)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.signature().as_u64());
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({})", self)
    }
}
