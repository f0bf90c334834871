//! The generalized test space abstraction.
//!
//! A variational statement pairs a trial-side expression with a test object.
//! For Galerkin-type methods the test object is a basis function and pairing
//! means integration; for generalized finite difference methods it is a
//! Dirac delta functional and pairing means point evaluation. Both are
//! variants of [`TestSpaceKind`] exposing one capability contract, so form
//! algebra and canonicalization never branch on the discretization family.
//! A new family is added by introducing a new variant and extending the
//! exhaustive matches here.

use crate::derivative::div;
use crate::error::FormError;
use crate::expr::{Argument, Expr, ExprKind, Shape, Terminal};
use crate::form::Integral;
use crate::measure::Measure;
use std::sync::Arc;
use vfl_traits::{CollocationSet, ElementDescriptor};

/// The kind of test object an [`Argument`] is paired through.
#[derive(Debug, Clone)]
pub enum TestSpaceKind {
    /// Pairing integrates the expression against a basis function drawn from
    /// the described space; tabulation is deferred to the form compiler.
    BasisFunction(Arc<dyn ElementDescriptor>),
    /// Pairing evaluates the expression at each point of the described
    /// collocation set.
    DeltaFunctional(Arc<dyn CollocationSet>),
}

impl TestSpaceKind {
    /// Stable identifier of the underlying descriptor.
    pub fn label(&self) -> &str {
        match self {
            TestSpaceKind::BasisFunction(space) => space.label(),
            TestSpaceKind::DeltaFunctional(set) => set.label(),
        }
    }

    pub(crate) fn discriminant(&self) -> u8 {
        match self {
            TestSpaceKind::BasisFunction(_) => 0,
            TestSpaceKind::DeltaFunctional(_) => 1,
        }
    }

    /// Whether two kinds are the same variant over the same descriptor.
    pub fn same_kind(&self, other: &TestSpaceKind) -> bool {
        self.discriminant() == other.discriminant() && self.label() == other.label()
    }

    /// Shape of values taken by the test object. Delta functionals act on
    /// scalar quantities.
    pub fn value_shape(&self) -> Shape {
        match self {
            TestSpaceKind::BasisFunction(space) => Shape::from_dims(space.value_shape()),
            TestSpaceKind::DeltaFunctional(_) => Shape::scalar(),
        }
    }

    pub fn geometric_dimension(&self) -> Option<usize> {
        match self {
            TestSpaceKind::BasisFunction(space) => Some(space.geometric_dimension()),
            TestSpaceKind::DeltaFunctional(set) => Some(set.geometric_dimension()),
        }
    }

    /// The minimum continuity the paired expression must satisfy: the number
    /// of spatial derivatives that may be applied to an argument over this
    /// kind. For basis functions this is the Sobolev order of the element;
    /// for delta functionals it is the number of derivatives the pairing may
    /// transfer onto the trial side by integration by parts.
    pub fn regularity_order(&self) -> usize {
        match self {
            TestSpaceKind::BasisFunction(space) => space.sobolev().derivative_order(),
            TestSpaceKind::DeltaFunctional(set) => set.transfer_order(),
        }
    }

    /// Whether an expression has the right shape to be paired with this test
    /// object.
    pub fn shape_compatible(&self, expr: &Expr) -> bool {
        expr.shape() == &self.value_shape() && expr.free_indices().is_empty()
    }

    /// Pairs a trial-side expression (which must not itself reference the
    /// test slot) with this test object over the given measure.
    ///
    /// For basis functions this yields a single integral of the expression
    /// times the test argument; for delta functionals it yields one
    /// point-measure integral per collocation point, tagged with the point
    /// index, whose integrand the form compiler must evaluate rather than
    /// integrate. The test argument remains a factor of the integrand in
    /// both cases, so the form keeps its arity and its test-space descriptor
    /// after pairing.
    pub fn pair(&self, expr: &Expr, measure: &Measure) -> Result<Vec<Integral>, FormError> {
        if !self.shape_compatible(expr) {
            return Err(FormError::ShapeMismatch {
                operation: "pair",
                expected: self.value_shape(),
                found: expr.shape().clone(),
            });
        }
        let test = Expr::argument(0, self.clone());
        match self {
            TestSpaceKind::BasisFunction(_) => {
                let integrand = if expr.shape().is_scalar() {
                    Expr::product(vec![expr.clone(), test])?
                } else {
                    crate::expr::inner(expr, &test)?
                };
                Ok(vec![Integral::new(integrand, *measure)])
            }
            TestSpaceKind::DeltaFunctional(set) => {
                let integrand = Expr::product(vec![expr.clone(), test])?;
                Ok((0..set.num_points())
                    .map(|point| Integral::new(integrand.clone(), Measure::point(point as u32)))
                    .collect())
            }
        }
    }
}

/// Reduces an integrand that is homogeneous-linear in the test argument to
/// its strong (pointwise) residual, eliminating derivatives of the test
/// argument by integration by parts: each transfer rewrites
/// `inner(A, grad(X))` to `-inner(div(A), X)` and drops the boundary term,
/// which is what collocating the strong form means.
pub(crate) fn strong_residual(integrand: &Expr, test: &Argument) -> Result<Expr, FormError> {
    match integrand.kind() {
        ExprKind::Sum(operands) => {
            let reduced = operands
                .iter()
                .map(|operand| strong_term(operand, test))
                .collect::<Result<Vec<_>, _>>()?;
            Expr::sum(reduced)
        }
        _ => strong_term(integrand, test),
    }
}

fn strong_term(term: &Expr, test: &Argument) -> Result<Expr, FormError> {
    if !term.references_argument(test) {
        // A residual term without the test function has no pairing meaning.
        return Err(FormError::UnsupportedTestDependence);
    }
    match term.kind() {
        ExprKind::Terminal(Terminal::Argument(argument)) if **argument == *test => {
            Ok(Expr::constant(1.0))
        }
        ExprKind::Product(factors) => {
            let (carriers, others): (Vec<&Expr>, Vec<&Expr>) = factors
                .iter()
                .partition(|factor| factor.references_argument(test));
            if carriers.len() != 1 {
                return Err(FormError::UnsupportedTestDependence);
            }
            let mut operands: Vec<Expr> = others.into_iter().cloned().collect();
            operands.push(strong_term(carriers[0], test)?);
            Expr::product(operands)
        }
        ExprKind::Division(numerator, denominator) => {
            if denominator.references_argument(test) {
                return Err(FormError::UnsupportedTestDependence);
            }
            Expr::division(strong_term(numerator, test)?, denominator.clone())
        }
        ExprKind::Inner(a, b) => {
            let (data, carrier) = match (a.references_argument(test), b.references_argument(test))
            {
                (false, true) => (a, b),
                (true, false) => (b, a),
                _ => return Err(FormError::UnsupportedTestDependence),
            };
            transfer_derivatives(data, carrier, test)
        }
        _ => Err(FormError::UnsupportedTestDependence),
    }
}

/// Reduces `inner(data, carrier)` where `carrier` contains the test
/// argument under zero or more gradients.
fn transfer_derivatives(data: &Expr, carrier: &Expr, test: &Argument) -> Result<Expr, FormError> {
    match carrier.kind() {
        ExprKind::Spatial(crate::expr::DerivativeKind::Grad, operand) => {
            let transferred = div(data)?;
            let reduced = match operand.kind() {
                ExprKind::Terminal(Terminal::Argument(argument))
                    if **argument == *test && operand.shape().is_scalar() =>
                {
                    // inner(div(A), v) with scalar v is div(A) * v; the test
                    // factor evaluates to the point value.
                    transferred
                }
                _ => transfer_derivatives(&transferred, operand, test)?,
            };
            Expr::product(vec![Expr::constant(-1.0), reduced])
        }
        _ => Err(FormError::UnsupportedTestDependence),
    }
}
