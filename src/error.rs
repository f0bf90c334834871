use crate::expr::Shape;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Library-wide error type.
///
/// Every error is raised at construction time of an expression, integral or
/// form; once a [`Form`](crate::form::Form) has been built, canonicalization
/// and compiler-interface queries cannot fail.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FormError {
    /// Operand shapes are incompatible for the attempted operation.
    ShapeMismatch {
        operation: &'static str,
        expected: Shape,
        found: Shape,
    },
    /// Free indices do not balance across operands, or an index occurs more
    /// than twice in a contraction.
    FreeIndexMismatch { operation: &'static str },
    /// A spatial derivative would exceed the regularity declared by an
    /// argument's test space.
    UnsupportedDerivativeOrder { requested: usize, supported: usize },
    /// The spatial dimension of an expression could not be deduced from its
    /// terminals, but the attempted operation needs it.
    UnknownGeometricDimension { operation: &'static str },
    /// A form referenced more than two distinct argument numbers.
    ArityError { numbers: Vec<usize> },
    /// A form mixed two different test space kinds under one argument number.
    MixedTestSpaceKind { first: String, second: String },
    /// A delta-functional pairing could not reduce the integrand to a
    /// pointwise residual: the integrand is not homogeneous-linear in the
    /// test argument, or depends on it through an unsupported operator.
    UnsupportedTestDependence,
    /// A restricted expression was integrated over a measure other than the
    /// interior-facet measure, or a restriction was applied twice.
    InvalidRestriction,
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch {
                operation,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Shape mismatch in {}: expected {}, found {}",
                    operation, expected, found
                )
            }
            Self::FreeIndexMismatch { operation } => {
                write!(f, "Free indices do not balance in {}", operation)
            }
            Self::UnsupportedDerivativeOrder { requested, supported } => {
                write!(
                    f,
                    "Derivative of order {} exceeds the declared regularity ({}) of a test space",
                    requested, supported
                )
            }
            Self::UnknownGeometricDimension { operation } => {
                write!(
                    f,
                    "Cannot determine the geometric dimension of the operand of {}",
                    operation
                )
            }
            Self::ArityError { numbers } => {
                write!(
                    f,
                    "Form references {} distinct argument numbers ({:?}); at most two (test, trial) are supported",
                    numbers.len(),
                    numbers
                )
            }
            Self::MixedTestSpaceKind { first, second } => {
                write!(
                    f,
                    "Form mixes test space kinds '{}' and '{}' under one argument number",
                    first, second
                )
            }
            Self::UnsupportedTestDependence => {
                write!(
                    f,
                    "Integrand cannot be reduced to a collocation residual: it must be \
                     homogeneous-linear in the test argument and depend on it only through \
                     products, inner products and spatial derivatives"
                )
            }
            Self::InvalidRestriction => {
                write!(
                    f,
                    "Restricted expressions are only valid under the interior facet measure, \
                     and a restriction cannot be applied twice"
                )
            }
        }
    }
}

impl std::error::Error for FormError {}
