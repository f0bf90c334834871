//! Integrals and forms: the algebra that collects weighted integrands over
//! measures into a variational statement.

use crate::canonicalize::canonicalize_form;
use crate::error::FormError;
use crate::expr::{Argument, Coefficient, Expr, ExprKind, Shape, Terminal};
use crate::measure::{DomainKind, Measure};
use crate::signature::Signature;
use crate::testspace::{strong_residual, TestSpaceKind};
use rustc_hash::FxHasher;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

/// A single integrand paired with the measure it is integrated over.
///
/// Integrals are created by [`integrate`] (or the `Expr * Measure` sugar)
/// and owned exclusively by the [`Form`] containing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Integral {
    integrand: Expr,
    measure: Measure,
}

impl Integral {
    pub(crate) fn new(integrand: Expr, measure: Measure) -> Self {
        Self { integrand, measure }
    }

    pub fn integrand(&self) -> &Expr {
        &self.integrand
    }

    pub fn measure(&self) -> &Measure {
        &self.measure
    }
}

/// An ordered collection of integrals, closed under addition and scalar
/// multiplication.
///
/// The integral order is semantically irrelevant but kept stable so that
/// canonical output is reproducible.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Form {
    integrals: Vec<Integral>,
}

impl Form {
    /// Builds a form from integrals, validating the arity and test-space
    /// invariants.
    pub fn new(integrals: Vec<Integral>) -> Result<Form, FormError> {
        validate(&integrals)?;
        Ok(Form { integrals })
    }

    pub fn empty() -> Form {
        Form::default()
    }

    /// Bypasses validation for integrals derived from an already validated
    /// form.
    pub(crate) fn from_integrals_unchecked(integrals: Vec<Integral>) -> Form {
        Form { integrals }
    }

    pub fn integrals(&self) -> &[Integral] {
        &self.integrals
    }

    pub fn is_empty(&self) -> bool {
        self.integrals.is_empty()
    }

    /// The distinct arguments referenced by the form, ordered by number.
    pub fn arguments(&self) -> Vec<Arc<Argument>> {
        let mut arguments: Vec<Arc<Argument>> = Vec::new();
        for integral in &self.integrals {
            for (argument, _) in integral.integrand().argument_derivatives() {
                if !arguments.iter().any(|a| **a == **argument) {
                    arguments.push(argument.clone());
                }
            }
        }
        arguments.sort_by_key(|argument| argument.number());
        arguments
    }

    /// The distinct coefficients referenced by the form, ordered by name.
    /// These are the fields the form compiler must be supplied data for.
    pub fn coefficients(&self) -> Vec<Arc<Coefficient>> {
        let mut coefficients: Vec<Arc<Coefficient>> = Vec::new();
        for integral in &self.integrals {
            for node in integral.integrand().pre_order() {
                if let ExprKind::Terminal(Terminal::Coefficient(c)) = node.kind() {
                    if !coefficients.iter().any(|existing| **existing == **c) {
                        coefficients.push(c.clone());
                    }
                }
            }
        }
        coefficients.sort_by(|a, b| a.name().cmp(b.name()));
        coefficients
    }

    /// The arity of the form: the number of distinct argument numbers it
    /// references (0 for a functional, 1 for a linear form, 2 for a
    /// bilinear form).
    pub fn rank(&self) -> usize {
        let mut numbers: Vec<usize> = self
            .arguments()
            .iter()
            .map(|argument| argument.number())
            .collect();
        numbers.dedup();
        numbers.len()
    }

    /// The test space kind shared by all test arguments, if the form has
    /// any.
    pub fn test_space(&self) -> Option<TestSpaceKind> {
        self.arguments()
            .iter()
            .find(|argument| argument.is_test())
            .map(|argument| argument.kind().clone())
    }

    /// The canonicalized (frozen) form: integrands in normal form, zero
    /// integrals pruned, like-measure integrals merged, integrals sorted by
    /// measure.
    pub fn canonicalized(&self) -> Form {
        canonicalize_form(self)
    }

    /// A content signature of the form as currently represented. Stable
    /// under canonicalization of an already canonical form.
    pub fn signature(&self) -> Signature {
        let mut hasher = FxHasher::default();
        for integral in &self.integrals {
            hasher.write_u64(integral.integrand().signature().as_u64());
            integral.measure().hash(&mut hasher);
        }
        Signature::from_u64(hasher.finish())
    }

    /// Adds two forms, concatenating their integral lists. Fails if the
    /// combined form violates the arity or test-space invariants.
    pub fn try_add(&self, other: &Form) -> Result<Form, FormError> {
        let mut integrals = self.integrals.clone();
        integrals.extend(other.integrals.iter().cloned());
        Form::new(integrals)
    }

    /// Multiplies every integrand by a scalar.
    pub fn scaled(&self, scalar: f64) -> Form {
        let integrals = self
            .integrals
            .iter()
            .map(|integral| {
                let integrand =
                    Expr::product(vec![Expr::constant(scalar), integral.integrand().clone()])
                        .expect("Internal error: scaling a scalar integrand cannot fail");
                Integral::new(integrand, *integral.measure())
            })
            .collect();
        Form { integrals }
    }
}

fn validate(integrals: &[Integral]) -> Result<(), FormError> {
    let mut numbers: Vec<usize> = Vec::new();
    let mut test_kind: Option<TestSpaceKind> = None;
    for integral in integrals {
        for (argument, _) in integral.integrand().argument_derivatives() {
            if !numbers.contains(&argument.number()) {
                numbers.push(argument.number());
            }
            if argument.is_test() {
                match &test_kind {
                    None => test_kind = Some(argument.kind().clone()),
                    Some(kind) if kind.same_kind(argument.kind()) => {}
                    Some(kind) => {
                        return Err(FormError::MixedTestSpaceKind {
                            first: kind.label().to_string(),
                            second: argument.kind().label().to_string(),
                        })
                    }
                }
            }
        }
    }
    if numbers.len() > 2 {
        numbers.sort_unstable();
        return Err(FormError::ArityError { numbers });
    }
    Ok(())
}

/// Builds the form contribution of integrating `integrand` over `measure`,
/// resolving the pairing dictated by the integrand's test argument:
///
/// - with no test argument, or a basis-function test argument, this is a
///   single integral of the integrand over the measure;
/// - with a delta-functional test argument, the integrand is reduced to its
///   strong residual and one point-measure integral is emitted per
///   collocation point.
pub fn integrate(integrand: &Expr, measure: &Measure) -> Result<Form, FormError> {
    if !integrand.shape().is_scalar() {
        return Err(FormError::ShapeMismatch {
            operation: "integrate",
            expected: Shape::scalar(),
            found: integrand.shape().clone(),
        });
    }
    if !integrand.free_indices().is_empty() {
        return Err(FormError::FreeIndexMismatch {
            operation: "integrate",
        });
    }
    if integrand.contains_restriction() && measure.domain() != DomainKind::InteriorFacet {
        return Err(FormError::InvalidRestriction);
    }

    let mut test_argument: Option<Arc<Argument>> = None;
    for (argument, _) in integrand.argument_derivatives() {
        if argument.is_test() {
            match &test_argument {
                None => test_argument = Some(argument.clone()),
                Some(existing) if existing.kind().same_kind(argument.kind()) => {}
                Some(existing) => {
                    return Err(FormError::MixedTestSpaceKind {
                        first: existing.kind().label().to_string(),
                        second: argument.kind().label().to_string(),
                    })
                }
            }
        }
    }

    match test_argument {
        Some(argument) if matches!(argument.kind(), TestSpaceKind::DeltaFunctional(_)) => {
            let strong = strong_residual(integrand, &argument)?;
            Form::new(argument.kind().pair(&strong, measure)?)
        }
        _ => Form::new(vec![Integral::new(integrand.clone(), *measure)]),
    }
}

impl Display for Integral {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} }} * {}", self.integrand, self.measure)
    }
}

impl Display for Form {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.integrals.is_empty() {
            return write!(f, "<empty form>");
        }
        for (i, integral) in self.integrals.iter().enumerate() {
            if i > 0 {
                write!(f, "\n  + ")?;
            }
            write!(f, "{}", integral)?;
        }
        Ok(())
    }
}

// --- Operator sugar ---
//
// As for expressions, the operator impls panic on invariant violations;
// fallible call sites should use `integrate`, `try_add` and `scaled`.

impl Mul<Measure> for Expr {
    type Output = Form;

    /// # Panics
    ///
    /// Panics if the integrand is not an index-free scalar, or if pairing
    /// resolution fails (see [`integrate`]).
    fn mul(self, measure: Measure) -> Form {
        match integrate(&self, &measure) {
            Ok(form) => form,
            Err(error) => panic!("{}", error),
        }
    }
}

impl Add for Form {
    type Output = Form;

    /// # Panics
    ///
    /// Panics if the combined form violates the arity or test-space
    /// invariants.
    fn add(self, rhs: Form) -> Form {
        match self.try_add(&rhs) {
            Ok(form) => form,
            Err(error) => panic!("{}", error),
        }
    }
}

impl Sub for Form {
    type Output = Form;

    /// # Panics
    ///
    /// Panics if the combined form violates the arity or test-space
    /// invariants.
    fn sub(self, rhs: Form) -> Form {
        self + rhs.scaled(-1.0)
    }
}

impl Neg for Form {
    type Output = Form;

    fn neg(self) -> Form {
        self.scaled(-1.0)
    }
}

impl Mul<Form> for f64 {
    type Output = Form;

    fn mul(self, rhs: Form) -> Form {
        rhs.scaled(self)
    }
}

impl Mul<f64> for Form {
    type Output = Form;

    fn mul(self, rhs: f64) -> Form {
        self.scaled(rhs)
    }
}
