//! Symbolic differentiation: spatial derivatives and Gateaux (directional)
//! derivatives of expressions and forms.
//!
//! Spatial derivatives are pushed through sums and products at construction
//! time; compound tensor operators keep a symbolic derivative node for the
//! form compiler. The Gateaux derivative linearizes a residual form with
//! respect to a coefficient, introducing the trial argument (number 1) for
//! the perturbation direction.

use crate::cache;
use crate::error::FormError;
use crate::expr::{
    cos, dot, inner, ln, outer, sin, sqrt, tan, Coefficient, DerivativeKind, Expr, ExprKind,
    MathFunction, Shape, Terminal,
};
use crate::form::{Form, Integral};
use std::sync::Arc;

/// Verifies that applying `extra` more spatial derivatives does not exceed
/// the regularity declared by the test space of any test argument in the
/// subtree.
///
/// Only test arguments are bounded: derivatives of the trial slot (such as
/// the second derivatives a collocation Jacobian carries) are resolved by
/// the form compiler's tabulation, not by the pairing.
fn check_regularity(expr: &Expr, extra: usize) -> Result<(), FormError> {
    for (argument, order) in expr.argument_derivatives() {
        if !argument.is_test() {
            continue;
        }
        let supported = argument.kind().regularity_order();
        if order + extra > supported {
            return Err(FormError::UnsupportedDerivativeOrder {
                requested: order + extra,
                supported,
            });
        }
    }
    Ok(())
}

/// Multiplies a (possibly tensor-valued) expression by a gradient factor,
/// using an outer product when both are tensor-valued.
fn tensorize(rest: Expr, gradient: Expr) -> Result<Expr, FormError> {
    if rest.shape().is_scalar() || gradient.shape().is_scalar() {
        Expr::product(vec![rest, gradient])
    } else {
        outer(&rest, &gradient)
    }
}

/// The spatial gradient. Appends one axis of the geometric dimension to the
/// operand shape.
pub fn grad(expr: &Expr) -> Result<Expr, FormError> {
    let dim = expr
        .geometric_dimension()
        .ok_or(FormError::UnknownGeometricDimension { operation: "grad" })?;
    grad_with_dim(expr, dim)
}

/// Gradient with the geometric dimension threaded through the recursion, so
/// that spatially constant subexpressions (whose terminals cannot pin the
/// dimension down) still differentiate to correctly shaped zeros.
fn grad_with_dim(expr: &Expr, dim: usize) -> Result<Expr, FormError> {
    check_regularity(expr, 1)?;
    let result_shape = expr.shape().with_appended_axis(dim);

    match expr.kind() {
        ExprKind::Terminal(terminal) if terminal.is_spatially_constant() => Ok(Expr::zero_with(
            result_shape,
            expr.free_indices().clone(),
        )),
        ExprKind::Sum(operands) => {
            let gradients = operands
                .iter()
                .map(|operand| grad_with_dim(operand, dim))
                .collect::<Result<Vec<_>, _>>()?;
            Expr::sum(gradients)
        }
        ExprKind::Product(factors) if expr.free_indices().is_empty() => {
            // Product rule; all factors are scalar except at most one.
            let mut terms = Vec::new();
            for (i, factor) in factors.iter().enumerate() {
                let gradient = grad_with_dim(factor, dim)?;
                if gradient.is_zero() {
                    continue;
                }
                let others: Vec<Expr> = factors
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, f)| f.clone())
                    .collect();
                terms.push(tensorize(Expr::product(others)?, gradient)?);
            }
            if terms.is_empty() {
                Ok(Expr::zero(result_shape))
            } else {
                Expr::sum(terms)
            }
        }
        ExprKind::Division(a, b) => {
            // (b grad(a) - a grad(b)) / b^2
            let term1 = Expr::product(vec![b.clone(), grad_with_dim(a, dim)?])?;
            let term2 = Expr::product(vec![
                Expr::constant(-1.0),
                tensorize(a.clone(), grad_with_dim(b, dim)?)?,
            ])?;
            Expr::division(
                Expr::sum(vec![term1, term2])?,
                Expr::power(b.clone(), Expr::constant(2.0))?,
            )
        }
        ExprKind::Power(a, b) => {
            // a^b (ln(a) grad(b) + (b / a) grad(a))
            let term1 = Expr::product(vec![ln(a)?, grad_with_dim(b, dim)?])?;
            let term2 = Expr::product(vec![
                Expr::division(b.clone(), a.clone())?,
                grad_with_dim(a, dim)?,
            ])?;
            Expr::product(vec![expr.clone(), Expr::sum(vec![term1, term2])?])
        }
        ExprKind::Math(function, operand) if operand.free_indices().is_empty() => {
            let outer_derivative = math_derivative(*function, operand)?;
            Expr::product(vec![outer_derivative, grad_with_dim(operand, dim)?])
        }
        _ => Ok(Expr::new_node(
            ExprKind::Spatial(DerivativeKind::Grad, expr.clone()),
            result_shape,
            expr.free_indices().clone(),
        )),
    }
}

/// The divergence: contracts the last axis of the operand against the
/// spatial derivative.
pub fn div(expr: &Expr) -> Result<Expr, FormError> {
    check_regularity(expr, 1)?;
    let result_shape = expr
        .shape()
        .with_last_axis_dropped()
        .ok_or(FormError::ShapeMismatch {
            operation: "div",
            expected: Shape::vector(0),
            found: expr.shape().clone(),
        })?;

    match expr.kind() {
        ExprKind::Terminal(terminal) if terminal.is_spatially_constant() => Ok(Expr::zero_with(
            result_shape,
            expr.free_indices().clone(),
        )),
        ExprKind::Sum(operands) => {
            let divergences = operands
                .iter()
                .map(div)
                .collect::<Result<Vec<_>, _>>()?;
            Expr::sum(divergences)
        }
        ExprKind::Product(factors) if expr.free_indices().is_empty() => {
            // div(s F) = s div(F) + dot(F, grad(s)) with s the scalar part.
            let dim = expr
                .geometric_dimension()
                .ok_or(FormError::UnknownGeometricDimension { operation: "div" })?;
            let (tensors, scalars): (Vec<&Expr>, Vec<&Expr>) =
                factors.iter().partition(|f| !f.shape().is_scalar());
            debug_assert_eq!(tensors.len(), 1);
            let tensor: &Expr = tensors[0];
            let scalar_part = Expr::product(scalars.into_iter().cloned().collect())?;
            let term1 = Expr::product(vec![scalar_part.clone(), div(tensor)?])?;
            let gradient = grad_with_dim(&scalar_part, dim)?;
            if gradient.is_zero() {
                Ok(term1)
            } else {
                Expr::sum(vec![term1, dot(tensor, &gradient)?])
            }
        }
        _ => Ok(Expr::new_node(
            ExprKind::Spatial(DerivativeKind::Div, expr.clone()),
            result_shape,
            expr.free_indices().clone(),
        )),
    }
}

/// The curl of a vector field: a 3-vector in three dimensions, the scalar
/// rotation in two.
pub fn curl(expr: &Expr) -> Result<Expr, FormError> {
    check_regularity(expr, 1)?;
    let result_shape = match expr.shape().dims() {
        [3] => Shape::vector(3),
        [2] => Shape::scalar(),
        _ => {
            return Err(FormError::ShapeMismatch {
                operation: "curl",
                expected: Shape::vector(3),
                found: expr.shape().clone(),
            })
        }
    };

    match expr.kind() {
        ExprKind::Terminal(terminal) if terminal.is_spatially_constant() => Ok(Expr::zero_with(
            result_shape,
            expr.free_indices().clone(),
        )),
        ExprKind::Sum(operands) => {
            let curls = operands
                .iter()
                .map(curl)
                .collect::<Result<Vec<_>, _>>()?;
            Expr::sum(curls)
        }
        _ => Ok(Expr::new_node(
            ExprKind::Spatial(DerivativeKind::Curl, expr.clone()),
            result_shape,
            expr.free_indices().clone(),
        )),
    }
}

fn math_derivative(function: MathFunction, operand: &Expr) -> Result<Expr, FormError> {
    let u = operand.clone();
    match function {
        MathFunction::Sqrt => Expr::division(
            Expr::constant(1.0),
            Expr::product(vec![Expr::constant(2.0), sqrt(&u)?])?,
        ),
        MathFunction::Exp => crate::expr::exp(&u),
        MathFunction::Ln => Expr::division(Expr::constant(1.0), u),
        MathFunction::Sin => cos(&u),
        MathFunction::Cos => Expr::product(vec![Expr::constant(-1.0), sin(&u)?]),
        MathFunction::Tan => Expr::sum(vec![
            Expr::constant(1.0),
            Expr::power(tan(&u)?, Expr::constant(2.0))?,
        ]),
        MathFunction::Abs => Expr::division(u.clone(), crate::expr::abs(&u)?),
    }
}

/// The Gateaux derivative of a form with respect to a coefficient, in the
/// direction of a fresh trial argument over the coefficient's space. This is
/// the linearization used to build a Jacobian form for Newton iteration.
///
/// # Panics
///
/// Panics if `coefficient` is not a coefficient terminal.
pub fn derivative(form: &Form, coefficient: &Expr) -> Result<Form, FormError> {
    let c = expect_coefficient(coefficient);
    let direction = Expr::trial_function(c.space().clone());
    derivative_in_direction(form, coefficient, &direction)
}

/// The Gateaux derivative of a form in an explicit direction.
///
/// # Panics
///
/// Panics if `coefficient` is not a coefficient terminal.
pub fn derivative_in_direction(
    form: &Form,
    coefficient: &Expr,
    direction: &Expr,
) -> Result<Form, FormError> {
    let c = expect_coefficient(coefficient);
    if direction.shape() != &c.value_shape() {
        return Err(FormError::ShapeMismatch {
            operation: "derivative direction",
            expected: c.value_shape(),
            found: direction.shape().clone(),
        });
    }
    log::debug!(
        "differentiating form with {} integrals with respect to '{}'",
        form.integrals().len(),
        c.name()
    );
    let integrals = form
        .integrals()
        .iter()
        .map(|integral| {
            // The measure is carried over unchanged.
            Ok(Integral::new(
                gateaux(integral.integrand(), coefficient, direction)?,
                *integral.measure(),
            ))
        })
        .collect::<Result<Vec<_>, FormError>>()?;
    Form::new(integrals)
}

fn expect_coefficient(expr: &Expr) -> Arc<Coefficient> {
    match expr.kind() {
        ExprKind::Terminal(Terminal::Coefficient(c)) => c.clone(),
        _ => panic!("derivative target must be a coefficient terminal"),
    }
}

/// The Gateaux derivative of a single expression with respect to a
/// coefficient in a given direction.
///
/// # Panics
///
/// Panics if `coefficient` is not a coefficient terminal.
pub fn gateaux(expr: &Expr, coefficient: &Expr, direction: &Expr) -> Result<Expr, FormError> {
    let c = expect_coefficient(coefficient);
    gateaux_impl(expr, &c, direction)
}

fn gateaux_impl(
    expr: &Expr,
    coefficient: &Arc<Coefficient>,
    direction: &Expr,
) -> Result<Expr, FormError> {
    if !expr.references_coefficient(coefficient) {
        return Ok(expr.zero_like());
    }
    let key = cache::derivative_key(expr, coefficient, direction);
    if let Some(hit) = cache::lookup(&key) {
        return Ok(hit);
    }

    let result = match expr.kind() {
        ExprKind::Terminal(Terminal::Coefficient(c)) if c == coefficient => Ok(direction.clone()),
        // Any other terminal does not depend on the coefficient; unreachable
        // here because of the reference check above, but kept for clarity.
        ExprKind::Terminal(_) => Ok(expr.zero_like()),
        ExprKind::Sum(operands) => {
            let derivatives = operands
                .iter()
                .map(|operand| gateaux_impl(operand, coefficient, direction))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(expr.rebuilt(ExprKind::Sum(derivatives)))
        }
        ExprKind::Product(factors) => {
            // Product rule. Rebuilding in place keeps index contractions
            // introduced by the original constructor intact.
            let mut terms = Vec::new();
            for (i, factor) in factors.iter().enumerate() {
                if !factor.references_coefficient(coefficient) {
                    continue;
                }
                let mut replaced = factors.clone();
                replaced[i] = gateaux_impl(factor, coefficient, direction)?;
                terms.push(expr.rebuilt(ExprKind::Product(replaced)));
            }
            Ok(expr.rebuilt(ExprKind::Sum(terms)))
        }
        ExprKind::Division(a, b) => {
            // (b da - a db) / b^2
            let da = gateaux_impl(a, coefficient, direction)?;
            let db = gateaux_impl(b, coefficient, direction)?;
            let term1 = Expr::product(vec![b.clone(), da])?;
            let term2 = Expr::product(vec![Expr::constant(-1.0), a.clone(), db])?;
            Expr::division(
                Expr::sum(vec![term1, term2])?,
                Expr::power(b.clone(), Expr::constant(2.0))?,
            )
        }
        ExprKind::Power(a, b) => {
            let da = gateaux_impl(a, coefficient, direction)?;
            if let Some(exponent) = b.as_constant() {
                // d(a^n) = n a^(n-1) da
                Expr::product(vec![
                    b.clone(),
                    Expr::power(a.clone(), Expr::constant(exponent - 1.0))?,
                    da,
                ])
            } else {
                // d(a^b) = a^b (db ln(a) + b da / a)
                let db = gateaux_impl(b, coefficient, direction)?;
                let term1 = Expr::product(vec![db, ln(a)?])?;
                let term2 = Expr::division(Expr::product(vec![b.clone(), da])?, a.clone())?;
                Expr::product(vec![expr.clone(), Expr::sum(vec![term1, term2])?])
            }
        }
        ExprKind::Math(function, operand) => {
            let du = gateaux_impl(operand, coefficient, direction)?;
            let outer_derivative = math_derivative(*function, operand)?;
            if operand.free_indices().is_empty() {
                Expr::product(vec![outer_derivative, du])
            } else {
                // Componentwise chain rule: shares the operand's free
                // indices, so bypass the contracting constructor.
                Ok(Expr::new_node(
                    ExprKind::Product(vec![outer_derivative, du]),
                    Shape::scalar(),
                    operand.free_indices().clone(),
                ))
            }
        }
        ExprKind::Inner(a, b) => bilinear(expr, a, b, coefficient, direction, |x, y| inner(x, y)),
        ExprKind::Dot(a, b) => bilinear(expr, a, b, coefficient, direction, |x, y| dot(x, y)),
        ExprKind::Outer(a, b) => bilinear(expr, a, b, coefficient, direction, |x, y| outer(x, y)),
        ExprKind::Cross(a, b) => {
            bilinear(expr, a, b, coefficient, direction, |x, y| {
                crate::expr::cross(x, y)
            })
        }
        ExprKind::Transposed(a) => {
            crate::expr::transpose(&gateaux_impl(a, coefficient, direction)?)
        }
        ExprKind::Trace(a) => crate::expr::tr(&gateaux_impl(a, coefficient, direction)?),
        ExprKind::Sym(a) => crate::expr::sym(&gateaux_impl(a, coefficient, direction)?),
        ExprKind::Skew(a) => crate::expr::skew(&gateaux_impl(a, coefficient, direction)?),
        ExprKind::Indexed(base, indices) => {
            let dbase = gateaux_impl(base, coefficient, direction)?;
            Ok(expr.rebuilt(ExprKind::Indexed(dbase, indices.clone())))
        }
        ExprKind::IndexSum(body, index, dim) => {
            let dbody = gateaux_impl(body, coefficient, direction)?;
            Ok(expr.rebuilt(ExprKind::IndexSum(dbody, *index, *dim)))
        }
        ExprKind::Spatial(kind, operand) => {
            // Differentiation commutes with spatial derivatives.
            let du = gateaux_impl(operand, coefficient, direction)?;
            if du.is_zero() {
                Ok(expr.zero_like())
            } else {
                match kind {
                    DerivativeKind::Grad => grad(&du),
                    DerivativeKind::Div => div(&du),
                    DerivativeKind::Curl => curl(&du),
                }
            }
        }
        ExprKind::Restricted(side, operand) => {
            let du = gateaux_impl(operand, coefficient, direction)?;
            Ok(expr.rebuilt(ExprKind::Restricted(*side, du)))
        }
    }?;

    cache::store(key, result.clone());
    Ok(result)
}

fn bilinear(
    expr: &Expr,
    a: &Expr,
    b: &Expr,
    coefficient: &Arc<Coefficient>,
    direction: &Expr,
    rebuild: impl Fn(&Expr, &Expr) -> Result<Expr, FormError>,
) -> Result<Expr, FormError> {
    let mut terms = Vec::new();
    if a.references_coefficient(coefficient) {
        terms.push(rebuild(&gateaux_impl(a, coefficient, direction)?, b)?);
    }
    if b.references_coefficient(coefficient) {
        terms.push(rebuild(a, &gateaux_impl(b, coefficient, direction)?)?);
    }
    if terms.is_empty() {
        Ok(expr.zero_like())
    } else {
        Expr::sum(terms)
    }
}
