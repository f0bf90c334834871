//! Checked constructors for the expression algebra, and the `std::ops`
//! sugar layered on top of them.

use crate::error::FormError;
use crate::expr::{Expr, ExprKind, FreeIndices, Index, IndexBase, MathFunction, Shape, Side};
use itertools::Itertools;
use std::ops::{Add, Div, Mul, Neg, Sub};

impl Expr {
    /// n-ary sum. All operands must share shape and free indices.
    pub fn sum(operands: Vec<Expr>) -> Result<Expr, FormError> {
        let first = operands.first().ok_or(FormError::ShapeMismatch {
            operation: "sum",
            expected: Shape::scalar(),
            found: Shape::scalar(),
        })?;
        let shape = first.shape().clone();
        let free = first.free_indices().clone();
        for operand in &operands[1..] {
            if operand.shape() != &shape {
                return Err(FormError::ShapeMismatch {
                    operation: "sum",
                    expected: shape,
                    found: operand.shape().clone(),
                });
            }
            if operand.free_indices() != &free {
                return Err(FormError::FreeIndexMismatch { operation: "sum" });
            }
        }
        if operands.len() == 1 {
            return Ok(operands.into_iter().next().expect("nonempty"));
        }
        Ok(Expr::new_node(ExprKind::Sum(operands), shape, free))
    }

    /// n-ary product. At most one operand may be tensor-valued; a free index
    /// shared by exactly two operands is contracted (Einstein convention) by
    /// wrapping the product in an index sum.
    pub fn product(operands: Vec<Expr>) -> Result<Expr, FormError> {
        if operands.is_empty() {
            return Ok(Expr::constant(1.0));
        }
        let mut shape = Shape::scalar();
        for operand in &operands {
            if !operand.shape().is_scalar() {
                if !shape.is_scalar() {
                    return Err(FormError::ShapeMismatch {
                        operation: "product",
                        expected: Shape::scalar(),
                        found: operand.shape().clone(),
                    });
                }
                shape = operand.shape().clone();
            }
        }

        // Count occurrences of each free index across operands. Once free,
        // twice contracted, more than twice is an error.
        let mut counts: Vec<(Index, usize, usize)> = Vec::new();
        for operand in &operands {
            for (index, dim) in operand.free_indices().entries() {
                match counts.iter_mut().find(|(i, _, _)| i == index) {
                    Some((_, _, count)) => *count += 1,
                    None => counts.push((*index, *dim, 1)),
                }
            }
        }
        if counts.iter().any(|(_, _, count)| *count > 2) {
            return Err(FormError::FreeIndexMismatch { operation: "product" });
        }
        let free = FreeIndices::from_entries(
            counts.iter().map(|(index, dim, _)| (*index, *dim)).collect(),
        );
        let repeated = counts
            .iter()
            .filter(|(_, _, count)| *count == 2)
            .map(|(index, dim, _)| (*index, *dim))
            .sorted_by_key(|(index, _)| *index)
            .collect_vec();

        let mut expr = if operands.len() == 1 {
            operands.into_iter().next().expect("nonempty")
        } else {
            Expr::new_node(ExprKind::Product(operands), shape, free)
        };
        for (index, dim) in repeated {
            expr = Expr::index_sum(expr, index, dim)?;
        }
        Ok(expr)
    }

    /// Division by an index-free scalar.
    pub fn division(numerator: Expr, denominator: Expr) -> Result<Expr, FormError> {
        if !denominator.shape().is_scalar() {
            return Err(FormError::ShapeMismatch {
                operation: "division",
                expected: Shape::scalar(),
                found: denominator.shape().clone(),
            });
        }
        if !denominator.free_indices().is_empty() {
            return Err(FormError::FreeIndexMismatch {
                operation: "division",
            });
        }
        let shape = numerator.shape().clone();
        let free = numerator.free_indices().clone();
        Ok(Expr::new_node(
            ExprKind::Division(numerator, denominator),
            shape,
            free,
        ))
    }

    /// Scalar power with an index-free exponent.
    pub fn power(base: Expr, exponent: Expr) -> Result<Expr, FormError> {
        for (operand, name) in [(&base, "power base"), (&exponent, "power exponent")] {
            if !operand.shape().is_scalar() {
                return Err(FormError::ShapeMismatch {
                    operation: name,
                    expected: Shape::scalar(),
                    found: operand.shape().clone(),
                });
            }
        }
        if !base.free_indices().is_empty() || !exponent.free_indices().is_empty() {
            return Err(FormError::FreeIndexMismatch { operation: "power" });
        }
        Ok(Expr::new_node(
            ExprKind::Power(base, exponent),
            Shape::scalar(),
            FreeIndices::empty(),
        ))
    }

    /// Component access by a multi-index. Fixed positions must be in range;
    /// a free index repeated within the multi-index, or shared with the base,
    /// is contracted.
    pub fn indexed(base: Expr, indices: Vec<IndexBase>) -> Result<Expr, FormError> {
        if base.shape().rank() != indices.len() {
            return Err(FormError::ShapeMismatch {
                operation: "indexed",
                expected: base.shape().clone(),
                found: Shape::from_dims(&vec![0; indices.len()]),
            });
        }
        let dims = base.shape().dims().to_vec();
        for (position, index) in indices.iter().enumerate() {
            if let IndexBase::Fixed(value) = index {
                if *value >= dims[position] {
                    return Err(FormError::ShapeMismatch {
                        operation: "indexed",
                        expected: base.shape().clone(),
                        found: Shape::vector(*value + 1),
                    });
                }
            }
        }

        let mut counts: Vec<(Index, usize, usize)> = base
            .free_indices()
            .entries()
            .iter()
            .map(|(index, dim)| (*index, *dim, 1))
            .collect();
        for (position, index) in indices.iter().enumerate() {
            if let IndexBase::Free(index) = index {
                match counts.iter_mut().find(|(i, _, _)| i == index) {
                    Some((_, dim, count)) => {
                        if *dim != dims[position] {
                            return Err(FormError::FreeIndexMismatch {
                                operation: "indexed",
                            });
                        }
                        *count += 1;
                    }
                    None => counts.push((*index, dims[position], 1)),
                }
            }
        }
        if counts.iter().any(|(_, _, count)| *count > 2) {
            return Err(FormError::FreeIndexMismatch {
                operation: "indexed",
            });
        }
        let free = FreeIndices::from_entries(
            counts.iter().map(|(index, dim, _)| (*index, *dim)).collect(),
        );
        let repeated = counts
            .iter()
            .filter(|(_, _, count)| *count == 2)
            .map(|(index, dim, _)| (*index, *dim))
            .sorted_by_key(|(index, _)| *index)
            .collect_vec();

        let mut expr = Expr::new_node(ExprKind::Indexed(base, indices), Shape::scalar(), free);
        for (index, dim) in repeated {
            expr = Expr::index_sum(expr, index, dim)?;
        }
        Ok(expr)
    }

    /// Explicitly binds a free index of the body, summing over its range.
    pub fn index_sum(body: Expr, index: Index, dim: usize) -> Result<Expr, FormError> {
        if body.free_indices().dimension_of(index) != Some(dim) {
            return Err(FormError::FreeIndexMismatch {
                operation: "index sum",
            });
        }
        let shape = body.shape().clone();
        let free = body.free_indices().without(index);
        Ok(Expr::new_node(
            ExprKind::IndexSum(body, index, dim),
            shape,
            free,
        ))
    }

    /// Restricts an expression to one side of an interior facet.
    pub fn restricted(side: Side, operand: Expr) -> Result<Expr, FormError> {
        if operand.contains_restriction() {
            return Err(FormError::InvalidRestriction);
        }
        let shape = operand.shape().clone();
        let free = operand.free_indices().clone();
        Ok(Expr::new_node(
            ExprKind::Restricted(side, operand),
            shape,
            free,
        ))
    }
}

fn require_index_free(operands: &[&Expr], operation: &'static str) -> Result<(), FormError> {
    if operands.iter().any(|e| !e.free_indices().is_empty()) {
        Err(FormError::FreeIndexMismatch { operation })
    } else {
        Ok(())
    }
}

/// Full contraction of two equally shaped expressions. Scalar operands
/// degenerate to an ordinary product.
pub fn inner(a: &Expr, b: &Expr) -> Result<Expr, FormError> {
    require_index_free(&[a, b], "inner")?;
    if a.shape() != b.shape() {
        return Err(FormError::ShapeMismatch {
            operation: "inner",
            expected: a.shape().clone(),
            found: b.shape().clone(),
        });
    }
    if a.shape().is_scalar() {
        return Expr::product(vec![a.clone(), b.clone()]);
    }
    Ok(Expr::new_node(
        ExprKind::Inner(a.clone(), b.clone()),
        Shape::scalar(),
        FreeIndices::empty(),
    ))
}

/// Contraction of the last axis of `a` against the first axis of `b`.
pub fn dot(a: &Expr, b: &Expr) -> Result<Expr, FormError> {
    require_index_free(&[a, b], "dot")?;
    let shape = a.shape().dot(b.shape()).ok_or(FormError::ShapeMismatch {
        operation: "dot",
        expected: a.shape().clone(),
        found: b.shape().clone(),
    })?;
    Ok(Expr::new_node(
        ExprKind::Dot(a.clone(), b.clone()),
        shape,
        FreeIndices::empty(),
    ))
}

/// Tensor product of two expressions; shapes concatenate.
pub fn outer(a: &Expr, b: &Expr) -> Result<Expr, FormError> {
    require_index_free(&[a, b], "outer")?;
    if a.shape().is_scalar() || b.shape().is_scalar() {
        // Degenerate outer products are plain scalar multiples.
        return Expr::product(vec![a.clone(), b.clone()]);
    }
    let shape = a.shape().outer(b.shape());
    Ok(Expr::new_node(
        ExprKind::Outer(a.clone(), b.clone()),
        shape,
        FreeIndices::empty(),
    ))
}

pub fn transpose(a: &Expr) -> Result<Expr, FormError> {
    require_index_free(&[a], "transpose")?;
    let shape = a.shape().transposed().ok_or(FormError::ShapeMismatch {
        operation: "transpose",
        expected: Shape::tensor(0, 0),
        found: a.shape().clone(),
    })?;
    Ok(Expr::new_node(
        ExprKind::Transposed(a.clone()),
        shape,
        FreeIndices::empty(),
    ))
}

/// Trace of a square second-order tensor.
pub fn tr(a: &Expr) -> Result<Expr, FormError> {
    require_index_free(&[a], "trace")?;
    if !a.shape().is_square_tensor() {
        return Err(FormError::ShapeMismatch {
            operation: "trace",
            expected: Shape::tensor(0, 0),
            found: a.shape().clone(),
        });
    }
    Ok(Expr::new_node(
        ExprKind::Trace(a.clone()),
        Shape::scalar(),
        FreeIndices::empty(),
    ))
}

fn square_tensor_op(
    a: &Expr,
    operation: &'static str,
    build: impl FnOnce(Expr) -> ExprKind,
) -> Result<Expr, FormError> {
    require_index_free(&[a], operation)?;
    if !a.shape().is_square_tensor() {
        return Err(FormError::ShapeMismatch {
            operation,
            expected: Shape::tensor(0, 0),
            found: a.shape().clone(),
        });
    }
    let shape = a.shape().clone();
    Ok(Expr::new_node(build(a.clone()), shape, FreeIndices::empty()))
}

/// Symmetric part of a square second-order tensor.
pub fn sym(a: &Expr) -> Result<Expr, FormError> {
    square_tensor_op(a, "sym", ExprKind::Sym)
}

/// Skew-symmetric part of a square second-order tensor.
pub fn skew(a: &Expr) -> Result<Expr, FormError> {
    square_tensor_op(a, "skew", ExprKind::Skew)
}

/// Cross product of two 3-vectors.
pub fn cross(a: &Expr, b: &Expr) -> Result<Expr, FormError> {
    require_index_free(&[a, b], "cross")?;
    if a.shape() != &Shape::vector(3) || b.shape() != &Shape::vector(3) {
        return Err(FormError::ShapeMismatch {
            operation: "cross",
            expected: Shape::vector(3),
            found: if a.shape() == &Shape::vector(3) {
                b.shape().clone()
            } else {
                a.shape().clone()
            },
        });
    }
    Ok(Expr::new_node(
        ExprKind::Cross(a.clone(), b.clone()),
        Shape::vector(3),
        FreeIndices::empty(),
    ))
}

pub(crate) fn math(function: MathFunction, operand: &Expr) -> Result<Expr, FormError> {
    if !operand.shape().is_scalar() {
        return Err(FormError::ShapeMismatch {
            operation: function.name(),
            expected: Shape::scalar(),
            found: operand.shape().clone(),
        });
    }
    let free = operand.free_indices().clone();
    Ok(Expr::new_node(
        ExprKind::Math(function, operand.clone()),
        Shape::scalar(),
        free,
    ))
}

pub fn sqrt(operand: &Expr) -> Result<Expr, FormError> {
    math(MathFunction::Sqrt, operand)
}

pub fn exp(operand: &Expr) -> Result<Expr, FormError> {
    math(MathFunction::Exp, operand)
}

pub fn ln(operand: &Expr) -> Result<Expr, FormError> {
    math(MathFunction::Ln, operand)
}

pub fn sin(operand: &Expr) -> Result<Expr, FormError> {
    math(MathFunction::Sin, operand)
}

pub fn cos(operand: &Expr) -> Result<Expr, FormError> {
    math(MathFunction::Cos, operand)
}

pub fn tan(operand: &Expr) -> Result<Expr, FormError> {
    math(MathFunction::Tan, operand)
}

pub fn abs(operand: &Expr) -> Result<Expr, FormError> {
    math(MathFunction::Abs, operand)
}

/// Restriction of `e` to the `+` side of an interior facet.
pub fn plus(e: &Expr) -> Result<Expr, FormError> {
    Expr::restricted(Side::Plus, e.clone())
}

/// Restriction of `e` to the `-` side of an interior facet.
pub fn minus(e: &Expr) -> Result<Expr, FormError> {
    Expr::restricted(Side::Minus, e.clone())
}

/// Jump of `e` across an interior facet: `e('+') - e('-')`.
pub fn jump(e: &Expr) -> Result<Expr, FormError> {
    let p = plus(e)?;
    let m = minus(e)?;
    Expr::sum(vec![p, Expr::product(vec![Expr::constant(-1.0), m])?])
}

/// Average of `e` across an interior facet: `(e('+') + e('-')) / 2`.
pub fn avg(e: &Expr) -> Result<Expr, FormError> {
    let half = Expr::constant(0.5);
    let total = Expr::sum(vec![plus(e)?, minus(e)?])?;
    Expr::product(vec![half, total])
}

// --- Operator sugar ---
//
// The operator impls delegate to the checked constructors above and panic on
// misuse, the same trade-off nalgebra makes for dimension mismatches in
// matrix arithmetic. Fallible call sites should use the constructors
// directly.

fn expect_valid(result: Result<Expr, FormError>) -> Expr {
    match result {
        Ok(expr) => expr,
        Err(error) => panic!("{}", error),
    }
}

impl Add for Expr {
    type Output = Expr;

    /// # Panics
    ///
    /// Panics if operand shapes or free indices are incompatible.
    fn add(self, rhs: Expr) -> Expr {
        expect_valid(Expr::sum(vec![self, rhs]))
    }
}

impl Sub for Expr {
    type Output = Expr;

    /// # Panics
    ///
    /// Panics if operand shapes or free indices are incompatible.
    fn sub(self, rhs: Expr) -> Expr {
        let negated = expect_valid(Expr::product(vec![Expr::constant(-1.0), rhs]));
        expect_valid(Expr::sum(vec![self, negated]))
    }
}

impl Mul for Expr {
    type Output = Expr;

    /// # Panics
    ///
    /// Panics if both operands are tensor-valued or an index occurs more
    /// than twice.
    fn mul(self, rhs: Expr) -> Expr {
        expect_valid(Expr::product(vec![self, rhs]))
    }
}

impl Div for Expr {
    type Output = Expr;

    /// # Panics
    ///
    /// Panics if the denominator is not an index-free scalar.
    fn div(self, rhs: Expr) -> Expr {
        expect_valid(Expr::division(self, rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        expect_valid(Expr::product(vec![Expr::constant(-1.0), self]))
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        expect_valid(Expr::product(vec![Expr::constant(self), rhs]))
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;

    fn mul(self, rhs: f64) -> Expr {
        expect_valid(Expr::product(vec![self, Expr::constant(rhs)]))
    }
}

impl Div<f64> for Expr {
    type Output = Expr;

    fn div(self, rhs: f64) -> Expr {
        expect_valid(Expr::division(self, Expr::constant(rhs)))
    }
}

impl Add<f64> for Expr {
    type Output = Expr;

    /// # Panics
    ///
    /// Panics if `self` is not an index-free scalar.
    fn add(self, rhs: f64) -> Expr {
        expect_valid(Expr::sum(vec![self, Expr::constant(rhs)]))
    }
}

impl Sub<f64> for Expr {
    type Output = Expr;

    /// # Panics
    ///
    /// Panics if `self` is not an index-free scalar.
    fn sub(self, rhs: f64) -> Expr {
        expect_valid(Expr::sum(vec![self, Expr::constant(-rhs)]))
    }
}
