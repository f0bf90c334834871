//! The normalizing rewrite pass.
//!
//! Canonicalization applies, bottom-up and to a fixed point: constant
//! folding, flattening of nested sums and products, elimination of additive
//! and multiplicative identities, zero propagation, and sorting of
//! commutative operands by the canonical expression order. Every rule is
//! size-non-increasing or order-normalizing, so the fixed-point loop
//! terminates, and canonicalizing an already canonical expression is a
//! no-op. Canonicalization never fails on validly constructed input.

use crate::cache;
use crate::expr::{Expr, ExprKind, Terminal};
use crate::form::{Form, Integral};
use crate::signature::canonical_cmp;
use rayon::prelude::*;

/// Canonicalizes an expression. Results are memoized in the global
/// signature cache.
pub fn canonicalize(expr: &Expr) -> Expr {
    let key = cache::canonical_key(expr);
    if let Some(hit) = cache::lookup(&key) {
        return hit;
    }
    let mut current = expr.clone();
    let mut passes = 0usize;
    loop {
        let next = rewrite(&current);
        passes += 1;
        if next.signature() == current.signature() {
            current = next;
            break;
        }
        current = next;
    }
    log::trace!("canonicalization reached a fixed point after {} passes", passes);
    cache::store(cache::canonical_key(&current), current.clone());
    cache::store(key, current.clone());
    current
}

/// One bottom-up rewrite pass.
fn rewrite(expr: &Expr) -> Expr {
    match expr.kind() {
        ExprKind::Terminal(Terminal::Constant(value)) if *value == 0.0 => expr.zero_like(),
        ExprKind::Terminal(_) => expr.clone(),
        ExprKind::Sum(operands) => rewrite_sum(expr, operands),
        ExprKind::Product(operands) => rewrite_product(expr, operands),
        ExprKind::Division(a, b) => {
            let a = rewrite(a);
            let b = rewrite(b);
            if a.is_zero() {
                return expr.zero_like();
            }
            match (a.as_constant(), b.as_constant()) {
                (Some(x), Some(y)) => Expr::constant(x / y),
                (_, Some(y)) if y == 1.0 => a,
                _ => expr.rebuilt(ExprKind::Division(a, b)),
            }
        }
        ExprKind::Power(a, b) => {
            let a = rewrite(a);
            let b = rewrite(b);
            match (a.as_constant(), b.as_constant()) {
                (Some(x), Some(y)) => Expr::constant(x.powf(y)),
                (_, Some(y)) if y == 1.0 => a,
                (_, Some(y)) if y == 0.0 => Expr::constant(1.0),
                _ => expr.rebuilt(ExprKind::Power(a, b)),
            }
        }
        ExprKind::Math(function, operand) => {
            let operand = rewrite(operand);
            match operand.as_constant() {
                Some(value) => Expr::constant(function.eval(value)),
                None => expr.rebuilt(ExprKind::Math(*function, operand)),
            }
        }
        ExprKind::Inner(a, b) => rewrite_binary(expr, a, b, ExprKind::Inner),
        ExprKind::Dot(a, b) => rewrite_binary(expr, a, b, ExprKind::Dot),
        ExprKind::Outer(a, b) => rewrite_binary(expr, a, b, ExprKind::Outer),
        ExprKind::Cross(a, b) => rewrite_binary(expr, a, b, ExprKind::Cross),
        ExprKind::Transposed(a) => {
            let a = rewrite(a);
            if a.is_zero() {
                return expr.zero_like();
            }
            // transpose(transpose(x)) = x
            if let ExprKind::Transposed(inner) = a.kind() {
                return inner.clone();
            }
            expr.rebuilt(ExprKind::Transposed(a))
        }
        ExprKind::Trace(a) => rewrite_unary(expr, a, ExprKind::Trace),
        ExprKind::Sym(a) => rewrite_unary(expr, a, ExprKind::Sym),
        ExprKind::Skew(a) => rewrite_unary(expr, a, ExprKind::Skew),
        ExprKind::Indexed(base, indices) => {
            let base = rewrite(base);
            if base.is_zero() {
                return expr.zero_like();
            }
            expr.rebuilt(ExprKind::Indexed(base, indices.clone()))
        }
        ExprKind::IndexSum(body, index, dim) => {
            let body = rewrite(body);
            if body.is_zero() {
                return expr.zero_like();
            }
            expr.rebuilt(ExprKind::IndexSum(body, *index, *dim))
        }
        ExprKind::Spatial(kind, operand) => {
            let operand = rewrite(operand);
            match operand.kind() {
                _ if operand.is_zero() => expr.zero_like(),
                ExprKind::Terminal(terminal) if terminal.is_spatially_constant() => {
                    expr.zero_like()
                }
                _ => expr.rebuilt(ExprKind::Spatial(*kind, operand)),
            }
        }
        ExprKind::Restricted(side, operand) => {
            let operand = rewrite(operand);
            if operand.is_zero() {
                return expr.zero_like();
            }
            expr.rebuilt(ExprKind::Restricted(*side, operand))
        }
    }
}

fn rewrite_unary(expr: &Expr, operand: &Expr, build: fn(Expr) -> ExprKind) -> Expr {
    let operand = rewrite(operand);
    if operand.is_zero() {
        expr.zero_like()
    } else {
        expr.rebuilt(build(operand))
    }
}

fn rewrite_binary(expr: &Expr, a: &Expr, b: &Expr, build: fn(Expr, Expr) -> ExprKind) -> Expr {
    let a = rewrite(a);
    let b = rewrite(b);
    if a.is_zero() || b.is_zero() {
        expr.zero_like()
    } else {
        expr.rebuilt(build(a, b))
    }
}

fn rewrite_sum(expr: &Expr, operands: &[Expr]) -> Expr {
    let mut flattened = Vec::with_capacity(operands.len());
    for operand in operands {
        let operand = rewrite(operand);
        match operand.kind() {
            ExprKind::Sum(nested) => flattened.extend(nested.iter().cloned()),
            _ => flattened.push(operand),
        }
    }

    let mut folded = 0.0;
    let mut kept = Vec::with_capacity(flattened.len());
    for operand in flattened {
        if operand.is_zero() {
            continue;
        }
        match operand.as_constant() {
            Some(value) => folded += value,
            None => kept.push(operand),
        }
    }
    if folded != 0.0 {
        kept.push(Expr::constant(folded));
    }

    kept.sort_by(canonical_cmp);
    match kept.len() {
        0 => expr.zero_like(),
        1 => kept.into_iter().next().expect("nonempty"),
        _ => expr.rebuilt(ExprKind::Sum(kept)),
    }
}

fn rewrite_product(expr: &Expr, operands: &[Expr]) -> Expr {
    let mut flattened = Vec::with_capacity(operands.len());
    for operand in operands {
        let operand = rewrite(operand);
        match operand.kind() {
            ExprKind::Product(nested) => flattened.extend(nested.iter().cloned()),
            _ => flattened.push(operand),
        }
    }

    if flattened.iter().any(|operand| operand.is_zero()) {
        return expr.zero_like();
    }

    let mut folded = 1.0;
    let mut kept = Vec::with_capacity(flattened.len());
    for operand in flattened {
        match operand.as_constant() {
            Some(value) => folded *= value,
            None => kept.push(operand),
        }
    }
    if folded == 0.0 {
        return expr.zero_like();
    }
    if kept.is_empty() {
        return Expr::constant(folded);
    }
    if folded != 1.0 {
        kept.push(Expr::constant(folded));
    }

    kept.sort_by(canonical_cmp);
    if kept.len() == 1 {
        kept.into_iter().next().expect("nonempty")
    } else {
        expr.rebuilt(ExprKind::Product(kept))
    }
}

/// Canonicalizes a form: integrands are canonicalized (in parallel), zero
/// integrals pruned, integrals sharing a measure merged, and the result
/// sorted by measure.
pub fn canonicalize_form(form: &Form) -> Form {
    let canonical: Vec<Integral> = form
        .integrals()
        .par_iter()
        .map(|integral| Integral::new(canonicalize(integral.integrand()), *integral.measure()))
        .collect();

    let mut kept: Vec<Integral> = canonical
        .into_iter()
        .filter(|integral| !integral.integrand().is_zero())
        .collect();
    kept.sort_by_key(|integral| *integral.measure());

    let mut merged: Vec<Integral> = Vec::new();
    for integral in kept {
        match merged.last_mut() {
            Some(last) if last.measure() == integral.measure() => {
                let sum = Expr::sum(vec![
                    last.integrand().clone(),
                    integral.integrand().clone(),
                ])
                .expect("Internal error: merging scalar integrands cannot fail");
                *last = Integral::new(canonicalize(&sum), *last.measure());
            }
            _ => merged.push(integral),
        }
    }
    // Merging opposite contributions can leave zero integrands behind.
    merged.retain(|integral| !integral.integrand().is_zero());

    Form::from_integrals_unchecked(merged)
}
