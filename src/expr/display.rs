//! Human-readable rendering of expressions.
//!
//! The notation follows the usual weak-form conventions: arguments render as
//! `v_0`, `v_1`, coefficients by name, and compound operators by their DSL
//! names, so canonicalized output is directly comparable in snapshots.

use crate::expr::{Expr, ExprKind, IndexBase, Terminal};
use itertools::Itertools;
use std::fmt;
use std::fmt::{Display, Formatter};

fn parenthesized(expr: &Expr) -> String {
    match expr.kind() {
        ExprKind::Sum(_) => format!("({})", expr),
        _ => format!("{}", expr),
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Terminal(terminal) => match terminal {
                Terminal::Coefficient(c) => write!(f, "{}", c.name()),
                Terminal::Argument(a) => write!(f, "{}", a),
                Terminal::Constant(value) => write!(f, "{}", value),
                Terminal::Zero => write!(f, "0"),
                Terminal::SpatialCoordinate(_) => write!(f, "x"),
                Terminal::FacetNormal(_) => write!(f, "n"),
            },
            ExprKind::Sum(operands) => {
                write!(f, "{}", operands.iter().map(|e| e.to_string()).join(" + "))
            }
            ExprKind::Product(operands) => {
                write!(f, "{}", operands.iter().map(parenthesized).join(" * "))
            }
            ExprKind::Division(a, b) => write!(f, "{} / {}", parenthesized(a), parenthesized(b)),
            ExprKind::Power(a, b) => write!(f, "{}^{}", parenthesized(a), parenthesized(b)),
            ExprKind::Inner(a, b) => write!(f, "inner({}, {})", a, b),
            ExprKind::Dot(a, b) => write!(f, "dot({}, {})", a, b),
            ExprKind::Outer(a, b) => write!(f, "outer({}, {})", a, b),
            ExprKind::Transposed(a) => write!(f, "transpose({})", a),
            ExprKind::Trace(a) => write!(f, "tr({})", a),
            ExprKind::Sym(a) => write!(f, "sym({})", a),
            ExprKind::Skew(a) => write!(f, "skew({})", a),
            ExprKind::Cross(a, b) => write!(f, "cross({}, {})", a, b),
            ExprKind::Math(function, a) => write!(f, "{}({})", function.name(), a),
            ExprKind::Indexed(base, indices) => {
                write!(
                    f,
                    "{}[{}]",
                    parenthesized(base),
                    indices.iter().map(index_label).join(", ")
                )
            }
            ExprKind::IndexSum(body, index, _) => write!(f, "sum_{{{}}} {}", index, body),
            ExprKind::Spatial(kind, a) => write!(f, "{}({})", kind.name(), a),
            ExprKind::Restricted(side, a) => write!(f, "{}('{}')", parenthesized(a), side.symbol()),
        }
    }
}

fn index_label(index: &IndexBase) -> String {
    index.to_string()
}
