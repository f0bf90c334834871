//! Structural content signatures for expressions and forms.
//!
//! A signature is a 64-bit hash of the canonical byte encoding of a tree.
//! Free and bound indices are renumbered by first occurrence during the
//! walk, so alpha-equivalent trees (identical up to index identity) share a
//! signature. Two expressions with equal signatures are treated as
//! semantically interchangeable throughout the crate, in particular by the
//! memoization cache.

use crate::expr::{Expr, ExprKind, Index, IndexBase, Terminal};
use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::Hasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature(u64);

impl Signature {
    pub(crate) fn from_u64(value: u64) -> Self {
        Signature(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Discriminant used as the primary sort key for commutative operands.
/// Constants sort before other terminals, terminals before operators.
pub(crate) fn type_code(expr: &Expr) -> u8 {
    match expr.kind() {
        ExprKind::Terminal(Terminal::Constant(_)) => 0,
        ExprKind::Terminal(Terminal::Zero) => 1,
        ExprKind::Terminal(Terminal::SpatialCoordinate(_)) => 2,
        ExprKind::Terminal(Terminal::FacetNormal(_)) => 3,
        ExprKind::Terminal(Terminal::Coefficient(_)) => 4,
        ExprKind::Terminal(Terminal::Argument(_)) => 5,
        ExprKind::Indexed(_, _) => 6,
        ExprKind::IndexSum(_, _, _) => 7,
        ExprKind::Power(_, _) => 8,
        ExprKind::Division(_, _) => 9,
        ExprKind::Product(_) => 10,
        ExprKind::Sum(_) => 11,
        ExprKind::Inner(_, _) => 12,
        ExprKind::Dot(_, _) => 13,
        ExprKind::Outer(_, _) => 14,
        ExprKind::Transposed(_) => 15,
        ExprKind::Trace(_) => 16,
        ExprKind::Sym(_) => 17,
        ExprKind::Skew(_) => 18,
        ExprKind::Cross(_, _) => 19,
        ExprKind::Math(_, _) => 20,
        ExprKind::Spatial(_, _) => 21,
        ExprKind::Restricted(_, _) => 22,
    }
}

/// Total order over expressions for canonical sorting of commutative
/// operands: primary key is the type code, then numeric order for
/// constants, then the signature.
///
/// The order deliberately does not depend on raw index ids, which would
/// destabilize the canonical form under renumbering.
pub(crate) fn canonical_cmp(a: &Expr, b: &Expr) -> Ordering {
    type_code(a)
        .cmp(&type_code(b))
        .then_with(|| match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => OrderedFloat(x).cmp(&OrderedFloat(y)),
            _ => Ordering::Equal,
        })
        .then_with(|| a.signature().cmp(&b.signature()))
}

struct SignatureHasher {
    hasher: FxHasher,
    index_numbers: FxHashMap<Index, u32>,
}

impl SignatureHasher {
    fn new() -> Self {
        Self {
            hasher: FxHasher::default(),
            index_numbers: FxHashMap::default(),
        }
    }

    fn write_u8(&mut self, value: u8) {
        self.hasher.write_u8(value);
    }

    fn write_usize(&mut self, value: usize) {
        self.hasher.write_usize(value);
    }

    fn write_str(&mut self, value: &str) {
        self.hasher.write_usize(value.len());
        self.hasher.write(value.as_bytes());
    }

    fn write_index(&mut self, index: Index) {
        let next = self.index_numbers.len() as u32;
        let number = *self.index_numbers.entry(index).or_insert(next);
        self.hasher.write_u32(number);
    }

    fn write_shape(&mut self, expr: &Expr) {
        let shape = expr.shape();
        self.write_usize(shape.rank());
        for dim in shape.dims() {
            self.write_usize(*dim);
        }
    }

    fn visit(&mut self, expr: &Expr) {
        self.write_u8(type_code(expr));
        match expr.kind() {
            ExprKind::Terminal(terminal) => {
                self.write_shape(expr);
                match terminal {
                    Terminal::Constant(value) => self.hasher.write_u64(value.to_bits()),
                    Terminal::Zero => {
                        // Shaped zeros also carry free indices.
                        for (index, dim) in expr.free_indices().entries() {
                            self.write_index(*index);
                            self.write_usize(*dim);
                        }
                    }
                    Terminal::SpatialCoordinate(dim) | Terminal::FacetNormal(dim) => {
                        self.write_usize(*dim)
                    }
                    Terminal::Coefficient(c) => {
                        self.write_str(c.name());
                        self.write_str(c.space().label());
                    }
                    Terminal::Argument(a) => {
                        self.write_usize(a.number());
                        self.write_u8(a.kind().discriminant());
                        self.write_str(a.kind().label());
                    }
                }
            }
            ExprKind::Indexed(base, indices) => {
                self.write_usize(indices.len());
                for index in indices {
                    match index {
                        IndexBase::Fixed(value) => {
                            self.write_u8(0);
                            self.write_usize(*value);
                        }
                        IndexBase::Free(index) => {
                            self.write_u8(1);
                            self.write_index(*index);
                        }
                    }
                }
                self.visit(base);
            }
            ExprKind::IndexSum(body, index, dim) => {
                self.write_index(*index);
                self.write_usize(*dim);
                self.visit(body);
            }
            ExprKind::Math(function, operand) => {
                self.write_str(function.name());
                self.visit(operand);
            }
            ExprKind::Spatial(kind, operand) => {
                self.write_str(kind.name());
                self.visit(operand);
            }
            ExprKind::Restricted(side, operand) => {
                self.write_str(side.symbol());
                self.visit(operand);
            }
            _ => {
                let operands = expr.operands();
                self.write_usize(operands.len());
                for operand in &operands {
                    self.visit(operand);
                }
            }
        }
    }
}

/// Computes the structural signature of an expression tree.
pub(crate) fn compute(expr: &Expr) -> Signature {
    let mut hasher = SignatureHasher::new();
    hasher.visit(expr);
    Signature(hasher.hasher.finish())
}
