use crate::expr::Expr;

/// Depth-first pre-order traversal over an expression tree.
///
/// Shared subtrees are visited once per occurrence; the trees built by this
/// crate are small enough that revisiting shared nodes is cheaper than
/// tracking visited signatures.
pub struct PreOrder {
    stack: Vec<Expr>,
}

impl Iterator for PreOrder {
    type Item = Expr;

    fn next(&mut self) -> Option<Expr> {
        let node = self.stack.pop()?;
        let mut operands = node.operands();
        // Reversed so that operands pop in their natural order.
        operands.reverse();
        self.stack.extend(operands);
        Some(node)
    }
}

impl Expr {
    pub fn pre_order(&self) -> PreOrder {
        PreOrder {
            stack: vec![self.clone()],
        }
    }
}
