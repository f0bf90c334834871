//! `vfl` is a symbolic language for declaring the weak (variational) form
//! of partial differential equations, designed so that one symbolic
//! specification can drive code generation for several discretization
//! families.
//!
//! The distinguishing feature is that the *test function* of a variational
//! statement is polymorphic over the discretization: for finite element
//! methods it is a basis function and pairing means integration, while for
//! generalized finite difference (collocation) methods it is a Dirac delta
//! functional and pairing means point evaluation. Both are variants of
//! [`TestSpaceKind`] behind one capability contract, so the surrounding
//! expression algebra, differentiation and canonicalization are shared.
//!
//! A scalar Poisson residual looks the same in either family:
//!
//! ```
//! use vfl::space::LagrangeElement;
//! use vfl::{dx, grad, inner, Expr};
//!
//! let space = LagrangeElement::scalar(1, 2);
//! let u = Expr::coefficient("u", space.clone());
//! let v = Expr::test_function(space.clone());
//! let f = Expr::coefficient("f", space);
//!
//! let residual = inner(&grad(&u).unwrap(), &grad(&v).unwrap()).unwrap() * dx()
//!     - f * v * dx();
//! let jacobian = vfl::derivative(&residual, &u).unwrap();
//! assert_eq!(jacobian.canonicalized().rank(), 2);
//! ```
//!
//! The engine is a pure, side-effect-free transformation pipeline: all
//! expressions and forms are immutable once constructed and safely shared
//! across threads. The only process-wide mutable state is the signature
//! cache, which memoizes canonicalization and differentiation and may be
//! cleared with [`clear_cache`] between independent compilations.

pub mod cache;
pub mod canonicalize;
pub mod compiler;
pub mod derivative;
pub mod error;
pub mod expr;
pub mod form;
pub mod measure;
pub mod signature;
pub mod space;
pub mod testspace;

pub mod traits {
    pub use vfl_traits::*;
}

pub use cache::clear_cache;
pub use canonicalize::{canonicalize, canonicalize_form};
pub use compiler::FormData;
pub use derivative::{curl, derivative, derivative_in_direction, div, gateaux, grad};
pub use error::FormError;
pub use expr::{
    abs, avg, cos, cross, dot, exp, inner, jump, ln, minus, outer, plus, sin, skew, sqrt, sym,
    tan, tr, transpose, Expr, Index, IndexBase, Shape,
};
pub use form::{integrate, Form, Integral};
pub use measure::{dS, ds, dx, DomainKind, Measure, Subdomain};
pub use signature::Signature;
pub use testspace::TestSpaceKind;
