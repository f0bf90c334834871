use proptest::prelude::*;
use vfl::space::LagrangeElement;
use vfl::{canonicalize, derivative, dx, exp, grad, inner, integrate, sin, transpose, Expr};

fn scalar_u() -> Expr {
    Expr::coefficient("u", LagrangeElement::scalar(1, 2))
}

fn scalar_f() -> Expr {
    Expr::coefficient("f", LagrangeElement::scalar(1, 2))
}

#[test]
fn constants_fold() {
    let e = (Expr::constant(2.0) + Expr::constant(3.0)) * Expr::constant(4.0);
    assert_eq!(canonicalize(&e).as_constant(), Some(20.0));
}

#[test]
fn math_functions_of_constants_fold() {
    let e = exp(&Expr::constant(0.0)).unwrap();
    assert_eq!(canonicalize(&e).as_constant(), Some(1.0));
}

#[test]
fn zero_annihilates_products() {
    let e = scalar_u() * Expr::constant(0.0);
    assert!(canonicalize(&e).is_zero());
}

#[test]
fn identities_are_eliminated() {
    let u = scalar_u();
    let e = u.clone() * Expr::constant(1.0) + Expr::constant(0.0);
    assert_eq!(canonicalize(&e).signature(), u.signature());
}

#[test]
fn zero_propagates_through_compound_operators() {
    let w = Expr::coefficient("w", LagrangeElement::vector(1, 2));
    let zero = Expr::zero(w.shape().clone());
    let e = inner(&w, &zero).unwrap();
    assert!(canonicalize(&e).is_zero());
}

#[test]
fn transpose_is_an_involution() {
    let gw = grad(&Expr::coefficient("w", LagrangeElement::vector(1, 2))).unwrap();
    let e = transpose(&transpose(&gw).unwrap()).unwrap();
    assert_eq!(canonicalize(&e).signature(), canonicalize(&gw).signature());
}

#[test]
fn poisson_residual_canonicalizes_to_one_merged_integral() {
    let u = scalar_u();
    let f = scalar_f();
    let v = Expr::test_function(LagrangeElement::scalar(1, 2));
    let residual =
        inner(&grad(&u).unwrap(), &grad(&v).unwrap()).unwrap() * dx() - f * v * dx();

    let canonical = residual.canonicalized();
    assert_eq!(canonical.integrals().len(), 1);
    insta::assert_snapshot!(
        canonical.to_string(),
        @"{ -1 * f * v_0 + inner(grad(u), grad(v_0)) } * dx"
    );
}

#[test]
fn form_canonicalization_is_idempotent() {
    let u = scalar_u();
    let v = Expr::test_function(LagrangeElement::scalar(1, 2));
    let canonical = (u * v * dx()).canonicalized();
    assert_eq!(canonical.signature(), canonical.canonicalized().signature());
}

fn arbitrary_scalar_expr(coefficients: &[Expr]) -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        proptest::sample::select(coefficients.to_vec()),
        (-2.0..2.0f64).prop_map(Expr::constant),
    ];
    leaf.prop_recursive(3, 16, 2, |element| {
        prop_oneof![
            (element.clone(), element.clone()).prop_map(|(a, b)| a + b),
            (element.clone(), element.clone()).prop_map(|(a, b)| a * b),
            element.clone().prop_map(|a| sin(&a).expect("scalar operand")),
            element.prop_map(|a| exp(&a).expect("scalar operand")),
        ]
    })
}

fn expr_in_u_and_f() -> impl Strategy<Value = Expr> {
    arbitrary_scalar_expr(&[scalar_u(), scalar_f()])
}

fn expr_in_f_only() -> impl Strategy<Value = Expr> {
    arbitrary_scalar_expr(&[scalar_f()])
}

proptest! {
    #[test]
    fn canonicalization_is_idempotent(e in expr_in_u_and_f()) {
        let once = canonicalize(&e);
        prop_assert_eq!(once.signature(), canonicalize(&once).signature());
    }

    #[test]
    fn addition_commutes_after_canonicalization(
        a in expr_in_u_and_f(),
        b in expr_in_u_and_f(),
    ) {
        let ab = canonicalize(&(a.clone() + b.clone()));
        let ba = canonicalize(&(b + a));
        prop_assert_eq!(ab.signature(), ba.signature());
    }

    #[test]
    fn addition_is_associative_after_canonicalization(
        a in expr_in_u_and_f(),
        b in expr_in_u_and_f(),
        c in expr_in_u_and_f(),
    ) {
        let left = canonicalize(&((a.clone() + b.clone()) + c.clone()));
        let right = canonicalize(&(a + (b + c)));
        prop_assert_eq!(left.signature(), right.signature());
    }

    #[test]
    fn multiplication_commutes_after_canonicalization(
        a in expr_in_u_and_f(),
        b in expr_in_u_and_f(),
    ) {
        let ab = canonicalize(&(a.clone() * b.clone()));
        let ba = canonicalize(&(b * a));
        prop_assert_eq!(ab.signature(), ba.signature());
    }

    #[test]
    fn differentiation_is_linear(
        a in expr_in_u_and_f(),
        b in expr_in_u_and_f(),
    ) {
        let u = scalar_u();
        let f1 = integrate(&a, &dx()).unwrap();
        let f2 = integrate(&b, &dx()).unwrap();
        let combined = derivative(&f1.try_add(&f2).unwrap(), &u)
            .unwrap()
            .canonicalized();
        let separate = derivative(&f1, &u)
            .unwrap()
            .try_add(&derivative(&f2, &u).unwrap())
            .unwrap()
            .canonicalized();
        prop_assert_eq!(combined.signature(), separate.signature());
    }

    #[test]
    fn derivative_with_respect_to_an_absent_coefficient_vanishes(
        e in expr_in_f_only(),
    ) {
        let form = integrate(&e, &dx()).unwrap();
        let zero = derivative(&form, &scalar_u()).unwrap().canonicalized();
        prop_assert!(zero.is_empty());
    }
}
