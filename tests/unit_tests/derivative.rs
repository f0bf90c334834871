use nalgebra::DVector;
use vfl::space::{LagrangeElement, PointCloud};
use vfl::{
    curl, derivative, derivative_in_direction, div, dx, gateaux, grad, inner, sin, Expr,
    FormError, Shape,
};

fn scalar_u() -> Expr {
    Expr::coefficient("u", LagrangeElement::scalar(1, 2))
}

fn scalar_f() -> Expr {
    Expr::coefficient("f", LagrangeElement::scalar(1, 2))
}

fn vector_w() -> Expr {
    Expr::coefficient("w", LagrangeElement::vector(1, 2))
}

fn trial() -> Expr {
    Expr::trial_function(LagrangeElement::scalar(1, 2))
}

#[test]
fn gradient_needs_a_geometric_dimension() {
    assert!(matches!(
        grad(&Expr::constant(2.0)),
        Err(FormError::UnknownGeometricDimension { .. })
    ));
}

#[test]
fn gradient_pushes_through_sums() {
    let e = scalar_u() + scalar_f();
    assert_eq!(grad(&e).unwrap().to_string(), "grad(u) + grad(f)");
}

#[test]
fn gradient_applies_the_product_rule() {
    let e = scalar_u() * scalar_f();
    assert_eq!(
        grad(&e).unwrap().to_string(),
        "f * grad(u) + u * grad(f)"
    );
}

#[test]
fn gradient_skips_spatially_constant_factors() {
    let e = scalar_u() * 3.0;
    assert_eq!(grad(&e).unwrap().to_string(), "3 * grad(u)");
}

#[test]
fn gradient_applies_the_chain_rule() {
    let e = sin(&scalar_u()).unwrap();
    assert_eq!(grad(&e).unwrap().to_string(), "cos(u) * grad(u)");
}

#[test]
fn divergence_drops_the_last_axis() {
    let w = vector_w();
    assert!(div(&w).unwrap().shape().is_scalar());
    assert!(matches!(
        div(&scalar_u()),
        Err(FormError::ShapeMismatch { .. })
    ));
}

#[test]
fn curl_shape_depends_on_the_dimension() {
    assert!(curl(&vector_w()).unwrap().shape().is_scalar());
    let w3 = Expr::coefficient("w", LagrangeElement::vector(1, 3));
    assert_eq!(curl(&w3).unwrap().shape(), &Shape::vector(3));
    assert!(curl(&scalar_u()).is_err());
}

#[test]
fn second_derivative_of_an_h1_test_function_is_rejected() {
    let v = Expr::test_function(LagrangeElement::scalar(1, 2));
    let gv = grad(&v).unwrap();
    assert!(matches!(
        grad(&gv),
        Err(FormError::UnsupportedDerivativeOrder {
            requested: 2,
            supported: 1,
        })
    ));
}

#[test]
fn trial_derivatives_are_not_bounded_by_the_test_space() {
    // A collocation Jacobian carries second derivatives of the trial slot;
    // only the test pairing is regularity-limited.
    let second = grad(&trial()).and_then(|g| grad(&g));
    assert!(second.is_ok());
}

#[test]
fn delta_test_functions_respect_the_transfer_order() {
    let cloud = PointCloud::new(
        "pts",
        vec![DVector::from_vec(vec![0.0, 0.0])],
    );
    let v = Expr::collocation_test_function(cloud);
    let second = grad(&v).and_then(|g| grad(&g)).unwrap();
    assert!(matches!(
        grad(&second),
        Err(FormError::UnsupportedDerivativeOrder {
            requested: 3,
            supported: 2,
        })
    ));
}

#[test]
fn gateaux_replaces_the_coefficient_with_the_direction() {
    let u = scalar_u();
    let e = u.clone() * u.clone();
    let d = gateaux(&e, &u, &trial()).unwrap();
    assert_eq!(d.to_string(), "v_1 * u + u * v_1");
}

#[test]
fn gateaux_of_an_independent_expression_is_zero() {
    let d = gateaux(&scalar_f(), &scalar_u(), &trial()).unwrap();
    assert!(d.is_zero());
}

#[test]
fn gateaux_applies_the_power_rule() {
    let u = scalar_u();
    let e = Expr::power(u.clone(), Expr::constant(3.0)).unwrap();
    let d = vfl::canonicalize(&gateaux(&e, &u, &trial()).unwrap());
    assert_eq!(d.to_string(), "3 * v_1 * u^2");
}

#[test]
fn gateaux_commutes_with_spatial_derivatives() {
    let u = scalar_u();
    let e = grad(&u).unwrap();
    let d = gateaux(&e, &u, &trial()).unwrap();
    assert_eq!(d.to_string(), "grad(v_1)");
}

#[test]
fn poisson_jacobian_is_the_stiffness_form() {
    let u = scalar_u();
    let f = scalar_f();
    let v = Expr::test_function(LagrangeElement::scalar(1, 2));
    let residual =
        inner(&grad(&u).unwrap(), &grad(&v).unwrap()).unwrap() * dx() - f * v * dx();

    let jacobian = derivative(&residual, &u).unwrap().canonicalized();
    assert_eq!(jacobian.integrals().len(), 1);
    assert_eq!(jacobian.rank(), 2);
    insta::assert_snapshot!(
        jacobian.to_string(),
        @"{ inner(grad(v_1), grad(v_0)) } * dx"
    );
}

#[test]
fn derivative_direction_must_match_the_coefficient_shape() {
    let u = scalar_u();
    let v = Expr::test_function(LagrangeElement::scalar(1, 2));
    let form = u.clone() * v * dx();
    let err = derivative_in_direction(&form, &u, &vector_w()).unwrap_err();
    assert!(matches!(err, FormError::ShapeMismatch { .. }));
}

#[test]
fn derivative_carries_measures_over_unchanged() {
    let u = scalar_u();
    let v = Expr::test_function(LagrangeElement::scalar(1, 2));
    let form = u.clone() * v.clone() * dx() + u.clone() * v * vfl::ds();
    let jacobian = derivative(&form, &u).unwrap();
    let measures: Vec<_> = jacobian
        .integrals()
        .iter()
        .map(|integral| *integral.measure())
        .collect();
    assert_eq!(measures, vec![dx(), vfl::ds()]);
}
