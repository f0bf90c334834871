use nalgebra::DVector;
use std::sync::Arc;
use vfl::space::{LagrangeElement, PointCloud};
use vfl::traits::CollocationSet;
use vfl::{
    derivative, dx, grad, inner, integrate, DomainKind, Expr, FormError, TestSpaceKind,
};

fn cloud(n: usize) -> Arc<PointCloud> {
    let points = (0..n)
        .map(|i| DVector::from_vec(vec![i as f64, 0.0]))
        .collect();
    PointCloud::new("pts", points)
}

fn collocation_residual(n: usize) -> (vfl::Form, Expr) {
    let space = LagrangeElement::scalar(1, 2);
    let u = Expr::coefficient("u", space.clone());
    let f = Expr::coefficient("f", space);
    let v = Expr::collocation_test_function(cloud(n));
    let residual =
        inner(&grad(&u).unwrap(), &grad(&v).unwrap()).unwrap() * dx() - f * v * dx();
    (residual, u)
}

#[test]
fn basis_forms_contain_no_point_integrals() {
    let space = LagrangeElement::scalar(1, 2);
    let u = Expr::coefficient("u", space.clone());
    let f = Expr::coefficient("f", space.clone());
    let v = Expr::test_function(space);
    let residual =
        inner(&grad(&u).unwrap(), &grad(&v).unwrap()).unwrap() * dx() - f * v * dx();
    assert!(residual
        .canonicalized()
        .integrals()
        .iter()
        .all(|integral| integral.measure().domain() != DomainKind::Point));
}

#[test]
fn delta_forms_contain_only_point_integrals() {
    let (residual, _) = collocation_residual(3);
    let canonical = residual.canonicalized();
    assert_eq!(canonical.integrals().len(), 3);
    assert!(canonical
        .integrals()
        .iter()
        .all(|integral| integral.measure().domain() == DomainKind::Point));
    assert_eq!(canonical.rank(), 1);
    assert!(matches!(
        canonical.test_space(),
        Some(TestSpaceKind::DeltaFunctional(_))
    ));
}

#[test]
fn delta_pairing_collocates_the_strong_form() {
    // -div(grad(u)) evaluated at each collocation point, one integral per
    // point over the zero measure.
    let space = LagrangeElement::scalar(1, 2);
    let u = Expr::coefficient("u", space);
    let v = Expr::collocation_test_function(cloud(2));
    let laplace = inner(&grad(&u).unwrap(), &grad(&v).unwrap()).unwrap() * dx();

    let canonical = laplace.canonicalized();
    assert_eq!(canonical.integrals().len(), 2);
    assert_eq!(
        canonical.integrals()[0].to_string(),
        "{ -1 * v_0 * div(grad(u)) } * dP(0)"
    );
    assert_eq!(
        canonical.integrals()[1].to_string(),
        "{ -1 * v_0 * div(grad(u)) } * dP(1)"
    );
}

#[test]
fn delta_jacobian_keeps_point_measures() {
    let (residual, u) = collocation_residual(2);
    let jacobian = derivative(&residual, &u).unwrap().canonicalized();
    assert_eq!(jacobian.rank(), 2);
    assert_eq!(jacobian.integrals().len(), 2);
    assert_eq!(
        jacobian.integrals()[0].to_string(),
        "{ -1 * v_0 * div(grad(v_1)) } * dP(0)"
    );
}

#[test]
fn nonlinear_test_dependence_is_rejected() {
    let v = Expr::collocation_test_function(cloud(1));
    let err = integrate(&(v.clone() * v), &dx()).unwrap_err();
    assert!(matches!(err, FormError::UnsupportedTestDependence));
}

#[test]
fn residual_terms_missing_the_test_function_are_rejected() {
    let space = LagrangeElement::scalar(1, 2);
    let u = Expr::coefficient("u", space.clone());
    let f = Expr::coefficient("f", space);
    let v = Expr::collocation_test_function(cloud(1));
    let err = integrate(&(u * v + f), &dx()).unwrap_err();
    assert!(matches!(err, FormError::UnsupportedTestDependence));
}

#[test]
fn one_integrand_cannot_mix_kinds() {
    let space = LagrangeElement::scalar(1, 2);
    let v_basis = Expr::test_function(space);
    let v_delta = Expr::collocation_test_function(cloud(1));
    let err = integrate(&(v_basis * v_delta), &dx()).unwrap_err();
    assert!(matches!(err, FormError::MixedTestSpaceKind { .. }));
}

#[test]
fn pair_contract_is_uniform_across_kinds() {
    let space = LagrangeElement::scalar(1, 2);
    let u = Expr::coefficient("u", space.clone());

    let basis = TestSpaceKind::BasisFunction(space);
    assert!(basis.shape_compatible(&u));
    assert_eq!(basis.regularity_order(), 1);
    let galerkin = basis.pair(&u, &dx()).unwrap();
    assert_eq!(galerkin.len(), 1);
    assert_eq!(galerkin[0].measure().domain(), DomainKind::Cell);

    let delta = TestSpaceKind::DeltaFunctional(cloud(2));
    assert!(delta.shape_compatible(&u));
    assert_eq!(delta.regularity_order(), 2);
    let collocated = delta.pair(&u, &dx()).unwrap();
    assert_eq!(collocated.len(), 2);
    assert!(collocated
        .iter()
        .all(|integral| integral.measure().domain() == DomainKind::Point));
}

#[test]
fn pairing_validates_the_expression_shape() {
    let w = Expr::coefficient("w", LagrangeElement::vector(1, 2));
    let delta = TestSpaceKind::DeltaFunctional(cloud(1));
    assert!(!delta.shape_compatible(&w));
    assert!(matches!(
        delta.pair(&w, &dx()),
        Err(FormError::ShapeMismatch { .. })
    ));
}

#[test]
fn collocation_descriptors_pass_through_unchanged() {
    let set = cloud(3);
    let v = Expr::collocation_test_function(set.clone());
    let u = Expr::coefficient("u", LagrangeElement::scalar(1, 2));
    let form = integrate(&(u * v), &dx()).unwrap();
    match form.test_space() {
        Some(TestSpaceKind::DeltaFunctional(stored)) => {
            assert_eq!(stored.num_points(), 3);
            assert_eq!(stored.points(), set.points());
        }
        other => panic!("expected a delta functional test space, got {:?}", other),
    }
}
