use nalgebra::DVector;
use vfl::space::{LagrangeElement, PointCloud};
use vfl::{
    dS, ds, dx, grad, inner, integrate, jump, DomainKind, Expr, Form, FormData, FormError,
    TestSpaceKind,
};

fn scalar_space() -> std::sync::Arc<LagrangeElement> {
    LagrangeElement::scalar(1, 2)
}

fn poisson_residual() -> (Form, Expr) {
    let space = scalar_space();
    let u = Expr::coefficient("u", space.clone());
    let v = Expr::test_function(space.clone());
    let f = Expr::coefficient("f", space);
    let residual =
        inner(&grad(&u).unwrap(), &grad(&v).unwrap()).unwrap() * dx() - f * v * dx();
    (residual, u)
}

#[test]
fn like_measure_integrals_merge() {
    let space = scalar_space();
    let u = Expr::coefficient("u", space.clone());
    let f = Expr::coefficient("f", space.clone());
    let v = Expr::test_function(space);

    let same_measure = u.clone() * v.clone() * dx() + f.clone() * v.clone() * dx();
    assert_eq!(same_measure.canonicalized().integrals().len(), 1);

    let split_measures = u * v.clone() * dx() + f * v * ds();
    let canonical = split_measures.canonicalized();
    assert_eq!(canonical.integrals().len(), 2);
    assert_eq!(canonical.integrals()[0].measure().domain(), DomainKind::Cell);
    assert_eq!(
        canonical.integrals()[1].measure().domain(),
        DomainKind::ExteriorFacet
    );
}

#[test]
fn scalar_multiplication_distributes_into_integrands() {
    let space = scalar_space();
    let u = Expr::coefficient("u", space.clone());
    let v = Expr::test_function(space);
    let form = (3.0 * (u * v * dx())).canonicalized();
    assert_eq!(form.to_string(), "{ 3 * u * v_0 } * dx");
}

#[test]
fn scaling_by_zero_empties_the_form() {
    let space = scalar_space();
    let u = Expr::coefficient("u", space.clone());
    let v = Expr::test_function(space);
    let form = u * v * dx();
    assert!(form.scaled(0.0).canonicalized().is_empty());
}

#[test]
fn arguments_and_coefficients_are_collected() {
    let (residual, u) = poisson_residual();
    let arguments = residual.arguments();
    assert_eq!(arguments.len(), 1);
    assert_eq!(arguments[0].number(), 0);

    let names: Vec<_> = residual
        .coefficients()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["f", "u"]);

    let jacobian = vfl::derivative(&residual, &u).unwrap();
    assert_eq!(jacobian.canonicalized().arguments().len(), 2);
}

#[test]
fn rank_counts_distinct_argument_numbers() {
    let space = scalar_space();
    let f = Expr::coefficient("f", space.clone());
    let v = Expr::test_function(space.clone());
    let trial = Expr::trial_function(space);

    assert_eq!((f.clone() * dx()).rank(), 0);
    assert_eq!((f * v.clone() * dx()).rank(), 1);
    assert_eq!((trial * v * dx()).rank(), 2);
}

#[test]
fn more_than_two_argument_numbers_are_rejected() {
    let space = scalar_space();
    let v = Expr::test_function(space.clone());
    let trial = Expr::trial_function(space.clone());
    let extra = Expr::argument(2, TestSpaceKind::BasisFunction(space));
    let err = integrate(&(v * trial * extra), &dx()).unwrap_err();
    assert!(matches!(err, FormError::ArityError { numbers } if numbers == vec![0, 1, 2]));
}

#[test]
fn mixed_test_space_kinds_are_rejected() {
    let space = scalar_space();
    let f = Expr::coefficient("f", space.clone());
    let g = Expr::coefficient("g", space.clone());
    let v_basis = Expr::test_function(space);
    let cloud = PointCloud::new("pts", vec![DVector::from_vec(vec![0.0, 0.0])]);
    let v_delta = Expr::collocation_test_function(cloud);

    let galerkin = f * v_basis * dx();
    let collocation = integrate(&(g * v_delta), &dx()).unwrap();
    let err = galerkin.try_add(&collocation).unwrap_err();
    assert!(matches!(err, FormError::MixedTestSpaceKind { .. }));
}

#[test]
fn restrictions_require_the_interior_facet_measure() {
    let space = scalar_space();
    let f = Expr::coefficient("f", space.clone());
    let v = Expr::test_function(space);
    let integrand = jump(&v).unwrap() * f;

    assert!(matches!(
        integrate(&integrand, &dx()),
        Err(FormError::InvalidRestriction)
    ));
    assert!(integrate(&integrand, &dS()).is_ok());
}

#[test]
fn integrands_must_be_scalar() {
    let w = Expr::coefficient("w", LagrangeElement::vector(1, 2));
    assert!(matches!(
        integrate(&w, &dx()),
        Err(FormError::ShapeMismatch { .. })
    ));
}

#[test]
fn neumann_flux_terms_integrate_over_the_boundary() {
    let space = scalar_space();
    let u = Expr::coefficient("u", space.clone());
    let v = Expr::test_function(space);
    let n = Expr::facet_normal(2);
    let flux = vfl::dot(&grad(&u).unwrap(), &n).unwrap();
    let form = flux * v * ds();
    assert_eq!(form.integrals().len(), 1);
    assert_eq!(
        form.integrals()[0].measure().domain(),
        DomainKind::ExteriorFacet
    );
}

#[test]
fn empty_form_is_the_additive_identity() {
    let (residual, _) = poisson_residual();
    let sum = residual.try_add(&Form::empty()).unwrap();
    assert_eq!(
        sum.canonicalized().signature(),
        residual.canonicalized().signature()
    );
}

#[test]
fn form_data_freezes_the_canonical_form() -> eyre::Result<()> {
    let (residual, _) = poisson_residual();
    let data = FormData::from_form(&residual);
    assert_eq!(data.rank(), 1);
    assert_eq!(data.integrals().len(), 1);
    assert_eq!(data.signature(), residual.canonicalized().signature());
    assert_eq!(data.coefficients().len(), 2);
    assert!(matches!(
        data.test_space(),
        Some(TestSpaceKind::BasisFunction(_))
    ));
    Ok(())
}

#[test]
fn checked_constructors_build_a_mass_form() -> eyre::Result<()> {
    let space = scalar_space();
    let trial = Expr::trial_function(space.clone());
    let v = Expr::test_function(space);
    let mass = integrate(&Expr::product(vec![trial, v])?, &dx())?;
    assert_eq!(mass.rank(), 2);
    Ok(())
}
