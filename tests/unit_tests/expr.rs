use vfl::space::LagrangeElement;
use vfl::{dot, grad, inner, outer, tr, transpose, Expr, FormError, Index, IndexBase, Shape};

fn scalar_u() -> Expr {
    Expr::coefficient("u", LagrangeElement::scalar(1, 2))
}

fn vector_w() -> Expr {
    Expr::coefficient("w", LagrangeElement::vector(1, 2))
}

#[test]
fn sum_requires_matching_shapes() {
    let err = Expr::sum(vec![scalar_u(), vector_w()]).unwrap_err();
    assert!(matches!(err, FormError::ShapeMismatch { .. }));
}

#[test]
fn product_rejects_two_tensor_factors() {
    let w = vector_w();
    assert!(matches!(
        Expr::product(vec![w.clone(), w]),
        Err(FormError::ShapeMismatch { .. })
    ));
}

#[test]
fn product_allows_one_tensor_factor() {
    let e = Expr::product(vec![scalar_u(), vector_w()]).unwrap();
    assert_eq!(e.shape(), &Shape::vector(2));
}

#[test]
fn inner_requires_equal_shapes() {
    let u = scalar_u();
    let w = vector_w();
    assert!(matches!(
        inner(&u, &w),
        Err(FormError::ShapeMismatch { .. })
    ));
}

#[test]
fn repeated_index_contracts() {
    // w_i w_i sums over i, so the result has no free indices left.
    let w = vector_w();
    let i = Index::new();
    let wi = Expr::indexed(w, vec![IndexBase::Free(i)]).unwrap();
    let contracted = Expr::product(vec![wi.clone(), wi]).unwrap();
    assert!(contracted.free_indices().is_empty());
    assert!(contracted.shape().is_scalar());
}

#[test]
fn index_occurring_three_times_is_rejected() {
    let w = vector_w();
    let i = Index::new();
    let wi = Expr::indexed(w, vec![IndexBase::Free(i)]).unwrap();
    assert!(matches!(
        Expr::product(vec![wi.clone(), wi.clone(), wi]),
        Err(FormError::FreeIndexMismatch { .. })
    ));
}

#[test]
fn free_indices_must_balance_across_sums() {
    let w = vector_w();
    let i = Index::new();
    let j = Index::new();
    let wi = Expr::indexed(w.clone(), vec![IndexBase::Free(i)]).unwrap();
    let wj = Expr::indexed(w, vec![IndexBase::Free(j)]).unwrap();
    assert!(matches!(
        Expr::sum(vec![wi, wj]),
        Err(FormError::FreeIndexMismatch { .. })
    ));
}

#[test]
fn fixed_index_out_of_range_is_rejected() {
    let w = vector_w();
    assert!(Expr::indexed(w.clone(), vec![IndexBase::Fixed(1)]).is_ok());
    assert!(Expr::indexed(w, vec![IndexBase::Fixed(2)]).is_err());
}

#[test]
fn dot_contracts_adjacent_axes() {
    let w = vector_w();
    let gw = grad(&w).unwrap();
    assert_eq!(gw.shape(), &Shape::tensor(2, 2));
    assert_eq!(dot(&gw, &w).unwrap().shape(), &Shape::vector(2));
}

#[test]
fn outer_concatenates_shapes() {
    let w = vector_w();
    assert_eq!(outer(&w, &w).unwrap().shape(), &Shape::tensor(2, 2));
}

#[test]
fn transpose_and_trace_need_second_order_tensors() {
    let w = vector_w();
    assert!(transpose(&w).is_err());
    assert!(tr(&w).is_err());
    let gw = grad(&w).unwrap();
    assert_eq!(transpose(&gw).unwrap().shape(), &Shape::tensor(2, 2));
    assert!(tr(&gw).unwrap().shape().is_scalar());
}

#[test]
fn division_requires_a_scalar_denominator() {
    assert!(matches!(
        Expr::division(scalar_u(), vector_w()),
        Err(FormError::ShapeMismatch { .. })
    ));
}

#[test]
fn structural_equality_ignores_node_identity() {
    let a = scalar_u() + Expr::constant(1.0);
    let b = scalar_u() + Expr::constant(1.0);
    assert_eq!(a, b);
    assert_eq!(a.signature(), b.signature());
}

#[test]
fn coefficients_are_identified_by_name_and_space() {
    let space = LagrangeElement::scalar(1, 2);
    let u1 = Expr::coefficient("u", space.clone());
    let u2 = Expr::coefficient("u", space.clone());
    let other = Expr::coefficient("p", space);
    assert_eq!(u1.signature(), u2.signature());
    assert_ne!(u1.signature(), other.signature());
}

#[test]
fn equivalence_is_modulo_canonicalization() {
    let a = scalar_u() + Expr::constant(2.0);
    let b = Expr::constant(2.0) + scalar_u();
    assert_ne!(a, b);
    assert!(a.equivalent(&b));
}

#[test]
fn geometry_terminals_carry_their_dimension() {
    let x = Expr::spatial_coordinate(3);
    assert_eq!(x.shape(), &Shape::vector(3));
    assert_eq!(x.geometric_dimension(), Some(3));
    let n = Expr::facet_normal(2);
    assert_eq!(n.shape(), &Shape::vector(2));
}

#[test]
fn display_renders_weak_form_notation() {
    let u = scalar_u();
    let v = Expr::test_function(LagrangeElement::scalar(1, 2));
    let e = inner(&grad(&u).unwrap(), &grad(&v).unwrap()).unwrap();
    assert_eq!(e.to_string(), "inner(grad(u), grad(v_0))");
}
