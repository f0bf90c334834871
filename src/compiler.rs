//! The form-compiler interface: a frozen, canonicalized view of a form
//! together with the metadata an external code generator needs.
//!
//! This is a pure read contract. The symbolic core never invokes the
//! backend; a form compiler consumes the canonical integrals and the
//! opaque basis/collocation descriptors and produces discretization code
//! on its own.

use crate::expr::{Argument, Coefficient};
use crate::form::{Form, Integral};
use crate::signature::Signature;
use crate::testspace::TestSpaceKind;
use std::sync::Arc;

/// The frozen result of preprocessing a form for compilation.
#[derive(Debug, Clone)]
pub struct FormData {
    form: Form,
    signature: Signature,
    arguments: Vec<Arc<Argument>>,
    coefficients: Vec<Arc<Coefficient>>,
}

impl FormData {
    /// Canonicalizes the form and collects its metadata. Cannot fail: every
    /// invariant was already enforced when the form was constructed.
    pub fn from_form(form: &Form) -> FormData {
        let canonical = form.canonicalized();
        let arguments = canonical.arguments();
        let coefficients = canonical.coefficients();
        let signature = canonical.signature();
        FormData {
            form: canonical,
            signature,
            arguments,
            coefficients,
        }
    }

    /// The canonicalized form.
    pub fn form(&self) -> &Form {
        &self.form
    }

    /// The canonical integrals, ordered by measure.
    pub fn integrals(&self) -> &[Integral] {
        self.form.integrals()
    }

    /// The content signature of the canonical form; suitable as a cache key
    /// for generated code.
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Distinct arguments in canonical order. The length determines whether
    /// the compiled object is a functional, a linear form or a bilinear
    /// form.
    pub fn arguments(&self) -> &[Arc<Argument>] {
        &self.arguments
    }

    /// Distinct coefficients in canonical order; the caller must supply
    /// data for each.
    pub fn coefficients(&self) -> &[Arc<Coefficient>] {
        &self.coefficients
    }

    pub fn rank(&self) -> usize {
        self.form.rank()
    }

    /// The test space kind of the form, with its opaque descriptor for
    /// tabulation (basis functions) or evaluation (collocation points).
    pub fn test_space(&self) -> Option<TestSpaceKind> {
        self.form.test_space()
    }
}
