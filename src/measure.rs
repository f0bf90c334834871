use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// The class of integration domain an integral is taken over.
///
/// `Point` is the zero-measure domain produced by delta-functional pairing:
/// the form compiler must interpret integrals over it as point evaluation
/// rather than quadrature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainKind {
    Cell,
    ExteriorFacet,
    InteriorFacet,
    Point,
}

/// An optional subdomain marker. For point measures the tag is the index of
/// the collocation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subdomain {
    Everywhere,
    Tag(u32),
}

/// An integration measure: a domain class plus an optional subdomain tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Measure {
    domain: DomainKind,
    subdomain: Subdomain,
}

impl Measure {
    pub fn cell() -> Self {
        Self {
            domain: DomainKind::Cell,
            subdomain: Subdomain::Everywhere,
        }
    }

    pub fn exterior_facet() -> Self {
        Self {
            domain: DomainKind::ExteriorFacet,
            subdomain: Subdomain::Everywhere,
        }
    }

    pub fn interior_facet() -> Self {
        Self {
            domain: DomainKind::InteriorFacet,
            subdomain: Subdomain::Everywhere,
        }
    }

    /// The zero measure concentrated on the collocation point with the given
    /// index.
    pub fn point(index: u32) -> Self {
        Self {
            domain: DomainKind::Point,
            subdomain: Subdomain::Tag(index),
        }
    }

    pub fn with_subdomain(self, tag: u32) -> Self {
        Self {
            subdomain: Subdomain::Tag(tag),
            ..self
        }
    }

    pub fn domain(&self) -> DomainKind {
        self.domain
    }

    pub fn subdomain(&self) -> Subdomain {
        self.subdomain
    }

    pub fn is_point(&self) -> bool {
        self.domain == DomainKind::Point
    }
}

/// The cell (interior) measure, conventionally written `dx`.
pub fn dx() -> Measure {
    Measure::cell()
}

/// The exterior facet (boundary) measure, conventionally written `ds`.
pub fn ds() -> Measure {
    Measure::exterior_facet()
}

/// The interior facet measure, conventionally written `dS`.
#[allow(non_snake_case)]
pub fn dS() -> Measure {
    Measure::interior_facet()
}

impl Display for Measure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self.domain {
            DomainKind::Cell => "dx",
            DomainKind::ExteriorFacet => "ds",
            DomainKind::InteriorFacet => "dS",
            DomainKind::Point => "dP",
        };
        match self.subdomain {
            Subdomain::Everywhere => write!(f, "{}", name),
            Subdomain::Tag(tag) => write!(f, "{}({})", name, tag),
        }
    }
}
