//! Process-wide memoization of canonicalization and differentiation
//! results, keyed by structural signatures.
//!
//! The cache is purely an optimization: entries are only consulted for
//! inputs whose signature matches, and signatures identify semantically
//! interchangeable expressions, so a missing (or cleared) cache affects
//! performance, never results. The cache is lazily initialized and may be
//! cleared between independent compilations.

use crate::expr::{Coefficient, Expr};
use crate::signature::Signature;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CacheKey {
    /// Canonical form of the expression with the given signature.
    Canonical(Signature),
    /// Gateaux derivative: (expression, coefficient identity, direction).
    Derivative(Signature, u64, Signature),
}

static CACHE: OnceLock<Mutex<FxHashMap<CacheKey, Expr>>> = OnceLock::new();

fn cache() -> &'static Mutex<FxHashMap<CacheKey, Expr>> {
    CACHE.get_or_init(|| Mutex::new(FxHashMap::default()))
}

pub(crate) fn derivative_key(
    expr: &Expr,
    coefficient: &Arc<Coefficient>,
    direction: &Expr,
) -> CacheKey {
    let mut hasher = FxHasher::default();
    coefficient.hash(&mut hasher);
    CacheKey::Derivative(expr.signature(), hasher.finish(), direction.signature())
}

pub(crate) fn canonical_key(expr: &Expr) -> CacheKey {
    CacheKey::Canonical(expr.signature())
}

pub(crate) fn lookup(key: &CacheKey) -> Option<Expr> {
    cache().lock().get(key).cloned()
}

pub(crate) fn store(key: CacheKey, value: Expr) {
    cache().lock().insert(key, value);
}

/// Clears the global signature cache. Useful between independent
/// compilations; never required for correctness.
pub fn clear_cache() {
    if let Some(cache) = CACHE.get() {
        cache.lock().clear();
    }
}

/// The number of memoized entries, exposed for diagnostics.
pub fn cache_len() -> usize {
    CACHE.get().map(|cache| cache.lock().len()).unwrap_or(0)
}
