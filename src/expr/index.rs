use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

static INDEX_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A free index for Einstein summation notation.
///
/// Indices are identified by a process-unique id; the id only serves to tell
/// indices apart within one expression, and signatures renumber indices by
/// first occurrence so that ids never leak into canonical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Index(usize);

impl Index {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Index(INDEX_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> usize {
        self.0
    }
}

impl Display for Index {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "i_{}", self.0)
    }
}

/// One position of a multi-index: either a fixed component or a free index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexBase {
    Fixed(usize),
    Free(Index),
}

impl Display for IndexBase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IndexBase::Fixed(value) => write!(f, "{}", value),
            IndexBase::Free(index) => write!(f, "{}", index),
        }
    }
}

/// The set of free indices of an expression together with the dimension each
/// index ranges over. Kept sorted by index id so that set comparisons are
/// plain slice comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FreeIndices(Vec<(Index, usize)>);

impl FreeIndices {
    pub fn empty() -> Self {
        FreeIndices(Vec::new())
    }

    pub fn from_entries(mut entries: Vec<(Index, usize)>) -> Self {
        entries.sort_by_key(|(index, _)| *index);
        entries.dedup();
        FreeIndices(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn entries(&self) -> &[(Index, usize)] {
        &self.0
    }

    pub fn contains(&self, index: Index) -> bool {
        self.0.binary_search_by_key(&index, |(i, _)| *i).is_ok()
    }

    pub fn dimension_of(&self, index: Index) -> Option<usize> {
        self.0
            .binary_search_by_key(&index, |(i, _)| *i)
            .ok()
            .map(|pos| self.0[pos].1)
    }

    pub fn without(&self, index: Index) -> FreeIndices {
        FreeIndices(
            self.0
                .iter()
                .copied()
                .filter(|(i, _)| *i != index)
                .collect(),
        )
    }
}

impl Display for FreeIndices {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (k, (index, dim)) in self.0.iter().enumerate() {
            if k > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", index, dim)?;
        }
        write!(f, "}}")
    }
}
