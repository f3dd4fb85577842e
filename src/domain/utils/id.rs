use std::fmt;
use std::marker::PhantomData;

/// Arena index into one of the per-invocation vectors (nodes, arcs, arc paths).
///
/// The tag type keeps a node index from being used where an arc index is expected.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Id<T> {
    pub index: usize,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub const fn new(index: usize) -> Self {
        Id { index, _marker: PhantomData }
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

impl<T> From<Id<T>> for usize {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.index
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {}", display_name, self.index)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct NodeTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ArcTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ArcPathTag;

pub type NodeId = Id<NodeTag>;
pub type ArcId = Id<ArcTag>;
pub type ArcPathId = Id<ArcPathTag>;
