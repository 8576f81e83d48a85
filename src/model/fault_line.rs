use super::file::Method;
use indexmap::IndexSet;
use std::sync::Arc;

/// The set of Methods reachable from a handler, deduplicated by Method
/// identity. Backed by `IndexSet` (rather than `HashSet`) so that
/// insertion order is preserved — the classifier's chunk tiebreak and the
/// endpoint resolver's tie-break both rely on "first occurrence in
/// iteration order" semantics.
pub type FaultLine = IndexSet<Arc<Method>>;
