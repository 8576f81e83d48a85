//! Per-language concrete-syntax-tree parsing and call-graph construction.
//!
//! [`SourceParser`] is the capability interface named in the Design
//! Notes: `{indexMethods, extendByImports, reachable, resolveEndpoint}`.
//! `reachable` and `resolve_endpoint` are provided as default methods here
//! because the BFS traversal and the fuzzy-decorator ranking are
//! language-agnostic once a parser can answer "what does this method body
//! call" (`call_tails`) — only `index_methods` and `extend_by_imports` are
//! genuinely per-language, split across `PythonParser`/`JavaParser`.

pub mod java;
pub mod python;

use crate::error::Result;
use crate::fuzzy;
use crate::model::{FaultLine, File, Method};
use indexmap::IndexSet;
use std::collections::VecDeque;
use std::sync::Arc;

pub use java::JavaParser;
pub use python::PythonParser;

/// Extract the call *tail identifier* from call-expression source text: the
/// last dot-separated token before the opening parenthesis. `a.b.c(x)` →
/// `"c"`.
pub fn call_tail(call_text: &str) -> String {
    let before_paren = call_text.split('(').next().unwrap_or(call_text);
    before_paren
        .rsplit('.')
        .next()
        .unwrap_or(before_paren)
        .to_string()
}

pub trait SourceParser: Send + Sync {
    /// Populate `file.methods` with every method/function definition found
    /// in `file.content`, including decorator/annotation text where
    /// present. The decorated match takes precedence over the plain match
    /// for the same method name.
    fn index_methods(&self, file: &Arc<File>) -> Result<()>;

    /// For each file, find import references and merge in the methods of
    /// any other file whose path matches the import target. Java parsers
    /// additionally merge methods from files sharing the same package.
    fn extend_by_imports(&self, files: &[Arc<File>]) -> Result<()>;

    /// All call-tail identifiers invoked from within `body`.
    fn call_tails(&self, body: &str) -> Result<Vec<String>>;

    /// Breadth-first traversal of the call graph starting at `start`,
    /// restricted to methods present in `start`'s owning file's (extended)
    /// method map. Always includes `start` itself. Empty if `start` is
    /// `None`.
    fn reachable(&self, start: Option<&Arc<Method>>) -> Result<FaultLine> {
        let mut visited: FaultLine = IndexSet::new();
        let Some(start) = start else {
            return Ok(visited);
        };
        let Some(owner) = start.owner.upgrade() else {
            visited.insert(start.clone());
            return Ok(visited);
        };

        let mut queue: VecDeque<Arc<Method>> = VecDeque::new();
        queue.push_back(start.clone());
        visited.insert(start.clone());

        while let Some(node) = queue.pop_front() {
            for tail in self.call_tails(&node.body)? {
                let methods = owner.methods.read().expect("methods lock poisoned");
                if let Some(called) = methods.get(&tail) {
                    if !visited.contains(called) {
                        visited.insert(called.clone());
                        queue.push_back(called.clone());
                    }
                }
            }
        }
        Ok(visited)
    }

    /// Rank every decorated method across `files` by fuzzy similarity of
    /// its decorator text to `label`; return the best match, or `None` if
    /// no method carries a decorator. Ties favor the first occurrence in
    /// iteration order (stable sort over `files`/`methods` insertion
    /// order).
    fn resolve_endpoint(&self, files: &[Arc<File>], label: &str) -> Option<Arc<Method>> {
        // Hand-rolled scan rather than `Iterator::max_by_key`: the latter
        // keeps the *last* maximal element on a tie, but ties here must
        // favor the first occurrence in iteration order.
        let mut best: Option<(Arc<Method>, u32)> = None;
        for file in files {
            let methods = file.methods.read().expect("methods lock poisoned");
            for method in methods.values() {
                if let Some(decorator) = &method.decorator {
                    let score = fuzzy::ratio(decorator, label);
                    if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
                        best = Some((method.clone(), score));
                    }
                }
            }
        }
        best.map(|(method, _)| method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_tail_strips_receiver_chain() {
        assert_eq!(call_tail("a.b.c(x)"), "c");
    }

    #[test]
    fn call_tail_handles_bare_call() {
        assert_eq!(call_tail("helper(x, y)"), "helper");
    }
}
