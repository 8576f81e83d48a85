use crate::technology::Language;
use indexmap::IndexMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock, Weak};

/// One source file in the target repository.
///
/// `methods` starts as the plain per-file index populated by
/// [`crate::parser::SourceParser::index_methods`] and is later extended,
/// in place, by [`crate::parser::SourceParser::extend_by_imports`]. Wrapped
/// in `RwLock` because a `File` is shared (`Arc`) with every `Method` it
/// owns, which need only read through it, while the parser needs to mutate
/// it during construction.
#[derive(Debug)]
pub struct File {
    /// Repository-relative path.
    pub path: String,
    /// Derived from the file's extension.
    pub language: Language,
    /// Decoded UTF-8 source.
    pub content: String,
    /// Mapping from method-name string to Method. Insertion order is
    /// significant: ties in fuzzy matching are broken by first occurrence.
    pub methods: RwLock<IndexMap<String, Arc<Method>>>,
}

impl File {
    pub fn new(path: impl Into<String>, language: Language, content: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            language,
            content: content.into(),
            methods: RwLock::new(IndexMap::new()),
        })
    }

    /// Merge `other`'s methods into this file's map, preserving any local
    /// definition of the same name (local definitions win — see the
    /// import-extension invariant in the data model).
    pub fn extend(&self, other: &IndexMap<String, Arc<Method>>) {
        let mut methods = self.methods.write().expect("methods lock poisoned");
        for (name, method) in other {
            methods.entry(name.clone()).or_insert_with(|| method.clone());
        }
    }
}

/// A parsed function/method definition.
///
/// Identity, equality, and hash are defined solely by `(name, parameters)`
/// — method overloads distinguished only by body are considered the same
/// entry.
#[derive(Debug)]
pub struct Method {
    /// Non-owning back-reference: the File owns its Methods.
    pub owner: Weak<File>,
    /// Identifier.
    pub name: String,
    /// Source text of the parameter list.
    pub parameters: String,
    /// Source text of the full method definition including signature.
    pub body: String,
    /// Annotation/decorator argument text used for route matching, if any.
    pub decorator: Option<String>,
    /// Accepted regenerated body, once the Regenerator has produced one.
    pub rewrite: RwLock<Option<String>>,
}

impl Method {
    pub fn new(
        owner: &Arc<File>,
        name: impl Into<String>,
        parameters: impl Into<String>,
        body: impl Into<String>,
        decorator: Option<String>,
    ) -> Self {
        Self {
            owner: Arc::downgrade(owner),
            name: name.into(),
            parameters: parameters.into(),
            body: body.into(),
            decorator,
            rewrite: RwLock::new(None),
        }
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.parameters == other.parameters
    }
}

impl Eq for Method {}

impl Hash for Method {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.parameters.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_equal_by_name_and_parameters_only() {
        let file = File::new("a.py", Language::Python, "");
        let m1 = Method::new(&file, "login", "(req)", "def login(req): pass", None);
        let m2 = Method::new(&file, "login", "(req)", "def login(req): return 1", None);
        assert_eq!(m1, m2, "bodies differ but (name, parameters) match");
    }

    #[test]
    fn methods_with_different_parameters_are_distinct() {
        let file = File::new("a.py", Language::Python, "");
        let m1 = Method::new(&file, "login", "(req)", "...", None);
        let m2 = Method::new(&file, "login", "(req, extra)", "...", None);
        assert_ne!(m1, m2);
    }

    #[test]
    fn equal_methods_have_equal_hashes() {
        use std::collections::hash_map::DefaultHasher;
        let file = File::new("a.py", Language::Python, "");
        let m1 = Method::new(&file, "login", "(req)", "body a", None);
        let m2 = Method::new(&file, "login", "(req)", "body b", None);

        let mut h1 = DefaultHasher::new();
        m1.hash(&mut h1);
        let mut h2 = DefaultHasher::new();
        m2.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn extend_keeps_local_definition_on_name_collision() {
        let local = File::new("a.py", Language::Python, "");
        let imported = File::new("b.py", Language::Python, "");
        let local_method = Arc::new(Method::new(&local, "helper", "()", "local body", None));
        let imported_method = Arc::new(Method::new(&imported, "helper", "()", "imported body", None));

        local
            .methods
            .write()
            .unwrap()
            .insert("helper".to_string(), local_method.clone());
        let mut other_map = IndexMap::new();
        other_map.insert("helper".to_string(), imported_method);
        local.extend(&other_map);

        let methods = local.methods.read().unwrap();
        assert!(Arc::ptr_eq(methods.get("helper").unwrap(), &local_method));
    }
}
