use super::{call_tail, SourceParser};
use crate::error::{AioptimError, Result};
use crate::model::File;
use std::collections::HashMap;
use std::sync::Arc;
use tree_sitter::{Language, Parser, Query, QueryCursor};

fn java_language() -> Language {
    tree_sitter_java::language()
}

fn matches_by_capture_name<'a>(
    query: &'a Query,
    tree: &'a tree_sitter::Tree,
    source: &'a [u8],
) -> Vec<HashMap<&'a str, String>> {
    let mut cursor = QueryCursor::new();
    let names = query.capture_names();
    cursor
        .matches(query, tree.root_node(), source)
        .map(|m| {
            let mut row: HashMap<&str, String> = HashMap::new();
            for capture in m.captures {
                let name = names[capture.index as usize];
                row.entry(name).or_insert_with(|| {
                    capture
                        .node
                        .utf8_text(source)
                        .unwrap_or_default()
                        .to_string()
                });
            }
            row
        })
        .collect()
}

/// Parser for Java source: method/annotated-method grammars, single-type
/// and on-demand imports, and package-scoped import extension.
pub struct JavaParser {
    method_query: Query,
    decorator_query: Query,
    call_query: Query,
    import_query: Query,
    package_query: Query,
}

impl JavaParser {
    pub fn new() -> Result<Self> {
        let lang = java_language();
        let compile = |src: &str| {
            Query::new(&lang, src)
                .map_err(|e| AioptimError::Other(format!("invalid tree-sitter query: {e}")))
        };
        Ok(Self {
            method_query: compile(
                "(method_declaration
                    name: (identifier) @identifier
                    parameters: (formal_parameters) @parameters
                ) @method",
            )?,
            decorator_query: compile(
                "(method_declaration
                    (modifiers
                        (annotation
                            arguments: (annotation_argument_list) @decorator))
                    name: (identifier) @identifier
                    parameters: (formal_parameters) @parameters
                ) @method",
            )?,
            call_query: compile("(method_invocation) @call")?,
            import_query: compile("(import_declaration (scoped_identifier) @import)")?,
            package_query: compile("(package_declaration (scoped_identifier) @package)")?,
        })
    }

    fn parse(&self, source: &str) -> Result<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&java_language())
            .map_err(|e| AioptimError::Other(format!("failed to set java grammar: {e}")))?;
        parser
            .parse(source, None)
            .ok_or_else(|| AioptimError::Other("tree-sitter failed to parse java source".into()))
    }

    fn package_of(&self, tree: &tree_sitter::Tree, source: &[u8]) -> Option<String> {
        matches_by_capture_name(&self.package_query, tree, source)
            .into_iter()
            .find_map(|row| row.get("package").cloned())
    }
}

impl SourceParser for JavaParser {
    fn index_methods(&self, file: &Arc<File>) -> Result<()> {
        let source = file.content.as_bytes();
        let tree = self.parse(&file.content)?;

        let apply = |query: &Query, with_decorator: bool| -> Result<Vec<(String, crate::model::Method)>> {
            let mut out = Vec::new();
            for row in matches_by_capture_name(query, &tree, source) {
                let name = row.get("identifier").cloned().unwrap_or_default();
                let parameters = row.get("parameters").cloned().unwrap_or_default();
                let body = row.get("method").cloned().unwrap_or_default();
                let decorator = if with_decorator {
                    row.get("decorator").cloned()
                } else {
                    None
                };
                out.push((
                    name.clone(),
                    crate::model::Method::new(file, name, parameters, body, decorator),
                ));
            }
            Ok(out)
        };

        let mut methods = file.methods.write().expect("methods lock poisoned");
        for (name, method) in apply(&self.method_query, false)? {
            methods.insert(name, Arc::new(method));
        }
        for (name, method) in apply(&self.decorator_query, true)? {
            methods.insert(name, Arc::new(method));
        }
        Ok(())
    }

    fn extend_by_imports(&self, files: &[Arc<File>]) -> Result<()> {
        let packages: Vec<Option<String>> = files
            .iter()
            .map(|file| {
                let tree = self.parse(&file.content).ok()?;
                self.package_of(&tree, file.content.as_bytes())
            })
            .collect();

        for (i, file) in files.iter().enumerate() {
            let tree = self.parse(&file.content)?;
            let source = file.content.as_bytes();

            let mut targets: std::collections::HashSet<usize> = std::collections::HashSet::new();
            for row in matches_by_capture_name(&self.import_query, &tree, source) {
                let Some(import) = row.get("import") else {
                    continue;
                };
                let fragment = import.replace('.', "/");
                for (j, other) in files.iter().enumerate() {
                    if other.path.contains(&fragment) {
                        targets.insert(j);
                    }
                }
            }
            // Java additionally merges methods from every file sharing this
            // file's package declaration.
            if let Some(own_package) = &packages[i] {
                for (j, other_package) in packages.iter().enumerate() {
                    if j != i && other_package.as_deref() == Some(own_package.as_str()) {
                        targets.insert(j);
                    }
                }
            }

            for j in targets {
                let other_methods = files[j].methods.read().expect("methods lock poisoned").clone();
                file.extend(&other_methods);
            }
        }
        Ok(())
    }

    fn call_tails(&self, body: &str) -> Result<Vec<String>> {
        let tree = self.parse(body)?;
        let source = body.as_bytes();
        Ok(matches_by_capture_name(&self.call_query, &tree, source)
            .into_iter()
            .filter_map(|row| row.get("call").map(|c| call_tail(c)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technology::Language as SourceLanguage;

    #[test]
    fn indexes_plain_and_annotated_methods() {
        let parser = JavaParser::new().unwrap();
        let source = r#"
package com.example.app;

class Handlers {
    @RequestMapping("/login")
    public void login(Request req) {
        authenticateUser(req);
    }

    private void authenticateUser(Request req) {
    }
}
"#;
        let file = File::new("Handlers.java", SourceLanguage::Java, source);
        parser.index_methods(&file).unwrap();
        let methods = file.methods.read().unwrap();
        assert!(methods.contains_key("login"));
        assert!(methods.contains_key("authenticateUser"));
        assert!(methods.get("login").unwrap().decorator.is_some());
    }

    #[test]
    fn extend_by_imports_merges_same_package_files() {
        let parser = JavaParser::new().unwrap();
        let a = File::new(
            "com/example/app/Handlers.java",
            SourceLanguage::Java,
            "package com.example.app;\nclass Handlers { void login() { helper(); } }",
        );
        let b = File::new(
            "com/example/app/Helper.java",
            SourceLanguage::Java,
            "package com.example.app;\nclass Helper { void helper() {} }",
        );
        parser.index_methods(&a).unwrap();
        parser.index_methods(&b).unwrap();
        let files = vec![a.clone(), b.clone()];
        parser.extend_by_imports(&files).unwrap();
        assert!(a.methods.read().unwrap().contains_key("helper"));
    }
}
