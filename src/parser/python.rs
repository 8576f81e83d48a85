use super::{call_tail, SourceParser};
use crate::error::{AioptimError, Result};
use crate::model::File;
use std::collections::HashMap;
use std::sync::Arc;
use tree_sitter::{Language, Parser, Query, QueryCursor};

fn python_language() -> Language {
    tree_sitter_python::language()
}

/// Run `query` over `tree`, yielding one `HashMap<capture name, node text>`
/// per match (first captured node per name).
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

/// Parser for Python source: function/decorated-function grammars, dotted
/// module-path imports.
pub struct PythonParser {
    method_query: Query,
    decorator_query: Query,
    call_query: Query,
    import_query: Query,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let lang = python_language();
        let compile = |src: &str| {
            Query::new(&lang, src)
                .map_err(|e| AioptimError::Other(format!("invalid tree-sitter query: {e}")))
        };
        Ok(Self {
            method_query: compile(
                "(function_definition
                    name: (identifier) @identifier
                    parameters: (parameters) @parameters
                ) @method",
            )?,
            decorator_query: compile(
                "(decorated_definition
                    (decorator
                        (call
                            arguments: (argument_list) @decorator))
                    definition: (function_definition
                        name: (identifier) @identifier
                        parameters: (parameters) @parameters
                    )
                ) @method",
            )?,
            call_query: compile("(call function: (_)) @call")?,
            import_query: compile(
                "(import_from_statement module_name: (dotted_name) @import)
                 (import_statement name: (dotted_name) @import)",
            )?,
        })
    }

    fn parse(&self, source: &str) -> Result<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&python_language())
            .map_err(|e| AioptimError::Other(format!("failed to set python grammar: {e}")))?;
        parser
            .parse(source, None)
            .ok_or_else(|| AioptimError::Other("tree-sitter failed to parse python source".into()))
    }
}

impl SourceParser for PythonParser {
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

        // Plain pass first, decorated pass second — the decorated match
        // overwrites a plain match of the same name.
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
        for file in files {
            let tree = self.parse(&file.content)?;
            let source = file.content.as_bytes();
            for row in matches_by_capture_name(&self.import_query, &tree, source) {
                let Some(import) = row.get("import") else {
                    continue;
                };
                let fragment = import.replace('.', "/");
                for other in files {
                    if other.path.contains(&fragment) {
                        let other_methods = other.methods.read().expect("methods lock poisoned").clone();
                        file.extend(&other_methods);
                    }
                }
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
    fn indexes_plain_and_decorated_methods() {
        let parser = PythonParser::new().unwrap();
        let source = r#"
def retrieve_file(name):
    return open(name)

@app.route("/login")
def login(req):
    authenticateUser(req)
    signUP(req)
"#;
        let file = File::new("handlers.py", SourceLanguage::Python, source);
        parser.index_methods(&file).unwrap();
        let methods = file.methods.read().unwrap();
        assert!(methods.contains_key("retrieve_file"));
        assert!(methods.contains_key("login"));
        assert!(methods.get("login").unwrap().decorator.is_some());
        assert!(methods.get("retrieve_file").unwrap().decorator.is_none());
    }

    #[test]
    fn reachable_follows_local_calls() {
        use crate::parser::SourceParser as _;
        let parser = PythonParser::new().unwrap();
        let source = r#"
def login(req):
    authenticateUser(req)
    signUP(req)

def authenticateUser(req):
    pass

def signUP(req):
    pass

def retrieve_file(name):
    pass
"#;
        let file = File::new("handlers.py", SourceLanguage::Python, source);
        parser.index_methods(&file).unwrap();
        let start = {
            let methods = file.methods.read().unwrap();
            methods.get("login").unwrap().clone()
        };
        let fault_line = parser.reachable(Some(&start)).unwrap();
        assert_eq!(fault_line.len(), 3);

        let retrieve = {
            let methods = file.methods.read().unwrap();
            methods.get("retrieve_file").unwrap().clone()
        };
        let solo = parser.reachable(Some(&retrieve)).unwrap();
        assert_eq!(solo.len(), 1);
    }
}
