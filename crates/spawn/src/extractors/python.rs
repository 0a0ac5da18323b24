//! Python source metadata extractor.
//!
//! Parses the file with tree-sitter and reports module structure: the
//! docstring, imports bucketed by origin, classes with their methods,
//! top-level functions, module-level variables, and a small complexity
//! summary. A file that does not parse reports a syntax error and no
//! structural fields.

use crate::document::Fragment;
use crate::extractors::basic::common_file_fragment;
use crate::registry::MetadataExtractor;
use crate::Result;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error};
use tree_sitter::{Node, Parser};

/// Import names treated as part of the host project rather than third-party
/// code.
const LOCAL_MODULE_PREFIX: &str = "spawn";

/// Standard-library module names used to bucket imports.
const STANDARD_LIBS: [&str; 50] = [
    "abc", "argparse", "ast", "asyncio", "base64", "collections", "concurrent", "contextlib",
    "copy", "csv", "datetime", "decimal", "difflib", "enum", "functools", "glob", "gzip",
    "hashlib", "http", "importlib", "inspect", "io", "itertools", "json", "logging", "math",
    "multiprocessing", "os", "pathlib", "pickle", "random", "re", "shutil", "signal", "socket",
    "sqlite3", "statistics", "string", "subprocess", "sys", "tempfile", "threading", "time",
    "traceback", "typing", "unittest", "urllib", "uuid", "warnings", "weakref",
];

/// Node kinds counted as statements by the complexity summary.
const STATEMENT_KINDS: [&str; 15] = [
    "assignment",
    "augmented_assignment",
    "return_statement",
    "raise_statement",
    "assert_statement",
    "import_statement",
    "import_from_statement",
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
    "except_clause",
    "pass_statement",
    "break_statement",
    "continue_statement",
];

/// Extract metadata from Python source files.
pub struct PythonExtractor {
    analyze_complexity: bool,
    extract_docstrings: bool,
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self {
            analyze_complexity: true,
            extract_docstrings: true,
        }
    }

    /// Control complexity analysis and docstring capture independently.
    pub fn with_options(analyze_complexity: bool, extract_docstrings: bool) -> Self {
        Self {
            analyze_complexity,
            extract_docstrings,
        }
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor for PythonExtractor {
    fn name(&self) -> &str {
        "python-extractor"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[".py", ".pyi", ".pyx", ".pyw"]
    }

    fn supported_mime_prefixes(&self) -> &[&str] {
        &["text/x-python", "text/x-script.python"]
    }

    fn extract(&self, path: &Path) -> Result<Fragment> {
        let mut fragment = common_file_fragment(path)?;

        let content = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                error!(path = %path.display(), error = %e, "error extracting Python metadata");
                fragment.insert("error".to_string(), json!(e.to_string()));
                return Ok(fragment);
            }
        };

        fragment.insert(
            "line_count".to_string(),
            json!(content.matches('\n').count() + 1),
        );
        fragment.insert("char_count".to_string(), json!(content.chars().count()));

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
            error!(path = %path.display(), error = %e, "failed to load Python grammar");
            fragment.insert("error".to_string(), json!(e.to_string()));
            return Ok(fragment);
        }

        let Some(tree) = parser.parse(&content, None) else {
            fragment.insert("error".to_string(), json!("Syntax error: parse failed"));
            return Ok(fragment);
        };

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root).unwrap_or(1);
            debug!(path = %path.display(), line, "syntax error in Python source");
            fragment.insert(
                "error".to_string(),
                json!(format!("Syntax error: invalid syntax (line {})", line)),
            );
            return Ok(fragment);
        }

        if self.extract_docstrings {
            if let Some(docstring) = body_docstring(root, &content) {
                fragment.insert("module_docstring".to_string(), json!(docstring));
            }
        }

        let imports = extract_imports(root, &content);
        if !imports.is_empty() {
            fragment.insert("imports".to_string(), Value::Object(imports));
        }

        let classes = self.extract_classes(root, &content);
        if !classes.is_empty() {
            fragment.insert("classes".to_string(), json!(classes));
        }

        let functions = self.extract_functions(root, &content);
        if !functions.is_empty() {
            fragment.insert("functions".to_string(), json!(functions));
        }

        let variables = extract_variables(root, &content);
        if !variables.is_empty() {
            fragment.insert("variables".to_string(), json!(variables));
        }

        if self.analyze_complexity {
            fragment.insert(
                "complexity".to_string(),
                analyze_complexity(root, &content),
            );
        }

        Ok(fragment)
    }
}

fn node_text<'a>(node: Node, content: &'a str) -> &'a str {
    node.utf8_text(content.as_bytes()).unwrap_or_default()
}

fn walk_tree<'a>(node: Node<'a>, visit: &mut dyn FnMut(Node<'a>)) {
    visit(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_tree(child, visit);
    }
}

fn first_error_line(root: Node) -> Option<usize> {
    let mut line = None;
    walk_tree(root, &mut |node| {
        if line.is_none() && (node.is_error() || node.is_missing()) {
            line = Some(node.start_position().row + 1);
        }
    });
    line
}

/// Unwrap `decorated_definition` down to the wrapped definition.
fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        if let Some(definition) = node.child_by_field_name("definition") {
            return definition;
        }
    }
    node
}

/// The docstring of a definition-like node: the leading string expression of
/// its `body` block (or of the module itself).
fn body_docstring(node: Node, content: &str) -> Option<String> {
    let body = if node.kind() == "module" {
        node
    } else {
        node.child_by_field_name("body")?
    };

    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let mut stmt_cursor = first.walk();
    let string_node = first
        .named_children(&mut stmt_cursor)
        .find(|child| child.kind() == "string")?;

    Some(clean_string_literal(node_text(string_node, content)))
}

fn clean_string_literal(raw: &str) -> String {
    let stripped = raw
        .trim_start_matches(|c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F'));
    let stripped = if let Some(inner) = stripped
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
    {
        inner
    } else if let Some(inner) = stripped.strip_prefix("'''").and_then(|s| s.strip_suffix("'''")) {
        inner
    } else if let Some(inner) = stripped.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        inner
    } else if let Some(inner) = stripped.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        inner
    } else {
        stripped
    };
    stripped.trim().to_string()
}

/// Bucket every import in the file into standard-library, third-party, and
/// local groups.
fn extract_imports(root: Node, content: &str) -> Map<String, Value> {
    let standard_libs: HashSet<&str> = STANDARD_LIBS.iter().copied().collect();
    let mut standard_library: Vec<String> = Vec::new();
    let mut third_party: Vec<String> = Vec::new();
    let mut local: Vec<String> = Vec::new();

    walk_tree(root, &mut |node| match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                let name = match child.kind() {
                    "dotted_name" => node_text(child, content).to_string(),
                    "aliased_import" => child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, content).to_string())
                        .unwrap_or_default(),
                    _ => continue,
                };
                if name.is_empty() {
                    continue;
                }
                let module = name.split('.').next().unwrap_or(&name);
                if standard_libs.contains(module) {
                    standard_library.push(name);
                } else if module.starts_with(LOCAL_MODULE_PREFIX) {
                    local.push(name);
                } else {
                    third_party.push(name);
                }
            }
        }
        "import_from_statement" => {
            let Some(module_node) = node.child_by_field_name("module_name") else {
                return;
            };
            let module = node_text(module_node, content).to_string();

            let mut names: Vec<String> = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.id() == module_node.id() {
                    continue;
                }
                match child.kind() {
                    "dotted_name" => names.push(node_text(child, content).to_string()),
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            names.push(node_text(name, content).to_string());
                        }
                    }
                    "wildcard_import" => names.push("*".to_string()),
                    _ => {}
                }
            }

            let rendered = format!("{} -> {}", module, names.join(", "));
            let first_segment = module.split('.').next().unwrap_or(&module);

            if module_node.kind() == "relative_import" || module.starts_with('.') {
                local.push(rendered);
            } else if standard_libs.contains(first_segment) {
                standard_library.push(rendered);
            } else if first_segment.starts_with(LOCAL_MODULE_PREFIX) {
                local.push(rendered);
            } else {
                third_party.push(rendered);
            }
        }
        _ => {}
    });

    // Empty buckets are omitted.
    let mut imports = Map::new();
    if !standard_library.is_empty() {
        imports.insert("standard_library".to_string(), json!(standard_library));
    }
    if !third_party.is_empty() {
        imports.insert("third_party".to_string(), json!(third_party));
    }
    if !local.is_empty() {
        imports.insert("local".to_string(), json!(local));
    }
    imports
}

impl PythonExtractor {
    fn extract_classes(&self, root: Node, content: &str) -> Vec<Value> {
        let mut classes = Vec::new();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let definition = unwrap_decorated(child);
            if definition.kind() != "class_definition" {
                continue;
            }

            let name = definition
                .child_by_field_name("name")
                .map(|n| node_text(n, content).to_string())
                .unwrap_or_default();

            let mut class_info = Map::new();
            class_info.insert("name".to_string(), json!(name));
            class_info.insert("line".to_string(), json!(definition.start_position().row + 1));
            class_info.insert(
                "end_line".to_string(),
                json!(definition.end_position().row + 1),
            );

            let bases = extract_bases(definition, content);
            if !bases.is_empty() {
                class_info.insert("bases".to_string(), json!(bases));
            }

            if self.extract_docstrings {
                if let Some(docstring) = body_docstring(definition, content) {
                    class_info.insert("docstring".to_string(), json!(docstring));
                }
            }

            let methods = self.extract_methods(definition, content);
            if !methods.is_empty() {
                class_info.insert("methods".to_string(), json!(methods));
            }

            classes.push(Value::Object(class_info));
        }

        classes
    }

    fn extract_methods(&self, class_node: Node, content: &str) -> Vec<Value> {
        let Some(body) = class_node.child_by_field_name("body") else {
            return Vec::new();
        };

        let mut methods = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let definition = unwrap_decorated(child);
            if definition.kind() != "function_definition" {
                continue;
            }

            let name = definition
                .child_by_field_name("name")
                .map(|n| node_text(n, content).to_string())
                .unwrap_or_default();

            let mut method_info = Map::new();
            method_info.insert("name".to_string(), json!(name));
            method_info.insert("line".to_string(), json!(definition.start_position().row + 1));
            method_info.insert(
                "end_line".to_string(),
                json!(definition.end_position().row + 1),
            );
            method_info.insert("type".to_string(), json!(method_visibility(&name)));

            if self.extract_docstrings {
                if let Some(docstring) = body_docstring(definition, content) {
                    method_info.insert("docstring".to_string(), json!(docstring));
                }
            }

            let parameters = extract_parameters(definition, content);
            if !parameters.is_empty() {
                method_info.insert("parameters".to_string(), json!(parameters));
            }

            methods.push(Value::Object(method_info));
        }

        methods
    }

    /// Top-level functions only: the walk stays at module children, so
    /// methods (whose enclosing node is a class body) are never counted.
    fn extract_functions(&self, root: Node, content: &str) -> Vec<Value> {
        let mut functions = Vec::new();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let definition = unwrap_decorated(child);
            if definition.kind() != "function_definition" {
                continue;
            }

            let name = definition
                .child_by_field_name("name")
                .map(|n| node_text(n, content).to_string())
                .unwrap_or_default();

            let mut function_info = Map::new();
            function_info.insert("name".to_string(), json!(name));
            function_info.insert("line".to_string(), json!(definition.start_position().row + 1));
            function_info.insert(
                "end_line".to_string(),
                json!(definition.end_position().row + 1),
            );
            function_info.insert(
                "type".to_string(),
                json!(if name.starts_with('_') { "private" } else { "public" }),
            );

            if self.extract_docstrings {
                if let Some(docstring) = body_docstring(definition, content) {
                    function_info.insert("docstring".to_string(), json!(docstring));
                }
            }

            let parameters = extract_parameters(definition, content);
            if !parameters.is_empty() {
                function_info.insert("parameters".to_string(), json!(parameters));
            }

            if let Some(return_type) = definition.child_by_field_name("return_type") {
                function_info.insert("returns".to_string(), json!(node_text(return_type, content)));
            }

            functions.push(Value::Object(function_info));
        }

        functions
    }
}

fn method_visibility(name: &str) -> &'static str {
    if name.starts_with("__") && name.ends_with("__") {
        "special"
    } else if name.starts_with('_') {
        "private"
    } else {
        "public"
    }
}

fn extract_bases(class_node: Node, content: &str) -> Vec<String> {
    let Some(superclasses) = class_node.child_by_field_name("superclasses") else {
        return Vec::new();
    };

    let mut bases = Vec::new();
    let mut cursor = superclasses.walk();
    for child in superclasses.named_children(&mut cursor) {
        if matches!(child.kind(), "identifier" | "attribute") {
            bases.push(node_text(child, content).to_string());
        }
    }
    bases
}

fn extract_parameters(definition: Node, content: &str) -> Vec<Value> {
    let Some(parameters) = definition.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut cursor = parameters.walk();
    for child in parameters.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                out.push(json!({"name": node_text(child, content)}));
            }
            "typed_parameter" => {
                let name = {
                    let mut inner = child.walk();
                    let x = child
                        .named_children(&mut inner)
                        .find(|n| n.kind() == "identifier")
                        .map(|n| node_text(n, content).to_string());
                    x
                };
                let annotation = child
                    .child_by_field_name("type")
                    .map(|n| node_text(n, content).to_string());
                if let Some(name) = name {
                    match annotation {
                        Some(annotation) => {
                            out.push(json!({"name": name, "annotation": annotation}))
                        }
                        None => out.push(json!({"name": name})),
                    }
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, content).to_string());
                let annotation = child
                    .child_by_field_name("type")
                    .map(|n| node_text(n, content).to_string());
                if let Some(name) = name {
                    match annotation {
                        Some(annotation) => {
                            out.push(json!({"name": name, "annotation": annotation}))
                        }
                        None => out.push(json!({"name": name})),
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Module-level variable assignments with a best-effort literal type tag.
fn extract_variables(root: Node, content: &str) -> Vec<Value> {
    let mut variables = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "expression_statement" {
            continue;
        }
        let mut stmt_cursor = child.walk();
        for statement in child.named_children(&mut stmt_cursor) {
            if statement.kind() != "assignment" {
                continue;
            }
            let Some(left) = statement.child_by_field_name("left") else {
                continue;
            };
            if left.kind() != "identifier" {
                continue;
            }

            let mut var_info = Map::new();
            var_info.insert("name".to_string(), json!(node_text(left, content)));
            var_info.insert("line".to_string(), json!(statement.start_position().row + 1));

            if let Some(annotation) = statement.child_by_field_name("type") {
                var_info.insert("annotation".to_string(), json!(node_text(annotation, content)));
            } else if let Some(right) = statement.child_by_field_name("right") {
                var_info.insert("type".to_string(), json!(literal_type_tag(right)));
            }

            variables.push(Value::Object(var_info));
        }
    }

    variables
}

fn literal_type_tag(node: Node) -> &'static str {
    match node.kind() {
        "string" | "concatenated_string" => "str",
        "integer" | "float" => "num",
        "list" | "list_comprehension" => "list",
        "dictionary" | "dictionary_comprehension" => "dict",
        "tuple" => "tuple",
        "set" | "set_comprehension" => "set",
        "none" => "None",
        "true" | "false" => "bool",
        _ => "unknown",
    }
}

/// Statement count, branch counts, a McCabe-style approximation, and the
/// comment ratio.
fn analyze_complexity(root: Node, content: &str) -> Value {
    let mut statement_count = 0usize;
    let mut if_count = 0usize;
    let mut for_count = 0usize;
    let mut while_count = 0usize;
    let mut try_count = 0usize;

    walk_tree(root, &mut |node| {
        let kind = node.kind();
        if STATEMENT_KINDS.contains(&kind) {
            statement_count += 1;
        }
        match kind {
            "if_statement" => if_count += 1,
            "for_statement" => for_count += 1,
            "while_statement" => while_count += 1,
            "try_statement" => try_count += 1,
            _ => {}
        }
    });

    let branches = if_count + for_count + while_count + try_count;

    let comment_lines = content
        .lines()
        .filter(|line| line.trim_start().starts_with('#'))
        .count();
    let total_lines = content.matches('\n').count() + 1;

    json!({
        "statement_count": statement_count,
        "control_flow": {
            "if": if_count,
            "for": for_count,
            "while": while_count,
            "try": try_count,
        },
        "cyclomatic_complexity": 1 + branches,
        "comment_lines": comment_lines,
        "comment_ratio": round2(comment_lines as f64 / total_lines as f64),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn extract_source(source: &str) -> Fragment {
        let dir = tempdir().unwrap();
        let path = dir.path().join("module.py");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(source.as_bytes())
            .unwrap();
        PythonExtractor::new().extract(&path).unwrap()
    }

    #[test]
    fn test_simple_function() {
        let fragment = extract_source("def foo(x: int) -> int:\n    return x\n");

        let functions = fragment["functions"].as_array().unwrap();
        assert_eq!(functions.len(), 1);
        let foo = &functions[0];
        assert_eq!(foo["name"], "foo");
        assert_eq!(foo["type"], "public");
        assert_eq!(foo["returns"], "int");
        assert_eq!(foo["parameters"], json!([{"name": "x", "annotation": "int"}]));
        assert!(fragment.get("classes").is_none());
    }

    #[test]
    fn test_syntax_error_reports_no_structure() {
        let fragment = extract_source("def (:\n");

        assert!(fragment["error"].as_str().unwrap().starts_with("Syntax error"));
        assert!(fragment.get("functions").is_none());
        assert!(fragment.get("classes").is_none());
        // Counts computed before the parse survive.
        assert_eq!(fragment["line_count"], 2);
    }

    #[test]
    fn test_module_docstring() {
        let fragment = extract_source("\"\"\"Module things.\"\"\"\n\nx = 1\n");
        assert_eq!(fragment["module_docstring"], "Module things.");
    }

    #[test]
    fn test_class_with_methods() {
        let source = r#"
class Greeter(Base):
    """Says hello."""

    def __init__(self, name):
        self.name = name

    def _helper(self):
        pass

    def greet(self, loud: bool):
        return self.name
"#;
        let fragment = extract_source(source);

        let classes = fragment["classes"].as_array().unwrap();
        assert_eq!(classes.len(), 1);
        let class = &classes[0];
        assert_eq!(class["name"], "Greeter");
        assert_eq!(class["bases"], json!(["Base"]));
        assert_eq!(class["docstring"], "Says hello.");

        let methods = class["methods"].as_array().unwrap();
        assert_eq!(methods.len(), 3);
        assert_eq!(methods[0]["name"], "__init__");
        assert_eq!(methods[0]["type"], "special");
        assert_eq!(methods[1]["type"], "private");
        assert_eq!(methods[2]["type"], "public");
        assert_eq!(
            methods[2]["parameters"],
            json!([{"name": "self"}, {"name": "loud", "annotation": "bool"}])
        );

        // Methods never appear as top-level functions.
        assert!(fragment.get("functions").is_none());
    }

    #[test]
    fn test_imports_bucketed() {
        let source = "import os\nimport numpy\nimport spawn.util\nfrom pathlib import Path\nfrom . import helpers\nfrom requests import get, post\n";
        let fragment = extract_source(source);

        let imports = &fragment["imports"];
        assert_eq!(imports["standard_library"], json!(["os", "pathlib -> Path"]));
        assert_eq!(
            imports["third_party"],
            json!(["numpy", "requests -> get, post"])
        );
        let local = imports["local"].as_array().unwrap();
        assert_eq!(local[0], "spawn.util");
        assert!(local[1].as_str().unwrap().starts_with('.'));
    }

    #[test]
    fn test_variables_with_type_tags() {
        let source = "NAME = \"spawn\"\nCOUNT = 3\nITEMS = [1, 2]\nTABLE = {}\nFLAG = True\nNOTHING = None\nANNOTATED: int = 7\n";
        let fragment = extract_source(source);

        let variables = fragment["variables"].as_array().unwrap();
        let tags: Vec<(&str, Option<&str>)> = variables
            .iter()
            .map(|v| {
                (
                    v["name"].as_str().unwrap(),
                    v.get("type").and_then(|t| t.as_str()),
                )
            })
            .collect();
        assert_eq!(tags[0], ("NAME", Some("str")));
        assert_eq!(tags[1], ("COUNT", Some("num")));
        assert_eq!(tags[2], ("ITEMS", Some("list")));
        assert_eq!(tags[3], ("TABLE", Some("dict")));
        assert_eq!(tags[4], ("FLAG", Some("bool")));
        assert_eq!(tags[5], ("NOTHING", Some("None")));
        assert_eq!(variables[6]["annotation"], "int");
    }

    #[test]
    fn test_complexity_summary() {
        let source = "# leading comment\nx = 1\nif x:\n    for i in range(3):\n        x += i\nwhile x > 10:\n    break\n";
        let fragment = extract_source(source);

        let complexity = &fragment["complexity"];
        assert_eq!(complexity["control_flow"]["if"], 1);
        assert_eq!(complexity["control_flow"]["for"], 1);
        assert_eq!(complexity["control_flow"]["while"], 1);
        assert_eq!(complexity["control_flow"]["try"], 0);
        assert_eq!(complexity["cyclomatic_complexity"], 4);
        assert_eq!(complexity["comment_lines"], 1);
    }

    #[test]
    fn test_can_handle() {
        let extractor = PythonExtractor::new();
        assert!(extractor.can_handle(Path::new("script.py")));
        assert!(extractor.can_handle(Path::new("stub.pyi")));
        assert!(!extractor.can_handle(Path::new("script.rb")));
    }
}
