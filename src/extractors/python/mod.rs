//! Python schema extraction.
//!
//! Top-level definitions are direct children of the module node, possibly
//! wrapped in a `decorated_definition`. Docstrings are the leading string
//! expression of a body rather than preceding comments, so adjacency lookups
//! run inside the body, not among siblings.

use tree_sitter::Node;

use crate::extractors::base::{
    children, children_of_type, clean_hash_docstring, syntax_health, SourceFile,
};
use crate::extractors::tables;
use crate::language::Language;
use crate::schema::{
    ClassAttributes, ClassRecord, DefaultArgs, FileSchema, MethodAttributes, MethodRecord,
    PythonClassAttributes, PythonMethodAttributes,
};
use crate::span::Span;

const DOCSTRING_TYPES: [&str; 2] = ["string", "comment"];

/// A definition node of kind `defn`, possibly wrapped in a
/// `decorated_definition`. Returns the outer node (decorators belong to the
/// record's span).
fn distinguish_decorated<'t>(node: Node<'t>, defn: &str) -> Option<Node<'t>> {
    if node.kind() == defn {
        return Some(node);
    }
    if node.kind() == "decorated_definition" {
        if let Some(last) = node.child(node.child_count().wrapping_sub(1)) {
            if last.kind() == defn {
                return Some(node);
            }
        }
    }
    None
}

fn decorated_defns<'t>(nodes: &[Node<'t>], defn: &str) -> Vec<Node<'t>> {
    nodes
        .iter()
        .filter_map(|n| distinguish_decorated(*n, defn))
        .collect()
}

pub(crate) fn extract(src: &SourceFile) -> FileSchema {
    let root_children = children(src.root);
    FileSchema {
        file_hash: src.file_hash(),
        file_docstring: file_docstring(src),
        contexts: file_context(src),
        methods: decorated_defns(&root_children, "function_definition")
            .into_iter()
            .map(|n| parse_method(src, n))
            .collect(),
        classes: decorated_defns(&root_children, "class_definition")
            .into_iter()
            .map(|n| parse_class(src, n))
            .collect(),
    }
}

/// The first single- or multi-line comment in the file.
fn file_docstring(src: &SourceFile) -> String {
    let first = match src.root.child(0) {
        Some(node) => node,
        None => return String::new(),
    };
    let raw = if first
        .child(0)
        .map(|c| c.kind() == "string")
        .unwrap_or(false)
    {
        src.text(&first.child(0).expect("checked above"))
    } else if first.kind() == "comment" {
        src.text(&first)
    } else {
        return String::new();
    };
    clean_hash_docstring(&raw)
}

/// Global import and assignment statements, in source order per group.
fn file_context(src: &SourceFile) -> Vec<String> {
    let mut context: Vec<String> = children_of_type(src.root, tables(Language::Python).import_types)
        .iter()
        .map(|n| src.text(n))
        .collect();
    for child in children(src.root) {
        if child.kind() == "expression_statement"
            && child.child(0).map(|c| c.kind() == "assignment").unwrap_or(false)
        {
            context.push(src.text(&child));
        }
    }
    context
}

/// Split a `decorated_definition` into its decorators and the wrapped
/// definition; an unwrapped node passes through with no decorators.
fn unwrap_decorators<'t>(src: &SourceFile, node: Node<'t>) -> (Vec<String>, Node<'t>) {
    if node.kind() != "decorated_definition" {
        return (Vec::new(), node);
    }
    let mut decorators = Vec::new();
    let mut inner = node;
    for child in children(node) {
        if child.kind() == "decorator" {
            decorators.push(src.text(&child));
        } else if matches!(child.kind(), "function_definition" | "class_definition") {
            inner = child;
        }
    }
    (decorators, inner)
}

fn parse_method(src: &SourceFile, node: Node) -> MethodRecord {
    let span = Span::of(&node);
    let (decorators, defn) = unwrap_decorators(src, node);
    let defn_children = children(defn);

    let mut name = String::new();
    let mut default_arguments = DefaultArgs::new();
    let head = &defn_children[..defn_children.len().saturating_sub(1)];
    for def_child in head {
        if def_child.kind() == "identifier" {
            name = src.text(def_child).trim().to_string();
        }
        if def_child.kind() == "parameters" {
            for arg_child in children(*def_child) {
                if arg_child.kind().contains("default") {
                    let parts = children(arg_child);
                    if let Some(eq) = parts.iter().position(|c| c.kind() == "=") {
                        default_arguments
                            .insert(src.select(&parts[..eq]), src.select(&parts[eq + 1..]));
                    }
                }
            }
        }
    }

    let mut signature: Vec<String> = decorators.clone();
    signature.push(src.select(head));

    let (docstring, body) = body_and_docstring(src, defn);
    let (methods, classes) = nested_definitions(src, defn);

    MethodRecord {
        name,
        original_string: src.span_text(&span),
        signature: signature.join("\n"),
        body,
        docstring,
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        default_arguments,
        syntax_pass: syntax_health(node),
        attributes: MethodAttributes::Python(PythonMethodAttributes { decorators }),
        methods,
        classes,
    }
}

/// A body's docstring is its first statement when that statement is a bare
/// string; the body text then excludes it.
fn body_and_docstring(src: &SourceFile, defn: Node) -> (String, String) {
    let body_node = match defn.child(defn.child_count().wrapping_sub(1)) {
        Some(node) => node,
        None => return (String::new(), String::new()),
    };
    let statements = children(body_node);
    if let Some(first) = statements.first() {
        if let Some(leading) = first.child(0) {
            if DOCSTRING_TYPES.contains(&leading.kind()) && first.kind() == "expression_statement" {
                let docstring = clean_hash_docstring(&src.text(&leading));
                let body = src.select(&statements[1..]);
                return (docstring, body);
            }
        }
    }
    (String::new(), src.text(&body_node))
}

/// Definitions nested directly inside a definition's body.
fn nested_definitions(src: &SourceFile, defn: Node) -> (Vec<MethodRecord>, Vec<ClassRecord>) {
    let body_node = match defn.child(defn.child_count().wrapping_sub(1)) {
        Some(node) => node,
        None => return (Vec::new(), Vec::new()),
    };
    let statements = children(body_node);
    let methods = decorated_defns(&statements, "function_definition")
        .into_iter()
        .map(|n| parse_method(src, n))
        .collect();
    let classes = decorated_defns(&statements, "class_definition")
        .into_iter()
        .map(|n| parse_class(src, n))
        .collect();
    (methods, classes)
}

fn parse_class(src: &SourceFile, node: Node) -> ClassRecord {
    let span = Span::of(&node);
    let (decorators, defn) = unwrap_decorators(src, node);
    let defn_children = children(defn);

    let defn_end = defn_children
        .iter()
        .position(|c| c.kind() == ":")
        .map(|i| i + 1)
        .unwrap_or(defn_children.len().saturating_sub(1));
    let mut definition: Vec<String> = decorators.clone();
    definition.push(src.select(&defn_children[..defn_end]));

    let name = defn_children
        .get(1)
        .map(|n| src.text(n))
        .unwrap_or_default();

    let body_node = defn.child(defn.child_count().wrapping_sub(1));
    let mut class_docstring = String::new();
    let mut attribute_expressions = Vec::new();
    let mut methods = Vec::new();
    let mut classes = Vec::new();
    if let Some(body) = body_node {
        for (i, child) in children(body).into_iter().enumerate() {
            let leading = child.child(0);
            if i == 0 {
                if let Some(first) = leading {
                    if first.kind() == "string" {
                        class_docstring = clean_hash_docstring(&src.text(&first));
                    }
                }
            }
            if leading.map(|c| c.kind() == "assignment").unwrap_or(false) {
                attribute_expressions.push(src.text(&child));
            }
            if let Some(method) = distinguish_decorated(child, "function_definition") {
                methods.push(parse_method(src, method));
            }
            if let Some(class) = distinguish_decorated(child, "class_definition") {
                classes.push(parse_class(src, class));
            }
        }
    }

    ClassRecord {
        name,
        original_string: src.span_text(&span),
        definition: definition.join("\n"),
        body: body_node.map(|b| src.text(&b)).unwrap_or_default(),
        class_docstring,
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        syntax_pass: syntax_health(node),
        attributes: ClassAttributes::Python(PythonClassAttributes {
            decorators,
            attribute_expressions,
        }),
        fields: Vec::new(),
        properties: Vec::new(),
        methods,
        classes,
    }
}

#[cfg(test)]
mod tests {
    use crate::extractors::extract_file_schema;
    use crate::language::Language;
    use crate::schema::MethodAttributes;

    fn schema(code: &str) -> crate::schema::FileSchema {
        extract_file_schema(code, Language::Python).unwrap()
    }

    #[test]
    fn extracts_top_level_function() {
        let code = "def multiply_images(image1, image2):\n    return image1 * image2\n";
        let s = schema(code);
        assert_eq!(s.methods.len(), 1);
        let m = &s.methods[0];
        assert_eq!(m.name, "multiply_images");
        assert_eq!(
            m.original_string,
            "def multiply_images(image1, image2):\n    return image1 * image2"
        );
        assert_eq!(m.signature, "def multiply_images(image1, image2):");
        assert_eq!(m.body, "return image1 * image2");
        assert_eq!(m.start_point.row, 0);
        assert_eq!(m.end_point.row, 1);
        assert!(m.syntax_pass);
    }

    #[test]
    fn span_invariant_holds() {
        let code = "x = 1\n\ndef f(a):\n    return a\n\nclass C:\n    pass\n";
        let s = schema(code);
        let bytes = code.as_bytes();
        let m = &s.methods[0];
        assert_eq!(
            m.original_string.as_bytes(),
            &bytes[m.byte_span.0..m.byte_span.1]
        );
        let c = &s.classes[0];
        assert_eq!(
            c.original_string.as_bytes(),
            &bytes[c.byte_span.0..c.byte_span.1]
        );
    }

    #[test]
    fn extracts_default_arguments() {
        let s = schema("def f(a, b=10):\n    return b\n");
        let m = &s.methods[0];
        assert_eq!(m.default_arguments.len(), 1);
        assert_eq!(m.default_arguments.get("b"), Some("10"));
    }

    #[test]
    fn default_arguments_keep_declaration_order() {
        let s = schema("def f(a, b=10, c='x'):\n    return b\n");
        let keys: Vec<&str> = s.methods[0].default_arguments.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn typed_default_arguments_keep_annotation() {
        let s = schema("def f(a, b: int = 10):\n    return b\n");
        let m = &s.methods[0];
        assert_eq!(m.default_arguments.get("b: int"), Some("10"));
    }

    #[test]
    fn decorators_join_the_signature() {
        let code = "@wraps(fn)\n@cache\ndef f():\n    return 1\n";
        let s = schema(code);
        let m = &s.methods[0];
        assert_eq!(m.signature, "@wraps(fn)\n@cache\ndef f():");
        match &m.attributes {
            MethodAttributes::Python(attrs) => {
                assert_eq!(attrs.decorators, vec!["@wraps(fn)", "@cache"]);
            }
            other => panic!("wrong attribute family: {other:?}"),
        }
        // the record's span covers the decorators
        assert!(m.original_string.starts_with("@wraps(fn)"));
    }

    #[test]
    fn method_docstring_is_separated_from_body() {
        let code = "def f():\n    \"\"\"Docs here.\"\"\"\n    return 1\n";
        let m = &schema(code).methods[0];
        assert_eq!(m.docstring, "Docs here.");
        assert_eq!(m.body, "return 1");
    }

    #[test]
    fn file_docstring_and_contexts() {
        let code = "\"\"\"Module docs.\"\"\"\nimport os\nfrom sys import path\nX = 1\n";
        let s = schema(code);
        assert_eq!(s.file_docstring, "Module docs.");
        assert_eq!(
            s.contexts,
            vec!["import os", "from sys import path", "X = 1"]
        );
    }

    #[test]
    fn class_schema_with_members() {
        let code = concat!(
            "class Point:\n",
            "    \"\"\"A point.\"\"\"\n",
            "    dims = 2\n",
            "\n",
            "    def norm(self):\n",
            "        return abs(self.x)\n",
            "\n",
            "    class Inner:\n",
            "        pass\n",
        );
        let s = schema(code);
        let c = &s.classes[0];
        assert_eq!(c.name, "Point");
        assert_eq!(c.definition, "class Point:");
        assert_eq!(c.class_docstring, "A point.");
        match &c.attributes {
            crate::schema::ClassAttributes::Python(attrs) => {
                assert_eq!(attrs.attribute_expressions, vec!["dims = 2"]);
            }
            other => panic!("wrong attribute family: {other:?}"),
        }
        assert_eq!(c.methods.len(), 1);
        assert_eq!(c.methods[0].name, "norm");
        assert_eq!(c.classes.len(), 1);
        assert_eq!(c.classes[0].name, "Inner");
    }

    #[test]
    fn nesting_depth_mirrors_source() {
        let code = concat!(
            "class Outer:\n",
            "    def method(self):\n",
            "        def helper():\n",
            "            return 1\n",
            "        return helper()\n",
        );
        let s = schema(code);
        let outer = &s.classes[0];
        let method = &outer.methods[0];
        assert_eq!(method.name, "method");
        assert_eq!(method.methods.len(), 1);
        assert_eq!(method.methods[0].name, "helper");
    }

    #[test]
    fn malformed_sibling_does_not_abort_extraction() {
        let code = "def broken(:\n    pass\n\ndef fine():\n    return 1\n";
        let s = schema(code);
        assert!(s.methods.iter().any(|m| m.name == "fine" && m.syntax_pass));
    }
}
