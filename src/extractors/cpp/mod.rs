//! C++ schema extraction.
//!
//! Namespaces nest arbitrarily, so a single top-down pass records a
//! `namespace1::namespace2::` prefix and the enclosing syntactic parent for
//! every class and free function found directly inside a namespace body.
//! Member access is resolved by scanning the access-specifier labels that
//! precede a member in its `field_declaration_list`; C++ class members
//! default to private.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::extractors::base::{
    children, children_of_type, previous_sibling, strip_c_style_delimiters, syntax_health,
    traverse_type, SourceFile,
};
use crate::extractors::tables;
use crate::language::Language;
use crate::schema::{
    ClassAttributes, ClassRecord, CppClassAttributes, CppMethodAttributes, DefaultArgs,
    FieldRecord, FileSchema, MethodAttributes, MethodRecord,
};
use crate::span::{node_key, Span, SpanKey};

const SPECIFIER_KINDS: [&str; 4] = [
    "storage_class_specifier",
    "virtual_function_specifier",
    "virtual",
    "explicit_function_specifier",
];

/// Per-file auxiliary maps, keyed by span because node identity is not
/// stable. Rebuilt for every file; never shared across extractions.
struct Maps<'t> {
    namespace: HashMap<SpanKey, String>,
    parent: HashMap<SpanKey, Node<'t>>,
}

impl<'t> Maps<'t> {
    fn build(src: &SourceFile<'t>) -> Self {
        let mut maps = Self {
            namespace: HashMap::new(),
            parent: HashMap::new(),
        };
        maps.traverse(src, src.root, "");
        maps
    }

    /// Record namespace prefixes for classes and functions directly inside
    /// each namespace body (anonymous namespaces get `(unique)`).
    fn traverse(&mut self, src: &SourceFile<'t>, node: Node<'t>, prefix: &str) {
        for child in children(node) {
            if child.kind() == "namespace_definition" {
                let namespace_name = child
                    .child_by_field_name("name")
                    .map(|n| src.text(&n))
                    .unwrap_or_else(|| "(unique)".to_string());
                for grandchild in children(child) {
                    if grandchild.kind() == "declaration_list" {
                        self.traverse(src, grandchild, &format!("{prefix}{namespace_name}::"));
                        break;
                    }
                }
            }
            if matches!(child.kind(), "class_specifier" | "function_definition") {
                self.namespace.insert(node_key(&child), prefix.to_string());
                self.parent.insert(node_key(&child), node);
            }
        }
    }
}

pub(crate) fn extract(src: &SourceFile) -> FileSchema {
    let maps = Maps::build(src);
    let table = tables(Language::Cpp);

    let namespace_nodes = traverse_type(src.root, table.namespace_types);
    let mut class_nodes = children_of_type(src.root, table.class_types);
    let mut method_nodes = children_of_type(src.root, table.method_types);
    for namespace in &namespace_nodes {
        for child in children(*namespace) {
            if child.kind() == "declaration_list" {
                class_nodes.extend(children_of_type(child, table.class_types));
                method_nodes.extend(children_of_type(child, table.method_types));
                break;
            }
        }
    }

    FileSchema {
        file_hash: src.file_hash(),
        file_docstring: file_docstring(src),
        contexts: children_of_type(src.root, table.import_types)
            .iter()
            .map(|n| src.text(n).trim().to_string())
            .collect(),
        methods: method_nodes
            .into_iter()
            .map(|n| parse_method(src, &maps, n, None))
            .collect(),
        classes: class_nodes
            .into_iter()
            .map(|n| parse_class(src, &maps, n, None))
            .collect(),
    }
}

/// The leading run of comments at the top of the file.
fn file_docstring(src: &SourceFile) -> String {
    let mut docstring = String::new();
    for child in children(src.root) {
        if child.kind() != "comment" {
            break;
        }
        docstring.push_str(&src.text(&child));
        docstring.push('\n');
    }
    strip_c_style_delimiters(&docstring).trim().to_string()
}

/// The comment directly above `node` among `parent`'s children (root when
/// no parent is known).
fn docstring_before<'t>(src: &SourceFile<'t>, node: Node<'t>, parent: Option<Node<'t>>) -> String {
    let parent = parent.unwrap_or(src.root);
    match previous_sibling(node, parent) {
        Some(prev) if prev.kind() == "comment" => {
            strip_c_style_delimiters(&src.text(&prev)).trim().to_string()
        }
        _ => String::new(),
    }
}

/// Access label for a member of a `field_declaration_list`: the most recent
/// `access_specifier` above it, defaulting to private.
fn member_access(src: &SourceFile, member: Node, parent: Node) -> Option<String> {
    if parent.kind() != "field_declaration_list" {
        return None;
    }
    let mut access = "private".to_string();
    for child in children(parent) {
        if node_key(&child) == node_key(&member) {
            return Some(access);
        }
        if child.kind() == "access_specifier" {
            if let Some(label) = child.child(0) {
                access = src.text(&label);
            }
        }
    }
    None
}

/// Specifier annotations on a function: storage/virtual/explicit before the
/// declarator, a trailing const qualifier on the declarator itself.
fn method_annotations(src: &SourceFile, node: Node) -> Vec<String> {
    let mut annotations = Vec::new();
    for child in children(node) {
        if child.kind() == "function_declarator" {
            if let Some(last) = child.child(child.child_count().wrapping_sub(1)) {
                if last.kind() == "type_qualifier" {
                    annotations.push(src.text(&last));
                }
            }
            break;
        }
        if SPECIFIER_KINDS.contains(&child.kind()) {
            annotations.push(src.text(&child));
        }
    }
    annotations
}

fn parse_method<'t>(
    src: &SourceFile<'t>,
    maps: &Maps<'t>,
    node: Node<'t>,
    parent: Option<Node<'t>>,
) -> MethodRecord {
    let span = Span::of(&node);
    let key = node_key(&node);

    let mut parent = parent;
    let mut namespace_prefix = String::new();
    if let Some(prefix) = maps.namespace.get(&key) {
        namespace_prefix = prefix.clone();
        parent = maps.parent.get(&key).copied();
    }

    // signature: everything before the compound statement
    let node_children = children(node);
    let body_index = node_children
        .iter()
        .position(|c| c.kind() == "compound_statement")
        .unwrap_or(node_children.len());
    let signature = src.select(&node_children[..body_index]);

    let body_node = node.child_by_field_name("body");
    let name = node
        .child_by_field_name("declarator")
        .and_then(|d| d.child_by_field_name("declarator"))
        .map(|n| src.text(&n))
        .unwrap_or_default();
    let return_type = node
        .child_by_field_name("type")
        .map(|n| src.text(&n))
        .unwrap_or_default();

    let mut annotations = Vec::new();
    if let Some(parent_node) = parent {
        if let Some(access) = member_access(src, node, parent_node) {
            annotations.push(access);
        }
    }
    annotations.extend(method_annotations(src, node));

    let (methods, classes) = body_node
        .map(|body| nested(src, maps, body))
        .unwrap_or_default();

    MethodRecord {
        name,
        original_string: src.span_text(&span),
        signature,
        body: body_node.map(|b| src.text(&b)).unwrap_or_default(),
        docstring: docstring_before(src, node, parent),
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        default_arguments: default_arguments(src, node),
        syntax_pass: syntax_health(node),
        attributes: MethodAttributes::Cpp(CppMethodAttributes {
            namespace_prefix,
            annotations,
            return_type,
        }),
        methods,
        classes,
    }
}

/// Defaulted parameters: `optional_parameter_declaration` nodes split at
/// their `=`.
fn default_arguments(src: &SourceFile, node: Node) -> DefaultArgs {
    let mut defaults = DefaultArgs::new();
    let declarator = match node.child_by_field_name("declarator") {
        Some(d) => d,
        None => return defaults,
    };
    let params = match declarator.child_by_field_name("parameters") {
        Some(p) => p,
        None => return defaults,
    };
    for param in children(params) {
        if param.kind().contains("optional_parameter") {
            let parts = children(param);
            if let Some(eq) = parts.iter().position(|c| c.kind() == "=") {
                defaults.insert(src.select(&parts[..eq]), src.select(&parts[eq + 1..]));
            }
        }
    }
    defaults
}

fn nested<'t>(
    src: &SourceFile<'t>,
    maps: &Maps<'t>,
    body: Node<'t>,
) -> (Vec<MethodRecord>, Vec<ClassRecord>) {
    let table = tables(Language::Cpp);
    let methods = children_of_type(body, table.method_types)
        .into_iter()
        .map(|n| parse_method(src, maps, n, Some(body)))
        .collect();
    let classes = children_of_type(body, table.class_types)
        .into_iter()
        .map(|n| parse_class(src, maps, n, Some(body)))
        .collect();
    (methods, classes)
}

fn parse_class<'t>(
    src: &SourceFile<'t>,
    maps: &Maps<'t>,
    node: Node<'t>,
    parent: Option<Node<'t>>,
) -> ClassRecord {
    let span = Span::of(&node);
    let key = node_key(&node);

    let mut parent = parent;
    let mut namespace_prefix = String::new();
    if let Some(prefix) = maps.namespace.get(&key) {
        namespace_prefix = prefix.clone();
        parent = maps.parent.get(&key).copied();
    }

    let name = node
        .child_by_field_name("name")
        .map(|n| src.text(&n))
        .unwrap_or_default();
    let body_node = node.child_by_field_name("body");

    // definition: header up to the body
    let node_children = children(node);
    let body_index = body_node
        .map(|body| {
            node_children
                .iter()
                .position(|c| node_key(c) == node_key(&body))
                .unwrap_or(node_children.len())
        })
        .unwrap_or(node_children.len());
    let definition = src.select(&node_children[..body_index]);

    let mut annotations = Vec::new();
    if let Some(parent_node) = parent {
        if let Some(access) = member_access(src, node, parent_node) {
            annotations.push(access);
        }
    }

    let mut fields = Vec::new();
    if let Some(body) = body_node {
        let mut access = "private".to_string();
        for member in children(body) {
            if member.kind() == "access_specifier" {
                if let Some(label) = member.child(0) {
                    access = src.text(&label);
                }
            }
            if member.kind() != "field_declaration" {
                continue;
            }
            let field_span = Span::of(&member);
            let mut modifiers = vec![access.clone()];
            if member
                .child(0)
                .map(|c| c.kind() == "storage_class_specifier")
                .unwrap_or(false)
            {
                modifiers.push(src.text(&member.child(0).expect("checked above")));
            }
            fields.push(FieldRecord {
                original_string: src.span_text(&field_span),
                docstring: docstring_before(src, member, Some(body)),
                modifiers,
                type_: member
                    .child_by_field_name("type")
                    .map(|n| src.text(&n))
                    .unwrap_or_default(),
                name: member
                    .child_by_field_name("declarator")
                    .map(|n| src.text(&n))
                    .unwrap_or_default(),
                byte_span: field_span.byte_span(),
                start_point: field_span.start_point,
                end_point: field_span.end_point,
                syntax_pass: syntax_health(member),
            });
        }
    }

    let (methods, classes) = body_node
        .map(|body| nested(src, maps, body))
        .unwrap_or_default();

    ClassRecord {
        name,
        original_string: src.span_text(&span),
        definition,
        body: body_node.map(|b| src.text(&b)).unwrap_or_default(),
        class_docstring: docstring_before(src, node, parent),
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        syntax_pass: syntax_health(node),
        attributes: ClassAttributes::Cpp(CppClassAttributes {
            namespace_prefix,
            annotations,
        }),
        fields,
        properties: Vec::new(),
        methods,
        classes,
    }
}

#[cfg(test)]
mod tests {
    use crate::extractors::extract_file_schema;
    use crate::language::Language;
    use crate::schema::{ClassAttributes, MethodAttributes};

    fn schema(code: &str) -> crate::schema::FileSchema {
        extract_file_schema(code, Language::Cpp).unwrap()
    }

    fn method_attrs(m: &crate::schema::MethodRecord) -> &crate::schema::CppMethodAttributes {
        match &m.attributes {
            MethodAttributes::Cpp(attrs) => attrs,
            other => panic!("wrong attribute family: {other:?}"),
        }
    }

    #[test]
    fn extracts_free_function() {
        let code = "// doubles x\nint twice(int x) {\n    return x * 2;\n}\n";
        let s = schema(code);
        let m = &s.methods[0];
        assert_eq!(m.name, "twice");
        assert_eq!(m.signature, "int twice(int x)");
        assert_eq!(m.body, "{\n    return x * 2;\n}");
        assert_eq!(method_attrs(m).return_type, "int");
        assert!(m.syntax_pass);
    }

    #[test]
    fn function_docstring_skips_file_header_run() {
        // header comments form the file docstring; a directly preceding
        // comment still reaches the function
        let code = "#include <cstdio>\n\n// helper\nvoid f() { }\n";
        let s = schema(code);
        assert_eq!(s.methods[0].docstring, "helper");
        assert_eq!(s.contexts, vec!["#include <cstdio>"]);
    }

    #[test]
    fn namespace_prefix_accumulates() {
        let code = concat!(
            "namespace outer {\n",
            "namespace inner {\n",
            "int f() { return 1; }\n",
            "class C { };\n",
            "}\n",
            "}\n",
        );
        let s = schema(code);
        let m = s.methods.iter().find(|m| m.signature.contains("f")).unwrap();
        assert_eq!(method_attrs(m).namespace_prefix, "outer::inner::");
        let c = &s.classes[0];
        match &c.attributes {
            ClassAttributes::Cpp(attrs) => {
                assert_eq!(attrs.namespace_prefix, "outer::inner::");
            }
            other => panic!("wrong attribute family: {other:?}"),
        }
    }

    #[test]
    fn anonymous_namespace_is_marked_unique() {
        let code = "namespace {\nvoid g() { }\n}\n";
        let s = schema(code);
        assert_eq!(method_attrs(&s.methods[0]).namespace_prefix, "(unique)::");
    }

    #[test]
    fn member_access_defaults_to_private() {
        let code = concat!(
            "class C {\n",
            "    int hidden;\n",
            "public:\n",
            "    int shown;\n",
            "    void m() { }\n",
            "};\n",
        );
        let s = schema(code);
        let c = &s.classes[0];
        assert_eq!(c.fields[0].modifiers, vec!["private"]);
        assert_eq!(c.fields[1].modifiers, vec!["public"]);
        let m = &c.methods[0];
        assert!(method_attrs(m).annotations.contains(&"public".to_string()));
    }

    #[test]
    fn static_and_const_annotations() {
        let code = concat!(
            "class C {\n",
            "public:\n",
            "    static int counter;\n",
            "    int get() const { return 1; }\n",
            "};\n",
        );
        let s = schema(code);
        let c = &s.classes[0];
        assert!(c.fields[0].modifiers.contains(&"static".to_string()));
        let annotations = &method_attrs(&c.methods[0]).annotations;
        assert!(annotations.contains(&"const".to_string()), "{annotations:?}");
    }

    #[test]
    fn fields_carry_type_and_docstring() {
        let code = concat!(
            "class C {\n",
            "public:\n",
            "    // count of things\n",
            "    int n;\n",
            "};\n",
        );
        let s = schema(code);
        let field = &s.classes[0].fields[0];
        assert_eq!(field.type_, "int");
        assert_eq!(field.name, "n");
        assert_eq!(field.docstring, "count of things");
    }

    #[test]
    fn default_arguments_extracted() {
        let code = "int f(int a, int b = 10) {\n    return a + b;\n}\n";
        let s = schema(code);
        let defaults = &s.methods[0].default_arguments;
        assert_eq!(defaults.get("int b"), Some("10"));
        assert_eq!(defaults.len(), 1);
    }

    #[test]
    fn span_invariant_holds() {
        let code = "namespace n {\nclass C {\npublic:\n  void m() { }\n};\n}\n";
        let s = schema(code);
        let bytes = code.as_bytes();
        let c = &s.classes[0];
        assert_eq!(
            c.original_string.as_bytes(),
            &bytes[c.byte_span.0..c.byte_span.1]
        );
        let m = &c.methods[0];
        assert_eq!(
            m.original_string.as_bytes(),
            &bytes[m.byte_span.0..m.byte_span.1]
        );
    }
}
