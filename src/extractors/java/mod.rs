//! Java schema extraction.
//!
//! Classes carry a `modifiers` node holding annotations and access keywords
//! in declaration order; the record keeps the verbatim modifier run and also
//! splits it into marker annotations (`@Foo`) and everything else. Docstrings
//! are the single comment node directly above a declaration.

use tree_sitter::Node;

use crate::extractors::base::{
    children, children_of_type, nodes_equal, previous_sibling, strip_c_style_delimiters,
    syntax_health, SourceFile,
};
use crate::extractors::tables;
use crate::language::Language;
use crate::schema::{
    ClassAttributes, ClassRecord, DefaultArgs, FieldRecord, FileSchema, JavaClassAttributes,
    JavaMethodAttributes, MethodAttributes, MethodRecord,
};
use crate::span::Span;

fn is_comment(kind: &str) -> bool {
    kind.contains("comment")
}

pub(crate) fn extract(src: &SourceFile) -> FileSchema {
    let table = tables(Language::Java);
    FileSchema {
        file_hash: src.file_hash(),
        file_docstring: file_docstring(src),
        contexts: children_of_type(src.root, table.import_types)
            .iter()
            .map(|n| src.text(n).trim().to_string())
            .collect(),
        methods: children_of_type(src.root, table.method_types)
            .into_iter()
            .map(|n| parse_method(src, n, src.root))
            .collect(),
        classes: children_of_type(src.root, table.class_types)
            .into_iter()
            .map(|n| parse_class(src, n, src.root))
            .collect(),
    }
}

/// The leading run of comments at the top of the file.
fn file_docstring(src: &SourceFile) -> String {
    let mut docstring = String::new();
    for child in children(src.root) {
        if !is_comment(child.kind()) {
            break;
        }
        docstring.push_str(&src.text(&child));
        docstring.push('\n');
    }
    strip_c_style_delimiters(&docstring).trim().to_string()
}

/// The comment node directly above `node` among `parent`'s children,
/// excluding the file's leading comment so it is not attributed twice.
fn docstring_before(src: &SourceFile, node: Node, parent: Node) -> String {
    let prev = match previous_sibling(node, parent) {
        Some(prev) => prev,
        None => return String::new(),
    };
    if !is_comment(prev.kind()) {
        return String::new();
    }
    if let Some(first) = src.root.child(0) {
        if nodes_equal(&prev, &first) {
            return String::new();
        }
    }
    strip_c_style_delimiters(&src.text(&prev))
}

/// Split a `modifiers` node into its verbatim run, marker annotations, and
/// non-marker entries.
fn split_modifiers(src: &SourceFile, node: Node) -> (String, Vec<String>, Vec<String>) {
    let modifiers_node = children_of_type(node, &["modifiers"]);
    let modifiers_node = match modifiers_node.first() {
        Some(n) => *n,
        None => return (String::new(), Vec::new(), Vec::new()),
    };
    let mut markers = Vec::new();
    let mut non_markers = Vec::new();
    for child in children(modifiers_node) {
        if child.kind() == "marker_annotation" {
            markers.push(src.text(&child));
        } else if !is_comment(child.kind()) {
            non_markers.push(src.text(&child));
        }
    }
    (src.text(&modifiers_node), markers, non_markers)
}

fn parse_method(src: &SourceFile, node: Node, parent: Node) -> MethodRecord {
    let span = Span::of(&node);
    let node_children = children(node);

    let (modifiers, markers, non_markers) = split_modifiers(src, node);
    let return_type = node
        .child_by_field_name("type")
        .map(|n| src.text(&n))
        .unwrap_or_default();
    let name = node
        .child_by_field_name("name")
        .map(|n| src.text(&n))
        .unwrap_or_default();

    // signature runs through the formal parameter list
    let signature = node_children
        .iter()
        .position(|c| c.kind() == "formal_parameters")
        .map(|i| src.select(&node_children[..=i]))
        .unwrap_or_default();

    let body_node = node.child_by_field_name("body");
    let (methods, classes) = body_node
        .map(|body| nested(src, body))
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
        default_arguments: DefaultArgs::new(),
        syntax_pass: syntax_health(node),
        attributes: MethodAttributes::Java(JavaMethodAttributes {
            modifiers,
            marker_annotations: markers,
            non_marker_annotations: non_markers,
            return_type,
        }),
        methods,
        classes,
    }
}

fn nested(src: &SourceFile, body: Node) -> (Vec<MethodRecord>, Vec<ClassRecord>) {
    let table = tables(Language::Java);
    let methods = children_of_type(body, table.method_types)
        .into_iter()
        .map(|n| parse_method(src, n, body))
        .collect();
    let classes = children_of_type(body, table.class_types)
        .into_iter()
        .map(|n| parse_class(src, n, body))
        .collect();
    (methods, classes)
}

fn parse_field(src: &SourceFile, node: Node, body: Node) -> FieldRecord {
    let span = Span::of(&node);
    let (_, markers, non_markers) = split_modifiers(src, node);
    let mut modifiers = markers;
    modifiers.extend(non_markers);
    FieldRecord {
        original_string: src.span_text(&span),
        docstring: docstring_before(src, node, body),
        modifiers,
        type_: node
            .child_by_field_name("type")
            .map(|n| src.text(&n))
            .unwrap_or_default(),
        name: node
            .child_by_field_name("declarator")
            .and_then(|d| d.child_by_field_name("name"))
            .map(|n| src.text(&n))
            .unwrap_or_default(),
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        syntax_pass: syntax_health(node),
    }
}

fn parse_class(src: &SourceFile, node: Node, parent: Node) -> ClassRecord {
    let span = Span::of(&node);
    let node_children = children(node);

    let (modifiers, markers, non_markers) = split_modifiers(src, node);
    let name_node = node.child_by_field_name("name");
    let name = name_node.map(|n| src.text(&n)).unwrap_or_default();

    // definition runs through the class name
    let definition = node_children
        .iter()
        .position(|c| c.kind() == "identifier")
        .map(|i| src.select(&node_children[..=i]))
        .unwrap_or_default();

    let body_node = node.child_by_field_name("body");
    let fields = body_node
        .map(|body| {
            children_of_type(body, &["field_declaration"])
                .into_iter()
                .map(|f| parse_field(src, f, body))
                .collect()
        })
        .unwrap_or_default();
    let (methods, classes) = body_node
        .map(|body| nested(src, body))
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
        attributes: ClassAttributes::Java(JavaClassAttributes {
            modifiers,
            marker_annotations: markers,
            non_marker_annotations: non_markers,
        }),
        fields,
        properties: Vec::new(),
        methods,
        classes,
    }
}
