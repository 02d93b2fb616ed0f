//! JavaScript / TypeScript schema extraction.
//!
//! One extractor serves both grammars. Beyond plain declarations it finds
//! definitions wrapped in variable declarations, assignments, and export
//! statements (see `discovery`); a wrapped definition's record spans the
//! whole wrapper so the byte-span invariant holds for what a reader would
//! call "the definition". Signatures come from a leaf walk that stops at
//! the body, which uniformly handles functions, arrows, generators, and
//! method definitions.

mod discovery;

use tree_sitter::Node;

use crate::extractors::base::{
    children, children_of_type, nodes_equal, strip_c_style_delimiters, syntax_health, SourceFile,
};
use crate::extractors::tables;
use crate::schema::{
    ClassAttributes, ClassRecord, DefaultArgs, FileSchema, JsTsClassAttributes,
    JsTsMethodAttributes, MethodAttributes, MethodRecord,
};
use crate::span::{node_key, Span, SpanKey};

use discovery::{discover_classes, discover_functions, Wrappers, CLASS_TYPES};

const FUNCTION_BODY_TYPES: [&str; 4] = [
    "statement_block",
    "binary_expression",
    "ternary_expression",
    "new_expression",
];

const NAME_TYPES: [&str; 5] = [
    "identifier",
    "property_identifier",
    "number",
    "string",
    "computed_property_name",
];

/// Leaf-walk depth guard; real signatures are shallow, adversarial inputs
/// are not.
const MAX_SIGNATURE_DEPTH: usize = 200;

pub(crate) fn extract(src: &SourceFile) -> FileSchema {
    let method_types = tables(src.lang).method_types;
    let mut wrappers = Wrappers::default();

    let mut method_nodes = children_of_type(src.root, method_types);
    method_nodes.extend(discover_functions(src, src.root, method_types, &mut wrappers));
    let mut class_nodes = children_of_type(src.root, &CLASS_TYPES);
    class_nodes.extend(discover_classes(src, src.root, &mut wrappers));

    sort_candidates(&mut method_nodes);
    sort_candidates(&mut class_nodes);

    FileSchema {
        file_hash: src.file_hash(),
        file_docstring: file_docstring(src),
        contexts: children_of_type(src.root, tables(src.lang).import_types)
            .iter()
            .map(|n| src.text(n))
            .collect(),
        methods: method_nodes
            .into_iter()
            .map(|n| parse_method(src, &wrappers, n, None))
            .collect(),
        classes: class_nodes
            .into_iter()
            .map(|n| parse_class(src, &wrappers, n))
            .collect(),
    }
}

fn sort_candidates(nodes: &mut Vec<Node>) {
    nodes.retain(|n| n.child_count() > 0);
    nodes.sort_by_key(|n| n.start_byte());
    let mut seen: Vec<SpanKey> = Vec::new();
    nodes.retain(|n| {
        let key = node_key(n);
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

/// The file docstring is the first comment when it is multi-line, else the
/// contiguous run of single-line comments at the top of the file.
fn file_docstring(src: &SourceFile) -> String {
    let root_children = children(src.root);
    let first = match root_children.first() {
        Some(node) => *node,
        None => return String::new(),
    };
    if first.kind() != "comment" {
        return String::new();
    }
    let first_text = src.text(&first);
    if first_text.as_bytes().get(1) == Some(&b'*') {
        return strip_c_style_delimiters(&first_text);
    }
    let mut docstring_nodes: Vec<Node> = Vec::new();
    let mut previous = first;
    for child in root_children {
        if child.kind() == "comment"
            && (child.start_position().row as i64 - previous.end_position().row as i64) <= 1
        {
            docstring_nodes.push(child);
            previous = child;
        } else {
            break;
        }
    }
    strip_c_style_delimiters(&src.select(&docstring_nodes))
}

/// The comment right above `compare` in its true syntactic parent (the
/// export statement when `compare` is exported), excluding the file's first
/// comment.
fn docstring_for<'t>(src: &SourceFile<'t>, parent: Node<'t>, compare: Node<'t>) -> String {
    let parent = match compare.parent() {
        Some(p) if p.kind() == "export_statement" => p,
        _ => parent,
    };
    let siblings = children(parent);
    let index = match siblings.iter().position(|c| nodes_equal(c, &compare)) {
        Some(i) => i,
        None => return String::new(),
    };
    if index == 0 {
        return String::new();
    }
    let prev = siblings[index - 1];
    if prev.kind() != "comment" {
        return String::new();
    }
    if let Some(first) = src.root.child(0) {
        if nodes_equal(&prev, &first) {
            return String::new();
        }
    }
    strip_c_style_delimiters(&src.text(&prev))
}

/// Collect the leaf nodes up to (excluding) the body, harvesting parameter
/// defaults along the way. Returns `(leaves, body_reached)`.
fn signature_leaves<'t>(
    src: &SourceFile<'t>,
    node: Node<'t>,
    defaults: &mut DefaultArgs,
    depth: usize,
) -> (Vec<Node<'t>>, bool) {
    if node.child_count() == 0 {
        return (vec![node], false);
    }
    if depth > MAX_SIGNATURE_DEPTH {
        return (Vec::new(), true);
    }
    let body = node.child_by_field_name("body");
    let mut leaves = Vec::new();
    for child in children(node) {
        if let Some(body_node) = body {
            if nodes_equal(&body_node, &child) {
                return (leaves, true);
            }
        }
        match child.kind() {
            "required_parameter" | "optional_parameter" => {
                collect_parameter_default(src, child, defaults);
            }
            "assignment_pattern" => {
                // plain JavaScript default: `b = 10` inside the parameter list
                if let (Some(left), Some(right)) = (
                    child.child_by_field_name("left"),
                    child.child_by_field_name("right"),
                ) {
                    defaults.insert(src.text(&left), src.text(&right));
                }
            }
            _ => {}
        }
        let (more, end_found) = signature_leaves(src, child, defaults, depth + 1);
        leaves.extend(more);
        if end_found {
            return (leaves, true);
        }
    }
    (leaves, false)
}

/// TypeScript parameter nodes: `name [: type] [= value]`. The key joins the
/// name and its type annotation; parameters without a default contribute
/// nothing.
fn collect_parameter_default(src: &SourceFile, param: Node, defaults: &mut DefaultArgs) {
    let mut key = String::new();
    let mut type_key = String::new();
    let mut value = String::new();
    let mut has_default = false;
    for child in children(param) {
        match child.kind() {
            "identifier" => key = src.text(&child),
            "type_annotation" => type_key = src.text(&child),
            "=" => has_default = true,
            _ => {
                if has_default {
                    value = src.text(&child);
                }
            }
        }
    }
    if has_default {
        defaults.insert(format!("{key}{type_key}"), value);
    }
}

/// Signature and defaults of a definition (or its wrapping statement).
fn signature_and_defaults(src: &SourceFile, node: Node) -> (String, DefaultArgs) {
    let mut defaults = DefaultArgs::new();
    let (leaves, _) = signature_leaves(src, node, &mut defaults, 0);
    let signature = src.select(&leaves).replace("=>", "").trim().to_string();
    (signature, defaults)
}

fn parse_method<'t>(
    src: &SourceFile<'t>,
    wrappers: &Wrappers<'t>,
    node: Node<'t>,
    parent: Option<Node<'t>>,
) -> MethodRecord {
    let key = node_key(&node);
    let wrapper = wrappers.wrapper_of(&key);
    let record_node = wrapper.unwrap_or(node);
    let span = Span::of(&record_node);

    let (signature, default_arguments) = signature_and_defaults(src, record_node);

    let body = children_of_type(node, &FUNCTION_BODY_TYPES)
        .first()
        .map(|b| src.text(b))
        .unwrap_or_default();

    let mut name = node
        .child_by_field_name("name")
        .map(|n| src.text(&n))
        .unwrap_or_default();
    if let Some(declared) = wrappers.name.get(&key) {
        name = declared.clone();
    }

    let node_children = children(node);
    let decorator_count = node_children
        .iter()
        .take_while(|c| c.kind() == "decorator")
        .count();
    let name_index = node_children
        .iter()
        .position(|c| NAME_TYPES.contains(&c.kind()));

    let decorators = src.select_each(&node_children[..decorator_count]);
    let keywords = match name_index {
        Some(i) if i > decorator_count => src.select(&node_children[decorator_count..i]),
        _ => String::new(),
    };
    if name.is_empty() {
        if let Some(i) = name_index {
            name = src.text(&node_children[i]);
        }
    }

    let docstring = docstring_for(src, parent.unwrap_or(src.root), record_node);

    let methods = node
        .child_by_field_name("body")
        .map(|body| nested_methods(src, body))
        .unwrap_or_default();

    MethodRecord {
        name,
        original_string: src.span_text(&span),
        signature,
        body,
        docstring,
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        default_arguments,
        syntax_pass: syntax_health(node),
        attributes: MethodAttributes::JsTs(JsTsMethodAttributes {
            decorators,
            keywords,
        }),
        methods,
        classes: Vec::new(),
    }
}

fn nested_methods(src: &SourceFile, body: Node) -> Vec<MethodRecord> {
    let method_types = tables(src.lang).method_types;
    // local discovery keeps the per-body wrapper maps out of the shared ones
    let mut local = Wrappers::default();
    let mut nodes = children_of_type(body, method_types);
    nodes.extend(discover_functions(src, body, method_types, &mut local));
    sort_candidates(&mut nodes);
    nodes
        .into_iter()
        .map(|n| parse_method(src, &local, n, Some(body)))
        .collect()
}

fn parse_class<'t>(src: &SourceFile<'t>, wrappers: &Wrappers<'t>, node: Node<'t>) -> ClassRecord {
    let key = node_key(&node);
    let wrapper = wrappers.wrapper_of(&key);
    let record_node = wrapper.unwrap_or(node);
    let span = Span::of(&record_node);

    let node_children = children(node);
    let heritage_end = node_children
        .iter()
        .position(|c| c.kind() == "class_heritage")
        .unwrap_or(1)
        .min(node_children.len().saturating_sub(1));
    let definition = src.select(&node_children[..=heritage_end]);

    let mut name = node
        .child_by_field_name("name")
        .map(|n| src.text(&n))
        .unwrap_or_default();
    if name.is_empty() {
        if let Some(declared) = wrappers.name.get(&key) {
            name = declared.clone();
        }
    }
    if name.is_empty() {
        if let Some(wrapper_node) = wrapper {
            if let Some(declarator) =
                children_of_type(wrapper_node, &["variable_declarator"]).first()
            {
                name = declarator
                    .child_by_field_name("name")
                    .map(|n| src.text(&n))
                    .unwrap_or_default();
            }
        }
    }

    let class_body = children_of_type(node, &["class_body"]).first().copied();
    let methods = class_body
        .map(|body| {
            children(body)
                .into_iter()
                .filter(|c| c.kind() == "method_definition")
                .map(|m| parse_method(src, wrappers, m, Some(body)))
                .collect()
        })
        .unwrap_or_default();
    let classes = class_body
        .map(|body| {
            children_of_type(body, &CLASS_TYPES)
                .into_iter()
                .map(|c| parse_class(src, wrappers, c))
                .collect()
        })
        .unwrap_or_default();

    let expression = node_children
        .last()
        .map(|last| src.select_each(&children_of_type(*last, &["public_field_definition"])))
        .unwrap_or_default();

    ClassRecord {
        name,
        original_string: src.span_text(&span),
        definition,
        body: class_body.map(|b| src.text(&b)).unwrap_or_default(),
        class_docstring: docstring_for(src, src.root, record_node),
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        syntax_pass: syntax_health(node),
        attributes: ClassAttributes::JsTs(JsTsClassAttributes {
            decorators: src.select_each(&children_of_type(node, &["decorator"])),
            heritage: src.select_each(&children_of_type(node, &["class_heritage"])),
            expression,
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
    use crate::schema::ClassAttributes;

    fn schema_js(code: &str) -> crate::schema::FileSchema {
        extract_file_schema(code, Language::JavaScript).unwrap()
    }

    fn schema_ts(code: &str) -> crate::schema::FileSchema {
        extract_file_schema(code, Language::TypeScript).unwrap()
    }

    #[test]
    fn extracts_function_declaration() {
        let code = "// doubles x\nfunction twice(x) {\n    return x * 2;\n}\n";
        let s = schema_js(code);
        assert_eq!(s.methods.len(), 1);
        let m = &s.methods[0];
        assert_eq!(m.name, "twice");
        assert_eq!(m.signature, "function twice(x)");
        assert_eq!(m.body, "{\n    return x * 2;\n}");
        assert!(m.syntax_pass);
    }

    #[test]
    fn function_assigned_to_variable_is_found() {
        let code = "const handler = function(ev) {\n    return ev.id;\n};\n";
        let s = schema_js(code);
        assert_eq!(s.methods.len(), 1);
        let m = &s.methods[0];
        assert_eq!(m.name, "handler");
        // the record spans the whole declaration
        assert!(m.original_string.starts_with("const handler"));
        assert_eq!(
            m.original_string.as_bytes(),
            &code.as_bytes()[m.byte_span.0..m.byte_span.1]
        );
    }

    #[test]
    fn arrow_function_signature_drops_the_arrow() {
        let code = "const add = (a, b) => a + b;\n";
        let s = schema_js(code);
        let m = &s.methods[0];
        assert_eq!(m.name, "add");
        assert_eq!(m.signature, "const add = (a, b)");
    }

    #[test]
    fn exported_function_spans_the_export() {
        let code = "export function api(x) {\n    return x;\n}\n";
        let s = schema_js(code);
        let m = &s.methods[0];
        assert!(m.original_string.starts_with("export function"));
        assert_eq!(
            m.original_string.as_bytes(),
            &code.as_bytes()[m.byte_span.0..m.byte_span.1]
        );
    }

    #[test]
    fn javascript_default_arguments() {
        let code = "function f(a, b = 10) {\n    return b;\n}\n";
        let s = schema_js(code);
        assert_eq!(s.methods[0].default_arguments.get("b"), Some("10"));
        assert_eq!(s.methods[0].default_arguments.len(), 1);
    }

    #[test]
    fn typescript_default_arguments_include_type() {
        let code = "function f(a: number, b: number = 10): number {\n    return b;\n}\n";
        let s = schema_ts(code);
        let defaults = &s.methods[0].default_arguments;
        assert_eq!(defaults.get("b: number"), Some("10"));
        assert_eq!(defaults.len(), 1);
    }

    #[test]
    fn class_with_methods_and_heritage() {
        let code = concat!(
            "import { Shape } from './shape';\n",
            "\n",
            "/** A circle. */\n",
            "class Circle extends Shape {\n",
            "    area() {\n",
            "        return 3.14 * this.r * this.r;\n",
            "    }\n",
            "}\n",
        );
        let s = schema_js(code);
        assert_eq!(s.contexts, vec!["import { Shape } from './shape';"]);
        let c = &s.classes[0];
        assert_eq!(c.name, "Circle");
        assert_eq!(c.definition, "class Circle extends Shape");
        assert_eq!(c.class_docstring, " A circle.");
        match &c.attributes {
            ClassAttributes::JsTs(attrs) => {
                assert_eq!(attrs.heritage, vec!["extends Shape"]);
            }
            other => panic!("wrong attribute family: {other:?}"),
        }
        assert_eq!(c.methods.len(), 1);
        assert_eq!(c.methods[0].name, "area");
    }

    #[test]
    fn method_docstring_inside_class_body() {
        let code = concat!(
            "class A {\n",
            "    // computes the area\n",
            "    area() {\n",
            "        return 1;\n",
            "    }\n",
            "}\n",
        );
        let s = schema_js(code);
        assert_eq!(s.classes[0].methods[0].docstring, " computes the area");
    }

    #[test]
    fn file_docstring_from_comment_run() {
        let code = "// line one\n// line two\nfunction f() { }\n";
        let s = schema_js(code);
        assert_eq!(s.file_docstring, " line one\n line two");
    }

    #[test]
    fn file_docstring_multiline_comment() {
        let code = "/* header\n   text */\nfunction f() { }\n";
        let s = schema_js(code);
        assert!(s.file_docstring.contains("header"));
    }

    #[test]
    fn leading_comment_is_not_reused_as_docstring() {
        let code = "// the only comment\nfunction f() { }\n";
        let s = schema_js(code);
        assert_eq!(s.methods[0].docstring, "");
    }

    #[test]
    fn nested_function_in_body() {
        let code = concat!(
            "function outer() {\n",
            "    function inner() {\n",
            "        return 1;\n",
            "    }\n",
            "    return inner;\n",
            "}\n",
        );
        let s = schema_js(code);
        assert_eq!(s.methods.len(), 1);
        assert_eq!(s.methods[0].methods.len(), 1);
        assert_eq!(s.methods[0].methods[0].name, "inner");
    }

    #[test]
    fn exported_class_spans_the_export() {
        let code = "export class Api {\n    call() { return 1; }\n}\n";
        let s = schema_js(code);
        let c = &s.classes[0];
        assert_eq!(c.name, "Api");
        assert!(c.original_string.starts_with("export class"));
        assert_eq!(
            c.original_string.as_bytes(),
            &code.as_bytes()[c.byte_span.0..c.byte_span.1]
        );
    }

    #[test]
    fn iife_wrapped_function_is_found() {
        let code = "var Widget = (function() {\n    return 1;\n}());\n";
        let s = schema_js(code);
        assert_eq!(s.methods.len(), 1);
        // the record spans the whole declaration
        let m = &s.methods[0];
        assert!(m.original_string.starts_with("var Widget"));
        assert_eq!(
            m.original_string.as_bytes(),
            &code.as_bytes()[m.byte_span.0..m.byte_span.1]
        );
    }

    #[test]
    fn generator_keywords_are_captured() {
        let code = "async function go() {\n    return 1;\n}\n";
        let s = schema_js(code);
        let m = &s.methods[0];
        assert_eq!(m.name, "go");
        match &m.attributes {
            crate::schema::MethodAttributes::JsTs(attrs) => {
                assert_eq!(attrs.keywords, "async function");
            }
            other => panic!("wrong attribute family: {other:?}"),
        }
    }
}
