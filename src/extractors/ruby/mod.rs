//! Ruby schema extraction.
//!
//! Modules nest into a dotted namespace prefix recorded per class and
//! method. Ruby's reopened-class idiom means one qualified name can own
//! several disjoint bodies in a single file; the schema keeps the first
//! record and appends later bodies' methods in discovery order, tracking
//! consumed spans so nothing is counted twice.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::extractors::base::{
    children, children_of_type, clean_hash_docstring, previous_sibling, syntax_health,
    traverse_type, SourceFile,
};
use crate::extractors::tables;
use crate::language::Language;
use crate::schema::{
    ClassAttributes, ClassRecord, DefaultArgs, FileSchema, MethodAttributes, MethodRecord,
    RubyClassAttributes, RubyMethodAttributes,
};
use crate::span::{node_key, Span, SpanKey};

/// The statement container of a class/module/method body, when present.
fn body_of(node: Node) -> Option<Node> {
    node.child_by_field_name("body")
        .or_else(|| children_of_type(node, &["body_statement"]).first().copied())
}

struct Maps {
    namespace: HashMap<SpanKey, String>,
}

impl Maps {
    fn build(src: &SourceFile) -> Self {
        let mut maps = Self {
            namespace: HashMap::new(),
        };
        maps.traverse(src, src.root, "");
        maps
    }

    /// Record the dotted module prefix for classes and methods found inside
    /// module bodies; nested classes directly under a class share its
    /// prefix.
    fn traverse(&mut self, src: &SourceFile, node: Node, prefix: &str) {
        let statements = body_of(node)
            .map(children)
            .unwrap_or_else(|| children(node));
        for child in statements {
            match child.kind() {
                "module" => {
                    let module_name = child
                        .child_by_field_name("name")
                        .map(|n| format!("{}.", src.text(&n)))
                        .unwrap_or_default();
                    self.traverse(src, child, &format!("{prefix}{module_name}"));
                }
                "class" => {
                    self.namespace.insert(node_key(&child), prefix.to_string());
                    if let Some(body) = body_of(child) {
                        for nested in children_of_type(body, &["class"]) {
                            self.namespace.insert(node_key(&nested), prefix.to_string());
                        }
                    }
                }
                "method" | "singleton_method" => {
                    self.namespace.insert(node_key(&child), prefix.to_string());
                }
                _ => {}
            }
        }
    }
}

/// Candidate class/method nodes: top level, inside modules, and one wrapper
/// level down (conditionally defined classes). Discovery order, no
/// duplicate spans.
fn discover<'t>(src: &SourceFile<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut seen: Vec<SpanKey> = Vec::new();
    let mut out = Vec::new();
    let mut push = |node: Node<'t>| {
        let key = node_key(&node);
        if !seen.contains(&key) && children(node).len() > 0 {
            seen.push(key);
            out.push(node);
        }
    };

    for node in children_of_type(src.root, kinds) {
        push(node);
    }
    for module in traverse_type(src.root, tables(Language::Ruby).namespace_types) {
        if let Some(body) = body_of(module) {
            for node in children_of_type(body, kinds) {
                push(node);
            }
        }
    }
    // definitions wrapped in condition/other statement nodes, two levels
    // down; bodies of classes, modules, and methods stay nested records
    for child in children(src.root) {
        if matches!(child.kind(), "class" | "module" | "method" | "singleton_method") {
            continue;
        }
        for node in children_of_type(child, kinds) {
            push(node);
        }
        for grandchild in children(child) {
            for node in children_of_type(grandchild, kinds) {
                push(node);
            }
        }
    }
    out
}

pub(crate) fn extract(src: &SourceFile) -> FileSchema {
    let maps = Maps::build(src);
    let table = tables(Language::Ruby);

    // reopened classes merge by qualified name; the first record wins and
    // later bodies contribute their methods in discovery order
    let mut classes: Vec<ClassRecord> = Vec::new();
    let mut class_names: Vec<String> = Vec::new();
    let mut spans: Vec<SpanKey> = Vec::new();
    let mut in_class_methods: Vec<(usize, usize)> = Vec::new();
    for class_node in discover(src, table.class_types) {
        let record = parse_class(src, &maps, class_node);
        let prefix = match &record.attributes {
            ClassAttributes::Ruby(attrs) => attrs.namespace_prefix.clone(),
            _ => String::new(),
        };
        let qualified = format!("{prefix}{}", record.name);
        in_class_methods.extend(record.methods.iter().map(|m| m.byte_span));
        if !class_names.contains(&qualified) {
            class_names.push(qualified);
            spans.push(node_key(&class_node));
            classes.push(record);
        } else if !spans.contains(&node_key(&class_node)) {
            spans.push(node_key(&class_node));
            let index = class_names
                .iter()
                .position(|n| *n == qualified)
                .expect("name recorded above");
            classes[index].methods.extend(record.methods);
        }
    }

    let methods = discover(src, table.method_types)
        .into_iter()
        .filter(|m| !in_class_methods.contains(&(m.start_byte(), m.end_byte())))
        .map(|m| parse_method(src, &maps, m))
        .collect();

    FileSchema {
        file_hash: src.file_hash(),
        file_docstring: file_docstring(src),
        contexts: file_context(src),
        methods,
        classes,
    }
}

fn file_docstring(src: &SourceFile) -> String {
    let mut docstring = String::new();
    for child in children(src.root) {
        if child.kind() != "comment" {
            break;
        }
        docstring.push_str(&src.text(&child));
        docstring.push('\n');
    }
    clean_hash_docstring(&docstring)
}

/// `require`/`require_relative`/`include` calls at file level.
fn file_context(src: &SourceFile) -> Vec<String> {
    children_of_type(src.root, tables(Language::Ruby).import_types)
        .iter()
        .map(|n| src.text(n).trim().to_string())
        .filter(|content| {
            content.starts_with("require ")
                || content.starts_with("require_")
                || content.starts_with("include ")
        })
        .collect()
}

/// The contiguous run of comments directly above `node` in its parent,
/// cleaned of `#` markers. Ruby documentation is conventionally a run of
/// line comments.
fn docstring_run(src: &SourceFile, node: Node) -> String {
    let parent = match node.parent() {
        Some(p) => p,
        None => return String::new(),
    };
    let mut run: Vec<String> = Vec::new();
    let mut current = node;
    while let Some(prev) = previous_sibling(current, parent) {
        if prev.kind() != "comment" {
            break;
        }
        run.push(src.text(&prev));
        current = prev;
    }
    if run.is_empty() {
        return String::new();
    }
    // a run reaching the very first node of the file is the file docstring,
    // not this record's
    if let Some(first) = src.root.child(0) {
        if crate::extractors::base::nodes_equal(&current, &first) {
            return String::new();
        }
    }
    run.reverse();
    clean_hash_docstring(&run.join("\n"))
}

fn parse_method(src: &SourceFile, maps: &Maps, node: Node) -> MethodRecord {
    let span = Span::of(&node);
    let namespace_prefix = maps
        .namespace
        .get(&node_key(&node))
        .cloned()
        .unwrap_or_default();

    let name = node
        .child_by_field_name("name")
        .map(|n| src.text(&n))
        .unwrap_or_default();

    let node_children = children(node);
    let mut default_arguments = DefaultArgs::new();
    let mut parameters: Vec<String> = Vec::new();
    if let Some(params) = node_children
        .iter()
        .find(|c| c.kind() == "method_parameters")
    {
        parameters = src.select_each(&children_of_type(*params, &["identifier"]));
        for param in children(*params) {
            if param.kind().contains("optional_parameter") {
                let parts = children(param);
                if let Some(eq) = parts.iter().position(|c| c.kind() == "=") {
                    default_arguments
                        .insert(src.select(&parts[..eq]), src.select(&parts[eq + 1..]));
                }
                parameters.push(src.text(&param));
            }
        }
    }

    // signature: through the parameter list; `def self.` singleton forms
    // need two more children to reach the name
    let mut param_index = node_children
        .iter()
        .position(|c| c.kind() == "method_parameters")
        .unwrap_or(1)
        .min(node_children.len().saturating_sub(1));
    let mut signature = src.select(&node_children[..=param_index]);
    while signature.trim() == "def self" && param_index + 2 < node_children.len() {
        param_index += 2;
        signature = src.select(&node_children[..=param_index]);
    }

    let body_node = body_of(node);
    let (methods, classes) = body_node
        .map(|body| nested(src, maps, body))
        .unwrap_or_default();

    MethodRecord {
        name,
        original_string: src.span_text(&span),
        signature,
        body: body_node.map(|b| src.text(&b)).unwrap_or_default(),
        docstring: docstring_run(src, node),
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        default_arguments,
        syntax_pass: syntax_health(node),
        attributes: MethodAttributes::Ruby(RubyMethodAttributes {
            namespace_prefix,
            parameters,
        }),
        methods,
        classes,
    }
}

fn nested<'t>(
    src: &SourceFile<'t>,
    maps: &Maps,
    body: Node<'t>,
) -> (Vec<MethodRecord>, Vec<ClassRecord>) {
    let table = tables(Language::Ruby);
    let methods = children_of_type(body, table.method_types)
        .into_iter()
        .filter(|n| children(*n).len() > 0)
        .map(|n| parse_method(src, maps, n))
        .collect();
    let classes = children_of_type(body, table.class_types)
        .into_iter()
        .filter(|n| children(*n).len() > 0)
        .map(|n| parse_class(src, maps, n))
        .collect();
    (methods, classes)
}

fn parse_class(src: &SourceFile, maps: &Maps, node: Node) -> ClassRecord {
    let span = Span::of(&node);
    let namespace_prefix = maps
        .namespace
        .get(&node_key(&node))
        .cloned()
        .unwrap_or_default();

    let name = node
        .child_by_field_name("name")
        .map(|n| src.text(&n))
        .unwrap_or_default();

    let bases = node
        .child_by_field_name("superclass")
        .map(|superclass| {
            children(superclass)
                .into_iter()
                .filter(|c| c.kind() != "<")
                .map(|c| src.text(&c))
                .collect()
        })
        .unwrap_or_default();

    // definition: through the superclass when present, else `class Name`
    let node_children = children(node);
    let definition_end = node_children
        .iter()
        .position(|c| c.kind() == "superclass")
        .unwrap_or(1)
        .min(node_children.len().saturating_sub(1));
    let definition = src.select(&node_children[..=definition_end]);

    let body_node = body_of(node);
    let mut contexts = Vec::new();
    let mut attribute_expressions = Vec::new();
    if let Some(body) = body_node {
        for call in children_of_type(body, &["call"]) {
            let content = src.text(&call);
            if content.trim().starts_with("include ") {
                for child in children(call) {
                    if child.kind() == "argument_list" {
                        contexts.push(src.text(&child).replace("::", ".").trim().to_string());
                    }
                }
            } else {
                attribute_expressions.push(content);
            }
        }
        for assignment in children_of_type(body, &["assignment"]) {
            attribute_expressions.push(src.text(&assignment));
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
        class_docstring: docstring_run(src, node),
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        syntax_pass: syntax_health(node),
        attributes: ClassAttributes::Ruby(RubyClassAttributes {
            namespace_prefix,
            bases,
            contexts,
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
    use crate::schema::{ClassAttributes, MethodAttributes};

    fn schema(code: &str) -> crate::schema::FileSchema {
        extract_file_schema(code, Language::Ruby).unwrap()
    }

    fn class_attrs(c: &crate::schema::ClassRecord) -> &crate::schema::RubyClassAttributes {
        match &c.attributes {
            ClassAttributes::Ruby(attrs) => attrs,
            other => panic!("wrong attribute family: {other:?}"),
        }
    }

    #[test]
    fn extracts_class_with_method() {
        let code = concat!(
            "require 'set'\n",
            "\n",
            "# A greeter.\n",
            "class Greeter\n",
            "  def greet(name)\n",
            "    \"hi #{name}\"\n",
            "  end\n",
            "end\n",
        );
        let s = schema(code);
        assert_eq!(s.classes.len(), 1);
        let c = &s.classes[0];
        assert_eq!(c.name, "Greeter");
        assert_eq!(c.definition, "class Greeter");
        assert_eq!(c.class_docstring, "A greeter.");
        assert_eq!(c.methods.len(), 1);
        assert_eq!(c.methods[0].name, "greet");
        assert!(s.methods.is_empty(), "class methods must not leak to top level");
    }

    #[test]
    fn superclass_becomes_base() {
        let code = "class Dog < Animal\nend\n";
        let s = schema(code);
        let c = &s.classes[0];
        assert_eq!(class_attrs(c).bases, vec!["Animal"]);
        assert_eq!(c.definition, "class Dog < Animal");
    }

    #[test]
    fn namespace_prefix_from_modules() {
        let code = concat!(
            "module Outer\n",
            "  module Inner\n",
            "    class Thing\n",
            "      def use\n",
            "      end\n",
            "    end\n",
            "  end\n",
            "end\n",
        );
        let s = schema(code);
        let c = &s.classes[0];
        assert_eq!(c.name, "Thing");
        assert_eq!(class_attrs(c).namespace_prefix, "Outer.Inner.");
    }

    #[test]
    fn reopened_class_merges_methods() {
        let code = concat!(
            "class Foo\n",
            "  def a\n",
            "  end\n",
            "end\n",
            "\n",
            "class Foo\n",
            "  def b\n",
            "  end\n",
            "end\n",
        );
        let s = schema(code);
        assert_eq!(s.classes.len(), 1, "reopened class must merge");
        let names: Vec<&str> = s.classes[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        // no duplicated spans
        let mut spans: Vec<(usize, usize)> =
            s.classes[0].methods.iter().map(|m| m.byte_span).collect();
        spans.dedup();
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn three_reopenings_keep_discovery_order() {
        let code = concat!(
            "class Foo\n  def a\n  end\nend\n",
            "class Foo\n  def b\n  end\nend\n",
            "class Foo\n  def c\n  end\nend\n",
        );
        let s = schema(code);
        assert_eq!(s.classes.len(), 1);
        let names: Vec<&str> = s.classes[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn default_arguments_and_parameters() {
        let code = "def f(a, b = 10)\n  b\nend\n";
        let s = schema(code);
        let m = &s.methods[0];
        assert_eq!(m.default_arguments.get("b"), Some("10"));
        match &m.attributes {
            MethodAttributes::Ruby(attrs) => {
                assert_eq!(attrs.parameters, vec!["a", "b = 10"]);
            }
            other => panic!("wrong attribute family: {other:?}"),
        }
    }

    #[test]
    fn file_context_keeps_requires() {
        let code = "require 'json'\nrequire_relative 'util'\nputs 'hi'\n";
        let s = schema(code);
        assert_eq!(s.contexts, vec!["require 'json'", "require_relative 'util'"]);
    }

    #[test]
    fn include_populates_class_contexts() {
        let code = concat!(
            "class Thing\n",
            "  include Enumerable::Core\n",
            "  attr_reader :size\n",
            "end\n",
        );
        let s = schema(code);
        let attrs = class_attrs(&s.classes[0]);
        assert_eq!(attrs.contexts, vec!["Enumerable.Core"]);
        assert!(attrs
            .attribute_expressions
            .iter()
            .any(|e| e.contains("attr_reader")));
    }

    #[test]
    fn method_docstring_collects_comment_run() {
        let code = concat!(
            "class C\n",
            "  # adds one\n",
            "  # to its input\n",
            "  def incr(x)\n",
            "    x + 1\n",
            "  end\n",
            "end\n",
        );
        let s = schema(code);
        assert_eq!(s.classes[0].methods[0].docstring, "adds one\nto its input");
    }

    #[test]
    fn span_invariant_holds() {
        let code = "module M\n  class C\n    def m\n    end\n  end\nend\n";
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
