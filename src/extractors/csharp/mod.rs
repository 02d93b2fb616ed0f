//! C# schema extraction.
//!
//! Classes, structs, and interfaces are one record family distinguished by
//! `module_type`. Doc comments arrive as a run of adjacent `///` nodes, so
//! docstring adjacency collects the whole contiguous run rather than one
//! sibling. C# is also the only language here that distinguishes properties
//! from fields.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::extractors::base::{
    children, children_of_type, strip_c_style_delimiters, syntax_health, traverse_type, SourceFile,
};
use crate::extractors::tables;
use crate::language::Language;
use crate::schema::{
    CSharpClassAttributes, CSharpMethodAttributes, ClassAttributes, ClassRecord, DefaultArgs,
    FieldRecord, FileSchema, MethodAttributes, MethodRecord, PropertyRecord,
};
use crate::span::{node_key, Span, SpanKey};

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

    fn traverse(&mut self, src: &SourceFile<'t>, node: Node<'t>, prefix: &str) {
        let table = tables(Language::CSharp);
        for child in children(node) {
            if table.namespace_types.contains(&child.kind()) {
                let namespace_name = child
                    .child_by_field_name("name")
                    .map(|n| src.text(&n))
                    .unwrap_or_else(|| "(unique)".to_string());
                for grandchild in children(child) {
                    if grandchild.kind() == "declaration_list" {
                        self.traverse(src, grandchild, &format!("{prefix}{namespace_name}."));
                        break;
                    }
                }
            }
            if table.class_types.contains(&child.kind()) || table.method_types.contains(&child.kind())
            {
                self.namespace.insert(node_key(&child), prefix.to_string());
                self.parent.insert(node_key(&child), node);
            }
        }
    }
}

pub(crate) fn extract(src: &SourceFile) -> FileSchema {
    let maps = Maps::build(src);
    let table = tables(Language::CSharp);

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

/// The contiguous run of comment nodes directly above `node` among
/// `parent`'s children (`///` doc comments parse as one node per line).
fn docstring_run<'t>(src: &SourceFile<'t>, node: Node<'t>, parent: Option<Node<'t>>) -> String {
    let parent = parent.unwrap_or(src.root);
    let siblings = children(parent);
    let index = match siblings.iter().position(|c| node_key(c) == node_key(&node)) {
        Some(i) => i,
        None => return String::new(),
    };
    let mut start = index;
    while start > 0 && siblings[start - 1].kind() == "comment" {
        start -= 1;
    }
    if start == index {
        return String::new();
    }
    strip_c_style_delimiters(&src.select(&siblings[start..index]))
        .trim()
        .to_string()
}

fn modifiers_of(src: &SourceFile, node: Node) -> Vec<String> {
    src.select_each(&children_of_type(node, &["modifier"]))
}

/// Attribute-list entries when the declaration leads with `[...]`.
fn attributes_of(src: &SourceFile, node: Node) -> Vec<String> {
    match node.child(0) {
        Some(first) if first.kind() == "attribute_list" => {
            src.select_each(&children_of_type(first, &["attribute"]))
        }
        _ => Vec::new(),
    }
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

    // the return type's field name differs across grammar versions
    let return_type = node
        .child_by_field_name("type")
        .or_else(|| node.child_by_field_name("returns"))
        .map(|n| src.text(&n))
        .unwrap_or_default();
    let name = node
        .child_by_field_name("name")
        .map(|n| src.text(&n))
        .unwrap_or_default();

    let node_children = children(node);
    let parameters = node_children
        .iter()
        .find(|c| c.kind() == "parameter_list")
        .map(|list| src.select_each(&children_of_type(*list, &["parameter"])))
        .unwrap_or_default();

    // signature: from after the attribute list through the parameter list
    let start_index = usize::from(
        node_children
            .first()
            .map(|c| c.kind() == "attribute_list")
            .unwrap_or(false),
    );
    let signature = node_children
        .iter()
        .position(|c| c.kind() == "parameter_list")
        .map(|i| src.select(&node_children[start_index..=i]))
        .unwrap_or_default();

    let mut default_arguments = DefaultArgs::new();
    if let Some(list) = node_children.iter().find(|c| c.kind() == "parameter_list") {
        for param in children_of_type(*list, &["parameter"]) {
            let parts = children(param);
            // the default is either a bare `= value` tail or an
            // equals_value_clause wrapper, depending on grammar version
            if let Some(eq) = parts
                .iter()
                .position(|c| c.kind() == "=" || c.kind() == "equals_value_clause")
            {
                let value = if parts[eq].kind() == "=" {
                    src.select(&parts[eq + 1..])
                } else {
                    let inner = children(parts[eq]);
                    if inner.len() > 1 {
                        src.select(&inner[1..])
                    } else {
                        String::new()
                    }
                };
                default_arguments.insert(src.select(&parts[..eq]), value);
            }
        }
    }

    let body_node = node.child_by_field_name("body");
    let (methods, classes) = body_node
        .map(|body| nested(src, maps, body))
        .unwrap_or_default();

    MethodRecord {
        name,
        original_string: src.span_text(&span),
        signature,
        body: body_node.map(|b| src.text(&b)).unwrap_or_default(),
        docstring: docstring_run(src, node, parent),
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        default_arguments,
        syntax_pass: syntax_health(node),
        attributes: MethodAttributes::CSharp(CSharpMethodAttributes {
            namespace_prefix,
            modifiers: modifiers_of(src, node),
            attributes: attributes_of(src, node),
            parameters,
            return_type,
        }),
        methods,
        classes,
    }
}

fn nested<'t>(
    src: &SourceFile<'t>,
    maps: &Maps<'t>,
    body: Node<'t>,
) -> (Vec<MethodRecord>, Vec<ClassRecord>) {
    let table = tables(Language::CSharp);
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

fn parse_field(src: &SourceFile, node: Node, body: Node) -> FieldRecord {
    let span = Span::of(&node);
    let mut type_ = String::new();
    let mut name = String::new();
    for child in children(node) {
        if child.kind() == "variable_declaration" {
            type_ = child
                .child_by_field_name("type")
                .map(|n| src.text(&n))
                .unwrap_or_default();
            if let Some(declarator) =
                children_of_type(child, &["variable_declarator"]).first()
            {
                name = src.text(declarator);
            }
            break;
        }
    }
    FieldRecord {
        original_string: src.span_text(&span),
        docstring: docstring_run(src, node, Some(body)),
        modifiers: modifiers_of(src, node),
        type_,
        name,
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        syntax_pass: syntax_health(node),
    }
}

fn parse_property(src: &SourceFile, node: Node, body: Node) -> PropertyRecord {
    let span = Span::of(&node);
    let accessors = node
        .child_by_field_name("accessors")
        .or_else(|| children_of_type(node, &["accessor_list"]).first().copied())
        .map(|n| src.text(&n))
        .unwrap_or_default();
    PropertyRecord {
        original_string: src.span_text(&span),
        docstring: docstring_run(src, node, Some(body)),
        modifiers: modifiers_of(src, node),
        type_: node
            .child_by_field_name("type")
            .map(|n| src.text(&n))
            .unwrap_or_default(),
        name: node
            .child_by_field_name("name")
            .map(|n| src.text(&n))
            .unwrap_or_default(),
        accessors,
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        syntax_pass: syntax_health(node),
    }
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

    let node_children = children(node);
    let definition = node_children
        .iter()
        .position(|c| c.kind() == "identifier")
        .map(|i| src.select(&node_children[..=i]))
        .unwrap_or_default();

    let name = node
        .child_by_field_name("name")
        .map(|n| src.text(&n))
        .unwrap_or_default();
    let body_node = node.child_by_field_name("body");

    let bases = node
        .child_by_field_name("bases")
        .or_else(|| children_of_type(node, &["base_list"]).first().copied())
        .map(|bases| {
            children(bases)
                .into_iter()
                .filter(|b| !matches!(b.kind(), ":" | ","))
                .map(|b| src.text(&b))
                .collect()
        })
        .unwrap_or_default();

    let fields = body_node
        .map(|body| {
            children_of_type(body, &["field_declaration"])
                .into_iter()
                .map(|f| parse_field(src, f, body))
                .collect()
        })
        .unwrap_or_default();
    let properties = body_node
        .map(|body| {
            children_of_type(body, &["property_declaration"])
                .into_iter()
                .map(|p| parse_property(src, p, body))
                .collect()
        })
        .unwrap_or_default();
    let (methods, classes) = body_node
        .map(|body| nested(src, maps, body))
        .unwrap_or_default();

    ClassRecord {
        name,
        original_string: src.span_text(&span),
        definition,
        body: body_node.map(|b| src.text(&b)).unwrap_or_default(),
        class_docstring: docstring_run(src, node, parent),
        byte_span: span.byte_span(),
        start_point: span.start_point,
        end_point: span.end_point,
        syntax_pass: syntax_health(node),
        attributes: ClassAttributes::CSharp(CSharpClassAttributes {
            namespace_prefix,
            modifiers: modifiers_of(src, node),
            attributes: attributes_of(src, node),
            bases,
            module_type: node.kind().split('_').next().unwrap_or("class").to_string(),
        }),
        fields,
        properties,
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
        extract_file_schema(code, Language::CSharp).unwrap()
    }

    fn class_attrs(c: &crate::schema::ClassRecord) -> &crate::schema::CSharpClassAttributes {
        match &c.attributes {
            ClassAttributes::CSharp(attrs) => attrs,
            other => panic!("wrong attribute family: {other:?}"),
        }
    }

    fn method_attrs(m: &crate::schema::MethodRecord) -> &crate::schema::CSharpMethodAttributes {
        match &m.attributes {
            MethodAttributes::CSharp(attrs) => attrs,
            other => panic!("wrong attribute family: {other:?}"),
        }
    }

    const EXAMPLE: &str = concat!(
        "using System;\n",
        "\n",
        "namespace Geometry.Shapes\n",
        "{\n",
        "    /// <summary>\n",
        "    /// A circle.\n",
        "    /// </summary>\n",
        "    public class Circle : Shape\n",
        "    {\n",
        "        /// radius in meters\n",
        "        private double radius;\n",
        "\n",
        "        public double Radius { get; set; }\n",
        "\n",
        "        /// <summary>Computes the area.</summary>\n",
        "        public double Area(double scale = 1.0)\n",
        "        {\n",
        "            return scale * 3.14 * radius * radius;\n",
        "        }\n",
        "    }\n",
        "}\n",
    );

    #[test]
    fn class_inside_namespace() {
        let s = schema(EXAMPLE);
        assert_eq!(s.contexts, vec!["using System;"]);
        assert_eq!(s.classes.len(), 1);
        let c = &s.classes[0];
        assert_eq!(c.name, "Circle");
        let attrs = class_attrs(c);
        assert_eq!(attrs.namespace_prefix, "Geometry.Shapes.");
        assert_eq!(attrs.module_type, "class");
        assert_eq!(attrs.modifiers, vec!["public"]);
        assert_eq!(attrs.bases, vec!["Shape"]);
        assert!(c.class_docstring.contains("A circle."));
    }

    #[test]
    fn fields_and_properties_are_distinct() {
        let s = schema(EXAMPLE);
        let c = &s.classes[0];
        assert_eq!(c.fields.len(), 1);
        let field = &c.fields[0];
        assert_eq!(field.type_, "double");
        assert_eq!(field.name, "radius");
        assert_eq!(field.modifiers, vec!["private"]);
        assert_eq!(field.docstring, "radius in meters");

        assert_eq!(c.properties.len(), 1);
        let property = &c.properties[0];
        assert_eq!(property.name, "Radius");
        assert_eq!(property.type_, "double");
        assert_eq!(property.accessors, "{ get; set; }");
        assert_eq!(property.modifiers, vec!["public"]);
    }

    #[test]
    fn method_signature_and_defaults() {
        let s = schema(EXAMPLE);
        let m = &s.classes[0].methods[0];
        assert_eq!(m.name, "Area");
        assert_eq!(m.signature, "public double Area(double scale = 1.0)");
        assert_eq!(m.default_arguments.get("double scale"), Some("1.0"));
        let attrs = method_attrs(m);
        assert_eq!(attrs.return_type, "double");
        assert_eq!(attrs.parameters, vec!["double scale = 1.0"]);
        assert!(m.docstring.contains("Computes the area."));
    }

    #[test]
    fn doc_comment_run_is_collected_whole() {
        let s = schema(EXAMPLE);
        let doc = &s.classes[0].class_docstring;
        assert!(doc.contains("<summary>"), "{doc}");
        assert!(doc.contains("A circle."));
    }

    #[test]
    fn attribute_lists_are_extracted() {
        let code = concat!(
            "public class Tests\n",
            "{\n",
            "    [Fact]\n",
            "    public void Works()\n",
            "    {\n",
            "    }\n",
            "}\n",
        );
        let s = schema(code);
        let m = &s.classes[0].methods[0];
        assert_eq!(method_attrs(m).attributes, vec!["Fact"]);
        // attribute list stays out of the signature
        assert_eq!(m.signature, "public void Works()");
    }

    #[test]
    fn structs_and_interfaces_share_the_record() {
        let code = "struct P { }\ninterface IShape { }\n";
        let s = schema(code);
        assert_eq!(s.classes.len(), 2);
        assert_eq!(class_attrs(&s.classes[0]).module_type, "struct");
        assert_eq!(class_attrs(&s.classes[1]).module_type, "interface");
    }

    #[test]
    fn span_invariant_holds() {
        let s = schema(EXAMPLE);
        let bytes = EXAMPLE.as_bytes();
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
