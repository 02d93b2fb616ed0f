//! Discovery of definitions hiding behind declarations and exports.
//!
//! JavaScript and TypeScript define functions and classes in more places
//! than a declaration statement: assigned to variables, tucked inside object
//! properties, wrapped in parenthesized IIFEs, assigned to existing names,
//! and re-exported. Each discovery records the wrapping statement keyed by
//! the definition's span, because a wrapped definition's record spans the
//! whole wrapper and its docstring hangs off the wrapper's siblings.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::extractors::base::{children_of_type, SourceFile};
use crate::span::{node_key, SpanKey};

/// Function-shaped nodes that can appear as a value inside a declaration,
/// assignment, or object property.
pub(super) const INSIDE_METHOD_TYPES: [&str; 5] = [
    "function",
    "function_expression",
    "generator_function",
    "method_definition",
    "arrow_function",
];

pub(super) const CLASS_TYPES: [&str; 2] = ["class_declaration", "class"];

pub(super) const DECLARATION_TYPES: [&str; 2] = ["variable_declaration", "lexical_declaration"];

const EXPRESSION_TYPES: [&str; 1] = ["expression_statement"];

/// Span-keyed wrapper maps for one file.
#[derive(Default)]
pub(super) struct Wrappers<'t> {
    /// definition span -> wrapping variable/lexical declaration
    pub declaration: HashMap<SpanKey, Node<'t>>,
    /// definition span -> wrapping export statement
    pub export: HashMap<SpanKey, Node<'t>>,
    /// definition span -> name taken from the declarator
    pub name: HashMap<SpanKey, String>,
}

impl<'t> Wrappers<'t> {
    pub fn wrapper_of(&self, key: &SpanKey) -> Option<Node<'t>> {
        self.export
            .get(key)
            .copied()
            .or_else(|| self.declaration.get(key).copied())
    }
}

/// Functions assigned in `var`/`let`/`const` declarations, including ones
/// nested in object values and parenthesized call expressions
/// (`var C = (function(){ ... })()`).
pub(super) fn functions_in_declarations<'t>(
    src: &SourceFile<'t>,
    node: Node<'t>,
    wrappers: &mut Wrappers<'t>,
) -> Vec<Node<'t>> {
    let mut methods = Vec::new();
    for declaration in children_of_type(node, &DECLARATION_TYPES) {
        let declarator = match children_of_type(declaration, &["variable_declarator"]).first() {
            Some(d) => *d,
            None => continue,
        };
        let value = match declarator.child_by_field_name("value") {
            Some(v) => v,
            None => continue,
        };
        if let Some(name_node) = declarator.child_by_field_name("name") {
            wrappers.name.insert(node_key(&value), src.text(&name_node));
        }

        if INSIDE_METHOD_TYPES.contains(&value.kind()) {
            methods.push(value);
            wrappers.declaration.insert(node_key(&value), declaration);
        } else if matches!(value.kind(), "object" | "parenthesized_expression")
            && value.child_count() > 0
        {
            for method in children_of_type(value, &INSIDE_METHOD_TYPES) {
                methods.push(method);
                wrappers.declaration.insert(node_key(&method), declaration);
            }
            // `(function(){ ... })()`: the callee of a wrapped call
            if let Some(call) = value.child(1).filter(|c| c.kind() == "call_expression") {
                if let Some(callee) = call.child(0) {
                    if INSIDE_METHOD_TYPES.contains(&callee.kind()) {
                        methods.push(callee);
                        wrappers.declaration.insert(node_key(&callee), declaration);
                    }
                }
            }
        }
    }
    methods
}

/// Functions assigned to existing names (`obj.handler = function() {}`).
pub(super) fn functions_in_expressions<'t>(
    node: Node<'t>,
    wrappers: &mut Wrappers<'t>,
) -> Vec<Node<'t>> {
    let mut methods = Vec::new();
    for expression in children_of_type(node, &EXPRESSION_TYPES) {
        let assignment = match children_of_type(expression, &["assignment_expression"]).first() {
            Some(a) => *a,
            None => continue,
        };
        let right = match assignment.child_by_field_name("right") {
            Some(r) => r,
            None => continue,
        };
        if INSIDE_METHOD_TYPES.contains(&right.kind()) {
            methods.push(right);
            wrappers.declaration.insert(node_key(&right), expression);
        }
    }
    methods
}

/// Functions living inside export statements, directly or behind a wrapped
/// declaration/assignment.
pub(super) fn functions_in_exports<'t>(
    src: &SourceFile<'t>,
    node: Node<'t>,
    method_types: &[&str],
    wrappers: &mut Wrappers<'t>,
) -> Vec<Node<'t>> {
    let mut methods = Vec::new();
    for export in children_of_type(node, &["export_statement"]) {
        let mut current = functions_in_declarations(src, export, wrappers);
        current.extend(functions_in_expressions(export, wrappers));
        current.extend(children_of_type(export, method_types));
        for method in &current {
            wrappers.export.insert(node_key(method), export);
        }
        methods.extend(current);
    }
    methods
}

/// All extra function discoveries under `node`.
pub(super) fn discover_functions<'t>(
    src: &SourceFile<'t>,
    node: Node<'t>,
    method_types: &[&str],
    wrappers: &mut Wrappers<'t>,
) -> Vec<Node<'t>> {
    let mut methods = functions_in_declarations(src, node, wrappers);
    methods.extend(functions_in_expressions(node, wrappers));
    methods.extend(functions_in_exports(src, node, method_types, wrappers));
    methods
}

/// Classes assigned in declarations, including parenthesized forms.
pub(super) fn classes_in_declarations<'t>(
    src: &SourceFile<'t>,
    node: Node<'t>,
    wrappers: &mut Wrappers<'t>,
) -> Vec<Node<'t>> {
    let mut classes = Vec::new();
    for declaration in children_of_type(node, &DECLARATION_TYPES) {
        let declarator = match children_of_type(declaration, &["variable_declarator"]).first() {
            Some(d) => *d,
            None => continue,
        };
        let value = match declarator.child_by_field_name("value") {
            Some(v) => v,
            None => continue,
        };
        if let Some(name_node) = declarator.child_by_field_name("name") {
            wrappers.name.insert(node_key(&value), src.text(&name_node));
        }
        if CLASS_TYPES.contains(&value.kind()) {
            classes.push(value);
            wrappers.declaration.insert(node_key(&value), declaration);
        } else if value.kind() == "parenthesized_expression" && value.child_count() > 0 {
            for class in children_of_type(value, &CLASS_TYPES) {
                classes.push(class);
                wrappers.declaration.insert(node_key(&class), declaration);
            }
        }
    }
    classes
}

/// All extra class discoveries under `node`: declarations plus exports.
pub(super) fn discover_classes<'t>(
    src: &SourceFile<'t>,
    node: Node<'t>,
    wrappers: &mut Wrappers<'t>,
) -> Vec<Node<'t>> {
    let mut classes = classes_in_declarations(src, node, wrappers);
    for export in children_of_type(node, &["export_statement"]) {
        let mut exported = classes_in_declarations(src, export, wrappers);
        exported.extend(children_of_type(export, &CLASS_TYPES));
        for class in &exported {
            wrappers.export.insert(node_key(class), export);
        }
        classes.extend(exported);
    }
    classes
}
