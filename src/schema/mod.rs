//! The language-independent structural schema.
//!
//! Every extractor produces the same nested record shapes regardless of
//! source language; language-specific detail lives in a closed-key attribute
//! bag per record. Serialized output is JSON-compatible: absent optional
//! values render as empty strings or empty lists, never null, and
//! `byte_span`/`start_point`/`end_point` are always present on method, class,
//! field, and property records.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::span::Point;

/// Default-argument mapping preserving declaration order. Serializes as a
/// JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultArgs(Vec<(String, String)>);

impl DefaultArgs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert preserving first-seen order; a repeated key overwrites in
    /// place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for DefaultArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One extracted method/function/constructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MethodRecord {
    pub name: String,
    /// Exactly `source_bytes[byte_span.0..byte_span.1]`.
    pub original_string: String,
    /// Declaration text up to (excluding) the body, decorators included.
    pub signature: String,
    pub body: String,
    pub docstring: String,
    pub byte_span: (usize, usize),
    pub start_point: Point,
    pub end_point: Point,
    pub default_arguments: DefaultArgs,
    pub syntax_pass: bool,
    pub attributes: MethodAttributes,
    /// Nested definitions, mirroring source nesting.
    pub methods: Vec<MethodRecord>,
    pub classes: Vec<ClassRecord>,
}

/// One extracted class/struct/interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassRecord {
    pub name: String,
    pub original_string: String,
    /// Header text up to the body.
    pub definition: String,
    pub body: String,
    pub class_docstring: String,
    pub byte_span: (usize, usize),
    pub start_point: Point,
    pub end_point: Point,
    pub syntax_pass: bool,
    pub attributes: ClassAttributes,
    pub fields: Vec<FieldRecord>,
    /// Only C# distinguishes properties from fields; empty elsewhere.
    pub properties: Vec<PropertyRecord>,
    pub methods: Vec<MethodRecord>,
    pub classes: Vec<ClassRecord>,
}

/// A member variable declaration inside a class body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldRecord {
    pub original_string: String,
    pub docstring: String,
    pub modifiers: Vec<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    pub byte_span: (usize, usize),
    pub start_point: Point,
    pub end_point: Point,
    pub syntax_pass: bool,
}

/// A C# property declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub original_string: String,
    pub docstring: String,
    pub modifiers: Vec<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    /// The accessor block (`{ get; set; }`), like a body.
    pub accessors: String,
    pub byte_span: (usize, usize),
    pub start_point: Point,
    pub end_point: Point,
    pub syntax_pass: bool,
}

/// Whole-file extraction result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileSchema {
    pub file_hash: String,
    pub file_docstring: String,
    /// Ordered file-level import/context statements.
    pub contexts: Vec<String>,
    /// Top-level methods, excluding ones already nested under a class.
    pub methods: Vec<MethodRecord>,
    pub classes: Vec<ClassRecord>,
}

// Per-language attribute bags. Each variant's struct documents the closed
// key set for that language; serialization flattens to the inner object.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MethodAttributes {
    Python(PythonMethodAttributes),
    Java(JavaMethodAttributes),
    JsTs(JsTsMethodAttributes),
    Cpp(CppMethodAttributes),
    CSharp(CSharpMethodAttributes),
    Ruby(RubyMethodAttributes),
}

impl Default for MethodAttributes {
    fn default() -> Self {
        MethodAttributes::Python(PythonMethodAttributes::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClassAttributes {
    Python(PythonClassAttributes),
    Java(JavaClassAttributes),
    JsTs(JsTsClassAttributes),
    Cpp(CppClassAttributes),
    CSharp(CSharpClassAttributes),
    Ruby(RubyClassAttributes),
}

impl Default for ClassAttributes {
    fn default() -> Self {
        ClassAttributes::Python(PythonClassAttributes::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PythonMethodAttributes {
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PythonClassAttributes {
    pub decorators: Vec<String>,
    /// Class-level assignment statements.
    pub attribute_expressions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JavaMethodAttributes {
    /// Verbatim span of the modifier run (annotations included).
    pub modifiers: String,
    pub marker_annotations: Vec<String>,
    pub non_marker_annotations: Vec<String>,
    pub return_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JavaClassAttributes {
    pub modifiers: String,
    pub marker_annotations: Vec<String>,
    pub non_marker_annotations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsTsMethodAttributes {
    pub decorators: Vec<String>,
    /// Keywords between decorators and the name (`async`, `function*`, ...).
    pub keywords: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsTsClassAttributes {
    pub decorators: Vec<String>,
    pub heritage: Vec<String>,
    /// Public field definitions in the class body.
    pub expression: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CppMethodAttributes {
    /// `namespace1::namespace2::` form; empty at file scope.
    pub namespace_prefix: String,
    /// Access specifier plus storage/virtual/explicit/const specifiers.
    pub annotations: Vec<String>,
    pub return_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CppClassAttributes {
    pub namespace_prefix: String,
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CSharpMethodAttributes {
    /// `namespace1.namespace2.` form; empty at file scope.
    pub namespace_prefix: String,
    pub modifiers: Vec<String>,
    /// Attribute-list entries (`[Fact]`, custom attributes, ...).
    pub attributes: Vec<String>,
    pub parameters: Vec<String>,
    pub return_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CSharpClassAttributes {
    pub namespace_prefix: String,
    pub modifiers: Vec<String>,
    pub attributes: Vec<String>,
    pub bases: Vec<String>,
    /// "class", "struct", or "interface".
    pub module_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RubyMethodAttributes {
    /// `Module1.Module2.` form; empty at file scope.
    pub namespace_prefix: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RubyClassAttributes {
    pub namespace_prefix: String,
    pub bases: Vec<String>,
    /// `include` targets inside the class body.
    pub contexts: Vec<String>,
    /// Other calls and assignments in the class body.
    pub attribute_expressions: Vec<String>,
}
