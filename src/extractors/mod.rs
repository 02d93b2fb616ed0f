//! Per-language schema extractors.
//!
//! Extraction is configuration-driven: one shared algorithm skeleton (in
//! `base`) consults a per-language [`LanguageTables`] value, and each
//! language module contributes only the discovery rules that genuinely
//! diverge (decorator wrapping, functions assigned to variables, reopened
//! classes, namespace accumulation).

pub mod base;
pub mod cpp;
pub mod csharp;
pub mod java;
pub mod jsts;
pub mod python;
pub mod ruby;

pub use base::LanguageTables;

use crate::error::{Error, Result};
use crate::language::Language;
use crate::schema::FileSchema;

/// The capability table for `lang`: which node kinds denote methods,
/// classes, imports, docstrings, namespaces, and statement ends.
pub const fn tables(lang: Language) -> &'static LanguageTables {
    match lang {
        Language::Python => &LanguageTables {
            method_types: &["function_definition", "decorated_definition"],
            class_types: &["class_definition", "decorated_definition"],
            import_types: &["import_statement", "import_from_statement"],
            docstring_types: &["string", "comment"],
            namespace_types: &[],
            statement_types: &[],
        },
        Language::Java => &LanguageTables {
            method_types: &["method_declaration", "constructor_declaration"],
            class_types: &["class_declaration", "interface_declaration"],
            import_types: &["package_declaration", "import_declaration"],
            docstring_types: &["line_comment", "block_comment"],
            namespace_types: &[],
            statement_types: &[],
        },
        Language::JavaScript | Language::TypeScript => &LanguageTables {
            method_types: &[
                "function_declaration",
                "generator_function_declaration",
                "arrow_function",
                "function",
                "function_expression",
                "generator_function",
                "method_definition",
            ],
            class_types: &["class_declaration", "class"],
            import_types: &["import_statement"],
            docstring_types: &["comment"],
            namespace_types: &[],
            statement_types: &[],
        },
        Language::Cpp => &LanguageTables {
            method_types: &["function_definition"],
            class_types: &["class_specifier"],
            import_types: &["preproc_include", "preproc_def", "preproc_call"],
            docstring_types: &["comment"],
            namespace_types: &["namespace_definition"],
            statement_types: &[],
        },
        Language::CSharp => &LanguageTables {
            method_types: &["constructor_declaration", "method_declaration"],
            class_types: &[
                "class_declaration",
                "struct_declaration",
                "interface_declaration",
            ],
            import_types: &["using_directive"],
            docstring_types: &["comment"],
            namespace_types: &["namespace_declaration"],
            statement_types: &[
                "namespace_declaration",
                "class_declaration",
                "method_declaration",
                "struct_declaration",
                "interface_declaration",
                "operator_declaration",
                "record_declaration",
                "constructor_declaration",
                "destructor_declaration",
                "enum_declaration",
                "event_declaration",
                "event_field_declaration",
                "field_declaration",
                "property_declaration",
                "using_directive",
            ],
        },
        Language::Ruby => &LanguageTables {
            method_types: &["method", "singleton_method"],
            class_types: &["class"],
            import_types: &["call"],
            docstring_types: &["comment"],
            namespace_types: &["module"],
            statement_types: &[],
        },
    }
}

/// Extract the structural schema of one source file.
///
/// A hard `Err` means the input could not be parsed at all; everything short
/// of that degrades inside the schema (empty strings/lists, false
/// `syntax_pass` flags). The returned schema is pure data; extracting twice
/// from the same content yields identical output.
pub fn extract_file_schema(content: &str, lang: Language) -> Result<FileSchema> {
    let mut parser = lang.parser()?;
    let tree = parser.parse(content, None).ok_or(Error::Parse)?;
    let src = base::SourceFile::new(lang, content.as_bytes(), &tree);
    Ok(match lang {
        Language::Python => python::extract(&src),
        Language::Java => java::extract(&src),
        Language::JavaScript | Language::TypeScript => jsts::extract(&src),
        Language::Cpp => cpp::extract(&src),
        Language::CSharp => csharp::extract(&src),
        Language::Ruby => ruby::extract(&src),
    })
}
