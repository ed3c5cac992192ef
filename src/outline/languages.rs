use std::fmt;
use std::path::Path;

use serde::Serialize;
use tree_sitter::Language;

/// Languages with a grammar and a tags query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Python,
    Javascript,
    Typescript,
    Tsx,
    Go,
    Rust,
    Cpp,
    C,
    Ruby,
    Java,
}

impl LanguageId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Tsx => "tsx",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Cpp => "c++",
            Self::C => "c",
            Self::Ruby => "ruby",
            Self::Java => "java",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct LanguageConfig {
    pub id: LanguageId,
    pub language: Language,
    pub extensions: &'static [&'static str],
    /// Tags query. Every pattern captures one `name.<category>.<kind>` node and
    /// one `<category>.<kind>` node, plus any number of `doc` nodes.
    pub query: &'static str,
}

/// Immutable extension → language table.
///
/// Build it once and share it by reference; it holds no mutable state, so
/// concurrent extractions can use the same registry.
pub struct LanguageRegistry {
    configs: Vec<LanguageConfig>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            configs: vec![
                python_config(),
                javascript_config(),
                typescript_config(),
                tsx_config(),
                go_config(),
                rust_config(),
                cpp_config(),
                c_config(),
                ruby_config(),
                java_config(),
            ],
        }
    }

    /// Look up a language by extension, with or without the leading dot.
    pub fn get_by_extension(&self, ext: &str) -> Option<&LanguageConfig> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.configs
            .iter()
            .find(|c| c.extensions.contains(&ext.as_str()))
    }

    pub fn get_by_path(&self, path: &Path) -> Option<&LanguageConfig> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        self.get_by_extension(ext)
    }

    pub fn get(&self, id: LanguageId) -> Option<&LanguageConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageConfig> {
        self.configs.iter()
    }
}

fn python_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Python,
        language: tree_sitter_python::LANGUAGE.into(),
        extensions: &["py"],
        query: r#"
(class_definition
  name: (identifier) @name.definition.class) @definition.class

(function_definition
  name: (identifier) @name.definition.function) @definition.function

(call
  function: [
      (identifier) @name.reference.call
      (attribute
        attribute: (identifier) @name.reference.call)
  ]) @reference.call
"#,
    }
}

fn javascript_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Javascript,
        language: tree_sitter_javascript::LANGUAGE.into(),
        extensions: &["js"],
        query: r#"
(
  (comment)* @doc
  .
  (method_definition
    name: (property_identifier) @name.definition.method) @definition.method
  (#not-eq? @name.definition.method "constructor")
  (#strip! @doc "^[\\s\\*/]+|^[\\s\\*/]$")
  (#select-adjacent! @doc @definition.method)
)

(
  (comment)* @doc
  .
  [
    (class
      name: (_) @name.definition.class)
    (class_declaration
      name: (_) @name.definition.class)
  ] @definition.class
  (#strip! @doc "^[\\s\\*/]+|^[\\s\\*/]$")
  (#select-adjacent! @doc @definition.class)
)

(
  (comment)* @doc
  .
  [
    (function_expression
      name: (identifier) @name.definition.function)
    (function_declaration
      name: (identifier) @name.definition.function)
    (generator_function
      name: (identifier) @name.definition.function)
    (generator_function_declaration
      name: (identifier) @name.definition.function)
  ] @definition.function
  (#strip! @doc "^[\\s\\*/]+|^[\\s\\*/]$")
  (#select-adjacent! @doc @definition.function)
)

(
  (comment)* @doc
  .
  (lexical_declaration
    (variable_declarator
      name: (identifier) @name.definition.function
      value: [(arrow_function) (function_expression)]) @definition.function)
  (#strip! @doc "^[\\s\\*/]+|^[\\s\\*/]$")
  (#select-adjacent! @doc @definition.function)
)

(
  (comment)* @doc
  .
  (variable_declaration
    (variable_declarator
      name: (identifier) @name.definition.function
      value: [(arrow_function) (function_expression)]) @definition.function)
  (#strip! @doc "^[\\s\\*/]+|^[\\s\\*/]$")
  (#select-adjacent! @doc @definition.function)
)

(assignment_expression
  left: [
    (identifier) @name.definition.function
    (member_expression
      property: (property_identifier) @name.definition.function)
  ]
  right: [(arrow_function) (function_expression)]
) @definition.function

(pair
  key: (property_identifier) @name.definition.function
  value: [(arrow_function) (function_expression)]) @definition.function

(
  (call_expression
    function: (identifier) @name.reference.call) @reference.call
  (#not-match? @name.reference.call "^(require)$")
)

(call_expression
  function: (member_expression
    property: (property_identifier) @name.reference.call)
  arguments: (_) @reference.call)

(new_expression
  constructor: (_) @name.reference.class) @reference.class
"#,
    }
}

const TYPESCRIPT_QUERY: &str = r#"
(function_signature
  name: (identifier) @name.definition.function) @definition.function

(method_signature
  name: (property_identifier) @name.definition.method) @definition.method

(abstract_method_signature
  name: (property_identifier) @name.definition.method) @definition.method

(abstract_class_declaration
  name: (type_identifier) @name.definition.class) @definition.class

(module
  name: (identifier) @name.definition.module) @definition.module

(interface_declaration
  name: (type_identifier) @name.definition.interface) @definition.interface

(type_annotation
  (type_identifier) @name.reference.type) @reference.type

(new_expression
  constructor: (identifier) @name.reference.class) @reference.class

(function_declaration
  name: (identifier) @name.definition.function) @definition.function

(method_definition
  name: (property_identifier) @name.definition.method) @definition.method

(class_declaration
  name: (type_identifier) @name.definition.class) @definition.class

(interface_declaration
  name: (type_identifier) @name.definition.class) @definition.class

(type_alias_declaration
  name: (type_identifier) @name.definition.type) @definition.type

(enum_declaration
  name: (identifier) @name.definition.enum) @definition.enum
"#;

fn typescript_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Typescript,
        language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        extensions: &["ts"],
        query: TYPESCRIPT_QUERY,
    }
}

fn tsx_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Tsx,
        language: tree_sitter_typescript::LANGUAGE_TSX.into(),
        extensions: &["tsx", "jsx"],
        query: TYPESCRIPT_QUERY,
    }
}

fn go_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Go,
        language: tree_sitter_go::LANGUAGE.into(),
        extensions: &["go"],
        query: r#"
(
  (comment)* @doc
  .
  (function_declaration
    name: (identifier) @name.definition.function) @definition.function
  (#strip! @doc "^//\\s*")
  (#select-adjacent! @doc @definition.function)
)

(
  (comment)* @doc
  .
  (method_declaration
    name: (field_identifier) @name.definition.method) @definition.method
  (#strip! @doc "^//\\s*")
  (#select-adjacent! @doc @definition.method)
)

(call_expression
  function: [
    (identifier) @name.reference.call
    (parenthesized_expression (identifier) @name.reference.call)
    (selector_expression field: (field_identifier) @name.reference.call)
    (parenthesized_expression (selector_expression field: (field_identifier) @name.reference.call))
  ]) @reference.call

(type_spec
  name: (type_identifier) @name.definition.type) @definition.type

(type_identifier) @name.reference.type @reference.type
"#,
    }
}

fn rust_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Rust,
        language: tree_sitter_rust::LANGUAGE.into(),
        extensions: &["rs"],
        query: r#"
; ADT definitions

(struct_item
    name: (type_identifier) @name.definition.class) @definition.class

(enum_item
    name: (type_identifier) @name.definition.class) @definition.class

(union_item
    name: (type_identifier) @name.definition.class) @definition.class

; type aliases

(type_item
    name: (type_identifier) @name.definition.class) @definition.class

; method definitions

(declaration_list
    (function_item
        name: (identifier) @name.definition.method) @definition.method)

; function definitions

(function_item
    name: (identifier) @name.definition.function) @definition.function

; trait definitions

(trait_item
    name: (type_identifier) @name.definition.interface) @definition.interface

; module definitions

(mod_item
    name: (identifier) @name.definition.module) @definition.module

; macro definitions

(macro_definition
    name: (identifier) @name.definition.macro) @definition.macro

; references

(call_expression
    function: (identifier) @name.reference.call) @reference.call

(call_expression
    function: (field_expression
        field: (field_identifier) @name.reference.call)) @reference.call

(macro_invocation
    macro: (identifier) @name.reference.call) @reference.call

; implementations

(impl_item
    trait: (type_identifier) @name.reference.implementation) @reference.implementation

(impl_item
    type: (type_identifier) @name.reference.implementation
    !trait) @reference.implementation
"#,
    }
}

fn cpp_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Cpp,
        language: tree_sitter_cpp::LANGUAGE.into(),
        extensions: &["cpp", "cc", "hpp", "h", "cxx"],
        query: r#"
(struct_specifier name: (type_identifier) @name.definition.class body:(_)) @definition.class

(declaration type: (union_specifier name: (type_identifier) @name.definition.class)) @definition.class

(function_declarator declarator: (identifier) @name.definition.function) @definition.function

(function_declarator declarator: (field_identifier) @name.definition.function) @definition.function

(function_declarator declarator: (qualified_identifier scope: (namespace_identifier) name: (identifier) @name.definition.method)) @definition.method

(type_definition declarator: (type_identifier) @name.definition.type) @definition.type

(enum_specifier name: (type_identifier) @name.definition.type) @definition.type

(class_specifier name: (type_identifier) @name.definition.class) @definition.class
"#,
    }
}

fn c_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::C,
        language: tree_sitter_c::LANGUAGE.into(),
        extensions: &["c"],
        query: r#"
(struct_specifier name: (type_identifier) @name.definition.class body:(_)) @definition.class

(declaration type: (union_specifier name: (type_identifier) @name.definition.class)) @definition.class

(function_declarator declarator: (identifier) @name.definition.function) @definition.function

(type_definition declarator: (type_identifier) @name.definition.type) @definition.type

(enum_specifier name: (type_identifier) @name.definition.type) @definition.type
"#,
    }
}

fn ruby_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Ruby,
        language: tree_sitter_ruby::LANGUAGE.into(),
        extensions: &["rb"],
        query: r#"
; Method definitions

(
  (comment)* @doc
  .
  [
    (method
      name: (_) @name.definition.method) @definition.method
    (singleton_method
      name: (_) @name.definition.method) @definition.method
  ]
  (#strip! @doc "^#\\s*")
  (#select-adjacent! @doc @definition.method)
)

(alias
  name: (_) @name.definition.method) @definition.method

; Class definitions

(
  (comment)* @doc
  .
  [
    (class
      name: [
        (constant) @name.definition.class
        (scope_resolution
          name: (_) @name.definition.class)
      ]) @definition.class
    (singleton_class
      value: [
        (constant) @name.definition.class
        (scope_resolution
          name: (_) @name.definition.class)
      ]) @definition.class
  ]
  (#strip! @doc "^#\\s*")
  (#select-adjacent! @doc @definition.class)
)

; Module definitions

(
  (module
    name: [
      (constant) @name.definition.module
      (scope_resolution
        name: (_) @name.definition.module)
    ]) @definition.module
)

; Calls

(call method: (identifier) @name.reference.call) @reference.call

(
  [(identifier) (constant)] @name.reference.call @reference.call
  (#is-not? local)
  (#not-match? @name.reference.call "^(lambda|load|require|require_relative|__FILE__|__LINE__)$")
)
"#,
    }
}

fn java_config() -> LanguageConfig {
    LanguageConfig {
        id: LanguageId::Java,
        language: tree_sitter_java::LANGUAGE.into(),
        extensions: &["java"],
        query: r#"
(class_declaration
  name: (identifier) @name.definition.class) @definition.class

(method_declaration
  name: (identifier) @name.definition.method) @definition.method

(method_invocation
  name: (identifier) @name.reference.call
  arguments: (argument_list) @reference.call)

(interface_declaration
  name: (identifier) @name.definition.interface) @definition.interface

(type_list
  (type_identifier) @name.reference.implementation) @reference.implementation

(object_creation_expression
  type: (type_identifier) @name.reference.class) @reference.class

(superclass (type_identifier) @name.reference.class) @reference.class
"#,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::symbols::SymbolExtractor;
    use crate::outline::{ExtractError, SourceUnit, SymbolTable};
    use tree_sitter::Query;

    #[test]
    fn test_extension_lookup() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.get_by_extension("py").map(|c| c.id), Some(LanguageId::Python));
        assert_eq!(registry.get_by_extension(".go").map(|c| c.id), Some(LanguageId::Go));
        assert_eq!(registry.get_by_extension("JSX").map(|c| c.id), Some(LanguageId::Tsx));
        assert_eq!(registry.get_by_extension("h").map(|c| c.id), Some(LanguageId::Cpp));
        assert!(registry.get_by_extension("xyz").is_none());
    }

    #[test]
    fn test_path_lookup() {
        let registry = LanguageRegistry::new();
        let config = registry.get_by_path(Path::new("src/lib.rs")).unwrap();
        assert_eq!(config.id, LanguageId::Rust);
        assert!(registry.get_by_path(Path::new("Makefile")).is_none());
    }

    fn go_registry(query: &'static str) -> LanguageRegistry {
        LanguageRegistry {
            configs: vec![LanguageConfig {
                query,
                ..go_config()
            }],
        }
    }

    fn extract_with(registry: &LanguageRegistry, text: &str) -> Result<SymbolTable, ExtractError> {
        SymbolExtractor::new(registry).extract(&SourceUnit::new("p.go", text))
    }

    #[test]
    fn test_single_capture_pattern_is_fatal() {
        let registry =
            go_registry("(function_declaration name: (identifier) @name.definition.function)");
        let err = extract_with(&registry, "package p\nfunc F() {}\n").unwrap_err();

        match &err {
            ExtractError::QueryContractViolation {
                pattern_index,
                captures,
                ..
            } => {
                assert_eq!(*pattern_index, 0);
                assert_eq!(captures, "name.definition.function");
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("match id:"));
        assert!(message.contains("pattern_index:0"));
    }

    #[test]
    fn test_pattern_without_name_capture_is_fatal() {
        let registry = go_registry(
            "(function_declaration name: (identifier) @reference.call) @definition.function",
        );
        let err = extract_with(&registry, "package p\nfunc F() {}\n").unwrap_err();
        assert!(matches!(err, ExtractError::QueryContractViolation { .. }));
        assert!(err.to_string().contains("reference.call"));
    }

    #[test]
    fn test_name_only_pattern_is_skipped() {
        let registry = go_registry(
            "(function_declaration name: (identifier) @name.definition.function @name.reference.call)",
        );
        let table = extract_with(&registry, "package p\nfunc F() {}\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_all_queries_compile() {
        let registry = LanguageRegistry::new();
        for config in registry.iter() {
            if let Err(e) = Query::new(&config.language, config.query) {
                panic!("query for {} failed to compile: {e}", config.id);
            }
        }
    }
}
