//! Tree-sitter backed symbol outlines.

use crate::error::{ProviderError, ProviderResult};
use crate::host::{DocumentStore, SymbolProvider};
use crate::model::{FileId, Symbol, SymbolKind};
use crate::text::{LineIndex, Range};
use crate::workspace::scan::language_for_path;
use async_trait::async_trait;
use std::sync::Arc;
use tree_sitter::{Language, Node, Parser};

fn grammar(language: &str) -> Option<Language> {
    let language = match language {
        "rust" => tree_sitter_rust::LANGUAGE,
        "python" => tree_sitter_python::LANGUAGE,
        "javascript" => tree_sitter_javascript::LANGUAGE,
        "typescript" => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
        "tsx" => tree_sitter_typescript::LANGUAGE_TSX,
        "go" => tree_sitter_go::LANGUAGE,
        "csharp" => tree_sitter_c_sharp::LANGUAGE,
        "lua" => tree_sitter_lua::LANGUAGE,
        _ => return None,
    };
    Some(language.into())
}

/// Outline of documents from a [`DocumentStore`], parsed with tree-sitter.
pub struct OutlineProvider {
    documents: Arc<dyn DocumentStore>,
}

impl OutlineProvider {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl SymbolProvider for OutlineProvider {
    async fn document_symbols(&self, file: &FileId) -> ProviderResult<Vec<Symbol>> {
        let Some(language) = language_for_path(file.path()) else {
            return Err(ProviderError::Unavailable(format!(
                "no outline support for {file}"
            )));
        };
        let snapshot = self.documents.open(file).await?;
        let path = file.to_string();
        tokio::task::spawn_blocking(move || outline_source(language, &snapshot.text))
            .await
            .map_err(|err| ProviderError::Unavailable(format!("outline task for {path}: {err}")))?
            .map_err(|message| ProviderError::Parse { path: file.to_string(), message })
    }
}

/// Parse `source` and build its symbol forest.
pub fn outline_source(language: &str, source: &str) -> Result<Vec<Symbol>, String> {
    let grammar = grammar(language).ok_or_else(|| format!("unsupported language {language}"))?;
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|err| format!("load {language} grammar: {err}"))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| format!("{language} parser produced no tree"))?;
    let ctx = OutlineContext {
        language,
        source,
        lines: LineIndex::new(source),
    };
    Ok(ctx.walk(tree.root_node(), false))
}

struct OutlineContext<'a> {
    language: &'a str,
    source: &'a str,
    lines: LineIndex,
}

struct Declared<'t> {
    kind: SymbolKind,
    name_node: Node<'t>,
}

impl<'a> OutlineContext<'a> {
    fn walk(&self, node: Node<'_>, in_type: bool) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match self.declared(child) {
                Some(declared) => {
                    let kind = self.refine(declared.kind, in_type, declared.name_node);
                    let is_type = matches!(
                        kind,
                        SymbolKind::Class | SymbolKind::Struct | SymbolKind::Interface | SymbolKind::Enum
                    );
                    let name = self.text(declared.name_node).to_string();
                    let symbol = Symbol::new(
                        name,
                        kind,
                        self.range(child),
                        self.range(declared.name_node),
                    )
                    .with_children(self.walk(child, is_type));
                    out.push(symbol);
                }
                None => out.extend(self.walk(child, in_type)),
            }
        }
        out
    }

    fn declared<'t>(&self, node: Node<'t>) -> Option<Declared<'t>> {
        let named = |kind: SymbolKind, field: &str| {
            node.child_by_field_name(field)
                .map(|name_node| Declared { kind, name_node })
        };
        match (self.language, node.kind()) {
            ("rust", "function_item" | "function_signature_item") => named(SymbolKind::Function, "name"),
            ("rust", "impl_item") => named(SymbolKind::Class, "type"),
            ("rust", "struct_item") => named(SymbolKind::Struct, "name"),
            ("rust", "enum_item") => named(SymbolKind::Enum, "name"),
            ("rust", "trait_item") => named(SymbolKind::Interface, "name"),
            ("rust", "mod_item") => named(SymbolKind::Module, "name"),
            ("rust", "const_item" | "static_item") => named(SymbolKind::Constant, "name"),

            ("python", "function_definition") => named(SymbolKind::Function, "name"),
            ("python", "class_definition") => named(SymbolKind::Class, "name"),

            ("javascript" | "typescript" | "tsx", kind) => match kind {
                "function_declaration" | "generator_function_declaration" => {
                    named(SymbolKind::Function, "name")
                }
                "method_definition" | "method_signature" => named(SymbolKind::Method, "name"),
                "class_declaration" | "abstract_class_declaration" | "class" => {
                    named(SymbolKind::Class, "name")
                }
                "interface_declaration" => named(SymbolKind::Interface, "name"),
                "enum_declaration" => named(SymbolKind::Enum, "name"),
                "variable_declarator" => {
                    let value = node.child_by_field_name("value")?;
                    match value.kind() {
                        "arrow_function" | "function_expression" | "function" => {
                            named(SymbolKind::Function, "name")
                        }
                        _ => None,
                    }
                }
                _ => None,
            },

            ("go", "function_declaration") => named(SymbolKind::Function, "name"),
            ("go", "method_declaration") => named(SymbolKind::Method, "name"),
            ("go", "type_spec") => {
                let kind = match node.child_by_field_name("type").map(|t| t.kind()) {
                    Some("struct_type") => SymbolKind::Struct,
                    Some("interface_type") => SymbolKind::Interface,
                    _ => SymbolKind::Other,
                };
                named(kind, "name")
            }

            ("csharp", kind) => match kind {
                "class_declaration" | "record_declaration" => named(SymbolKind::Class, "name"),
                "struct_declaration" => named(SymbolKind::Struct, "name"),
                "interface_declaration" => named(SymbolKind::Interface, "name"),
                "enum_declaration" => named(SymbolKind::Enum, "name"),
                "namespace_declaration" => named(SymbolKind::Namespace, "name"),
                "method_declaration" => named(SymbolKind::Method, "name"),
                "constructor_declaration" => named(SymbolKind::Constructor, "name"),
                "local_function_statement" => named(SymbolKind::Function, "name"),
                "property_declaration" => named(SymbolKind::Property, "name"),
                _ => None,
            },

            ("lua", "function_declaration") => {
                let name = node.child_by_field_name("name")?;
                match name.kind() {
                    "method_index_expression" => name
                        .child_by_field_name("method")
                        .map(|name_node| Declared { kind: SymbolKind::Method, name_node }),
                    "dot_index_expression" => name
                        .child_by_field_name("field")
                        .map(|name_node| Declared { kind: SymbolKind::Function, name_node }),
                    _ => Some(Declared {
                        kind: SymbolKind::Function,
                        name_node: name,
                    }),
                }
            }
            _ => None,
        }
    }

    /// Functions declared inside a type become methods; constructor names
    /// become constructors.
    fn refine(&self, kind: SymbolKind, in_type: bool, name_node: Node<'_>) -> SymbolKind {
        if !kind.is_callable() {
            return kind;
        }
        let name = self.text(name_node);
        let constructor = match self.language {
            "python" => name == "__init__",
            "javascript" | "typescript" | "tsx" => name == "constructor",
            _ => false,
        };
        if constructor {
            SymbolKind::Constructor
        } else if kind == SymbolKind::Function && in_type {
            SymbolKind::Method
        } else {
            kind
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or("")
    }

    fn range(&self, node: Node<'_>) -> Range {
        self.lines
            .range(self.source, node.start_byte(), node.end_byte())
    }
}
